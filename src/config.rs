use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::stats::{AggregateOptions, TimeRange, DEFAULT_TOP_EXERCISES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,

    // API Settings
    pub api_bind_addr: String,
    pub cors_allowed_origins: String,

    // Statistics
    pub default_user: String,
    pub default_range: TimeRange,
    pub top_exercises: usize,
    pub normalize_exercise_names: bool,

    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "training_stats.db".to_string(),
            api_bind_addr: "127.0.0.1:3001".to_string(),
            cors_allowed_origins: "http://localhost:3000".to_string(),
            default_user: "me".to_string(),
            default_range: TimeRange::Last30Days,
            top_exercises: DEFAULT_TOP_EXERCISES,
            normalize_exercise_names: false,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        Figment::from(figment::providers::Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("Training.toml"))
            .merge(Json::file("Training.json"))
            .merge(Env::raw().only(&["DATABASE_URL"]))
            .merge(Env::prefixed("TRAINING_"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            top_exercises: self.top_exercises,
            normalize_exercise_names: self.normalize_exercise_names,
        }
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_files_or_env() {
        Jail::expect_with(|_jail| {
            let config = AppConfig::load()?;
            assert_eq!(config.default_range, TimeRange::Last30Days);
            assert_eq!(config.top_exercises, 5);
            assert!(!config.normalize_exercise_names);
            Ok(())
        });
    }

    #[test]
    fn toml_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Training.toml",
                r#"
                default_range = "90d"
                top_exercises = 3
                cors_allowed_origins = "http://a.test, http://b.test"
                "#,
            )?;
            jail.set_env("DATABASE_URL", "sqlite:///tmp/other.db");
            jail.set_env("TRAINING_NORMALIZE_EXERCISE_NAMES", "true");
            jail.set_env("TRAINING_TOP_EXERCISES", "10");

            let config = AppConfig::load()?;
            assert_eq!(config.default_range, TimeRange::Last90Days);
            assert_eq!(config.top_exercises, 10);
            assert_eq!(config.database_url, "sqlite:///tmp/other.db");
            assert!(config.aggregate_options().normalize_exercise_names);
            assert_eq!(config.cors_origins(), vec!["http://a.test", "http://b.test"]);
            Ok(())
        });
    }
}
