/// Parses `H:MM:SS`, `MM:SS` or `SS` into seconds.
///
/// Parsing is lenient: an empty unit counts as zero, but a non-numeric or
/// negative unit, a blank string, or more than three units yields 0 for the
/// whole value instead of an error.
pub fn parse_hms(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }

    let mut units = Vec::with_capacity(3);
    for part in text.split(':') {
        let part = part.trim();
        if part.is_empty() {
            units.push(0.0);
            continue;
        }
        match part.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => units.push(value),
            _ => return 0.0,
        }
    }

    match units.as_slice() {
        [s] => *s,
        [m, s] => m * 60.0 + s,
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        _ => 0.0,
    }
}

/// `H:MM:SS` from one hour up, `M:SS` below.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Renders seconds per km as `M:SS /km`, or `-` when there is no pace.
pub fn format_pace(seconds_per_km: Option<f64>) -> String {
    match seconds_per_km {
        Some(pace) if pace.is_finite() && pace > 0.0 => {
            let mut m = (pace / 60.0).floor() as u64;
            let mut s = (pace % 60.0).round() as u64;
            if s == 60 {
                m += 1;
                s = 0;
            }
            format!("{}:{:02} /km", m, s)
        }
        _ => "-".to_string(),
    }
}

pub fn pace_seconds_per_km(distance_km: f64, seconds: f64) -> Option<f64> {
    if distance_km > 0.0 && distance_km.is_finite() {
        Some(seconds / distance_km)
    } else {
        None
    }
}

pub fn speed_kmh(distance_km: f64, seconds: f64) -> Option<f64> {
    if distance_km <= 0.0 || seconds <= 0.0 || !distance_km.is_finite() || !seconds.is_finite() {
        return None;
    }
    Some(distance_km / (seconds / 3600.0))
}
