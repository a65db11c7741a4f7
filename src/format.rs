//! Display formatting for live workout screens.

/// `MM:SS` below an hour, `HH:MM:SS` from an hour on.
///
/// ```
/// use aerofit_tracker::format::format_duration;
/// assert_eq!(format_duration(75), "01:15");
/// assert_eq!(format_duration(3_725), "01:02:05");
/// ```
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Minutes per kilometer for a speed in km/h, `None` when not moving.
pub fn pace_min_per_km(speed_kmh: f64) -> Option<f64> {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        Some(60.0 / speed_kmh)
    } else {
        None
    }
}

/// Pace as `MM:SS` per km, or `--:--` when not moving.
pub fn format_pace(speed_kmh: f64) -> String {
    match pace_min_per_km(speed_kmh) {
        Some(pace) => {
            let total_secs = (pace * 60.0).round() as u64;
            format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
        }
        None => "--:--".to_string(),
    }
}

/// Distance for display: meters below 1 km, kilometers with two decimals above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{:.0} m", meters.max(0.0))
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}
