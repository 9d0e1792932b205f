use std::time::Duration;

/// Format a duration into human-readable form
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use rs_chain_diagnose::utils::format::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
/// assert_eq!(format_duration(Duration::from_secs(12)), "12.00s");
/// assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }

    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        return format!("{secs:.2}s");
    }

    let total = duration.as_secs();
    format!("{}m{:02}s", total / 60, total % 60)
}
