/// Live timer format, `HH:MM:SS`.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = total_secs / 60 % 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Trip summary format, `1h 5m` or `5m` below an hour.
pub fn format_summary(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = total_secs / 60 % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
