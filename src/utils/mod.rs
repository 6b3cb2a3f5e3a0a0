/// "1h 5m" when at least an hour, "45m" otherwise, "0m" when unknown.
pub fn format_workout_duration(duration_seconds: Option<u32>) -> String {
    let Some(seconds) = duration_seconds else {
        return "0m".to_string();
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Running clock for an active workout: "1:02:03" or "2:03".
pub fn format_elapsed(elapsed_seconds: u64) -> String {
    let hours = elapsed_seconds / 3600;
    let minutes = (elapsed_seconds % 3600) / 60;
    let seconds = elapsed_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workout_duration_formatting() {
        assert_eq!(format_workout_duration(None), "0m");
        assert_eq!(format_workout_duration(Some(59)), "0m");
        assert_eq!(format_workout_duration(Some(2700)), "45m");
        assert_eq!(format_workout_duration(Some(3900)), "1h 5m");
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0:00");
        assert_eq!(format_elapsed(123), "2:03");
        assert_eq!(format_elapsed(3723), "1:02:03");
    }
}
