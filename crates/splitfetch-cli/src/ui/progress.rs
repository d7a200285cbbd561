//! Download progress formatting

use splitfetch_core::Progress;

const BAR_WIDTH: usize = 30;
const MIB: f64 = 1024.0 * 1024.0;

/// Human readable size, e.g. `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Throughput, e.g. `850.0 KB/s` or `2.4 MB/s`
pub fn format_speed(bytes_per_sec: f64) -> String {
    let kib = bytes_per_sec / 1024.0;
    if kib >= 1024.0 {
        format!("{:.1} MB/s", kib / 1024.0)
    } else {
        format!("{kib:.1} KB/s")
    }
}

/// One progress line: `name: [█████░░░] 42.0% (1.2/3.0MB) 850.0 KB/s`
///
/// Without a known total only the byte count and speed are shown.
pub fn format_progress_line(label: &str, progress: &Progress) -> String {
    let speed = format_speed(progress.bytes_per_sec);
    let done_mb = progress.downloaded as f64 / MIB;

    match (progress.percent(), progress.total) {
        (Some(percent), Some(total)) => {
            let percent = percent.min(100.0);
            let filled = ((percent / 100.0) * BAR_WIDTH as f64) as usize;
            let bar = format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled));
            format!(
                "{label}: [{bar}] {percent:.1}% ({done_mb:.1}/{:.1}MB) {speed}",
                total as f64 / MIB
            )
        }
        _ => format!("{label}: {done_mb:.1}MB {speed}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(870_400.0), "850.0 KB/s");
        assert_eq!(format_speed(2.5 * 1024.0 * 1024.0), "2.5 MB/s");
    }

    #[test]
    fn test_progress_line() {
        let progress = Progress {
            downloaded: 1_258_292,
            total: Some(3 * 1024 * 1024),
            bytes_per_sec: 870_400.0,
        };
        let line = format_progress_line("base.apk", &progress);
        assert!(line.starts_with("base.apk: ["));
        assert!(line.ends_with("] 40.0% (1.2/3.0MB) 850.0 KB/s"));
        assert_eq!(line.matches('█').count(), 12);
        assert_eq!(line.matches('░').count(), 18);
    }

    #[test]
    fn test_progress_line_unknown_total() {
        let progress = Progress {
            downloaded: 2 * 1024 * 1024,
            total: None,
            bytes_per_sec: 0.0,
        };
        assert_eq!(
            format_progress_line("split", &progress),
            "split: 2.0MB 0.0 KB/s"
        );
    }
}
