//! Human-readable formatting helpers.

/// Formats a byte count with a binary unit suffix (`B`, `KB`, `MB`, `GB`, `TB`).
///
/// Values are scaled by 1024 and printed with up to two decimals, trailing zeros
/// trimmed.
///
/// # Examples
///
/// ```rust
/// use heapscope::utils::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(100 * 1024 * 1024), "100 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut order = 0;
    while value >= 1024.0 && order < UNITS.len() - 1 {
        value /= 1024.0;
        order += 1;
    }

    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[order])
}

/// Formats a count with `,` thousands separators.
///
/// ```rust
/// use heapscope::utils::format_count;
///
/// assert_eq!(format_count(10_000), "10,000");
/// ```
#[must_use]
pub fn format_count(count: u64) -> String {
    let digits = count.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
