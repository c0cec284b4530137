//! Human-readable size labels.
//!
//! File nodes store their size only as a label ("1.24 MB"), so storage
//! accounting parses the label back through the same unit table.

const UNITS: [(&str, u64); 5] = [
    ("B", 1),
    ("KB", 1024),
    ("MB", 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("TB", 1024 * 1024 * 1024 * 1024),
];

/// Format a byte count with the largest unit not exceeding it, rounded to
/// two decimals with trailing zeros dropped ("1.2 MB", "24 KB", "0 B").
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let (unit, multiplier) = UNITS
        .iter()
        .rev()
        .find(|(_, multiplier)| bytes >= *multiplier)
        .copied()
        .unwrap_or(UNITS[0]);

    let value = bytes as f64 / multiplier as f64;
    format!("{} {}", trim_decimals(value), unit)
}

/// Byte equivalent of a size label. Malformed labels and unknown units count as 0.
pub fn parse_size_label(label: &str) -> f64 {
    let parts: Vec<&str> = label.trim().split(' ').collect();
    if parts.len() != 2 {
        return 0.0;
    }

    let value: f64 = match parts[0].parse() {
        Ok(v) => v,
        Err(_) => return 0.0,
    };
    if !value.is_finite() || value < 0.0 {
        return 0.0;
    }

    let unit = parts[1].to_uppercase();
    UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| value * *multiplier as f64)
        .unwrap_or(0.0)
}

fn trim_decimals(value: f64) -> String {
    let fixed = format!("{:.2}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
