const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
const K: u64 = 1024;

/// Human readable byte count, `1024` -> `"1 KB"`.
///
/// The value is rounded to `decimals` places and trailing zeros are dropped.
/// Anything past terabytes is still expressed in TB.
pub fn format_bytes(bytes: u64, decimals: i32) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let decimals = decimals.max(0) as usize;

    let mut unit = 0;
    let mut scale = 1u64;
    while unit + 1 < UNITS.len() && bytes / scale >= K {
        scale *= K;
        unit += 1;
    }

    // Ties round up, not to even.
    let factor = 10f64.powi(decimals as i32);
    let value = (bytes as f64 / scale as f64 * factor).round() / factor;
    format!("{} {}", trim_fraction(format!("{:.*}", decimals, value)), UNITS[unit])
}

fn trim_fraction(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

/// First `max` characters of `name`, with `...` appended when it was longer.
pub fn truncate_label(name: &str, max: usize) -> String {
    if name.chars().count() > max {
        let mut label: String = name.chars().take(max).collect();
        label.push_str("...");
        label
    } else {
        name.to_string()
    }
}

/// Size in MB rounded to two decimals, as plotted by the size ranking.
pub fn megabytes(bytes: u64) -> f64 {
    let mb = bytes as f64 / 1024.0 / 1024.0;
    (mb * 100.0).round() / 100.0
}
