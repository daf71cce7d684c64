use chrono::{DateTime, Utc};

/// Format timestamp as a calendar date
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

/// Format timestamp in human-readable format
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Truncate a long identifier for table display
pub fn truncate_id(id: &str, width: usize) -> String {
    if id.chars().count() <= width || width < 4 {
        id.to_string()
    } else {
        let kept: String = id.chars().take(width - 3).collect();
        format!("{}...", kept)
    }
}

/// Print a formatted table border
pub fn print_table_border(width: usize) {
    println!("{}", "=".repeat(width));
}

/// Print a table row with columns
pub fn print_table_row(columns: &[&str], widths: &[usize]) {
    let mut row = String::new();
    for (col, width) in columns.iter().zip(widths) {
        row.push_str(&format!("{:<width$}  ", truncate_id(col, *width), width = *width));
    }
    println!("{}", row.trim_end());
}
