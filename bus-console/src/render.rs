//! Plain-text rendering of the message table

use std::fmt::Write;

use bus_monitor::{
    format_frequency, ByteTrend, Column, FilterSet, RowSnapshot, SortOrder, ViewSnapshot,
};

const NAME_WIDTH: usize = 24;

/// Render one payload byte with its highlight marker
///
/// `+` marks a byte that rose, `-` one that fell, a space one that is steady.
fn render_byte(row: &RowSnapshot, position: usize, value: u8) -> String {
    let marker = match row.highlights.iter().find(|h| h.position == position) {
        Some(h) if h.trend == ByteTrend::Rising => '+',
        Some(_) => '-',
        None => ' ',
    };
    format!("{}{:02X}", marker, value)
}

fn header_title(column: Column, sort: (Column, SortOrder)) -> String {
    match sort {
        (sorted, SortOrder::Ascending) if sorted == column => format!("{}^", column.title()),
        (sorted, SortOrder::Descending) if sorted == column => format!("{}v", column.title()),
        _ => column.title().to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width - 1).collect();
        out.push('~');
        out
    }
}

/// Render the committed view as a text table
pub fn render_table(
    view: &ViewSnapshot,
    sort: (Column, SortOrder),
    filters: &FilterSet,
    max_rows: usize,
) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} / {} messages  t={:.3}s  rejected={}  suppressed={}",
        view.len(),
        view.total_rows,
        view.current_time.as_secs_f64(),
        view.rejected_frames,
        view.suppressed_bytes
    );
    if !filters.is_empty() {
        let active: Vec<String> = filters
            .iter()
            .map(|(column, text)| format!("{} {}", column.title(), text))
            .collect();
        let _ = writeln!(out, "filter: {}", active.join(", "));
    }

    let _ = writeln!(
        out,
        "{:<name$} {:>4} {:>8} {:>6} {:>8}  {}",
        header_title(Column::Name, sort),
        header_title(Column::Source, sort),
        header_title(Column::Address, sort),
        header_title(Column::Frequency, sort),
        header_title(Column::Count, sort),
        header_title(Column::Data, sort),
        name = NAME_WIDTH
    );

    for row in view.rows.iter().take(max_rows) {
        let bytes: String = row
            .payload
            .iter()
            .enumerate()
            .map(|(position, value)| render_byte(row, position, *value))
            .collect();

        let _ = write!(
            out,
            "{:<name$} {:>4} {:>8} {:>6} {:>8} {}",
            truncate(&row.name, NAME_WIDTH),
            row.source(),
            row.id.address_hex(),
            format_frequency(row.frequency),
            row.count,
            bytes,
            name = NAME_WIDTH
        );
        for warning in &row.warnings {
            let _ = write!(out, "  ! {}", warning);
        }
        out.push('\n');
    }

    if view.len() > max_rows {
        let _ = writeln!(out, "... {} more", view.len() - max_rows);
    }
    out
}
