use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use zoomos_model::FileStatus;

use crate::types::{FileSummary, ProcessResult};

pub fn print_summary(result: &ProcessResult) {
    println!("Client: {}", result.client_id);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Id"),
        header_cell("Chain"),
        header_cell("Status"),
        header_cell("Rows"),
        header_cell("Success"),
        header_cell("Errors"),
        header_cell("Seconds"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 4..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 3, CellAlignment::Center);
    for file in &result.files {
        table.add_row(file_row(file));
    }
    let totals = &result.totals;
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(format!("{} files", result.files.len()))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(totals.total_count).add_attribute(Attribute::Bold),
        Cell::new(totals.success_count).add_attribute(Attribute::Bold),
        count_cell(totals.error_count, Color::Red).add_attribute(Attribute::Bold),
        Cell::new(totals.processing_time_seconds).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");

    let exports: Vec<_> = result
        .files
        .iter()
        .filter_map(|file| file.export.as_ref())
        .collect();
    if !exports.is_empty() {
        println!("Exports:");
        for path in exports {
            println!("- {}", path.display());
        }
    }

    let messages: Vec<_> = result
        .files
        .iter()
        .filter_map(|file| file.message.as_ref().map(|message| (file, message)))
        .collect();
    if !messages.is_empty() {
        eprintln!("Messages:");
        for (file, message) in messages {
            eprintln!("- {}: {message}", file.path.display());
        }
    }
}

fn file_row(file: &FileSummary) -> Vec<Cell> {
    vec![
        Cell::new(file.path.display()),
        file.id.map_or_else(|| dim_cell("-"), Cell::new),
        if file.chain.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(&file.chain)
        },
        status_cell(file.status),
        Cell::new(file.stats.total_count),
        Cell::new(file.stats.success_count),
        count_cell(file.stats.error_count, Color::Red),
        dim_cell(file.stats.processing_time_seconds),
    ]
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: FileStatus) -> Cell {
    let color = match status {
        FileStatus::Completed => Color::Green,
        FileStatus::CompletedWithErrors => Color::Yellow,
        FileStatus::Error => Color::Red,
        FileStatus::Cancelled | FileStatus::Pending | FileStatus::Processing => Color::DarkGrey,
    };
    Cell::new(status.as_str())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
