//! Table output using the `tabled` crate.

use super::{truncate, OutputConfig};
use tabled::{
    builder::Builder,
    settings::{object::Columns, style::Style, Alignment, Modify, Width},
};

pub struct TableOutput;

impl TableOutput {
    /// Two-column table of labels and values.
    pub fn format_key_value(pairs: &[(&str, String)], config: &OutputConfig) -> String {
        let mut builder = Builder::default();
        for (key, value) in pairs {
            builder.push_record([*key, value.as_str()]);
        }

        let mut table = builder.build();
        Self::style(&mut table, config);
        table.with(Modify::new(Columns::first()).with(Alignment::right()));
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }
        table.to_string()
    }

    /// Table with a header row. Cells in `truncated` columns are cut to
    /// `max_cell` characters when truncation is on.
    pub fn from_rows(
        headers: &[&str],
        rows: &[Vec<String>],
        truncated: &[usize],
        max_cell: usize,
        config: &OutputConfig,
    ) -> String {
        if rows.is_empty() {
            return "(no modules)".to_string();
        }

        let mut builder = Builder::default();
        builder.push_record(headers.iter().copied());
        for row in rows {
            builder.push_record(row.iter().enumerate().map(|(i, cell)| {
                if config.should_truncate() && truncated.contains(&i) {
                    truncate(cell, max_cell)
                } else {
                    cell.clone()
                }
            }));
        }

        let mut table = builder.build();
        Self::style(&mut table, config);
        if config.should_truncate() {
            table.with(Width::wrap(config.effective_width()));
        }
        table.to_string()
    }

    fn style(table: &mut tabled::Table, config: &OutputConfig) {
        if config.compact {
            table.with(Style::blank());
        } else {
            table.with(Style::rounded());
        }
    }
}
