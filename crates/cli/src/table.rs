// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Column layout for `rvt list`.
//!
//! Widths come from the data. Styling is applied after padding so escape
//! codes never count toward a column's width.

use std::io::Write;

use crate::color;

const SEP: &str = "  ";

pub enum Align {
    Left,
    Right,
}

/// Coloring for a cell once it has been padded.
pub enum CellStyle {
    Plain,
    Muted,
    /// Colored by lifecycle status word.
    Status,
}

pub struct Column {
    pub name: &'static str,
    pub align: Align,
    pub style: CellStyle,
    /// Lower bound on the width; the header length otherwise.
    pub min_width: Option<usize>,
    /// Longer values are cut to this many characters.
    pub max_width: Option<usize>,
}

impl Column {
    fn new(name: &'static str, align: Align, style: CellStyle) -> Self {
        Self {
            name,
            align,
            style,
            min_width: None,
            max_width: None,
        }
    }

    pub fn left(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Plain)
    }

    pub fn right(name: &'static str) -> Self {
        Self::new(name, Align::Right, CellStyle::Plain)
    }

    pub fn muted(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Muted)
    }

    pub fn status(name: &'static str) -> Self {
        Self::new(name, Align::Left, CellStyle::Status)
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max_width = Some(max);
        self
    }

    fn clip<'a>(&self, value: &'a str) -> &'a str {
        match self.max_width {
            Some(max) => match value.char_indices().nth(max) {
                Some((end, _)) => &value[..end],
                None => value,
            },
            None => value,
        }
    }

    /// Pads `text` to `width`, except a trailing left-aligned column.
    fn fit(&self, text: &str, width: usize, last: bool) -> String {
        match self.align {
            Align::Left if last => text.to_string(),
            Align::Left => format!("{:<width$}", text),
            Align::Right => format!("{:>width$}", text),
        }
    }
}

pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
    colorize: bool,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self::with_color(columns, color::should_colorize())
    }

    #[cfg(test)]
    pub fn plain(columns: Vec<Column>) -> Self {
        Self::with_color(columns, false)
    }

    #[cfg(test)]
    pub fn colored(columns: Vec<Column>) -> Self {
        Self::with_color(columns, true)
    }

    fn with_color(columns: Vec<Column>, colorize: bool) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            colorize,
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Writes the header and every row. An empty table writes nothing.
    pub fn render(&self, out: &mut impl Write) {
        if self.rows.is_empty() {
            return;
        }
        let widths = self.widths();
        let last = self.columns.len().saturating_sub(1);

        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let cell = col.fit(col.name, widths[i], i == last);
                if self.colorize {
                    color::apply_header(&cell)
                } else {
                    cell
                }
            })
            .collect();
        let _ = writeln!(out, "{}", header.join(SEP));

        for row in &self.rows {
            let cells: Vec<String> = self
                .columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let value = col.clip(row.get(i).map_or("", String::as_str));
                    self.style(col, col.fit(value, widths[i], i == last))
                })
                .collect();
            let _ = writeln!(out, "{}", cells.join(SEP));
        }
    }

    fn widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let widest = self
                    .rows
                    .iter()
                    .map(|row| row.get(i).map_or(0, |cell| col.clip(cell).chars().count()))
                    .max()
                    .unwrap_or(0);
                col.min_width.unwrap_or(col.name.len()).max(widest)
            })
            .collect()
    }

    fn style(&self, col: &Column, cell: String) -> String {
        if !self.colorize {
            return cell;
        }
        match col.style {
            CellStyle::Plain => cell,
            CellStyle::Muted => color::apply_muted(&cell),
            CellStyle::Status => color::apply_status(&cell),
        }
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
