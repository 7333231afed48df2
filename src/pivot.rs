//! pivot.rs — Flat records → (LOKASI, STATE) × (TYPE, GRADE) count grid.
//!
//! Row and column keys keep the order in which they first appear in the
//! records; nothing is sorted. Records missing any of the four dimensions
//! do not contribute.

use std::collections::HashMap;

use serde::Serialize;

use crate::query_schema::{COL_GRADE, COL_LOCATION, COL_STATE, COL_TYPE};
use crate::record::FlatRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RowKey {
    pub location: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnKey {
    pub container_type: String,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PivotTable {
    pub rows: Vec<RowKey>,
    pub columns: Vec<ColumnKey>,
    /// `cells[r][c]` counts records with `rows[r]` and `columns[c]`.
    pub cells: Vec<Vec<u64>>,
}

impl PivotTable {
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }
}

pub fn build_pivot(records: &[FlatRecord]) -> PivotTable {
    let mut rows: Vec<RowKey> = Vec::new();
    let mut columns: Vec<ColumnKey> = Vec::new();
    let mut row_index: HashMap<RowKey, usize> = HashMap::new();
    let mut col_index: HashMap<ColumnKey, usize> = HashMap::new();
    let mut hits: Vec<(usize, usize)> = Vec::new();

    for (location, state, container_type, grade) in records.iter().filter_map(FlatRecord::pivot_key) {
        let row = RowKey { location: location.to_string(), state: state.to_string() };
        let r = *row_index.entry(row.clone()).or_insert_with(|| {
            rows.push(row);
            rows.len() - 1
        });

        let col = ColumnKey { container_type: container_type.to_string(), grade: grade.to_string() };
        let c = *col_index.entry(col.clone()).or_insert_with(|| {
            columns.push(col);
            columns.len() - 1
        });

        hits.push((r, c));
    }

    let mut cells = vec![vec![0u64; columns.len()]; rows.len()];
    for (r, c) in hits {
        cells[r][c] += 1;
    }

    PivotTable { rows, columns, cells }
}

/// One display row: LOKASI is empty when it repeats the row above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub location: String,
    pub state: String,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayPivotTable {
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<DisplayRow>,
}

/// Blank each LOKASI label equal to the previous row's, mimicking merged
/// cells. Compares against the previous row's original label, so runs of
/// any length collapse to their first row.
pub fn collapse_for_display(pivot: &PivotTable) -> DisplayPivotTable {
    let mut previous: Option<&str> = None;
    let rows = pivot
        .rows
        .iter()
        .zip(&pivot.cells)
        .map(|(key, counts)| {
            let location = if previous == Some(key.location.as_str()) {
                String::new()
            } else {
                key.location.clone()
            };
            previous = Some(key.location.as_str());
            DisplayRow { location, state: key.state.clone(), counts: counts.clone() }
        })
        .collect();

    DisplayPivotTable { columns: pivot.columns.clone(), rows }
}

impl DisplayPivotTable {
    /// `<table>` fragment with a two-level header (TYPE over GRADE).
    pub fn render_html(&self) -> String {
        let mut out = String::from("<table border=\"1\" class=\"dataframe\">\n  <thead>\n");

        out.push_str(&format!(
            "    <tr>\n      <th rowspan=\"2\">{}</th>\n      <th rowspan=\"2\">{}</th>\n",
            COL_LOCATION, COL_STATE
        ));
        for (label, span) in type_spans(&self.columns) {
            out.push_str(&format!("      <th colspan=\"{}\">{}</th>\n", span, escape_html(label)));
        }
        out.push_str("    </tr>\n    <tr>\n");
        for col in &self.columns {
            out.push_str(&format!("      <th>{}</th>\n", escape_html(&col.grade)));
        }
        out.push_str("    </tr>\n  </thead>\n  <tbody>\n");

        for row in &self.rows {
            out.push_str("    <tr>\n");
            out.push_str(&format!("      <td>{}</td>\n", escape_html(&row.location)));
            out.push_str(&format!("      <td>{}</td>\n", escape_html(&row.state)));
            for n in &row.counts {
                out.push_str(&format!("      <td>{}</td>\n", n));
            }
            out.push_str("    </tr>\n");
        }
        out.push_str("  </tbody>\n</table>");
        out
    }

    /// Comma-separated export: a TYPE header line, a GRADE header line, then
    /// one line per display row.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();

        let mut types = vec![COL_TYPE.to_string(), String::new()];
        types.extend(self.columns.iter().map(|c| c.container_type.clone()));
        push_csv_line(&mut out, &types);

        let mut grades = vec![COL_LOCATION.to_string(), COL_STATE.to_string()];
        grades.extend(self.columns.iter().map(|c| format!("{} {}", COL_GRADE, c.grade)));
        push_csv_line(&mut out, &grades);

        for row in &self.rows {
            let mut fields = vec![row.location.clone(), row.state.clone()];
            fields.extend(row.counts.iter().map(|n| n.to_string()));
            push_csv_line(&mut out, &fields);
        }
        out
    }

    /// Plain-text grid for terminal output.
    pub fn format_table(&self) -> String {
        let mut header = vec![COL_LOCATION.to_string(), COL_STATE.to_string()];
        header.extend(self.columns.iter().map(|c| format!("{}/{}", c.container_type, c.grade)));

        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| {
                let mut line = vec![r.location.clone(), r.state.clone()];
                line.extend(r.counts.iter().map(|n| n.to_string()));
                line
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for line in &body {
            for (i, val) in line.iter().enumerate() {
                widths[i] = widths[i].max(val.chars().count());
            }
        }

        let render = |cells: &[String]| -> String {
            let joined = cells
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
                .collect::<Vec<_>>()
                .join(" | ");
            format!("| {} |\n", joined)
        };

        let mut out = render(&header);
        let sep = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-");
        out.push_str(&format!("|-{}-|\n", sep));
        for line in &body {
            out.push_str(&render(line));
        }
        out.push_str(&format!("  {} row(s)\n", self.rows.len()));
        out
    }
}

/// Consecutive runs of the same TYPE, for the spanning header cells.
fn type_spans(columns: &[ColumnKey]) -> Vec<(&str, usize)> {
    let mut spans: Vec<(&str, usize)> = Vec::new();
    for col in columns {
        match spans.last_mut() {
            Some((label, n)) if *label == col.container_type => *n += 1,
            _ => spans.push((col.container_type.as_str(), 1)),
        }
    }
    spans
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn push_csv_line(out: &mut String, fields: &[String]) {
    let line = fields
        .iter()
        .map(|f| {
            if f.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}
