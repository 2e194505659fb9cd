// src/powerflow.rs

use thiserror::Error;

use crate::{
    parse::{Row, Table, Value},
    render::html::html_escape,
};

/// Buses in the flow matrix. Fields are `P{from}{to}` for 1..=4.
pub const BUSES: usize = 4;
pub const HOUR_COLUMN: &str = "Hour";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PowerflowError {
    #[error("row {row}: field {field:?} is missing")]
    Missing { row: usize, field: String },
    #[error("row {row}: field {field:?} is not numeric ({value:?})")]
    NotNumeric {
        row: usize,
        field: String,
        value: String,
    },
}

/// One hour of line flows, `cells[from][to]` in MW.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowMatrix {
    pub hour: f64,
    pub cells: [[f64; BUSES]; BUSES],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Zero,
    Low,
    Mid,
    High,
}

pub fn field_name(from: usize, to: usize) -> String {
    format!("P{}{}", from + 1, to + 1)
}

fn numeric(row: &Row, field: &str, row_no: usize) -> Result<f64, PowerflowError> {
    match row.get(field) {
        None | Some(Value::Null) => Err(PowerflowError::Missing {
            row: row_no,
            field: field.to_string(),
        }),
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(PowerflowError::NotNumeric {
            row: row_no,
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

impl FlowMatrix {
    /// Build the matrix from one `powerflow.csv` row. `row_no` is only for errors.
    pub fn from_row(row: &Row, row_no: usize) -> Result<Self, PowerflowError> {
        let hour = numeric(row, HOUR_COLUMN, row_no)?;
        let mut cells = [[0.0; BUSES]; BUSES];
        for (from, line) in cells.iter_mut().enumerate() {
            for (to, cell) in line.iter_mut().enumerate() {
                *cell = numeric(row, &field_name(from, to), row_no)?;
            }
        }
        Ok(Self { hour, cells })
    }

    pub fn max_abs(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    /// Colour band of `value` relative to the largest magnitude in the grid.
    pub fn band(value: f64, max_abs: f64) -> Band {
        if value == 0.0 || max_abs <= 0.0 {
            return Band::Zero;
        }
        let ratio = value.abs() / max_abs;
        if ratio < 1.0 / 3.0 {
            Band::Low
        } else if ratio < 2.0 / 3.0 {
            Band::Mid
        } else {
            Band::High
        }
    }
}

/// Background colour: blues for export (positive), reds for import.
fn colour(value: f64, band: Band) -> &'static str {
    match (band, value > 0.0) {
        (Band::Zero, _) => "#f5f5f5",
        (Band::Low, true) => "#c6dbef",
        (Band::Mid, true) => "#6baed6",
        (Band::High, true) => "#2171b5",
        (Band::Low, false) => "#fcbba1",
        (Band::Mid, false) => "#fb6a4a",
        (Band::High, false) => "#cb181d",
    }
}

/// Every hour of a power-flow table, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSeries {
    pub matrices: Vec<FlowMatrix>,
}

impl FlowSeries {
    /// Zero rows gives an empty series, never an error.
    pub fn from_table(table: &Table) -> Result<Self, PowerflowError> {
        let matrices = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| FlowMatrix::from_row(row, i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { matrices })
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Distinct hours in file order; these populate the hour selector.
    pub fn hours(&self) -> Vec<f64> {
        let mut hours: Vec<f64> = Vec::with_capacity(self.matrices.len());
        for m in &self.matrices {
            if !hours.contains(&m.hour) {
                hours.push(m.hour);
            }
        }
        hours
    }

    /// First matrix recorded for `hour`.
    pub fn at(&self, hour: f64) -> Option<&FlowMatrix> {
        self.matrices.iter().find(|m| m.hour == hour)
    }
}

/// 4×4 grid, one coloured cell per line flow.
pub fn render_heatmap(region_id: &str, matrix: &FlowMatrix) -> String {
    let max_abs = matrix.max_abs();
    let mut out = format!(
        r#"<table id="{}" class="heatmap" data-hour="{}"><caption>Hour {}</caption><thead><tr><th></th>"#,
        html_escape(region_id),
        matrix.hour,
        matrix.hour
    );
    for to in 0..BUSES {
        out.push_str(&format!("<th>To {}</th>", to + 1));
    }
    out.push_str("</tr></thead><tbody>");
    for (from, line) in matrix.cells.iter().enumerate() {
        out.push_str(&format!("<tr><th>From {}</th>", from + 1));
        for &v in line {
            let band = FlowMatrix::band(v, max_abs);
            out.push_str(&format!(
                r#"<td style="background:{}" title="{:.2} MW">{:.1}</td>"#,
                colour(v, band),
                v,
                v
            ));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// Hour selector plus one grid per hour. Only the first hour starts
/// visible; the page script swaps grids when the selection changes.
pub fn render_heatmaps(region_id: &str, series: &FlowSeries) -> String {
    if series.is_empty() {
        return r#"<p class="heatmap-empty">No hours to plot.</p>"#.to_string();
    }
    let hours = series.hours();

    let id = html_escape(region_id);
    let mut out = format!(r#"<div class="heatmaps" id="{id}"><label>Hour <select class="hour-select">"#);
    for (i, hour) in hours.iter().enumerate() {
        let selected = if i == 0 { " selected" } else { "" };
        out.push_str(&format!(r#"<option value="{hour}"{selected}>{hour}</option>"#));
    }
    out.push_str("</select></label>");
    for (i, hour) in hours.iter().enumerate() {
        let Some(matrix) = series.at(*hour) else {
            continue;
        };
        let hidden = if i == 0 { "" } else { " hidden" };
        out.push_str(&format!(r#"<div class="heatmap-hour" data-hour="{hour}"{hidden}>"#));
        out.push_str(&render_heatmap(&format!("{region_id}-{i}"), matrix));
        out.push_str("</div>");
    }
    out.push_str("</div>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn powerflow_csv(rows: &[(u32, f64)]) -> String {
        let mut header = vec!["Hour".to_string()];
        for from in 0..BUSES {
            for to in 0..BUSES {
                header.push(field_name(from, to));
            }
        }
        let mut out = header.join(",");
        out.push('\n');
        for (hour, base) in rows {
            let mut line = vec![hour.to_string()];
            for k in 0..BUSES * BUSES {
                line.push(format!("{}", base * (k as f64 - 7.0)));
            }
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_matrix_from_rows() {
        let table = parse(&powerflow_csv(&[(1, 10.0), (2, 1.0)])).unwrap();
        let series = FlowSeries::from_table(&table).unwrap();
        assert_eq!(series.hours(), vec![1.0, 2.0]);
        let m = series.at(1.0).unwrap();
        assert_eq!(m.cells[0][0], -70.0);
        assert_eq!(m.cells[1][3], 0.0);
        assert_eq!(m.cells[3][3], 80.0);
        assert_eq!(m.max_abs(), 80.0);
    }

    #[test]
    fn test_empty_table_is_empty_series() {
        let table = parse(&powerflow_csv(&[])).unwrap();
        let series = FlowSeries::from_table(&table).unwrap();
        assert!(series.is_empty());
        assert!(series.hours().is_empty());
    }

    #[test]
    fn test_missing_column_is_error() {
        let table = parse("Hour,P11\n1,5\n").unwrap();
        let err = FlowSeries::from_table(&table).unwrap_err();
        assert_eq!(
            err,
            PowerflowError::Missing {
                row: 1,
                field: "P12".into()
            }
        );
    }

    #[test]
    fn test_non_numeric_is_error() {
        let csv = powerflow_csv(&[(1, 1.0)]).replacen("\n1,", "\nnoon,", 1);
        let table = parse(&csv).unwrap();
        assert!(matches!(
            FlowSeries::from_table(&table),
            Err(PowerflowError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_bands() {
        assert_eq!(FlowMatrix::band(0.0, 10.0), Band::Zero);
        assert_eq!(FlowMatrix::band(5.0, 0.0), Band::Zero);
        assert_eq!(FlowMatrix::band(-2.0, 10.0), Band::Low);
        assert_eq!(FlowMatrix::band(5.0, 10.0), Band::Mid);
        assert_eq!(FlowMatrix::band(-10.0, 10.0), Band::High);
    }

    #[test]
    fn test_hours_are_distinct() {
        let table = parse(&powerflow_csv(&[(1, 1.0), (2, 2.0), (1, 3.0)])).unwrap();
        let series = FlowSeries::from_table(&table).unwrap();
        assert_eq!(series.hours(), vec![1.0, 2.0]);
        assert_eq!(series.at(1.0).unwrap().cells[0][0], -7.0);
        assert!(series.at(5.0).is_none());
    }

    #[test]
    fn test_render_heatmaps_one_grid_per_hour() {
        let table = parse(&powerflow_csv(&[(1, 1.0), (2, 2.0), (3, 0.5)])).unwrap();
        let series = FlowSeries::from_table(&table).unwrap();
        let html = render_heatmaps("powerflowHeatmap", &series);

        assert!(html.contains(r#"<select class="hour-select">"#));
        assert_eq!(html.matches("<option ").count(), 3);
        assert!(html.contains(r#"<option value="1" selected>1</option>"#));
        assert!(html.contains(r#"<option value="3">3</option>"#));
        assert_eq!(html.matches(r#"class="heatmap""#).count(), 3);
        assert!(html.contains(r#"<div class="heatmap-hour" data-hour="1">"#));
        assert!(html.contains(r#"<div class="heatmap-hour" data-hour="2" hidden>"#));
        assert!(html.contains(r#"id="powerflowHeatmap-2""#));
    }

    #[test]
    fn test_render_heatmaps_without_hours() {
        let html = render_heatmaps("h", &FlowSeries::default());
        assert!(html.contains("No hours to plot."));
        assert!(!html.contains("<select"));
    }

    #[test]
    fn test_render_heatmap_grid() {
        let table = parse(&powerflow_csv(&[(7, 1.0)])).unwrap();
        let series = FlowSeries::from_table(&table).unwrap();
        let html = render_heatmap("flowHeatmap", series.at(7.0).unwrap());
        assert!(html.contains("Hour 7"));
        assert_eq!(html.matches("<td ").count(), 16);
        assert!(html.contains("#cb181d")); // -7 is the largest import
        assert!(html.contains("#2171b5")); // +8 is the largest export
    }
}
