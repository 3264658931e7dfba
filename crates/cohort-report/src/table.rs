//! Group comparison output tables.

use std::fmt;

use comfy_table::{Cell, CellAlignment};
use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::render::{align_column, number_cell, p_value_cell, styled_table};

/// Whether a table summarizes continuous or categorical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Continuous,
    Categorical,
}

/// One row of a comparison table.
///
/// For continuous tables the three summary cells read `"{mean} ± {sd} ({n})"`;
/// for categorical tables they read `"{count} (%{percent})"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub variable: String,
    pub total: String,
    pub reference: String,
    pub other: String,
    /// Chi-square statistic; categorical tables only.
    pub chi_square: Option<f64>,
    /// Odds ratio; 2x2 categorical tables only.
    pub odds_ratio: Option<f64>,
    pub p_value: f64,
}

/// A "Table 1" comparison of a reference group against everyone else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub kind: TableKind,
    /// Column that split the cohort.
    pub separator: String,
    /// Level of the separator that defines the reference group.
    pub reference_key: String,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn new(kind: TableKind, separator: impl Into<String>, reference_key: impl Into<String>) -> Self {
        Self {
            kind,
            separator: separator.into(),
            reference_key: reference_key.into(),
            rows: Vec::new(),
        }
    }

    /// Header of the reference-group column, e.g. `status == alive`.
    pub fn reference_label(&self) -> String {
        format!("{} == {}", self.separator, self.reference_key)
    }

    /// Header of the other-group column, e.g. `status != alive`.
    pub fn other_label(&self) -> String {
        format!("{} != {}", self.separator, self.reference_key)
    }

    /// Column headers in output order.
    pub fn column_labels(&self) -> Vec<String> {
        let mut labels = vec![
            "variable".to_string(),
            "Total".to_string(),
            self.reference_label(),
            self.other_label(),
        ];
        if self.kind == TableKind::Categorical {
            labels.push("chi^2".to_string());
            labels.push("oddsRatio".to_string());
        }
        labels.push("pvalue".to_string());
        labels
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at a 0-based index.
    pub fn row(&self, index: usize) -> Option<&ComparisonRow> {
        self.rows.get(index)
    }

    /// First row with the given variable label.
    pub fn find(&self, variable: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|row| row.variable == variable)
    }

    /// Converts the table to a `DataFrame` with [`Self::column_labels`] as headers.
    ///
    /// # Errors
    ///
    /// Returns an error if Polars rejects the columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let variable: Vec<&str> = self.rows.iter().map(|row| row.variable.as_str()).collect();
        let total: Vec<&str> = self.rows.iter().map(|row| row.total.as_str()).collect();
        let reference: Vec<&str> = self.rows.iter().map(|row| row.reference.as_str()).collect();
        let other: Vec<&str> = self.rows.iter().map(|row| row.other.as_str()).collect();

        let mut columns = vec![
            Column::new("variable".into(), variable),
            Column::new("Total".into(), total),
            Column::new(self.reference_label().into(), reference),
            Column::new(self.other_label().into(), other),
        ];
        if self.kind == TableKind::Categorical {
            let chi_square: Vec<Option<f64>> = self.rows.iter().map(|row| row.chi_square).collect();
            let odds_ratio: Vec<Option<f64>> = self.rows.iter().map(|row| row.odds_ratio).collect();
            columns.push(Column::new("chi^2".into(), chi_square));
            columns.push(Column::new("oddsRatio".into(), odds_ratio));
        }
        let p_values: Vec<f64> = self.rows.iter().map(|row| row.p_value).collect();
        columns.push(Column::new("pvalue".into(), p_values));

        Ok(DataFrame::new(columns)?)
    }

    /// Serializes the table, including its rows, as pretty-printed JSON.
    ///
    /// Non-finite numbers (an infinite odds ratio, for example) become `null`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = styled_table(&self.column_labels());
        for row in &self.rows {
            let mut cells = vec![
                Cell::new(&row.variable),
                Cell::new(&row.total),
                Cell::new(&row.reference),
                Cell::new(&row.other),
            ];
            if self.kind == TableKind::Categorical {
                cells.push(number_cell(row.chi_square));
                cells.push(number_cell(row.odds_ratio));
            }
            cells.push(p_value_cell(row.p_value));
            table.add_row(cells);
        }
        for index in 1..table.column_count() {
            align_column(&mut table, index, CellAlignment::Right);
        }
        write!(f, "{table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categorical() -> ComparisonTable {
        let mut table = ComparisonTable::new(TableKind::Categorical, "status", "alive");
        table.rows.push(ComparisonRow {
            variable: "sex - F".to_string(),
            total: "4 (%40.00)".to_string(),
            reference: "2 (%33.33)".to_string(),
            other: "2 (%50.00)".to_string(),
            chi_square: Some(0.0),
            odds_ratio: Some(f64::INFINITY),
            p_value: 1.0,
        });
        table
    }

    #[test]
    fn test_column_labels() {
        let table = categorical();
        assert_eq!(
            table.column_labels(),
            vec![
                "variable",
                "Total",
                "status == alive",
                "status != alive",
                "chi^2",
                "oddsRatio",
                "pvalue"
            ]
        );

        let continuous = ComparisonTable::new(TableKind::Continuous, "status", "alive");
        assert_eq!(continuous.column_labels().len(), 5);
    }

    #[test]
    fn test_to_dataframe() {
        let frame = categorical().to_dataframe().unwrap();
        assert_eq!(frame.shape(), (1, 7));
        let names: Vec<&str> = frame
            .get_columns()
            .iter()
            .map(|column| column.name().as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "variable",
                "Total",
                "status == alive",
                "status != alive",
                "chi^2",
                "oddsRatio",
                "pvalue"
            ]
        );
    }

    #[test]
    fn test_to_json_nulls_infinity() {
        let json = categorical().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "categorical");
        assert_eq!(value["rows"][0]["variable"], "sex - F");
        assert!(value["rows"][0]["odds_ratio"].is_null());
    }

    #[test]
    fn test_display_contains_headers_and_cells() {
        let rendered = categorical().to_string();
        assert!(rendered.contains("status == alive"));
        assert!(rendered.contains("2 (%33.33)"));
        assert!(rendered.contains("inf"));
    }
}
