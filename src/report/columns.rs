use crate::insights::{AggregatedRow, Metric};
use crate::report::format::{num_formatter, perc_formatter};

/// What a column shows for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnValue {
    Binary,
    Function,
    Mean(Metric),
    BaseMean(Metric),
    Perc(Metric),
}

impl ColumnValue {
    pub fn render(&self, row: &AggregatedRow) -> String {
        match self {
            ColumnValue::Binary => row.binary_name.clone(),
            ColumnValue::Function => row.function_name.clone(),
            ColumnValue::Mean(metric) => num_formatter(row.mean(*metric)),
            ColumnValue::BaseMean(metric) => num_formatter(row.base_mean(*metric)),
            ColumnValue::Perc(metric) => perc_formatter(row.perc(*metric)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub header: String,
    pub value: ColumnValue,
}

impl ColumnDescriptor {
    fn new(header: impl Into<String>, value: ColumnValue) -> Self {
        Self {
            header: header.into(),
            value,
        }
    }
}

/// Report columns; each metric's base mean and percentage follow its mean when comparing
pub fn columns(has_baseline: bool) -> Vec<ColumnDescriptor> {
    let mut columns = vec![
        ColumnDescriptor::new("Binary", ColumnValue::Binary),
        ColumnDescriptor::new("Function", ColumnValue::Function),
    ];

    for metric in Metric::ALL {
        columns.push(ColumnDescriptor::new(
            format!("{} mean", metric.label()),
            ColumnValue::Mean(metric),
        ));
        if has_baseline {
            columns.push(ColumnDescriptor::new(
                format!("{} base mean", metric.label()),
                ColumnValue::BaseMean(metric),
            ));
            columns.push(ColumnDescriptor::new(
                format!("{} %", metric.label()),
                ColumnValue::Perc(metric),
            ));
        }
    }

    columns
}

/// Rendered table: one header row plus formatted body rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub body: Vec<Vec<String>>,
}

impl Table {
    pub fn build(rows: &[AggregatedRow], columns: &[ColumnDescriptor]) -> Self {
        if rows.is_empty() {
            return Self {
                header: vec!["No symbols found".to_string()],
                body: Vec::new(),
            };
        }

        Self {
            header: columns.iter().map(|c| c.header.clone()).collect(),
            body: rows
                .iter()
                .map(|row| columns.iter().map(|c| c.value.render(row)).collect())
                .collect(),
        }
    }

    /// GitHub flavored markdown table
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&markdown_row(&self.header));
        out.push_str(&markdown_row(&vec!["---".to_string(); self.header.len()]));
        for row in &self.body {
            out.push_str(&markdown_row(row));
        }
        out
    }
}

/// Cells stay on one row: line breaks become spaces and pipes are escaped
fn markdown_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells
        .iter()
        .map(|c| c.replace("\r\n", " ").replace(['\n', '\r'], " ").replace('|', "\\|"))
        .collect();
    format!("| {} |\n", escaped.join(" | "))
}
