mod parser;

use super::domain::{OrderRecord, OrderValidationError};
use super::scoring::{RiskAssessment, RiskScorer};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

use parser::ParseError;

#[derive(Debug)]
pub enum BatchImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidCell {
        line: u64,
        column: &'static str,
        value: String,
    },
    InvalidOrder {
        line: u64,
        column: &'static str,
        source: OrderValidationError,
    },
}

impl std::fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchImportError::Io(err) => write!(f, "failed to read order export: {}", err),
            BatchImportError::Csv(err) => write!(f, "invalid order CSV data: {}", err),
            BatchImportError::InvalidCell {
                line,
                column,
                value,
            } => write!(f, "line {line}: unrecognised {column} value '{value}'"),
            BatchImportError::InvalidOrder {
                line,
                column,
                source,
            } => write!(f, "line {line}: invalid {column}: {source}"),
        }
    }
}

impl std::error::Error for BatchImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BatchImportError::Io(err) => Some(err),
            BatchImportError::Csv(err) => Some(err),
            BatchImportError::InvalidCell { .. } => None,
            BatchImportError::InvalidOrder { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for BatchImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for BatchImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ParseError> for BatchImportError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Csv(err) => Self::Csv(err),
            ParseError::Cell(cell) => Self::InvalidCell {
                line: cell.line,
                column: cell.column,
                value: cell.value,
            },
        }
    }
}

/// One scored row of an order export.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub order_id: String,
    pub order: OrderRecord,
    pub assessment: RiskAssessment,
    /// Historical outcome when the export carries a `Canceled` column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled: Option<bool>,
}

impl BatchRow {
    pub fn agrees_with_label(&self) -> Option<bool> {
        self.cancelled
            .map(|cancelled| cancelled == self.assessment.is_high_risk())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub rows: Vec<BatchRow>,
}

impl BatchReport {
    pub fn high_risk_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.assessment.is_high_risk())
            .count()
    }

    pub fn labelled_count(&self) -> usize {
        self.rows.iter().filter(|row| row.cancelled.is_some()).count()
    }

    /// Share of labelled rows where the rule scorer matches the recorded outcome.
    pub fn agreement(&self) -> Option<f64> {
        let labelled = self.labelled_count();
        if labelled == 0 {
            return None;
        }

        let agreeing = self
            .rows
            .iter()
            .filter(|row| row.agrees_with_label() == Some(true))
            .count();
        Some(agreeing as f64 / labelled as f64)
    }
}

/// Scores every order in a CSV export.
pub struct OrderBatchImporter;

impl OrderBatchImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<BatchReport, BatchImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<BatchReport, BatchImportError> {
        let scorer = RiskScorer::new();
        let mut report = BatchReport::default();

        for row in parser::parse_rows(reader)? {
            row.order
                .validate()
                .map_err(|source| BatchImportError::InvalidOrder {
                    line: row.line,
                    column: parser::field_column(source.field()),
                    source,
                })?;

            let assessment = scorer.assess(&row.order);
            report.rows.push(BatchRow {
                order_id: row.order_id,
                order: row.order,
                assessment,
                cancelled: row.cancelled,
            });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::risk::domain::PaymentMethod;
    use std::io::Cursor;

    const HEADER: &str = "Order ID,Delivery Time,Order Value,Cancellation History,Distance,Time of Order,Payment Method,Address Issues,Peak Hour Order,Canceled";

    fn import(body: &str) -> Result<BatchReport, BatchImportError> {
        let csv = format!("{HEADER}\n{body}");
        OrderBatchImporter::from_reader(Cursor::new(csv.into_bytes()))
    }

    #[test]
    fn parse_hour_supports_bare_and_clock_values() {
        assert_eq!(parser::parse_hour_for_tests("18"), Some(18));
        assert_eq!(parser::parse_hour_for_tests("07:45"), Some(7));
        assert_eq!(parser::parse_hour_for_tests("24"), None);
        assert_eq!(parser::parse_hour_for_tests("evening"), None);
    }

    #[test]
    fn scores_rows_and_measures_agreement() {
        let report = import(
            "A1,30,500,2,5,18,Card,No,No,0\n\
             A2,45,500,2,15,21,COD,Yes,Yes,1\n\
             A3,20,10000,0,0,9,UPI,No,No,1\n",
        )
        .expect("export parses");

        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].assessment.score, 35.0);
        assert_eq!(report.rows[1].order.payment_method, PaymentMethod::Cash);
        assert!(report.rows[1].assessment.is_high_risk());
        assert_eq!(report.high_risk_count(), 1);
        assert_eq!(report.labelled_count(), 3);
        let agreement = report.agreement().expect("labels present");
        assert!((agreement - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn unlabelled_exports_have_no_agreement() {
        let csv = "Delivery Time,Order Value,Cancellation History,Distance,Time of Order,Payment Method,Address Issues,Peak Hour Order\n30,500,2,5,18,card,0,0\n";
        let report =
            OrderBatchImporter::from_reader(Cursor::new(csv.as_bytes())).expect("export parses");

        assert_eq!(report.rows[0].order_id, "row-2");
        assert_eq!(report.labelled_count(), 0);
        assert!(report.agreement().is_none());
    }

    #[test]
    fn rejects_unknown_payment_method_with_line_number() {
        match import("A1,30,500,2,5,18,cheque,No,No,0\n") {
            Err(BatchImportError::InvalidCell { line, column, value }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "Payment Method");
                assert_eq!(value, "cheque");
            }
            other => panic!("expected invalid cell, got {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_order_value() {
        match import("A1,30,-5,2,5,18,card,No,No,0\n") {
            Err(BatchImportError::InvalidOrder { column, .. }) => {
                assert_eq!(column, "Order Value")
            }
            other => panic!("expected invalid order, got {other:?}"),
        }
    }
}
