//! Evaluation of compiled queries against the datastore.

use std::{cmp::Ordering, io::Write};

use crate::{
    err::Error,
    store::{Row, Store},
};

use super::compiler::{CompiledQuery, Predicate, Value};

/// Rows of one result, projected to the display labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    /// Display labels of the columns.
    pub labels: Vec<String>,
    /// Cell values in label order.
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultTable {
    /// Append the rows of `other`, which must have the same labels.
    pub fn append(&mut self, mut other: ResultTable) {
        if self.labels.is_empty() {
            self.labels = other.labels;
        }
        self.rows.append(&mut other.rows);
    }

    /// Write as TSV with a header line of labels.
    pub fn write_tsv<W: Write>(&self, writer: W) -> Result<(), anyhow::Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(writer);

        csv_writer.write_record(&self.labels)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(cell))?;
        }
        csv_writer.flush()?;

        Ok(())
    }
}

fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        value => value.to_string(),
    }
}

/// Outcome of a successful query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// At least one row matched.
    Rows(ResultTable),
    /// No row matched.
    Empty,
}

/// Compare the stored value against the bound value, `None` if they are not
/// comparable.
fn compare(stored: &serde_json::Value, bound: &Value) -> Option<Ordering> {
    let bound = match bound {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        Value::Text(bound) => {
            return match stored {
                serde_json::Value::Null => None,
                serde_json::Value::String(s) => Some(s.as_str().cmp(bound.as_str())),
                stored => Some(stored.to_string().as_str().cmp(bound.as_str())),
            }
        }
    };
    let stored = match stored {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    stored.partial_cmp(&bound)
}

/// Whether `row` satisfies `predicate`; a row without the column never does.
fn matches(row: &Row, predicate: &Predicate) -> bool {
    row.get(&predicate.column)
        .and_then(|stored| compare(stored, &predicate.value))
        .map(|ordering| predicate.operator.accepts(ordering))
        .unwrap_or(false)
}

/// Run `compiled` against its table in `store`.
pub fn execute(store: &Store, compiled: &CompiledQuery) -> Result<QueryOutcome, Error> {
    tracing::debug!(
        "executing {} with {:?}",
        compiled.statement(),
        compiled.params()
    );

    let mut table = ResultTable {
        labels: compiled
            .projection
            .iter()
            .map(|c| c.display_label.clone())
            .collect(),
        rows: Vec::new(),
    };
    for row in store.scan(&compiled.table)? {
        let row = row?;
        if compiled.predicates.iter().all(|p| matches(&row, p)) {
            table.rows.push(
                compiled
                    .projection
                    .iter()
                    .map(|c| {
                        row.get(&c.storage_column)
                            .cloned()
                            .unwrap_or(serde_json::Value::Null)
                    })
                    .collect(),
            );
        }
    }

    if table.rows.is_empty() {
        Ok(QueryOutcome::Empty)
    } else {
        Ok(QueryOutcome::Rows(table))
    }
}
