//! Error kinds of the merge and query engines.

use std::process::{ExitCode, Termination};

/// Errors that terminate a genotype merge run or a query request.
///
/// An empty query result is not an error, see `query::executor::QueryOutcome`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The backing store could not be opened or read.
    #[error("backing store unavailable: {0}")]
    StoreUnavailable(String),
    /// One row of the ingestion batch could not be decoded.
    #[error("malformed row in line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    /// A stored row, or its sample genotypes, could not be decoded.
    #[error("corrupt stored row for variant {key}: {reason}")]
    CorruptStoredRow { key: String, reason: String },
    /// The query names a gene missing from the coordinate table.
    #[error("unrecognized gene symbol: {0}")]
    UnknownGene(String),
    /// The query string matches none of the accepted shapes.
    #[error("invalid query: {0}")]
    UnparseableQuery(String),
    /// The table is not part of the configured schema.
    #[error("unknown table: {0}")]
    UnknownTable(String),
    /// The column is not part of the configured table schema.
    #[error("unknown column {column:?} in table {table}")]
    UnknownColumn { table: String, column: String },
    /// None of the requested columns has a display label.
    #[error("no displayable columns selected for table {0}")]
    EmptyProjection(String),
}

impl Error {
    /// Process exit code for the error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::StoreUnavailable(_) => 2,
            Error::MalformedRow { .. } => 3,
            Error::CorruptStoredRow { .. } => 4,
            Error::UnknownGene(_) => 5,
            Error::UnparseableQuery(_) => 6,
            Error::UnknownTable(_) | Error::UnknownColumn { .. } => 7,
            Error::EmptyProjection(_) => 8,
        }
    }
}

impl Termination for Error {
    fn report(self) -> ExitCode {
        ExitCode::from(self.exit_code())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            Error::UnknownGene(String::from("FAKEGENE123")).to_string(),
            "unrecognized gene symbol: FAKEGENE123"
        );
        assert_eq!(
            Error::MalformedRow {
                line: 3,
                reason: String::from("too few columns")
            }
            .to_string(),
            "malformed row in line 3: too few columns"
        );
    }

    #[test]
    fn exit_codes_distinct_for_user_facing_errors() {
        let unknown_gene = Error::UnknownGene(String::new()).exit_code();
        let unparseable = Error::UnparseableQuery(String::new()).exit_code();
        let unavailable = Error::StoreUnavailable(String::new()).exit_code();
        assert_ne!(unknown_gene, unparseable);
        assert_ne!(unknown_gene, unavailable);
        assert_ne!(unparseable, unavailable);
    }
}
