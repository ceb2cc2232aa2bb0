//! Data structures of parsed search patterns.

use serde::{Deserialize, Serialize};

/// Comparison operator of a field clause.
#[derive(
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Clone,
    Copy,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum Operator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Eq,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Ge,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Le,
}

impl Operator {
    /// Whether `ordering` of stored value against bound value satisfies the
    /// operator.
    pub fn accepts(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Operator::Eq => ordering == Equal,
            Operator::Gt => ordering == Greater,
            Operator::Lt => ordering == Less,
            Operator::Ge => ordering != Less,
            Operator::Le => ordering != Greater,
        }
    }
}

/// Order in which operators are tried when splitting a clause.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum OperatorPrecedence {
    /// Two-character operators first: `>=`, `<=`, `=`, `>`, `<`.
    #[default]
    MostSpecificFirst,
    /// `=`, `>`, `<`, `>=`, `<=` as historically, so `a>=1` splits at `=`.
    Legacy,
}

impl OperatorPrecedence {
    /// The operators in the order they are tried.
    pub fn operators(&self) -> &'static [Operator] {
        match self {
            OperatorPrecedence::MostSpecificFirst => &[
                Operator::Ge,
                Operator::Le,
                Operator::Eq,
                Operator::Gt,
                Operator::Lt,
            ],
            OperatorPrecedence::Legacy => &[
                Operator::Eq,
                Operator::Gt,
                Operator::Lt,
                Operator::Ge,
                Operator::Le,
            ],
        }
    }
}

/// Closed genomic interval on one chromosome.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct GenomicRange {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
}

/// One clause of a parsed search pattern.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchClause {
    /// A single variant.
    LocationExact {
        chrom: String,
        pos: u32,
        reference: String,
        alternative: String,
    },
    /// All variants at one position.
    LocationPoint { chrom: String, pos: u32 },
    /// All variants within a range, bounds included.
    LocationRange(GenomicRange),
    /// Comparison of a column against a literal.
    FieldComparison {
        field: String,
        operator: Operator,
        value: String,
    },
}

/// A parsed search pattern, the conjunction of its clauses.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct Query {
    pub clauses: Vec<SearchClause>,
}

#[cfg(test)]
mod test {
    use std::{cmp::Ordering, str::FromStr};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("=", Operator::Eq)]
    #[case(">", Operator::Gt)]
    #[case("<", Operator::Lt)]
    #[case(">=", Operator::Ge)]
    #[case("<=", Operator::Le)]
    fn operator_strings(#[case] s: &str, #[case] op: Operator) -> Result<(), anyhow::Error> {
        assert_eq!(Operator::from_str(s)?, op);
        assert_eq!(op.to_string(), s);

        Ok(())
    }

    #[rstest]
    #[case(Operator::Eq, [false, true, false])]
    #[case(Operator::Gt, [false, false, true])]
    #[case(Operator::Lt, [true, false, false])]
    #[case(Operator::Ge, [false, true, true])]
    #[case(Operator::Le, [true, true, false])]
    fn operator_accepts(#[case] op: Operator, #[case] expected: [bool; 3]) {
        assert_eq!(
            [
                op.accepts(Ordering::Less),
                op.accepts(Ordering::Equal),
                op.accepts(Ordering::Greater)
            ],
            expected
        );
    }

    #[test]
    fn precedence_covers_all_operators() {
        use strum::IntoEnumIterator;

        for precedence in [OperatorPrecedence::MostSpecificFirst, OperatorPrecedence::Legacy] {
            let ops = precedence.operators();
            assert_eq!(ops.len(), 5);
            assert!(Operator::iter().all(|op| ops.contains(&op)));
        }
    }

    #[test]
    fn clause_json() -> Result<(), anyhow::Error> {
        let query = Query {
            clauses: vec![
                SearchClause::LocationRange(GenomicRange {
                    chrom: String::from("chr17"),
                    start: 1,
                    end: 2,
                }),
                SearchClause::FieldComparison {
                    field: String::from("revel_score"),
                    operator: Operator::Ge,
                    value: String::from("0.5"),
                },
            ],
        };

        insta::assert_snapshot!(serde_json::to_string(&query)?, @r###"{"clauses":[{"kind":"location_range","chrom":"chr17","start":1,"end":2},{"kind":"field_comparison","field":"revel_score","operator":">=","value":"0.5"}]}"###);

        Ok(())
    }
}
