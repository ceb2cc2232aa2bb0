//! Compilation of parsed queries into filter predicates and projections.
//!
//! Table and column names are taken from the configured schema only; values
//! from the search pattern are bound as typed parameters and never end up in
//! the statement text.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    conf::{ColumnType, Conf, TableSchema},
    err::Error,
};

use super::schema::{Operator, Query, SearchClause};

/// Storage columns of the variant location.
const CHROM_COLUMN: &str = "chr";
const POS_COLUMN: &str = "pos";
const REF_COLUMN: &str = "ref";
const ALT_COLUMN: &str = "alt";

/// A bound parameter value.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

/// One condition `column <operator> ?`.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

/// One selected column with its display label.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
pub struct ProjectedColumn {
    pub storage_column: String,
    pub display_label: String,
}

/// A query ready for execution against one table.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct CompiledQuery {
    /// Name of the table.
    pub table: String,
    /// Conjunction of conditions.
    pub predicates: Vec<Predicate>,
    /// Selected columns in label-table order.
    pub projection: Vec<ProjectedColumn>,
}

impl CompiledQuery {
    /// The conjunction with `?` placeholders, e.g., `chr = ? AND pos >= ?`.
    pub fn filter_expression(&self) -> String {
        self.predicates
            .iter()
            .map(|p| format!("{} {} ?", p.column, p.operator))
            .join(" AND ")
    }

    /// The values bound to the placeholders, in order.
    pub fn params(&self) -> Vec<&Value> {
        self.predicates.iter().map(|p| &p.value).collect()
    }

    /// The full statement text.
    pub fn statement(&self) -> String {
        let columns = self
            .projection
            .iter()
            .map(|c| format!("{} AS \"{}\"", c.storage_column, c.display_label))
            .join(", ");
        if self.predicates.is_empty() {
            format!("SELECT {} FROM {}", columns, self.table)
        } else {
            format!(
                "SELECT {} FROM {} WHERE {} ALLOW FILTERING",
                columns,
                self.table,
                self.filter_expression()
            )
        }
    }
}

/// Build the predicate for `column`, binding `value` by the column type.
fn predicate(
    table: &str,
    schema: &TableSchema,
    column: &str,
    operator: Operator,
    value: &str,
) -> Result<Predicate, Error> {
    let column_type = schema
        .columns
        .get(column)
        .ok_or_else(|| Error::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })?;
    let invalid = || {
        Error::UnparseableQuery(format!(
            "value {:?} is not of type {} required by column {}",
            value, column_type, column
        ))
    };
    let value = match column_type {
        ColumnType::Text => Value::Text(value.to_string()),
        ColumnType::Int => Value::Int(value.parse().map_err(|_| invalid())?),
        ColumnType::Float => Value::Float(value.parse().map_err(|_| invalid())?),
    };
    Ok(Predicate {
        column: column.to_string(),
        operator,
        value,
    })
}

fn clause_predicates(
    table: &str,
    schema: &TableSchema,
    clause: &SearchClause,
) -> Result<Vec<Predicate>, Error> {
    let pred = |column: &str, operator: Operator, value: &str| {
        predicate(table, schema, column, operator, value)
    };
    match clause {
        SearchClause::LocationExact {
            chrom,
            pos,
            reference,
            alternative,
        } => Ok(vec![
            pred(CHROM_COLUMN, Operator::Eq, chrom.as_str())?,
            pred(POS_COLUMN, Operator::Eq, pos.to_string().as_str())?,
            pred(REF_COLUMN, Operator::Eq, reference.as_str())?,
            pred(ALT_COLUMN, Operator::Eq, alternative.as_str())?,
        ]),
        SearchClause::LocationPoint { chrom, pos } => Ok(vec![
            pred(CHROM_COLUMN, Operator::Eq, chrom.as_str())?,
            pred(POS_COLUMN, Operator::Eq, pos.to_string().as_str())?,
        ]),
        SearchClause::LocationRange(range) => Ok(vec![
            pred(CHROM_COLUMN, Operator::Eq, range.chrom.as_str())?,
            pred(POS_COLUMN, Operator::Ge, range.start.to_string().as_str())?,
            pred(POS_COLUMN, Operator::Le, range.end.to_string().as_str())?,
        ]),
        SearchClause::FieldComparison {
            field,
            operator,
            value,
        } => Ok(vec![pred(field.as_str(), *operator, value.as_str())?]),
    }
}

/// Select the requested columns of `table` that have a display label.
///
/// `requested` holds `table.column` entries, entries of other tables are
/// ignored and bare `column` entries apply to every table.  Requested
/// columns outside the table schema or without a label are dropped.
fn projection(
    table: &str,
    schema: &TableSchema,
    requested: &[String],
    conf: &Conf,
) -> Result<Vec<ProjectedColumn>, Error> {
    let mut columns = Vec::new();
    for entry in requested {
        let column = match entry.split_once('.') {
            Some((entry_table, column)) if entry_table == table => column,
            Some(_) => continue,
            None => entry.as_str(),
        };
        if schema.columns.contains_key(column) {
            columns.push(column);
        } else {
            tracing::debug!("dropping column {} unknown to table {}", column, table);
        }
    }

    let projection = conf
        .labels
        .iter()
        .filter(|(column, _)| columns.contains(&column.as_str()))
        .map(|(column, label)| ProjectedColumn {
            storage_column: column.clone(),
            display_label: label.clone(),
        })
        .collect::<Vec<_>>();
    if projection.is_empty() {
        return Err(Error::EmptyProjection(table.to_string()));
    }
    Ok(projection)
}

/// Compile `query` against `table` selecting the `requested` columns.
pub fn compile(
    query: &Query,
    table: &str,
    requested: &[String],
    conf: &Conf,
) -> Result<CompiledQuery, Error> {
    let schema = conf.table(table)?;

    let predicates = query
        .clauses
        .iter()
        .map(|clause| clause_predicates(table, schema, clause))
        .flatten_ok()
        .collect::<Result<Vec<_>, _>>()?;
    let projection = projection(table, schema, requested, conf)?;

    Ok(CompiledQuery {
        table: table.to_string(),
        predicates,
        projection,
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::query::schema::GenomicRange;

    fn requested(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    fn comparison(field: &str, operator: Operator, value: &str) -> SearchClause {
        SearchClause::FieldComparison {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    #[test]
    fn compile_exact() -> Result<(), anyhow::Error> {
        let query = Query {
            clauses: vec![SearchClause::LocationExact {
                chrom: String::from("chr1"),
                pos: 12345,
                reference: String::from("A"),
                alternative: String::from("G"),
            }],
        };
        let compiled = compile(
            &query,
            "annotations",
            &requested(&["annotations.gene_symbol", "annotations.chr"]),
            &Conf::default(),
        )?;

        assert_eq!(
            compiled.filter_expression(),
            "chr = ? AND pos = ? AND ref = ? AND alt = ?"
        );
        assert_eq!(
            compiled.params(),
            vec![
                &Value::Text(String::from("chr1")),
                &Value::Int(12345),
                &Value::Text(String::from("A")),
                &Value::Text(String::from("G")),
            ]
        );
        insta::assert_snapshot!(compiled.statement(), @r###"SELECT chr AS "Chr", gene_symbol AS "Gene Symbol" FROM annotations WHERE chr = ? AND pos = ? AND ref = ? AND alt = ? ALLOW FILTERING"###);

        Ok(())
    }

    #[test]
    fn compile_range() -> Result<(), anyhow::Error> {
        let query = Query {
            clauses: vec![SearchClause::LocationRange(GenomicRange {
                chrom: String::from("chr17"),
                start: 43044295,
                end: 43125483,
            })],
        };
        let compiled = compile(
            &query,
            "annotations",
            &requested(&["annotations.pos"]),
            &Conf::default(),
        )?;

        assert_eq!(
            compiled.filter_expression(),
            "chr = ? AND pos >= ? AND pos <= ?"
        );
        assert_eq!(
            compiled.params(),
            vec![
                &Value::Text(String::from("chr17")),
                &Value::Int(43044295),
                &Value::Int(43125483),
            ]
        );

        Ok(())
    }

    #[test]
    fn compile_typed_comparisons() -> Result<(), anyhow::Error> {
        let query = Query {
            clauses: vec![
                comparison("variant_count", Operator::Gt, "10"),
                comparison("revel_score", Operator::Ge, "0.5"),
                comparison("acmg_classification", Operator::Eq, "Pathogenic"),
            ],
        };
        let compiled = compile(
            &query,
            "annotations",
            &requested(&["annotations.chr"]),
            &Conf::default(),
        )?;

        assert_eq!(
            compiled.params(),
            vec![
                &Value::Int(10),
                &Value::Float(0.5),
                &Value::Text(String::from("Pathogenic")),
            ]
        );

        Ok(())
    }

    #[test]
    fn compile_value_not_of_column_type() {
        let query = Query {
            clauses: vec![comparison("variant_count", Operator::Gt, "many")],
        };

        assert!(matches!(
            compile(
                &query,
                "annotations",
                &requested(&["annotations.chr"]),
                &Conf::default()
            ),
            Err(Error::UnparseableQuery(_))
        ));
    }

    #[test]
    fn compile_unknown_identifiers() {
        let query = Query {
            clauses: vec![comparison("chr", Operator::Eq, "chr1")],
        };
        let conf = Conf::default();

        assert_eq!(
            compile(&query, "system_auth", &requested(&["chr"]), &conf),
            Err(Error::UnknownTable(String::from("system_auth")))
        );
        assert_eq!(
            compile(
                &Query {
                    clauses: vec![comparison("password", Operator::Eq, "x")],
                },
                "annotations",
                &requested(&["chr"]),
                &conf
            ),
            Err(Error::UnknownColumn {
                table: String::from("annotations"),
                column: String::from("password"),
            })
        );
    }

    #[test]
    fn unlabelled_columns_dropped_silently() -> Result<(), anyhow::Error> {
        let query = Query {
            clauses: vec![comparison("chr", Operator::Eq, "chr1")],
        };
        let compiled = compile(
            &query,
            "annotations",
            &requested(&["annotations.chr", "annotations.not_labelled"]),
            &Conf::default(),
        )?;

        assert_eq!(
            compiled.projection,
            vec![ProjectedColumn {
                storage_column: String::from("chr"),
                display_label: String::from("Chr"),
            }]
        );
        assert_eq!(
            compile(
                &query,
                "annotations",
                &requested(&["annotations.not_labelled"]),
                &Conf::default()
            ),
            Err(Error::EmptyProjection(String::from("annotations")))
        );

        Ok(())
    }

    #[test]
    fn projection_intersects_labels_in_label_order() -> Result<(), anyhow::Error> {
        let conf = Conf::load(Some("tests/query/conf.toml"))?;
        let query = Query {
            clauses: vec![comparison("chr", Operator::Eq, "chr1")],
        };
        let compiled = compile(
            &query,
            "variants",
            &requested(&[
                "variants.samples",
                "variants.internal_note",
                "other.gene_symbol",
                "variants.chr",
            ]),
            &conf,
        )?;

        assert_eq!(
            compiled.projection,
            vec![
                ProjectedColumn {
                    storage_column: String::from("chr"),
                    display_label: String::from("Chromosome"),
                },
                ProjectedColumn {
                    storage_column: String::from("samples"),
                    display_label: String::from("Samples"),
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn empty_projection() -> Result<(), anyhow::Error> {
        let conf = Conf::load(Some("tests/query/conf.toml"))?;
        let query = Query {
            clauses: vec![comparison("chr", Operator::Eq, "chr1")],
        };

        assert_eq!(
            compile(
                &query,
                "variants",
                &requested(&["variants.internal_note", "other.chr"]),
                &conf
            ),
            Err(Error::EmptyProjection(String::from("variants")))
        );

        Ok(())
    }
}
