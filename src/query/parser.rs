//! Parsing of search patterns typed as a single string.
//!
//! Accepted shapes after normalization:
//!
//! - `chr-pos-ref-alt` for a single variant,
//! - `chr-start-end` for a range,
//! - `chr-pos` for a single position,
//! - `field<op>value&&field<op>value...` for a conjunction of comparisons,
//!   where `gene=SYMBOL` is resolved into the range of the gene.

use crate::err::Error;

use super::{
    genes::GeneCoordinateTable,
    schema::{GenomicRange, Operator, OperatorPrecedence, Query, SearchClause},
};

/// Separator of clauses in a conjunction.
const CLAUSE_SEPARATOR: &str = "&&";

/// Field name that is resolved through the gene coordinate table.
const GENE_FIELD: &str = "gene";

/// Remove surrounding and embedded blanks and commas, and map `:` to `-`.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | '\t'))
        .map(|c| if c == ':' { '-' } else { c })
        .collect()
}

/// Whether the normalized input should be read as a location.
fn is_location_shaped(normalized: &str) -> bool {
    !normalized.contains(['=', '<', '>', '&'])
}

fn unparseable(raw: &str, reason: &str) -> Error {
    Error::UnparseableQuery(format!("{:?}: {}", raw, reason))
}

fn parse_pos(raw: &str, value: &str) -> Result<u32, Error> {
    value
        .parse::<u32>()
        .map_err(|_| unparseable(raw, &format!("invalid position {:?}", value)))
}

fn parse_location(raw: &str, normalized: &str) -> Result<SearchClause, Error> {
    let fields = normalized.split('-').collect::<Vec<_>>();
    if fields.iter().any(|field| field.is_empty()) {
        return Err(unparseable(raw, "empty location field"));
    }

    match fields.as_slice() {
        [chrom, pos, reference, alternative] => Ok(SearchClause::LocationExact {
            chrom: chrom.to_string(),
            pos: parse_pos(raw, pos)?,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
        }),
        [chrom, start, end] => {
            let (start, end) = (parse_pos(raw, start)?, parse_pos(raw, end)?);
            if start > end {
                return Err(unparseable(raw, "range start after end"));
            }
            Ok(SearchClause::LocationRange(GenomicRange {
                chrom: chrom.to_string(),
                start,
                end,
            }))
        }
        [chrom, pos] => Ok(SearchClause::LocationPoint {
            chrom: chrom.to_string(),
            pos: parse_pos(raw, pos)?,
        }),
        _ => Err(unparseable(
            raw,
            "expected chr-pos, chr-start-end, chr-pos-ref-alt, or field comparisons",
        )),
    }
}

fn parse_clause(
    raw: &str,
    clause: &str,
    genes: &GeneCoordinateTable,
    precedence: OperatorPrecedence,
) -> Result<SearchClause, Error> {
    if clause.is_empty() {
        return Err(unparseable(raw, "empty clause"));
    }

    let (operator, idx) = precedence
        .operators()
        .iter()
        .find_map(|op| clause.find(&op.to_string()).map(|idx| (*op, idx)))
        .ok_or_else(|| unparseable(raw, &format!("no operator in clause {:?}", clause)))?;
    let field = &clause[..idx];
    let value = &clause[idx + operator.to_string().len()..];
    if field.is_empty() || value.is_empty() {
        return Err(unparseable(
            raw,
            &format!("incomplete comparison {:?}", clause),
        ));
    }

    if field == GENE_FIELD {
        if operator != Operator::Eq {
            return Err(unparseable(raw, "genes can only be compared with ="));
        }
        return Ok(SearchClause::LocationRange(genes.resolve(value)?.clone()));
    }

    Ok(SearchClause::FieldComparison {
        field: field.to_string(),
        operator,
        value: value.to_string(),
    })
}

/// Parse the search pattern `raw`.
pub fn parse(
    raw: &str,
    genes: &GeneCoordinateTable,
    precedence: OperatorPrecedence,
) -> Result<Query, Error> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(unparseable(raw, "empty search pattern"));
    }

    let clauses = if is_location_shaped(&normalized) {
        vec![parse_location(raw, &normalized)?]
    } else {
        normalized
            .split(CLAUSE_SEPARATOR)
            .map(|clause| parse_clause(raw, clause, genes, precedence))
            .collect::<Result<Vec<_>, _>>()?
    };
    tracing::debug!("parsed {:?} into {:?}", raw, &clauses);

    Ok(Query { clauses })
}
