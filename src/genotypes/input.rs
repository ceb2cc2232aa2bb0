//! Code for reading the ingestion batch file.

use std::io::BufRead;

use crate::{common::VariantKey, err::Error};

use super::ds::SampleGenotypes;

/// Minimal number of columns: `chr`, `pos`, `ref`, `alt`, and the samples.
const MIN_COLUMNS: usize = 5;

/// One row of the ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// 1-based line number in the input file.
    pub line: u64,
    /// The variant the row refers to.
    pub key: VariantKey,
    /// All columns but the last one, written out as they are.
    pub annotations: Vec<String>,
    /// The sample genotypes from the last column.
    pub genotypes: SampleGenotypes,
}

impl Row {
    /// Parse from the columns of one input line.
    pub fn from_record(line: u64, record: &csv::StringRecord) -> Result<Self, Error> {
        let malformed = |reason: String| Error::MalformedRow { line, reason };

        if record.len() < MIN_COLUMNS {
            return Err(malformed(format!(
                "expected at least {} columns but found {}",
                MIN_COLUMNS,
                record.len()
            )));
        }

        let chrom = &record[0];
        let pos = record[1]
            .parse::<u32>()
            .map_err(|e| malformed(format!("invalid position {:?}: {}", &record[1], e)))?;
        let (reference, alternative) = (&record[2], &record[3]);
        if chrom.is_empty() || reference.is_empty() || alternative.is_empty() {
            return Err(malformed(String::from(
                "chromosome and alleles must not be empty",
            )));
        }

        let last = record.len() - 1;
        let genotypes =
            SampleGenotypes::decode(&record[last]).map_err(|e| malformed(e.to_string()))?;

        Ok(Row {
            line,
            key: VariantKey::new(chrom, pos, reference, alternative),
            annotations: record.iter().take(last).map(|s| s.to_string()).collect(),
            genotypes,
        })
    }
}

/// The parsed ingestion batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Batch {
    /// The header line, if any.
    pub header: Option<String>,
    /// The data rows in input order.
    pub rows: Vec<Row>,
}

/// Read the complete batch from `reader`.
///
/// The header line is kept verbatim.  Fails on the first malformed row so
/// that no variant is silently dropped.
pub fn read_batch<R: BufRead>(reader: R) -> Result<Batch, anyhow::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = match records.next() {
        Some(record) => Some(record?.iter().collect::<Vec<_>>().join("\t")),
        None => return Ok(Batch::default()),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        rows.push(Row::from_record(line, &record)?);
    }

    Ok(Batch { header, rows })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn read_batch_example() -> Result<(), anyhow::Error> {
        let batch = read_batch(std::io::BufReader::new(std::fs::File::open(
            "tests/genotypes/sample1.tsv",
        )?))?;

        assert_eq!(
            batch.header.as_deref(),
            Some("chr\tpos\tref\talt\tgene_symbol\tvariant_samples")
        );
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[0].key, VariantKey::new("chr1", 12345, "A", "G"));
        assert_eq!(
            batch.rows[0].annotations,
            vec!["chr1", "12345", "A", "G", "GENE1"]
        );
        assert_eq!(batch.rows[0].genotypes.calls["sample1"].as_str(), "A/G");
        assert_eq!(batch.rows[2].line, 4);

        Ok(())
    }

    #[test]
    fn read_batch_empty() -> Result<(), anyhow::Error> {
        assert_eq!(read_batch(&b""[..])?, Batch::default());
        let batch = read_batch(&b"chr\tpos\tref\talt\tvariant_samples\n"[..])?;
        assert_eq!(batch.rows.len(), 0);
        assert!(batch.header.is_some());

        Ok(())
    }

    #[test]
    fn read_batch_skips_blank_lines() -> Result<(), anyhow::Error> {
        let text = "h\nchr1\t1\tA\tG\t{\"s\": \"A/G\"}\n\n";
        assert_eq!(read_batch(text.as_bytes())?.rows.len(), 1);

        Ok(())
    }

    #[rstest]
    #[case::too_few_columns("chr1\t1\tA\t{\"s\": \"A/G\"}")]
    #[case::non_numeric_pos("chr1\tx\tA\tG\t{\"s\": \"A/G\"}")]
    #[case::negative_pos("chr1\t-1\tA\tG\t{\"s\": \"A/G\"}")]
    #[case::empty_allele("chr1\t1\t\tG\t{\"s\": \"A/G\"}")]
    #[case::bad_map("chr1\t1\tA\tG\t{\"s\": \"A/G\"")]
    #[case::empty_call("chr1\t1\tA\tG\t{\"s\": \"\"}")]
    fn read_batch_malformed(#[case] line: &str) {
        let text = format!("h\nchr1\t1\tA\tG\t{{\"s\": \"A/G\"}}\n{}\n", line);
        let err = read_batch(text.as_bytes()).unwrap_err();

        match err.downcast_ref::<Error>() {
            Some(Error::MalformedRow { line, .. }) => assert_eq!(*line, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
