//! Gene symbol to genomic coordinate table.

use std::{collections::HashMap, time::Instant};

use serde::Deserialize;
use thousands::Separable;

use crate::{common::io::open_read_maybe_gz, err::Error};

use super::schema::GenomicRange;

/// One line of the gene coordinate TSV file.
#[derive(Debug, Deserialize)]
struct Record {
    gene_symbol: String,
    chromosome: String,
    start: u32,
    end: u32,
}

/// Read-only mapping from gene symbol to its coordinates.
#[derive(Debug, Default, Clone)]
pub struct GeneCoordinateTable {
    genes: HashMap<String, GenomicRange>,
}

impl GeneCoordinateTable {
    /// Load the table from a (possibly gzip-compressed) TSV file with the
    /// header `gene_symbol chromosome start end`.
    pub fn load(path: &str) -> Result<Self, anyhow::Error> {
        tracing::info!("Loading gene coordinates from {} ...", path);
        let before_loading = Instant::now();

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(open_read_maybe_gz(path)?);

        let mut genes = HashMap::new();
        for result in reader.deserialize() {
            let record: Record =
                result.map_err(|e| anyhow::anyhow!("problem reading {}: {}", path, e))?;
            if record.start > record.end {
                anyhow::bail!(
                    "gene {} in {} has start {} after end {}",
                    &record.gene_symbol,
                    path,
                    record.start,
                    record.end
                );
            }
            let range = GenomicRange {
                chrom: record.chromosome,
                start: record.start,
                end: record.end,
            };
            if genes.insert(record.gene_symbol.clone(), range).is_some() {
                anyhow::bail!("duplicate gene symbol {} in {}", &record.gene_symbol, path);
            }
        }

        tracing::info!(
            "... done loading {} genes in {:?}",
            genes.len().separate_with_commas(),
            before_loading.elapsed()
        );
        Ok(Self { genes })
    }

    /// Resolve `symbol`, case-sensitive.
    pub fn resolve(&self, symbol: &str) -> Result<&GenomicRange, Error> {
        self.genes
            .get(symbol)
            .ok_or_else(|| Error::UnknownGene(symbol.to_string()))
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

impl FromIterator<(String, GenomicRange)> for GeneCoordinateTable {
    fn from_iter<T: IntoIterator<Item = (String, GenomicRange)>>(iter: T) -> Self {
        Self {
            genes: iter.into_iter().collect(),
        }
    }
}
