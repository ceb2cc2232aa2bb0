//! Implementation of `genotypes merge` subcommand.
//!
//! Folds the genotype calls of a new sample into the genotypes stored for
//! each variant and writes the updated rows to a new file.

pub mod ds;
pub mod input;
pub mod runlog;

use std::{io::Write, path::Path, time::Instant};

use rayon::prelude::*;
use thousands::Separable;

use crate::{
    common::{self, io::open_read_maybe_gz, io::open_write_maybe_gz},
    conf::Conf,
    err::Error,
    store::{OpenOptions, RocksDbLookup, Store, VariantLookup},
};

/// Command line arguments for `genotypes merge` subcommand.
#[derive(Debug, clap::Parser)]
#[command(author, version, about = "merge sample genotypes into variant rows", long_about = None)]
pub struct Args {
    /// Path to the RocksDB datastore.
    #[arg(long)]
    pub path_db: String,
    /// Path to input TSV file with the new sample's genotypes.
    #[arg(long)]
    pub path_input: String,
    /// Path to output TSV file, defaults to `${path_input}.updated`.
    #[arg(long)]
    pub path_output: Option<String>,
    /// Path to configuration TOML file, defaults to built-in schema.
    #[arg(long)]
    pub path_conf: Option<String>,
    /// Table to look up the stored genotypes in.
    #[arg(long, default_value = "annotations")]
    pub table: String,
    /// Optional path to the run log to append to.
    #[arg(long)]
    pub path_run_log: Option<String>,
    /// Set the number of threads to use, defaults to number of cores.
    #[arg(long)]
    pub num_threads: Option<usize>,
    /// Number of retries when opening the datastore.
    #[arg(long, default_value_t = 3)]
    pub open_retries: usize,
}

/// Statistics of one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatistics {
    /// Name of the sample, derived from the input file name.
    pub sample_name: String,
    /// Number of variants processed.
    pub total_variants: usize,
    /// Number of variants without stored genotypes.
    pub novel_variants: usize,
    /// Wall clock time of the run.
    pub elapsed: std::time::Duration,
}

/// Derive the sample name from the input path, i.e., the file name up to
/// the first `.`.
pub fn sample_name<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Look up and merge all rows of `batch`.
///
/// Lookups run on the rayon thread pool; the result has the order of
/// `batch.rows`.
pub fn merge_batch<L: VariantLookup>(
    batch: &input::Batch,
    lookup: &L,
) -> Result<Vec<ds::Merged>, Error> {
    batch
        .rows
        .par_iter()
        .map(|row| -> Result<ds::Merged, Error> {
            let existing = lookup.lookup(&row.key)?;
            Ok(ds::merge(existing, row.genotypes.clone()))
        })
        .collect()
}

/// Write header and updated rows to `writer`.
///
/// Each row is the input row without its last column, followed by the
/// merged genotypes and the three counts.
pub fn write_updated<W: Write>(
    writer: W,
    batch: &input::Batch,
    merged: &[ds::Merged],
) -> Result<(), anyhow::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .flexible(true)
        .from_writer(writer);

    if let Some(header) = &batch.header {
        csv_writer.write_record(header.split('\t'))?;
    }
    for (row, merged) in batch.rows.iter().zip(merged.iter()) {
        let mut record = row.annotations.clone();
        record.push(merged.genotypes.encode());
        record.push(merged.counts.sample_count.to_string());
        record.push(merged.counts.homozygous_count.to_string());
        record.push(merged.counts.heterozygous_count.to_string());
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Merge `batch` using `lookup` and write the updated rows to `path_output`.
///
/// Nothing is written unless all rows could be merged.
pub fn run_batch<L: VariantLookup, P: AsRef<Path>>(
    batch: &input::Batch,
    lookup: &L,
    path_output: P,
    sample_name: &str,
) -> Result<RunStatistics, anyhow::Error> {
    let before_merge = Instant::now();
    let merged = merge_batch(batch, lookup)?;

    let output = open_write_maybe_gz(path_output.as_ref()).map_err(|e| {
        anyhow::anyhow!(
            "could not open file {:?} for writing: {}",
            path_output.as_ref(),
            e
        )
    })?;
    write_updated(output, batch, &merged)?;

    Ok(RunStatistics {
        sample_name: sample_name.to_string(),
        total_variants: merged.len(),
        novel_variants: merged.iter().filter(|merged| merged.was_novel).count(),
        elapsed: before_merge.elapsed(),
    })
}

/// Main entry point for `genotypes merge` sub command.
pub fn run(args_common: &common::Args, args: &Args) -> Result<RunStatistics, anyhow::Error> {
    let before_anything = Instant::now();
    tracing::info!("args_common = {:?}", &args_common);
    tracing::info!("args = {:?}", &args);

    if let Some(num_threads) = args.num_threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| anyhow::anyhow!("building global Rayon thread pool failed: {}", e))?;
    }

    let conf = Conf::load(args.path_conf.as_deref())?;
    let sample_name = sample_name(&args.path_input);
    let path_output = args
        .path_output
        .clone()
        .unwrap_or_else(|| format!("{}.updated", &args.path_input));

    tracing::info!("Reading input file {} ...", &args.path_input);
    let batch = input::read_batch(open_read_maybe_gz(&args.path_input).map_err(|e| {
        anyhow::anyhow!(
            "could not open file {} for reading: {}",
            &args.path_input,
            e
        )
    })?)?;
    tracing::info!(
        "... done reading {} rows",
        batch.rows.len().separate_with_commas()
    );

    let mut run_log = runlog::RunLog::open(args.path_run_log.as_ref())?;
    let result = {
        let store = Store::open(
            &args.path_db,
            &[args.table.as_str()],
            &OpenOptions {
                retries: args.open_retries,
                ..Default::default()
            },
        )?;
        run_log.info("Connected to the datastore.")?;

        let lookup = RocksDbLookup {
            store: &store,
            table: args.table.clone(),
            samples_column: conf.columns.samples.clone(),
        };
        run_batch(&batch, &lookup, &path_output, &sample_name)
    };

    match &result {
        Ok(stats) => {
            run_log.info(&format!(
                "Number of Total variants: {}",
                stats.total_variants
            ))?;
            run_log.info(&format!(
                "Number of Novel variants: {}",
                stats.novel_variants
            ))?;
            run_log.info(&format!(
                "{}\t({})",
                &stats.sample_name,
                common::format_elapsed(stats.elapsed)
            ))?;
        }
        Err(e) => run_log.error(&format!("{}\t{}", &sample_name, e))?,
    }
    run_log.info("Connection Terminated.")?;
    let stats = result?;

    tracing::info!(
        "All of `genotypes merge` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(stats)
}
