//! Implementation of the `query compile` and `query run` sub commands.
//!
//! A search pattern is parsed, resolved through the gene coordinate table,
//! and compiled once per selected table.  `query run` then evaluates the
//! compiled queries against the datastore and writes one TSV file per
//! result.

pub mod compiler;
pub mod executor;
pub mod genes;
pub mod parser;
pub mod presets;
pub mod schema;

use std::{path::Path, time::Instant};

use serde::Serialize;
use thousands::Separable;

use crate::{
    common::{self, io::open_write_maybe_gz},
    conf::{Conf, DEFAULT_TABLE},
    store::{OpenOptions, Store},
};

use self::{
    compiler::{CompiledQuery, Value},
    executor::{QueryOutcome, ResultTable},
    genes::GeneCoordinateTable,
    presets::Preset,
    schema::OperatorPrecedence,
};

/// Arguments shared by `query compile` and `query run`.
#[derive(Debug, Clone, clap::Args)]
pub struct QueryArgs {
    /// The search pattern, e.g., `chr1:12345-A-G` or `gene=BRCA1&&revel_score>=0.5`.
    #[arg(long, required_unless_present = "preset", conflicts_with = "preset")]
    pub search_pattern: Option<String>,
    /// Run a preset search instead of a search pattern.
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
    /// Tables to query.
    #[arg(long = "table", default_value = DEFAULT_TABLE)]
    pub tables: Vec<String>,
    /// Columns to select as `table.column`, may be given multiple times or
    /// comma-separated.
    #[arg(long = "column", required = true, value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Path to gene coordinate TSV file for resolving `gene=` clauses.
    #[arg(long)]
    pub path_genes: Option<String>,
    /// Path to configuration TOML file, defaults to built-in schema.
    #[arg(long)]
    pub path_conf: Option<String>,
    /// Order in which comparison operators are recognized.
    #[arg(long, value_enum, default_value_t = OperatorPrecedence::default())]
    pub operator_precedence: OperatorPrecedence,
}

/// Compiled queries whose results form one named result.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQueries {
    /// Name of the result, e.g., `Annotations`.
    pub name: String,
    /// The queries whose rows are concatenated.
    pub queries: Vec<CompiledQuery>,
}

/// Title-case `s` the way result headings are formed, e.g.,
/// `clinvar_variants` becomes `Clinvar_Variants`.
pub fn title_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_is_alpha = false;
    for c in s.chars() {
        if prev_is_alpha {
            result.extend(c.to_lowercase());
        } else {
            result.extend(c.to_uppercase());
        }
        prev_is_alpha = c.is_alphabetic();
    }
    result
}

/// Parse and compile the search of `args` against all selected tables.
pub fn compile_all(
    args: &QueryArgs,
    conf: &Conf,
    genes: &GeneCoordinateTable,
) -> Result<Vec<NamedQueries>, anyhow::Error> {
    let compile_pattern = |pattern: &str, table: &str| -> Result<CompiledQuery, anyhow::Error> {
        let query = parser::parse(pattern, genes, args.operator_precedence)?;
        Ok(compiler::compile(&query, table, &args.columns, conf)?)
    };

    match (args.preset, args.search_pattern.as_deref()) {
        (Some(preset), _) => {
            if args.tables.len() != 1 {
                anyhow::bail!(
                    "preset {} runs against exactly one table, got {}",
                    preset,
                    args.tables.len()
                );
            }
            let queries = preset
                .patterns()
                .iter()
                .map(|pattern| compile_pattern(pattern, &args.tables[0]))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(vec![NamedQueries {
                name: preset.result_name().to_string(),
                queries,
            }])
        }
        (None, Some(pattern)) => args
            .tables
            .iter()
            .map(|table| -> Result<NamedQueries, anyhow::Error> {
                Ok(NamedQueries {
                    name: title_case(table),
                    queries: vec![compile_pattern(pattern, table)?],
                })
            })
            .collect(),
        (None, None) => anyhow::bail!("either a search pattern or a preset is required"),
    }
}

/// Load configuration and gene table as given in `args`.
fn load_context(args: &QueryArgs) -> Result<(Conf, GeneCoordinateTable), anyhow::Error> {
    let conf = Conf::load(args.path_conf.as_deref())?;
    let genes = match &args.path_genes {
        Some(path) => GeneCoordinateTable::load(path)?,
        None => GeneCoordinateTable::default(),
    };
    Ok((conf, genes))
}

pub mod compile {
    //! Implementation of `query compile` sub command.

    use std::io::Write;

    use super::*;

    /// Command line arguments for `query compile` sub command.
    #[derive(Debug, clap::Parser)]
    #[command(author, version, about = "compile a search pattern into statements", long_about = None)]
    pub struct Args {
        #[command(flatten)]
        pub query: QueryArgs,
        /// Path to output JSON file, defaults to stdout.
        #[arg(long)]
        pub path_output: Option<String>,
    }

    /// One compiled statement as written out.
    #[derive(Debug, Serialize)]
    pub struct Statement<'a> {
        pub name: &'a str,
        pub statement: String,
        pub params: Vec<&'a Value>,
    }

    /// Main entry point for `query compile` sub command.
    pub fn run(args_common: &common::Args, args: &Args) -> Result<(), anyhow::Error> {
        tracing::info!("args_common = {:?}", &args_common);
        tracing::info!("args = {:?}", &args);

        let (conf, genes) = load_context(&args.query)?;
        let named = compile_all(&args.query, &conf, &genes)?;
        let statements = named
            .iter()
            .flat_map(|named| {
                named.queries.iter().map(move |query| Statement {
                    name: &named.name,
                    statement: query.statement(),
                    params: query.params(),
                })
            })
            .collect::<Vec<_>>();

        match &args.path_output {
            Some(path) => {
                let mut writer = open_write_maybe_gz(path)?;
                serde_json::to_writer_pretty(&mut writer, &statements)?;
                writeln!(writer)?;
                writer.flush()?;
            }
            None => println!("{}", serde_json::to_string_pretty(&statements)?),
        }

        Ok(())
    }
}

pub mod run {
    //! Implementation of `query run` sub command.

    use super::*;

    /// Command line arguments for `query run` sub command.
    #[derive(Debug, clap::Parser)]
    #[command(author, version, about = "run a search against the datastore", long_about = None)]
    pub struct Args {
        /// Path to the RocksDB datastore.
        #[arg(long)]
        pub path_db: String,
        #[command(flatten)]
        pub query: QueryArgs,
        /// Directory to write one `<Name>.tsv` per result to.
        #[arg(long)]
        pub path_output_dir: String,
        /// Number of retries when opening the datastore.
        #[arg(long, default_value_t = 3)]
        pub open_retries: usize,
    }

    /// Execute all `named` queries, dropping empty results.
    pub fn execute_all(
        store: &Store,
        named: &[NamedQueries],
    ) -> Result<Vec<(String, ResultTable)>, anyhow::Error> {
        let mut results = Vec::new();
        for named in named {
            let mut combined = ResultTable::default();
            for query in &named.queries {
                if let QueryOutcome::Rows(table) = executor::execute(store, query)? {
                    combined.append(table);
                }
            }
            if combined.rows.is_empty() {
                tracing::info!("no results for {}", &named.name);
            } else {
                tracing::info!(
                    "{} row(s) for {}",
                    combined.rows.len().separate_with_commas(),
                    &named.name
                );
                results.push((named.name.clone(), combined));
            }
        }
        Ok(results)
    }

    /// Main entry point for `query run` sub command.
    ///
    /// Returns the names of the written results, empty when nothing matched.
    pub fn run(args_common: &common::Args, args: &Args) -> Result<Vec<String>, anyhow::Error> {
        let before_anything = Instant::now();
        tracing::info!("args_common = {:?}", &args_common);
        tracing::info!("args = {:?}", &args);

        let (conf, genes) = load_context(&args.query)?;
        let named = compile_all(&args.query, &conf, &genes)?;

        let results = {
            let tables = args.query.tables.iter().map(|t| t.as_str()).collect::<Vec<_>>();
            let store = Store::open(
                &args.path_db,
                &tables,
                &OpenOptions {
                    retries: args.open_retries,
                    ..Default::default()
                },
            )?;
            execute_all(&store, &named)?
        };

        if results.is_empty() {
            tracing::info!("No results found.");
        } else {
            std::fs::create_dir_all(&args.path_output_dir).map_err(|e| {
                anyhow::anyhow!(
                    "could not create output directory {}: {}",
                    &args.path_output_dir,
                    e
                )
            })?;
        }
        for (name, table) in &results {
            let path = Path::new(&args.path_output_dir).join(format!("{}.tsv", name));
            tracing::info!("Writing {:?} ...", &path);
            table.write_tsv(open_write_maybe_gz(&path)?)?;
        }

        tracing::info!(
            "All of `query run` completed in {:?}",
            before_anything.elapsed()
        );
        Ok(results.into_iter().map(|(name, _)| name).collect())
    }
}
