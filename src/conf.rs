//! Configuration of the table schemas and display labels.
//!
//! Column and table names used in compiled queries are only ever taken from
//! here.  The configuration is read once from an optional TOML file; the
//! built-in default describes the `annotations` table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::err::Error;

/// Name of the default table.
pub const DEFAULT_TABLE: &str = "annotations";

/// Canonical storage column to display label table.
const LABELS: &[(&str, &str)] = &[
    ("chr", "Chr"),
    ("pos", "Pos"),
    ("ref", "Ref"),
    ("alt", "Alt"),
    ("effect", "Effect"),
    ("hgvs_c", "Hgvs C"),
    ("hgvs_p", "Hgvs P"),
    ("dbsnp", "dbSNP"),
    ("gene_symbol", "Gene Symbol"),
    ("gene_hgnc_id", "Gene Hgnc Id"),
    ("mane_select", "Mane Select"),
    ("exon_rank", "Exon Rank"),
    ("exon_count", "Exon Count"),
    ("intron_rank", "Intron Rank"),
    ("clinvar_disease", "ClinVar Disease"),
    ("clinvar_classification", "ClinVar Classification"),
    ("clinvar_review_status", "ClinVar Review Status"),
    ("clinvar_submissions_summary", "ClinVar Submissions Summary"),
    ("acmg_classification", "ACMG Classification"),
    ("omim", "OMIM"),
    ("omim_ids", "OMIM IDs"),
    ("matched_hpo_count", "Matched HPO Count"),
    ("matched_hpo_terms", "Matched HPO Terms"),
    ("acmg_score", "ACMG Score"),
    ("acmg_criteria", "ACMG Criteria"),
    ("acmg_by_gene", "ACMG By Gene"),
    ("revel_score", "Revel Score"),
    ("revel_prediction", "Revel Prediction"),
    ("alphamissense_score", "AlphaMissense Score"),
    ("alphamissense_prediction", "AlphaMissense Prediction"),
    ("bayesdelnoaf_score", "Bayesdelnoaf Score"),
    ("bayesdelnoaf_prediction", "Bayesdelnoaf Prediction"),
    ("phylop100way_score", "Phylop100Way Score"),
    ("phylop100way_prediction", "Phylop100Way Prediction"),
    ("spliceai_max_score", "SpliceAI Max Score"),
    ("spliceai_max_prediction", "SpliceAI Max Prediction"),
    ("dbscsnv_ada_score", "Dbscsnv Ada Score"),
    ("dbscsnv_ada_prediction", "Dbscsnv Ada Prediction"),
    ("apogee2_score", "Apogee2 Score"),
    ("apogee2_prediction", "Apogee2 Prediction"),
    ("gnomad_exomes_af", "gnomAD Exome AF"),
    ("gnomad_genomes_af", "gnomAD Genome AF"),
    ("phenotype_combined", "Phenotype Combined"),
    ("pathogenicity_classification_combined", "Pathogenicity Classification Combined"),
    ("ncbi_gene", "NCBI Gene"),
    ("omim_gene", "OMIM Gene"),
    ("aa_ref", "AA Ref"),
    ("aa_alt", "AA Alt"),
    ("aa_length", "AA Length"),
    ("aa_start", "AA Start"),
    ("canonical", "Canonical"),
    ("cdna_length", "cDNA Length"),
    ("cdna_start", "cDNA Start"),
    ("cds_length", "CDS Length"),
    ("cds_start", "CDS Start"),
    ("computational_prediction_selected", "Computational Prediction Selected"),
    ("computational_score_selected", "Computational Score Selected"),
    ("computational_source_selected", "Computational Source Selected"),
    ("allele_count_ref_population", "Allele Count ref Population"),
    ("frequency_ref_population", "Frequency ref Population"),
    ("hom_count_ref_population", "Hom Count ref Population"),
    ("gnomad_exomes_ac", "gnomAD Exomes Ac"),
    ("gnomad_exomes_homalt", "gnomAD Exomes Homalt"),
    ("gnomad_genomes_ac", "gnomAD Genomes Ac"),
    ("gnomad_genomes_homalt", "gnomAD Genomes Homalt"),
    ("gnomad_mito_heteroplasmic", "gnomAD Mito Heteroplasmic"),
    ("gnomad_mito_homoplasmic", "gnomAD Mito Homoplasmic"),
    ("mitotip_prediction", "Mitotip Prediction"),
    ("mitotip_score", "Mitotip Score"),
    ("protein_coding", "Protein Coding"),
    ("protein_id", "Protein ID"),
    ("splice_prediction_selected", "Splice Prediction Selected"),
    ("splice_score_selected", "Splice Score Selected"),
    ("splice_source_selected", "Splice Source Selected"),
    ("strand", "Strand"),
    ("transcript_support_level", "Transcript Support Level"),
    ("diseases_description", "Diseases Description"),
    ("hpo_ids", "HPO Ids"),
    ("hpo_terms", "HPO Terms"),
    ("gene_description", "Gene Description"),
    ("variant_count", "Variant Count"),
    ("variant_homozygous", "Variant Homozygous"),
    ("variant_heterozygous", "Variant Heterozygous"),
    ("variant_samples", "Variant Samples"),
];

/// Integer columns of the default table.
const INT_COLUMNS: &[&str] = &[
    "pos",
    "exon_rank",
    "exon_count",
    "intron_rank",
    "matched_hpo_count",
    "aa_length",
    "aa_start",
    "cdna_length",
    "cdna_start",
    "cds_length",
    "cds_start",
    "allele_count_ref_population",
    "hom_count_ref_population",
    "gnomad_exomes_ac",
    "gnomad_exomes_homalt",
    "gnomad_genomes_ac",
    "gnomad_genomes_homalt",
    "gnomad_mito_heteroplasmic",
    "gnomad_mito_homoplasmic",
    "variant_count",
    "variant_homozygous",
    "variant_heterozygous",
];

/// Floating point columns of the default table.
const FLOAT_COLUMNS: &[&str] = &[
    "acmg_score",
    "revel_score",
    "alphamissense_score",
    "bayesdelnoaf_score",
    "phylop100way_score",
    "spliceai_max_score",
    "dbscsnv_ada_score",
    "apogee2_score",
    "gnomad_exomes_af",
    "gnomad_genomes_af",
    "computational_score_selected",
    "frequency_ref_population",
    "mitotip_score",
    "splice_score_selected",
];

/// Type of a table column, used for binding query values.
#[derive(
    Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Debug, Default, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Int,
    Float,
}

/// Schema of one table.
#[derive(Serialize, Deserialize, PartialEq, Debug, Default, Clone)]
pub struct TableSchema {
    /// Columns with their types.
    pub columns: IndexMap<String, ColumnType>,
}

/// Names of the columns written by the genotype merge.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct Columns {
    /// Serialized sample to genotype map.
    pub samples: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            samples: String::from("variant_samples"),
        }
    }
}

/// Top-level configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct Conf {
    /// Special column names.
    pub columns: Columns,
    /// Display labels by storage column, in output order.
    pub labels: IndexMap<String, String>,
    /// Known tables.
    pub tables: IndexMap<String, TableSchema>,
}

impl Default for Conf {
    fn default() -> Self {
        let labels = LABELS
            .iter()
            .map(|(column, label)| (column.to_string(), label.to_string()))
            .collect::<IndexMap<_, _>>();
        let columns = LABELS
            .iter()
            .map(|(column, _)| {
                let column_type = if INT_COLUMNS.contains(column) {
                    ColumnType::Int
                } else if FLOAT_COLUMNS.contains(column) {
                    ColumnType::Float
                } else {
                    ColumnType::Text
                };
                (column.to_string(), column_type)
            })
            .collect();
        let mut tables = IndexMap::new();
        tables.insert(DEFAULT_TABLE.to_string(), TableSchema { columns });

        Self {
            columns: Default::default(),
            labels,
            tables,
        }
    }
}

impl Conf {
    /// Load from the TOML file at `path` or use the built-in default.
    pub fn load(path: Option<&str>) -> Result<Self, anyhow::Error> {
        match path {
            Some(path) => {
                tracing::info!("Loading configuration from {} ...", path);
                let toml_str = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("could not read {}: {}", path, e))?;
                let conf: Conf = toml::from_str(&toml_str)
                    .map_err(|e| anyhow::anyhow!("could not parse {}: {}", path, e))?;
                tracing::info!("... done loading {} table(s)", conf.tables.len());
                Ok(conf)
            }
            None => Ok(Self::default()),
        }
    }

    /// Return the schema of `table`.
    pub fn table(&self, table: &str) -> Result<&TableSchema, Error> {
        self.tables
            .get(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }
}
