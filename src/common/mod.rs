//! Common functionality.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// A genomic variant `CHROM-POS-REF-ALT`.
///
/// Two keys are equal iff all four fields are equal; no chromosome name
/// canonicalization is applied.
#[derive(Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, serde::Serialize)]
pub struct VariantKey {
    /// Chromosome name.
    pub chrom: String,
    /// 1-based position.
    pub pos: u32,
    /// Reference allele.
    pub reference: String,
    /// Alternative allele.
    pub alternative: String,
}

impl VariantKey {
    pub fn new(chrom: &str, pos: u32, reference: &str, alternative: &str) -> Self {
        VariantKey {
            chrom: chrom.to_string(),
            pos,
            reference: reference.to_string(),
            alternative: alternative.to_string(),
        }
    }

    /// Decode from the RocksDB row key, `None` if it is not a variant key.
    pub fn from_db_key(buf: &[u8]) -> Option<Self> {
        let colon = buf.iter().position(|b| *b == b':')?;
        let pos_bytes: [u8; 4] = buf.get(colon + 1..colon + 5)?.try_into().ok()?;
        let alleles = buf.get(colon + 5..)?;
        let gt = alleles.iter().position(|b| *b == b'>')?;
        Some(VariantKey {
            chrom: std::str::from_utf8(&buf[..colon]).ok()?.to_string(),
            pos: u32::from_be_bytes(pos_bytes),
            reference: std::str::from_utf8(&alleles[..gt]).ok()?.to_string(),
            alternative: std::str::from_utf8(&alleles[gt + 1..]).ok()?.to_string(),
        })
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            &self.chrom, self.pos, &self.reference, &self.alternative
        )
    }
}

/// Conversion into the RocksDB row key.
impl From<&VariantKey> for Vec<u8> {
    fn from(val: &VariantKey) -> Self {
        let mut result = Vec::with_capacity(
            val.chrom.len() + 1 + 4 + val.reference.len() + 1 + val.alternative.len(),
        );

        result.extend_from_slice(val.chrom.as_bytes());
        result.push(b':');
        result.extend_from_slice(&val.pos.to_be_bytes());
        result.extend_from_slice(val.reference.as_bytes());
        result.push(b'>');
        result.extend_from_slice(val.alternative.as_bytes());

        result
    }
}

/// Format a duration as `H:MM:SS`, truncating fractional seconds.
pub fn format_elapsed(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
