//! Data structures for per-variant sample genotypes and their merging.

use indexmap::IndexMap;

/// Error type for decoding genotype calls and sample genotype maps.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty genotype call for sample {0:?}")]
    EmptyCall(String),
    #[error("cannot decode sample genotypes {0:?}: {1}")]
    Invalid(String, String),
}

/// The two-allele observation of one sample at one variant, e.g., `A/G`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenotypeCall(String);

impl GenotypeCall {
    /// Construct from a non-empty string.
    pub fn new(call: &str) -> Option<Self> {
        if call.is_empty() {
            None
        } else {
            Some(GenotypeCall(call.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the first and last symbol of the call are identical.
    ///
    /// Single-symbol calls are homozygous.
    pub fn is_homozygous(&self) -> bool {
        self.0.chars().next() == self.0.chars().last()
    }
}

/// Genotype counts over all samples of one variant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counts {
    /// Number of samples.
    pub sample_count: u32,
    /// Number of hom. samples.
    pub homozygous_count: u32,
    /// Number of het. samples.
    pub heterozygous_count: u32,
}

/// Mapping from sample identifier to genotype call for one variant.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SampleGenotypes {
    /// Calls by sample, in order of first appearance.
    pub calls: IndexMap<String, GenotypeCall>,
}

impl SampleGenotypes {
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Decode from the serialized form `{"sample": "A/G", ...}`.
    ///
    /// The text is parsed as JSON first.  Maps written by older tooling use
    /// single quotes or a mix of quote styles (`{"O'Neil": 'A/G'}`); these
    /// are read with a strict grammar for flat string-to-string maps.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let raw: IndexMap<String, String> = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(json_err) => literal::parse_flat_map(text).map_err(|e| {
                DecodeError::Invalid(text.to_string(), format!("{}; {}", json_err, e))
            })?,
        };

        let mut calls = IndexMap::with_capacity(raw.len());
        for (sample, call) in raw {
            let call = GenotypeCall::new(&call)
                .ok_or_else(|| DecodeError::EmptyCall(sample.clone()))?;
            calls.insert(sample, call);
        }
        Ok(Self { calls })
    }

    /// Encode as `{"s1": "A/G", "s2": "A/A"}`.
    pub fn encode(&self) -> String {
        let mut result = String::from("{");
        for (i, (sample, call)) in self.calls.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(&serde_json::Value::from(sample.as_str()).to_string());
            result.push_str(": ");
            result.push_str(&serde_json::Value::from(call.as_str()).to_string());
        }
        result.push('}');
        result
    }

    /// Compute the counts over all samples.
    pub fn counts(&self) -> Counts {
        let homozygous_count = self
            .calls
            .values()
            .filter(|call| call.is_homozygous())
            .count() as u32;
        let sample_count = self.calls.len() as u32;
        Counts {
            sample_count,
            homozygous_count,
            heterozygous_count: sample_count - homozygous_count,
        }
    }
}

mod literal {
    //! Strict reader for flat `{str: str}` map literals with either quote
    //! style.  Nothing beyond string keys and values is accepted.

    use std::{iter::Peekable, str::CharIndices};

    use indexmap::IndexMap;

    struct Reader<'a> {
        chars: Peekable<CharIndices<'a>>,
        len: usize,
    }

    impl Reader<'_> {
        fn offset(&mut self) -> usize {
            self.chars.peek().map(|(i, _)| *i).unwrap_or(self.len)
        }

        fn skip_whitespace(&mut self) {
            while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        }

        fn expect(&mut self, expected: char) -> Result<(), String> {
            self.skip_whitespace();
            let offset = self.offset();
            match self.chars.next() {
                Some((_, c)) if c == expected => Ok(()),
                Some((_, c)) => Err(format!(
                    "expected {:?} but found {:?} at offset {}",
                    expected, c, offset
                )),
                None => Err(format!("expected {:?} but found end of input", expected)),
            }
        }

        fn eat(&mut self, expected: char) -> bool {
            self.skip_whitespace();
            self.chars.next_if(|(_, c)| *c == expected).is_some()
        }

        fn hex_escape(&mut self, digits: usize) -> Result<char, String> {
            let mut value = 0u32;
            for _ in 0..digits {
                let digit = self
                    .chars
                    .next()
                    .and_then(|(_, c)| c.to_digit(16))
                    .ok_or_else(|| String::from("invalid hex escape"))?;
                value = value * 16 + digit;
            }
            char::from_u32(value).ok_or_else(|| format!("invalid code point {:#x}", value))
        }

        fn string(&mut self) -> Result<String, String> {
            self.skip_whitespace();
            let offset = self.offset();
            let quote = match self.chars.next() {
                Some((_, c)) if c == '\'' || c == '"' => c,
                Some((_, c)) => {
                    return Err(format!("expected string but found {:?} at offset {}", c, offset))
                }
                None => return Err(String::from("expected string but found end of input")),
            };

            let mut result = String::new();
            loop {
                match self.chars.next() {
                    Some((_, c)) if c == quote => return Ok(result),
                    Some((_, '\\')) => {
                        let escaped = match self.chars.next() {
                            Some((_, '\\')) => '\\',
                            Some((_, '\'')) => '\'',
                            Some((_, '"')) => '"',
                            Some((_, 'n')) => '\n',
                            Some((_, 't')) => '\t',
                            Some((_, 'r')) => '\r',
                            Some((_, 'x')) => self.hex_escape(2)?,
                            Some((_, 'u')) => self.hex_escape(4)?,
                            Some((_, c)) => return Err(format!("unsupported escape \\{}", c)),
                            None => return Err(String::from("unterminated string")),
                        };
                        result.push(escaped);
                    }
                    Some((_, c)) => result.push(c),
                    None => return Err(String::from("unterminated string")),
                }
            }
        }
    }

    /// Parse `text` as a flat map literal, keeping entry order.
    pub fn parse_flat_map(text: &str) -> Result<IndexMap<String, String>, String> {
        let mut reader = Reader {
            chars: text.char_indices().peekable(),
            len: text.len(),
        };
        let mut result = IndexMap::new();

        reader.expect('{')?;
        if !reader.eat('}') {
            loop {
                let key = reader.string()?;
                reader.expect(':')?;
                let value = reader.string()?;
                result.insert(key, value);
                if reader.eat(',') {
                    // trailing comma
                    if reader.eat('}') {
                        break;
                    }
                } else {
                    reader.expect('}')?;
                    break;
                }
            }
        }

        reader.skip_whitespace();
        match reader.chars.next() {
            None => Ok(result),
            Some((offset, c)) => Err(format!("trailing {:?} at offset {}", c, offset)),
        }
    }
}

/// Result of `merge()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// The merged sample genotypes.
    pub genotypes: SampleGenotypes,
    /// Counts over `genotypes`.
    pub counts: Counts,
    /// Whether there were no stored genotypes for the variant.
    pub was_novel: bool,
}

/// Fold `incoming` into `existing`.
///
/// An absent or empty `existing` yields `incoming` as is.  Otherwise, calls
/// from `incoming` overwrite calls of the same sample.  Counts are always
/// recomputed over the full merged map.
pub fn merge(existing: Option<SampleGenotypes>, incoming: SampleGenotypes) -> Merged {
    let (genotypes, was_novel) = match existing.filter(|existing| !existing.is_empty()) {
        None => (incoming, true),
        Some(mut existing) => {
            existing.calls.extend(incoming.calls);
            (existing, false)
        }
    };
    let counts = genotypes.counts();
    Merged {
        genotypes,
        counts,
        was_novel,
    }
}
