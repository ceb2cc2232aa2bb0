//! Canned searches that replace a user-typed search pattern.

/// Available presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Preset {
    /// Frequently seen pathogenic and likely pathogenic variants.
    PathogenicPanel,
}

impl Preset {
    /// Name of the combined result.
    pub fn result_name(&self) -> &'static str {
        match self {
            Preset::PathogenicPanel => "Gene Panel",
        }
    }

    /// Search patterns whose results are concatenated.
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            Preset::PathogenicPanel => &[
                "variant_count>10&&acmg_classification=Pathogenic",
                "variant_count>10&&acmg_classification=Likely_pathogenic",
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::{
        genes::GeneCoordinateTable,
        parser::parse,
        schema::{Operator, SearchClause},
    };

    #[test]
    fn patterns_parse() -> Result<(), anyhow::Error> {
        let genes = GeneCoordinateTable::default();
        for pattern in Preset::PathogenicPanel.patterns() {
            let query = parse(pattern, &genes, Default::default())?;
            assert_eq!(query.clauses.len(), 2);
            assert!(matches!(
                &query.clauses[0],
                SearchClause::FieldComparison {
                    operator: Operator::Gt,
                    ..
                }
            ));
        }

        Ok(())
    }

    #[test]
    fn display() {
        assert_eq!(Preset::PathogenicPanel.to_string(), "pathogenic-panel");
        assert_eq!(Preset::PathogenicPanel.result_name(), "Gene Panel");
    }
}
