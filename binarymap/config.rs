//! # Configuration
//!
//! The recognized options for building a binary map from a table of variants,
//! loadable from TOML. Option combinations are validated before any data is read,
//! and the site-identifier choice is resolved here into one of the two concrete
//! map types.

use crate::alphabet::Alphabet;
use crate::assemble::BinaryMap;
use crate::matrix::BinaryMatrix;
use crate::registry::{FullExpansion, ObservedOnly};
use crate::types::{BinaryMapError, SiteKind, SiteLabel, ValidationError};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Names of the input columns. Each annotation column may be disabled with `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub substitutions_col: String,
    pub func_score_col: Option<String>,
    pub func_score_var_col: Option<String>,
    pub n_pre_col: Option<String>,
    pub n_post_col: Option<String>,
    /// When set, a named annotation column that is absent from the input leaves
    /// that annotation unavailable instead of failing.
    pub cols_optional: bool,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            substitutions_col: "aa_substitutions".to_string(),
            func_score_col: Some("func_score".to_string()),
            func_score_var_col: Some("func_score_var".to_string()),
            n_pre_col: Some("pre_count".to_string()),
            n_post_col: Some("post_count".to_string()),
            cols_optional: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphabetChoice {
    AminoAcids,
    #[default]
    AminoAcidsWithStop,
    AminoAcidsWithGap,
    AminoAcidsWithStopAndGap,
    Custom(Vec<char>),
}

impl AlphabetChoice {
    pub fn resolve(&self) -> Result<Alphabet, ValidationError> {
        match self {
            Self::AminoAcids => Ok(Alphabet::amino_acids()),
            Self::AminoAcidsWithStop => Ok(Alphabet::amino_acids_with_stop()),
            Self::AminoAcidsWithGap => Ok(Alphabet::amino_acids_with_gap()),
            Self::AminoAcidsWithStopAndGap => Ok(Alphabet::amino_acids_with_stop_and_gap()),
            Self::Custom(chars) => Alphabet::new(chars.iter().copied()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinaryMapConfig {
    pub columns: ColumnConfig,
    pub alphabet: AlphabetChoice,
    /// Index exactly these substitutions. Incompatible with `expand`.
    pub allowed_subs: Option<Vec<String>>,
    /// Treat sites as strings so they may carry suffixes like `214a`.
    pub sites_as_str: bool,
    /// Encode every alphabet character at every site of `wtseq`.
    pub expand: bool,
    pub wtseq: Option<String>,
}

impl BinaryMapConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, BinaryMapError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn site_kind(&self) -> SiteKind {
        if self.sites_as_str {
            SiteKind::Label
        } else {
            SiteKind::Numeric
        }
    }

    /// Builds the binary map for `frame` according to these options.
    pub fn build(&self, frame: &DataFrame) -> Result<AnyBinaryMap, BinaryMapError> {
        let alphabet = self.alphabet.resolve()?;

        if self.expand {
            if self.sites_as_str {
                return Err(ValidationError::IncompatibleOptions("expand", "sites_as_str").into());
            }
            if self.allowed_subs.is_some() {
                return Err(ValidationError::IncompatibleOptions("expand", "allowed_subs").into());
            }
            let wtseq = self
                .wtseq
                .as_deref()
                .ok_or(ValidationError::MissingWildtypeSequence)?;
            let map =
                BinaryMap::from_frame(frame, &self.columns, alphabet, FullExpansion::new(wtseq))?;
            return Ok(AnyBinaryMap::Numeric(map));
        }

        if self.wtseq.is_some() {
            return Err(ValidationError::UnexpectedWildtypeSequence.into());
        }
        let strategy = match &self.allowed_subs {
            Some(allowed) => ObservedOnly::with_allowed(allowed.iter().cloned()),
            None => ObservedOnly::new(),
        };
        Ok(match self.site_kind() {
            SiteKind::Numeric => AnyBinaryMap::Numeric(BinaryMap::from_frame(
                frame,
                &self.columns,
                alphabet,
                strategy,
            )?),
            SiteKind::Label => AnyBinaryMap::Labeled(BinaryMap::from_frame(
                frame,
                &self.columns,
                alphabet,
                strategy,
            )?),
        })
    }
}

/// A map built from a configuration, whose site kind is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyBinaryMap {
    Numeric(BinaryMap<i64>),
    Labeled(BinaryMap<SiteLabel>),
}

impl AnyBinaryMap {
    pub fn site_kind(&self) -> SiteKind {
        match self {
            Self::Numeric(_) => SiteKind::Numeric,
            Self::Labeled(_) => SiteKind::Label,
        }
    }

    pub fn binarylength(&self) -> usize {
        match self {
            Self::Numeric(map) => map.binarylength(),
            Self::Labeled(map) => map.binarylength(),
        }
    }

    pub fn nvariants(&self) -> usize {
        match self {
            Self::Numeric(map) => map.nvariants(),
            Self::Labeled(map) => map.nvariants(),
        }
    }

    pub fn binary_variants(&self) -> &BinaryMatrix {
        match self {
            Self::Numeric(map) => map.binary_variants(),
            Self::Labeled(map) => map.binary_variants(),
        }
    }

    /// Site of every feature rendered as text, in index order.
    pub fn binary_sites(&self) -> Vec<String> {
        match self {
            Self::Numeric(map) => map.binary_sites().iter().map(ToString::to_string).collect(),
            Self::Labeled(map) => map.binary_sites().iter().map(ToString::to_string).collect(),
        }
    }

    pub fn i_to_sub(&self, index: usize) -> Result<String, BinaryMapError> {
        Ok(match self {
            Self::Numeric(map) => map.i_to_sub(index)?,
            Self::Labeled(map) => map.i_to_sub(index)?,
        })
    }

    pub fn all_subs(&self) -> Vec<String> {
        match self {
            Self::Numeric(map) => map.all_subs(),
            Self::Labeled(map) => map.all_subs(),
        }
    }

    pub fn substitution_variants(&self) -> &[String] {
        match self {
            Self::Numeric(map) => map.substitution_variants(),
            Self::Labeled(map) => map.substitution_variants(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame() -> DataFrame {
        polars::df!(
            "aa_substitutions" => ["", "M1A", "M1C K3A", "", "A2C K3A", "A2*"],
            "func_score" => [0.0, -0.2, -0.4, 0.01, -0.05, -1.2],
            "func_score_var" => [0.2, 0.1, 0.3, 0.15, 0.1, 0.4]
        )
        .unwrap()
    }

    #[test]
    fn default_config_builds_numeric_observed_map() {
        let map = BinaryMapConfig::default().build(&frame()).unwrap();
        assert_eq!(map.site_kind(), SiteKind::Numeric);
        assert_eq!(map.binarylength(), 5);
        assert_eq!(map.binary_sites(), vec!["1", "1", "2", "2", "3"]);
    }

    #[test]
    fn rejects_incompatible_option_combinations() {
        let cases = [
            BinaryMapConfig {
                expand: true,
                sites_as_str: true,
                wtseq: Some("MAKG".into()),
                ..Default::default()
            },
            BinaryMapConfig {
                expand: true,
                allowed_subs: Some(vec!["M1A".into()]),
                wtseq: Some("MAKG".into()),
                ..Default::default()
            },
            BinaryMapConfig {
                expand: true,
                ..Default::default()
            },
            BinaryMapConfig {
                wtseq: Some("MAKG".into()),
                ..Default::default()
            },
        ];
        for config in cases {
            let err = config.build(&frame()).unwrap_err();
            assert!(
                matches!(err, BinaryMapError::Validation(_)),
                "expected a validation error for {config:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn loads_options_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
expand = true
wtseq = "MAKG"
alphabet = {{ custom = ["A", "C", "G", "K", "M", "*"] }}

[columns]
substitutions_col = "aa_substitutions"
cols_optional = true
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = BinaryMapConfig::load(file.path()).unwrap();
        assert!(config.expand);
        assert_eq!(config.columns.func_score_col.as_deref(), Some("func_score"));

        let map = config.build(&frame()).unwrap();
        assert_eq!(map.binarylength(), 24);
        assert_eq!(map.i_to_sub(4).unwrap(), "");
        assert!(map.binary_variants().row_sums().iter().all(|&s| s == 4));
    }

    #[test]
    fn label_sites_accept_suffixed_positions() {
        let frame = polars::df!("aa_substitutions" => ["M1A", "L3aT"]).unwrap();
        let config = BinaryMapConfig {
            sites_as_str: true,
            ..Default::default()
        };
        let map = config.build(&frame).unwrap();
        assert_eq!(map.site_kind(), SiteKind::Label);
        assert_eq!(map.all_subs(), vec!["M1A", "L3aT"]);

        let numeric = BinaryMapConfig::default().build(&frame).unwrap_err();
        assert!(matches!(numeric, BinaryMapError::Parse(_)));
    }
}
