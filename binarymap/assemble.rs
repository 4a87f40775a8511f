//! # Matrix Assembler
//!
//! Encodes every variant against a frozen [`Registry`] and collects the rows into one
//! [`BinaryMatrix`], alongside the row-aligned scalar annotations.

use crate::alphabet::Alphabet;
use crate::config::ColumnConfig;
use crate::matrix::BinaryMatrix;
use crate::registry::{Registry, RegistryStrategy};
use crate::table::read_variant_table;
use crate::types::{BinaryMapError, LookupError, Site, SiteKind, ValidationError};
use log::{debug, info};
use ndarray::{Array1, ArrayView1};
use polars::prelude::DataFrame;
use rayon::prelude::*;

/// Per-variant scalar columns. Each is either present for every row or absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub func_scores: Option<Array1<f64>>,
    pub func_scores_var: Option<Array1<f64>>,
    pub n_pre: Option<Array1<u64>>,
    pub n_post: Option<Array1<u64>>,
}

impl Annotations {
    /// Checks every present column against the variant count and its declared
    /// bound. Counts are unsigned, so only the float columns carry value checks.
    pub fn validate(
        &self,
        nvariants: usize,
        columns: &ColumnConfig,
    ) -> Result<(), ValidationError> {
        let name = |configured: &Option<String>, fallback: &'static str| {
            configured.as_deref().unwrap_or(fallback).to_string()
        };

        if let Some(scores) = &self.func_scores {
            let column = name(&columns.func_score_col, "func_score");
            check_length(&column, scores.len(), nvariants)?;
            check_float_values(&column, scores.iter().copied(), None)?;
        }
        if let Some(variances) = &self.func_scores_var {
            let column = name(&columns.func_score_var_col, "func_score_var");
            check_length(&column, variances.len(), nvariants)?;
            check_float_values(&column, variances.iter().copied(), Some(0.0))?;
        }
        if let Some(n_pre) = &self.n_pre {
            check_length(&name(&columns.n_pre_col, "pre_count"), n_pre.len(), nvariants)?;
        }
        if let Some(n_post) = &self.n_post {
            check_length(&name(&columns.n_post_col, "post_count"), n_post.len(), nvariants)?;
        }
        Ok(())
    }
}

fn check_length(column: &str, found: usize, expected: usize) -> Result<(), ValidationError> {
    if found != expected {
        return Err(ValidationError::ColumnLength {
            column: column.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

/// Fails on NaN values, or on values below `minimum` when one is given.
pub(crate) fn check_float_values(
    column: &str,
    values: impl IntoIterator<Item = f64>,
    minimum: Option<f64>,
) -> Result<(), ValidationError> {
    for value in values {
        if value.is_nan() {
            return Err(ValidationError::ColumnHasNaN(column.to_string()));
        }
        if let Some(minimum) = minimum {
            if value < minimum {
                return Err(ValidationError::ColumnBelowMinimum {
                    column: column.to_string(),
                    minimum,
                });
            }
        }
    }
    Ok(())
}

/// Variants encoded as a sparse one-hot matrix, with its registry and annotations.
///
/// Row `i` of `binary_variants` encodes `substitution_variants[i]`. Immutable once
/// built; two maps are equal when the registry, matrix, variant strings and every
/// annotation agree.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMap<S: Site> {
    registry: Registry<S>,
    binary_variants: BinaryMatrix,
    substitution_variants: Vec<String>,
    substitutions_col: String,
    annotations: Annotations,
}

impl<S: Site> BinaryMap<S> {
    /// Reads the configured columns of `frame`, builds the registry with `strategy`
    /// and assembles the matrix.
    pub fn from_frame<T: RegistryStrategy<S>>(
        frame: &DataFrame,
        columns: &ColumnConfig,
        alphabet: Alphabet,
        strategy: T,
    ) -> Result<Self, BinaryMapError> {
        let table = read_variant_table(frame, columns)?;
        let registry = Registry::build(
            alphabet,
            strategy,
            table.substitutions.iter().map(String::as_str),
        )?;
        Self::assemble(registry, table.substitutions, table.annotations, columns)
    }

    /// Encodes `substitution_variants` against an already built `registry`.
    pub fn assemble(
        registry: Registry<S>,
        substitution_variants: Vec<String>,
        annotations: Annotations,
        columns: &ColumnConfig,
    ) -> Result<Self, BinaryMapError> {
        let nvariants = substitution_variants.len();
        annotations.validate(nvariants, columns)?;

        let encoded: Vec<Vec<usize>> = substitution_variants
            .par_iter()
            .map(|variant| registry.encode(variant))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Encoded {nvariants} variants");

        let nnz: usize = encoded.iter().map(Vec::len).sum();
        let mut rows = Vec::with_capacity(nnz);
        let mut cols = Vec::with_capacity(nnz);
        for (row, indices) in encoded.iter().enumerate() {
            rows.extend(std::iter::repeat_n(row, indices.len()));
            cols.extend_from_slice(indices);
        }
        let binary_variants =
            BinaryMatrix::from_coordinates(nvariants, registry.binarylength(), &rows, &cols)?;

        info!(
            "Built binary map: {} variants x {} features ({} ones)",
            nvariants,
            registry.binarylength(),
            binary_variants.nnz()
        );

        Ok(Self {
            registry,
            binary_variants,
            substitution_variants,
            substitutions_col: columns.substitutions_col.clone(),
            annotations,
        })
    }

    pub fn registry(&self) -> &Registry<S> {
        &self.registry
    }

    pub fn binarylength(&self) -> usize {
        self.registry.binarylength()
    }

    pub fn nvariants(&self) -> usize {
        self.substitution_variants.len()
    }

    /// The (variants x binarylength) 0/1 matrix.
    pub fn binary_variants(&self) -> &BinaryMatrix {
        &self.binary_variants
    }

    /// Site of each column of `binary_variants`.
    pub fn binary_sites(&self) -> &[S] {
        self.registry.sites()
    }

    pub fn substitution_variants(&self) -> &[String] {
        &self.substitution_variants
    }

    pub fn substitutions_col(&self) -> &str {
        &self.substitutions_col
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn func_scores(&self) -> Option<&Array1<f64>> {
        self.annotations.func_scores.as_ref()
    }

    pub fn func_scores_var(&self) -> Option<&Array1<f64>> {
        self.annotations.func_scores_var.as_ref()
    }

    pub fn n_pre(&self) -> Option<&Array1<u64>> {
        self.annotations.n_pre.as_ref()
    }

    pub fn n_post(&self) -> Option<&Array1<u64>> {
        self.annotations.n_post.as_ref()
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.registry.alphabet()
    }

    pub fn site_kind(&self) -> SiteKind {
        self.registry.site_kind()
    }

    pub fn all_subs(&self) -> Vec<String> {
        self.registry.all_subs()
    }

    pub fn i_to_sub(&self, index: usize) -> Result<String, LookupError> {
        self.registry.i_to_sub(index)
    }

    pub fn sub_to_i(&self, sub: &str) -> Result<usize, BinaryMapError> {
        self.registry.sub_to_i(sub)
    }

    pub fn sub_str_to_indices(&self, sub_str: &str) -> Result<Vec<usize>, BinaryMapError> {
        self.registry.encode(sub_str)
    }

    pub fn sub_str_to_binary(&self, sub_str: &str) -> Result<Array1<i8>, BinaryMapError> {
        self.registry.encode_dense(sub_str)
    }

    pub fn binary_to_sub_str(&self, binary: ArrayView1<'_, i8>) -> Result<String, BinaryMapError> {
        self.registry.decode(binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FullExpansion, ObservedOnly};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn frame() -> DataFrame {
        polars::df!(
            "aa_substitutions" => ["", "M1A", "M1C K3A", "", "A2C K3A", "A2*"],
            "func_score" => [0.0, -0.2, -0.4, 0.01, -0.05, -1.2],
            "func_score_var" => [0.2, 0.1, 0.3, 0.15, 0.1, 0.4]
        )
        .unwrap()
    }

    fn observed_map(frame: &DataFrame) -> BinaryMap<i64> {
        BinaryMap::from_frame(
            frame,
            &ColumnConfig::default(),
            Alphabet::default(),
            ObservedOnly::new(),
        )
        .unwrap()
    }

    #[test]
    fn assembles_rows_in_input_order() {
        let map = observed_map(&frame());
        assert_eq!(map.nvariants(), 6);
        assert_eq!(map.binarylength(), 5);
        assert_eq!(map.binary_sites(), &[1i64, 1, 2, 2, 3]);
        assert_eq!(
            map.binary_variants().to_dense(),
            array![
                [0i8, 0, 0, 0, 0],
                [1, 0, 0, 0, 0],
                [0, 1, 0, 0, 1],
                [0, 0, 0, 0, 0],
                [0, 0, 1, 0, 1],
                [0, 0, 0, 1, 0]
            ]
        );
        assert_eq!(map.substitutions_col(), "aa_substitutions");
        assert!(map.n_pre().is_none());
        assert!(map.n_post().is_none());
    }

    #[test]
    fn annotations_follow_their_rows() {
        let map = observed_map(&frame());
        let scores = map.func_scores().unwrap();
        assert_abs_diff_eq!(scores[2], -0.4, epsilon = 1e-12);
        assert_abs_diff_eq!(map.func_scores_var().unwrap()[5], 0.4, epsilon = 1e-12);
    }

    #[test]
    fn conversion_helpers_agree_with_the_matrix() {
        let map = observed_map(&frame());
        assert_eq!(map.sub_str_to_indices("K3A M1C").unwrap(), vec![1, 4]);
        assert_eq!(map.sub_str_to_binary("A2*").unwrap(), map.binary_variants().row_dense(5));
        let row = map.binary_variants().row_dense(4);
        assert_eq!(map.binary_to_sub_str(row.view()).unwrap(), "A2C K3A");
        assert_eq!(map.sub_to_i("A2*").unwrap(), 3);
        assert_eq!(map.i_to_sub(3).unwrap(), "A2*");
        assert!(matches!(
            map.i_to_sub(5),
            Err(LookupError::IndexOutOfRange { index: 5, length: 5 })
        ));
    }

    #[test]
    fn changed_annotation_breaks_map_equality_only() {
        let first = observed_map(&frame());
        let again = observed_map(&frame());
        assert_eq!(first, again);

        let changed = polars::df!(
            "aa_substitutions" => ["", "M1A", "M1C K3A", "", "A2C K3A", "A2*"],
            "func_score" => [0.0, -0.2, -0.4, 0.01, -0.05, -1.1],
            "func_score_var" => [0.2, 0.1, 0.3, 0.15, 0.1, 0.4]
        )
        .unwrap();
        let second = observed_map(&changed);
        assert_ne!(first, second);
        assert_eq!(first.registry(), second.registry());
        assert_eq!(first.binary_variants(), second.binary_variants());
    }

    #[test]
    fn expanded_rows_have_one_active_index_per_site() {
        let alphabet = Alphabet::new(['A', 'C', 'G', 'K', 'M', '*']).unwrap();
        let map = BinaryMap::from_frame(
            &frame(),
            &ColumnConfig::default(),
            alphabet,
            FullExpansion::new("MAKG"),
        )
        .unwrap();
        assert_eq!(map.binarylength(), 24);
        assert!(map.binary_variants().row_sums().iter().all(|&s| s == 4));
        assert_eq!(map.binary_variants().row(0), map.registry().wildtype_indices());
    }

    #[test]
    fn rejects_misaligned_annotations() {
        let registry =
            Registry::<i64>::build(Alphabet::default(), ObservedOnly::new(), ["M1A", ""]).unwrap();
        let annotations = Annotations {
            func_scores: Some(array![0.1, 0.2, 0.3]),
            ..Default::default()
        };
        let err = BinaryMap::assemble(
            registry,
            vec!["M1A".to_string(), String::new()],
            annotations,
            &ColumnConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryMapError::Validation(ValidationError::ColumnLength {
                ref column,
                expected: 2,
                found: 3,
            }) if column == "func_score"
        ));
    }

    #[test]
    fn assemble_rejects_nan_and_negative_variance_annotations() {
        let assemble_with = |annotations: Annotations| {
            let registry =
                Registry::<i64>::build(Alphabet::default(), ObservedOnly::new(), ["M1A", ""])
                    .unwrap();
            BinaryMap::assemble(
                registry,
                vec!["M1A".to_string(), String::new()],
                annotations,
                &ColumnConfig::default(),
            )
        };

        let err = assemble_with(Annotations {
            func_scores: Some(array![f64::NAN, 0.0]),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryMapError::Validation(ValidationError::ColumnHasNaN(ref column))
                if column == "func_score"
        ));

        let err = assemble_with(Annotations {
            func_scores: Some(array![0.1, 0.0]),
            func_scores_var: Some(array![-5.0, 0.1]),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryMapError::Validation(ValidationError::ColumnBelowMinimum { ref column, minimum })
                if column == "func_score_var" && minimum == 0.0
        ));

        let err = assemble_with(Annotations {
            func_scores_var: Some(array![0.2, f64::NAN]),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryMapError::Validation(ValidationError::ColumnHasNaN(ref column))
                if column == "func_score_var"
        ));

        assert!(assemble_with(Annotations {
            func_scores: Some(array![-1.5, 0.0]),
            func_scores_var: Some(array![0.0, 0.1]),
            ..Default::default()
        })
        .is_ok());
    }

    #[test]
    fn unknown_substitutions_fail_assembly() {
        let registry =
            Registry::<i64>::build(Alphabet::default(), ObservedOnly::new(), ["M1A"]).unwrap();
        let err = BinaryMap::assemble(
            registry,
            vec!["M1A".to_string(), "K3A".to_string()],
            Annotations::default(),
            &ColumnConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BinaryMapError::Lookup(LookupError::UnknownSubstitution(_))));
    }
}
