//! # Encoder / Decoder
//!
//! Conversions between variant strings and their binary representation against a
//! frozen [`Registry`]. `decode` is the exact inverse of `encode_dense` for every
//! valid vector: it returns the variant's substitutions in ascending index order,
//! which is ascending natural site order.

use crate::grammar::parse_variant;
use crate::registry::{Feature, Registry};
use crate::types::{BinaryMapError, Site, ValidationError};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};

impl<S: Site> Registry<S> {
    /// Converts space-delimited substitutions to the sorted list of non-zero indices.
    ///
    /// Observed-only registries return one index per substitution, so the wildtype is
    /// an empty list. Expanded registries also include the wildtype index of every
    /// site the variant does not mention, giving exactly one index per site.
    pub fn encode(&self, sub_str: &str) -> Result<Vec<usize>, BinaryMapError> {
        let subs = parse_variant::<S>(sub_str, self.alphabet())?;
        let mut indices = Vec::with_capacity(subs.len() + self.wildtype_indices().len());
        for sub in &subs {
            indices.push(self.index_of(sub)?);
        }

        if !self.wildtype_indices().is_empty() {
            let mutated: AHashSet<&S> = subs.iter().map(|sub| &sub.site).collect();
            indices.extend(
                self.wildtype_indices()
                    .iter()
                    .copied()
                    .filter(|&i| !mutated.contains(&self.sites()[i])),
            );
        }

        indices.sort_unstable();
        Ok(indices)
    }

    /// The same computation as [`Registry::encode`], materialized as a 0/1 vector of
    /// length `binarylength`.
    pub fn encode_dense(&self, sub_str: &str) -> Result<Array1<i8>, BinaryMapError> {
        let mut binary = Array1::<i8>::zeros(self.binarylength());
        for index in self.encode(sub_str)? {
            binary[index] = 1;
        }
        Ok(binary)
    }

    /// Converts a binary representation back to space-delimited substitutions.
    pub fn decode(&self, binary: ArrayView1<'_, i8>) -> Result<String, BinaryMapError> {
        if binary.len() != self.binarylength() {
            return Err(ValidationError::BinaryLength {
                expected: self.binarylength(),
                found: binary.len(),
            }
            .into());
        }

        let mut active = Vec::new();
        for (index, &value) in binary.iter().enumerate() {
            match value {
                0 => {}
                1 => active.push(index),
                _ => return Err(ValidationError::NonBinaryValue { index, value }.into()),
            }
        }
        Ok(self.render(&active)?)
    }

    /// Reorders a variant's substitutions into the order `decode` produces.
    pub fn canonicalize(&self, sub_str: &str) -> Result<String, BinaryMapError> {
        let indices = self.encode(sub_str)?;
        Ok(self.render(&indices)?)
    }

    /// Joins the substitutions at ascending, in-range `active` indices, skipping
    /// wildtype states. Fails if two indices belong to the same site.
    fn render(&self, active: &[usize]) -> Result<String, ValidationError> {
        let mut claimed: AHashMap<&S, usize> = AHashMap::with_capacity(active.len());
        for &index in active {
            let site = &self.sites()[index];
            if let Some(&first) = claimed.get(site) {
                return Err(ValidationError::AmbiguousSite {
                    site: site.to_string(),
                    first,
                    second: index,
                });
            }
            claimed.insert(site, index);
        }

        Ok(active
            .iter()
            .filter_map(|&index| match &self.features()[index] {
                Feature::Mutation(sub) => Some(sub),
                Feature::Wildtype { .. } => None,
            })
            .join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::registry::{FullExpansion, ObservedOnly};
    use crate::types::{LookupError, SiteLabel};
    use ndarray::array;

    const VARIANTS: [&str; 6] = ["", "M1A", "M1C K3A", "", "A2C K3A", "A2*"];

    fn observed() -> Registry<i64> {
        Registry::build(Alphabet::default(), ObservedOnly::new(), VARIANTS).unwrap()
    }

    fn expanded() -> Registry<i64> {
        let alphabet = Alphabet::new(['A', 'C', 'G', 'K', 'M', '*']).unwrap();
        Registry::build(alphabet, FullExpansion::new("MAKG"), VARIANTS).unwrap()
    }

    #[test]
    fn observed_encoding_lists_only_carried_substitutions() {
        let registry = observed();
        let encoded: Vec<Vec<usize>> = VARIANTS
            .iter()
            .map(|v| registry.encode(v).unwrap())
            .collect();
        assert_eq!(
            encoded,
            vec![vec![], vec![0], vec![1, 4], vec![], vec![2, 4], vec![3]]
        );
        assert_eq!(registry.encode_dense("M1C K3A").unwrap(), array![0i8, 1, 0, 0, 1]);
    }

    #[test]
    fn token_order_does_not_change_the_encoding() {
        let registry = observed();
        assert_eq!(
            registry.encode("K3A M1C").unwrap(),
            registry.encode("M1C K3A").unwrap()
        );
        assert_eq!(registry.canonicalize("K3A M1C").unwrap(), "M1C K3A");
    }

    #[test]
    fn expanded_encoding_has_one_index_per_site() {
        let registry = expanded();
        assert_eq!(registry.encode("").unwrap(), vec![4, 6, 15, 20]);
        assert_eq!(registry.encode("M1C K3A").unwrap(), vec![1, 6, 12, 20]);
        for variant in VARIANTS {
            assert_eq!(registry.encode_dense(variant).unwrap().sum(), 4);
        }
    }

    #[test]
    fn decode_inverts_encode_dense() {
        for registry in [observed(), expanded()] {
            for variant in VARIANTS {
                let binary = registry.encode_dense(variant).unwrap();
                assert_eq!(registry.decode(binary.view()).unwrap(), variant);
            }
        }
    }

    #[test]
    fn decode_validates_shape_values_and_sites() {
        let registry = observed();
        assert!(matches!(
            registry.decode(array![1, 0].view()),
            Err(BinaryMapError::Validation(ValidationError::BinaryLength {
                expected: 5,
                found: 2
            }))
        ));
        assert!(matches!(
            registry.decode(array![0, 2, 0, 0, 0].view()),
            Err(BinaryMapError::Validation(ValidationError::NonBinaryValue {
                index: 1,
                value: 2
            }))
        ));
        assert!(matches!(
            registry.decode(array![1, 1, 0, 0, 0].view()),
            Err(BinaryMapError::Validation(ValidationError::AmbiguousSite {
                first: 0,
                second: 1,
                ..
            }))
        ));
        assert_eq!(registry.decode(array![0, 0, 0, 0, 0].view()).unwrap(), "");
    }

    #[test]
    fn decode_rejects_wildtype_and_mutant_active_at_one_site() {
        let registry = expanded();
        let mut binary = registry.encode_dense("").unwrap();
        binary[0] = 1;
        assert!(matches!(
            registry.decode(binary.view()),
            Err(BinaryMapError::Validation(ValidationError::AmbiguousSite { .. }))
        ));
    }

    #[test]
    fn encode_reports_parse_validation_and_lookup_failures() {
        let registry = observed();
        assert!(matches!(registry.encode("M1M"), Err(BinaryMapError::Parse(_))));
        assert!(matches!(
            registry.encode("M1A M1C"),
            Err(BinaryMapError::Validation(ValidationError::DuplicateSite { .. }))
        ));
        assert!(matches!(
            registry.encode("K3G"),
            Err(BinaryMapError::Lookup(LookupError::UnknownSubstitution(ref s))) if s == "K3G"
        ));
    }

    #[test]
    fn label_sites_round_trip() {
        let variants = ["", "L3aT", "M1A L3aT", "K3A"];
        let registry =
            Registry::<SiteLabel>::build(Alphabet::default(), ObservedOnly::new(), variants)
                .unwrap();
        for variant in variants {
            let binary = registry.encode_dense(variant).unwrap();
            assert_eq!(registry.decode(binary.view()).unwrap(), variant);
        }
    }
}
