//! # Index Registry
//!
//! The frozen bijection between substitutions and feature indices `0..binarylength`.
//!
//! A registry is built exactly once from the full variant collection by one of two
//! strategies:
//!
//! - [`ObservedOnly`] allocates an index for each distinct substitution seen in the
//!   variants (or in an explicit allowed set). Sites are laid out in natural order and
//!   mutants within a site in alphabet order.
//! - [`FullExpansion`] allocates one index per (site, alphabet character) pair over a
//!   wildtype sequence, one of which per site is that site's wildtype index. It is
//!   only implemented for numeric sites, so an expanded registry with label sites
//!   cannot be requested.
//!
//! Construction either returns a complete registry or an error; there is no partially
//! built state and no way to mutate a registry afterwards.

use crate::alphabet::Alphabet;
use crate::types::{BinaryMapError, LookupError, Site, SiteKind, Substitution, ValidationError};
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use log::debug;

/// What a single feature index stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feature<S> {
    /// The variant carries this substitution.
    Mutation(Substitution<S>),
    /// The site is unmutated. Only expanded registries have these.
    Wildtype { site: S, residue: char },
}

impl<S> Feature<S> {
    pub fn site(&self) -> &S {
        match self {
            Self::Mutation(sub) => &sub.site,
            Self::Wildtype { site, .. } => site,
        }
    }

    pub fn substitution(&self) -> Option<&Substitution<S>> {
        match self {
            Self::Mutation(sub) => Some(sub),
            Self::Wildtype { .. } => None,
        }
    }
}

/// A distinct substitution found in the variants, with every spelling of it that
/// occurs there (`M1A` and `M01A` are the same numeric substitution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation<S> {
    pub sub: Substitution<S>,
    pub tokens: Vec<String>,
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::ObservedOnly {}
    impl Sealed for super::FullExpansion {}
}

/// A way of laying out feature indices. Sealed: the two strategies in this module
/// are the only ones.
pub trait RegistryStrategy<S: Site>: sealed::Sealed {
    /// Produces the features in index order from the distinct substitutions
    /// observed across the variant collection, in first-seen order.
    fn layout(
        self,
        alphabet: &Alphabet,
        observed: Vec<Observation<S>>,
    ) -> Result<Vec<Feature<S>>, BinaryMapError>;
}

/// Index only substitutions that occur, optionally restricted to an allowed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedOnly {
    allowed: Option<Vec<String>>,
}

impl ObservedOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes exactly `allowed`. Every substitution in the variants must be in it;
    /// allowed substitutions that never occur are appended after the observed ones
    /// in the order given here.
    pub fn with_allowed<I, T>(allowed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            allowed: Some(allowed.into_iter().map(Into::into).collect()),
        }
    }
}

impl<S: Site> RegistryStrategy<S> for ObservedOnly {
    fn layout(
        self,
        alphabet: &Alphabet,
        observations: Vec<Observation<S>>,
    ) -> Result<Vec<Feature<S>>, BinaryMapError> {
        let extras = match self.allowed {
            None => Vec::new(),
            Some(tokens) => {
                let mut allowed = Vec::with_capacity(tokens.len());
                let mut allowed_set = AHashSet::with_capacity(tokens.len());
                for token in &tokens {
                    let sub = Substitution::<S>::parse(token, alphabet)?;
                    if allowed_set.insert(sub.clone()) {
                        allowed.push(sub);
                    }
                }

                let missing: Vec<String> = observations
                    .iter()
                    .filter(|obs| !allowed_set.contains(&obs.sub))
                    .flat_map(|obs| obs.tokens.iter().cloned())
                    .sorted()
                    .dedup()
                    .collect();
                if !missing.is_empty() {
                    return Err(ValidationError::NotInAllowedSet(missing).into());
                }

                let observed_set: AHashSet<&Substitution<S>> =
                    observations.iter().map(|obs| &obs.sub).collect();
                allowed
                    .into_iter()
                    .filter(|sub| !observed_set.contains(sub))
                    .collect()
            }
        };

        let observed: Vec<Substitution<S>> =
            observations.into_iter().map(|obs| obs.sub).collect();
        let all: Vec<&Substitution<S>> = observed.iter().chain(extras.iter()).collect();
        check_wildtypes(&all)?;

        let mut by_site: AHashMap<&S, Vec<char>> = AHashMap::new();
        for sub in &observed {
            by_site.entry(&sub.site).or_default().push(sub.mutant);
        }
        let mut sites: Vec<&S> = by_site.keys().copied().collect();
        sites.sort_by(|a, b| a.natural_cmp(b));

        let wildtype_at: AHashMap<&S, char> =
            observed.iter().map(|sub| (&sub.site, sub.wildtype)).collect();

        let mut features = Vec::with_capacity(observed.len() + extras.len());
        for site in sites {
            let wildtype = wildtype_at[site];
            let mutants = by_site[site]
                .iter()
                .copied()
                .unique()
                .sorted_by_key(|&m| alphabet.rank(m).unwrap_or(usize::MAX));
            for mutant in mutants {
                features.push(Feature::Mutation(Substitution {
                    wildtype,
                    site: site.clone(),
                    mutant,
                }));
            }
        }
        if !extras.is_empty() {
            debug!(
                "Appending {} allowed substitutions that do not occur in any variant",
                extras.len()
            );
        }
        features.extend(extras.into_iter().map(Feature::Mutation));
        Ok(features)
    }
}

/// Index every alphabet character at every position of a wildtype sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullExpansion {
    wtseq: String,
}

impl FullExpansion {
    pub fn new(wtseq: impl Into<String>) -> Self {
        Self {
            wtseq: wtseq.into(),
        }
    }
}

impl RegistryStrategy<i64> for FullExpansion {
    fn layout(
        self,
        alphabet: &Alphabet,
        observations: Vec<Observation<i64>>,
    ) -> Result<Vec<Feature<i64>>, BinaryMapError> {
        let observed: Vec<Substitution<i64>> =
            observations.into_iter().map(|obs| obs.sub).collect();
        let sequence: Vec<char> = self.wtseq.chars().collect();
        let outside: Vec<char> = sequence
            .iter()
            .copied()
            .filter(|&c| !alphabet.contains(c))
            .unique()
            .collect();
        if !outside.is_empty() {
            return Err(ValidationError::WildtypeOutsideAlphabet(outside).into());
        }

        let all: Vec<&Substitution<i64>> = observed.iter().collect();
        check_wildtypes(&all)?;

        if let Some(lowest) = observed.iter().map(|sub| sub.site).min() {
            if lowest < 1 {
                return Err(ValidationError::SiteBelowOne(lowest).into());
            }
        }
        if let Some(highest) = observed.iter().map(|sub| sub.site).max() {
            if highest as usize > sequence.len() {
                return Err(ValidationError::SiteBeyondSequence {
                    site: highest,
                    length: sequence.len(),
                }
                .into());
            }
        }
        for sub in observed.iter().sorted_by_key(|sub| sub.site) {
            let expected = sequence[(sub.site - 1) as usize];
            if expected != sub.wildtype {
                return Err(ValidationError::WildtypeMismatch {
                    site: sub.site,
                    expected,
                    found: sub.wildtype,
                }
                .into());
            }
        }

        let mut features = Vec::with_capacity(sequence.len() * alphabet.len());
        for (offset, &wildtype) in sequence.iter().enumerate() {
            let site = offset as i64 + 1;
            for &c in alphabet.chars() {
                if c == wildtype {
                    features.push(Feature::Wildtype {
                        site,
                        residue: wildtype,
                    });
                } else {
                    features.push(Feature::Mutation(Substitution {
                        wildtype,
                        site,
                        mutant: c,
                    }));
                }
            }
        }
        Ok(features)
    }
}

/// Fails if two substitutions disagree on the wildtype character at a site.
fn check_wildtypes<S: Site>(subs: &[&Substitution<S>]) -> Result<(), ValidationError> {
    let mut wildtypes: AHashMap<&S, char> = AHashMap::with_capacity(subs.len());
    for sub in subs {
        match wildtypes.get(&sub.site) {
            Some(&first) if first != sub.wildtype => {
                return Err(ValidationError::ConflictingWildtype {
                    site: sub.site.to_string(),
                    first,
                    second: sub.wildtype,
                });
            }
            Some(_) => {}
            None => {
                wildtypes.insert(&sub.site, sub.wildtype);
            }
        }
    }
    Ok(())
}

/// The frozen substitution ↔ index mapping.
#[derive(Debug, Clone)]
pub struct Registry<S: Site> {
    alphabet: Alphabet,
    features: Vec<Feature<S>>,
    // Derived from `features`; kept alongside for constant-time lookups.
    sites: Vec<S>,
    lookup: AHashMap<Substitution<S>, usize>,
    wildtype_indices: Vec<usize>,
}

impl<S: Site> PartialEq for Registry<S> {
    fn eq(&self, other: &Self) -> bool {
        self.alphabet == other.alphabet && self.features == other.features
    }
}

impl<S: Site> Registry<S> {
    /// Builds the registry from every substitution token in `variants`.
    pub fn build<'a, I, T>(
        alphabet: Alphabet,
        strategy: T,
        variants: I,
    ) -> Result<Self, BinaryMapError>
    where
        I: IntoIterator<Item = &'a str>,
        T: RegistryStrategy<S>,
    {
        let mut tokens_seen = AHashSet::new();
        let mut position: AHashMap<Substitution<S>, usize> = AHashMap::new();
        let mut observed: Vec<Observation<S>> = Vec::new();
        for variant in variants {
            for token in variant.split_whitespace() {
                if !tokens_seen.insert(token) {
                    continue;
                }
                let sub = Substitution::<S>::parse(token, &alphabet)?;
                match position.get(&sub) {
                    Some(&i) => observed[i].tokens.push(token.to_string()),
                    None => {
                        position.insert(sub.clone(), observed.len());
                        observed.push(Observation {
                            sub,
                            tokens: vec![token.to_string()],
                        });
                    }
                }
            }
        }
        debug!(
            "Found {} distinct substitutions across the variants",
            observed.len()
        );

        let features = strategy.layout(&alphabet, observed)?;
        Ok(Self::from_features(alphabet, features))
    }

    fn from_features(alphabet: Alphabet, features: Vec<Feature<S>>) -> Self {
        let sites = features.iter().map(|f| f.site().clone()).collect();
        let mut lookup = AHashMap::with_capacity(features.len());
        let mut wildtype_indices = Vec::new();
        for (index, feature) in features.iter().enumerate() {
            match feature {
                Feature::Mutation(sub) => {
                    lookup.insert(sub.clone(), index);
                }
                Feature::Wildtype { .. } => wildtype_indices.push(index),
            }
        }
        debug!(
            "Registry holds {} features, {} of them wildtype states",
            features.len(),
            wildtype_indices.len()
        );
        Self {
            alphabet,
            features,
            sites,
            lookup,
            wildtype_indices,
        }
    }

    /// Length of the binary representation of each variant.
    pub fn binarylength(&self) -> usize {
        self.features.len()
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn site_kind(&self) -> SiteKind {
        S::KIND
    }

    /// The site of every feature, in index order.
    pub fn sites(&self) -> &[S] {
        &self.sites
    }

    pub fn features(&self) -> &[Feature<S>] {
        &self.features
    }

    /// One wildtype index per site in sequence order; empty unless expanded.
    pub fn wildtype_indices(&self) -> &[usize] {
        &self.wildtype_indices
    }

    pub fn feature(&self, index: usize) -> Result<&Feature<S>, LookupError> {
        self.features
            .get(index)
            .ok_or(LookupError::IndexOutOfRange {
                index,
                length: self.features.len(),
            })
    }

    pub fn index_of(&self, sub: &Substitution<S>) -> Result<usize, LookupError> {
        self.lookup
            .get(sub)
            .copied()
            .ok_or_else(|| LookupError::UnknownSubstitution(sub.to_string()))
    }

    /// Index in the binary representation of a substitution token.
    pub fn sub_to_i(&self, token: &str) -> Result<usize, BinaryMapError> {
        let sub = Substitution::<S>::parse(token, &self.alphabet)?;
        Ok(self.index_of(&sub)?)
    }

    /// Substitution token at `index`; the empty string for a wildtype index.
    pub fn i_to_sub(&self, index: usize) -> Result<String, LookupError> {
        Ok(match self.feature(index)? {
            Feature::Mutation(sub) => sub.to_string(),
            Feature::Wildtype { .. } => String::new(),
        })
    }

    /// Substitutions in index order, excluding wildtype states.
    pub fn all_subs(&self) -> Vec<String> {
        self.features
            .iter()
            .filter_map(Feature::substitution)
            .map(ToString::to_string)
            .collect()
    }
}
