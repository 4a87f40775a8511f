//! # Substitution Grammar
//!
//! A substitution token is `<wt><site><mut>`: a wildtype character, a site, and a
//! mutant character, where both characters come from the map's alphabet and differ.
//! Numeric sites are `-?[0-9]+`; label sites are any non-empty text between the two
//! characters, which is what allows suffixed sites like `214a`. A variant is a
//! whitespace-delimited list of tokens with at most one token per site.

use crate::alphabet::Alphabet;
use crate::types::{BinaryMapError, ParseError, Site, Substitution, ValidationError};
use ahash::AHashSet;

impl<S: Site> Substitution<S> {
    /// Parses a single token against `alphabet`.
    pub fn parse(token: &str, alphabet: &Alphabet) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidForAlphabet {
            token: token.to_string(),
            alphabet: alphabet.to_string(),
        };

        let mut chars = token.chars();
        let (Some(wildtype), Some(mutant)) = (chars.next(), chars.next_back()) else {
            return Err(invalid());
        };
        if !alphabet.contains(wildtype) || !alphabet.contains(mutant) {
            return Err(invalid());
        }
        let site = S::parse_site(chars.as_str()).ok_or_else(invalid)?;

        if wildtype == mutant {
            return Err(ParseError::Synonymous(token.to_string()));
        }
        Ok(Self {
            wildtype,
            site,
            mutant,
        })
    }
}

/// Parses every token of a variant string, in the order written.
///
/// Fails if any token is malformed or if two tokens name the same site.
pub fn parse_variant<S: Site>(
    sub_str: &str,
    alphabet: &Alphabet,
) -> Result<Vec<Substitution<S>>, BinaryMapError> {
    let mut seen = AHashSet::new();
    let mut subs = Vec::new();
    for token in sub_str.split_whitespace() {
        let sub = Substitution::<S>::parse(token, alphabet)?;
        if !seen.insert(sub.site.clone()) {
            return Err(ValidationError::DuplicateSite {
                site: sub.site.to_string(),
                variant: sub_str.to_string(),
            }
            .into());
        }
        subs.push(sub);
    }
    Ok(subs)
}
