use crate::types::ValidationError;
use itertools::Itertools;
use std::fmt;

/// Amino-acid one-letter codes alphabetized, doesn't include stop.
pub const AAS_NOSTOP: [char; 20] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y',
];

/// Amino-acid one-letter codes alphabetized plus stop as `*`.
pub const AAS_WITHSTOP: [char; 21] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', '*',
];

/// Amino-acid one-letter codes alphabetized plus gap as `-`.
pub const AAS_WITHGAP: [char; 21] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', '-',
];

/// Amino-acid one-letter codes plus stop as `*` and gap as `-`.
pub const AAS_WITHSTOP_WITHGAP: [char; 22] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y', '*', '-',
];

/// The ordered set of characters a wildtype or mutant identity may take.
///
/// Order matters: mutants at a site are laid out in alphabet order, and in
/// expansion mode every site gets one feature per character in this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Builds an alphabet, rejecting characters other than letters, `*` and `-`.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Result<Self, ValidationError> {
        let chars: Vec<char> = chars.into_iter().collect();
        if chars.is_empty() {
            return Err(ValidationError::EmptyAlphabet);
        }
        for (i, &c) in chars.iter().enumerate() {
            if !(c.is_alphabetic() || c == '*' || c == '-') {
                return Err(ValidationError::InvalidAlphabetCharacter(c));
            }
            if chars[..i].contains(&c) {
                return Err(ValidationError::DuplicateAlphabetCharacter(c));
            }
        }
        Ok(Self { chars })
    }

    pub fn amino_acids() -> Self {
        Self {
            chars: AAS_NOSTOP.to_vec(),
        }
    }

    pub fn amino_acids_with_stop() -> Self {
        Self {
            chars: AAS_WITHSTOP.to_vec(),
        }
    }

    pub fn amino_acids_with_gap() -> Self {
        Self {
            chars: AAS_WITHGAP.to_vec(),
        }
    }

    pub fn amino_acids_with_stop_and_gap() -> Self {
        Self {
            chars: AAS_WITHSTOP_WITHGAP.to_vec(),
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    /// Position of `c` in the alphabet, used as the tie-break among mutants at a site.
    pub fn rank(&self, c: char) -> Option<usize> {
        self.chars.iter().position(|&x| x == c)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::amino_acids_with_stop()
    }
}

impl fmt::Display for Alphabet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.chars.iter().map(|c| format!("'{c}'")).join(", "))
    }
}
