// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used
// in one file.

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Which kind of site identifier a map was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// Plain integer positions, possibly negative.
    Numeric,
    /// Opaque labels such as `214a`, for numbering aligned to a reference.
    Label,
}

/// A sequence position identifier.
///
/// A registry is generic over exactly one implementor, so a single map can never
/// mix integer sites with string labels. Only `i64` sites can be expanded over a
/// wildtype sequence, which is enforced by the registry strategies rather than
/// checked at runtime.
pub trait Site: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    const KIND: SiteKind;

    /// Parses the text between the wildtype and mutant characters of a token.
    fn parse_site(text: &str) -> Option<Self>;

    /// Ascending order used to lay sites out in the binary representation.
    fn natural_cmp(&self, other: &Self) -> Ordering;
}

impl Site for i64 {
    const KIND: SiteKind = SiteKind::Numeric;

    fn parse_site(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('-').unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse().ok()
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// A free-form site label, e.g. `"3a"` for an insertion numbered against a reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteLabel(String);

impl SiteLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits off a leading signed integer, if the label starts with one.
    fn signed_prefix(&self) -> Option<(i64, &str)> {
        let text = self.0.as_str();
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let split = text.len() - unsigned.len() + digits;
        let value = text[..split].parse().ok()?;
        Some((value, &text[split..]))
    }
}

impl fmt::Display for SiteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Site for SiteLabel {
    const KIND: SiteKind = SiteKind::Label;

    fn parse_site(text: &str) -> Option<Self> {
        if text.is_empty() {
            None
        } else {
            Some(Self::new(text))
        }
    }

    fn natural_cmp(&self, other: &Self) -> Ordering {
        // Leading numbers compare as signed integers so "-2" sorts before "-1",
        // then the remainder falls back to natural ordering ("10a" < "10b").
        // Labels that are naturally equal ("01", "1") are ordered by their bytes.
        let natural = match (self.signed_prefix(), other.signed_prefix()) {
            (Some((a, rest_a)), Some((b, rest_b))) => {
                a.cmp(&b).then_with(|| natord::compare(rest_a, rest_b))
            }
            _ => natord::compare(&self.0, &other.0),
        };
        natural.then_with(|| self.0.cmp(&other.0))
    }
}

/// A single positional change, serialized as `{wildtype}{site}{mutant}`.
///
/// The wildtype and mutant characters always differ; parsing rejects tokens
/// where they are the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Substitution<S> {
    pub wildtype: char,
    pub site: S,
    pub mutant: char,
}

impl<S: fmt::Display> fmt::Display for Substitution<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.wildtype, self.site, self.mutant)
    }
}

// ========================================================================================
//                                     Error Kinds
// ========================================================================================

/// A substitution token that does not follow the `<wt><site><mut>` grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("substitution {token} is invalid for alphabet {alphabet}")]
    InvalidForAlphabet { token: String, alphabet: String },

    #[error("wildtype and mutant identity the same in {0}")]
    Synonymous(String),
}

/// Input that parses but violates an invariant of the map or of its inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid alphabet character: {0:?}")]
    InvalidAlphabetCharacter(char),

    #[error("alphabet character {0:?} appears more than once")]
    DuplicateAlphabetCharacter(char),

    #[error("alphabet must contain at least one character")]
    EmptyAlphabet,

    #[error("different wildtypes at site {site}: {first} versus {second}")]
    ConflictingWildtype {
        site: String,
        first: char,
        second: char,
    },

    #[error("multiple substitutions at site {site} in {variant:?}")]
    DuplicateSite { site: String, variant: String },

    #[error("substitutions not in `allowed_subs`: [{}]", .0.join(", "))]
    NotInAllowedSet(Vec<String>),

    #[error("cannot use both `{0}` and `{1}`")]
    IncompatibleOptions(&'static str, &'static str),

    #[error("`wtseq` is required when `expand` is set")]
    MissingWildtypeSequence,

    #[error("`wtseq` should only be given when `expand` is set")]
    UnexpectedWildtypeSequence,

    #[error("`wtseq` has characters not in alphabet: {0:?}")]
    WildtypeOutsideAlphabet(Vec<char>),

    #[error("site {0} is below 1; expanded site numbers must start at 1")]
    SiteBelowOne(i64),

    #[error("`wtseq` of length {length} is not long enough for site {site}")]
    SiteBeyondSequence { site: i64, length: usize },

    #[error("`wtseq` has {expected} at site {site} but the variants have wildtype {found}")]
    WildtypeMismatch {
        site: i64,
        expected: char,
        found: char,
    },

    #[error("binary vector has length {found}, expected {expected}")]
    BinaryLength { expected: usize, found: usize },

    #[error("binary vector has value {value} at index {index}; entries must be 0 or 1")]
    NonBinaryValue { index: usize, value: i8 },

    #[error("binary vector specifies multiple states at site {site}: indices {first} and {second}")]
    AmbiguousSite {
        site: String,
        first: usize,
        second: usize,
    },

    #[error("coordinate lists differ in length: {rows} rows, {cols} columns")]
    CoordinateLength { rows: usize, cols: usize },

    #[error("coordinate ({row}, {col}) is outside a {shape:?} matrix")]
    CoordinateOutOfBounds {
        row: usize,
        col: usize,
        shape: (usize, usize),
    },

    #[error("the same coordinate was given more than once")]
    DuplicateCoordinate,

    #[error("could not build sparse matrix: {0}")]
    SparseConstruction(String),

    #[error("input lacks column {0}")]
    MissingColumn(String),

    #[error("{column} not of type {expected}")]
    ColumnWrongType {
        column: String,
        expected: &'static str,
    },

    #[error("some entries in {0} are NaN")]
    ColumnHasNaN(String),

    #[error("some entries in {column} < {minimum}")]
    ColumnBelowMinimum { column: String, minimum: f64 },

    #[error("{column} has {found} entries but there are {expected} variants")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// A request for a substitution or index that the frozen registry does not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("sub of {0} is not in the binary map")]
    UnknownSubstitution(String),

    #[error("invalid index {index}; must be < {length}")]
    IndexOutOfRange { index: usize, length: usize },
}

/// The umbrella error type returned by map construction, encoding and decoding.
#[derive(Error, Debug)]
pub enum BinaryMapError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Error from the underlying Polars DataFrame library: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
