#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod alphabet;
pub mod assemble;
pub mod codec;
pub mod config;
pub mod grammar;
pub mod matrix;
pub mod registry;
pub mod table;
pub mod types;

pub use alphabet::Alphabet;
pub use assemble::{Annotations, BinaryMap};
pub use config::{AlphabetChoice, AnyBinaryMap, BinaryMapConfig, ColumnConfig};
pub use matrix::BinaryMatrix;
pub use registry::{Feature, FullExpansion, Observation, ObservedOnly, Registry, RegistryStrategy};
pub use types::{
    BinaryMapError, LookupError, ParseError, Site, SiteKind, SiteLabel, Substitution,
    ValidationError,
};
