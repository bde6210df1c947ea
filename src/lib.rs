//! Build group-theoretical meson operators from elemental meson operators.
//!
//! Pipeline:
//! - read the driver input document and the coefficient manifests (`input`)
//! - index elemental operator files by operator key (`registry`)
//! - optionally check cross-file provenance (`validate`)
//! - per configuration, group operator and dilution timeslice, combine the
//!   weighted elemental source and sink operators (`accumulate`, `driver`)
//! - write one source and one sink file per combination (`lime`)

pub mod accumulate;
pub mod driver;
pub mod error;
pub mod input;
pub mod lime;
pub mod operator;
pub mod registry;
pub mod report;
pub mod validate;

pub type Result<T> = anyhow::Result<T>;
