//! Input layer: document schemas and validated in-memory structures.
//!
//! This module is separate from file-format handling and accumulation.
//! It owns:
//! - OperatorKey (elemental operator identity)
//! - the driver input document
//! - coefficient manifests (group operator definitions)

pub mod coeff;
pub mod key;
pub mod params;

pub use coeff::{GroupMesonOperator, Term, read_coeff_files};
pub use key::{OperatorKey, QuarkInfo, TwoQuarkOp};
pub use params::{
    ConfigFiles, ElementalOpFiles, InputDocument, MakeOpsInput, OutputPaths, TimeFiles,
    load_input,
};
