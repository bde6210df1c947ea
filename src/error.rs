//! Typed failure kinds for the operator combination pipeline.
//!
//! Library code returns `anyhow::Result` and wraps these variants, so the
//! binary can downcast at its single error boundary and pick an exit code.

use crate::input::OperatorKey;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MesonOpsError {
    /// A key, configuration or timeslice index that the registry cannot resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// Two elemental manifests resolved to the same operator key.
    #[error(
        "multiple copies of the same elemental operator in input: {key} \
         (manifest {index}, first seen at manifest {first})"
    )]
    DuplicateKey {
        key: OperatorKey,
        index: usize,
        first: usize,
    },

    /// Output file names are derived from operator names, so they must be unique.
    #[error("group operator name '{0}' appears more than once in the coefficient files")]
    DuplicateOperatorName(String),

    /// Metadata that must agree across files does not.
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    /// Accumulator and operand shapes are not congruent.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An elemental file that is readable but structurally invalid.
    #[error("malformed elemental operator file {path}: {reason}")]
    MalformedElemental { path: String, reason: String },

    #[error("input parameter version {0} unsupported")]
    UnsupportedVersion(u32),

    /// Coefficient manifest syntax error.
    #[error("coefficient manifest {path}:{line}: {reason}")]
    ManifestParse {
        path: String,
        line: usize,
        reason: String,
    },
}

/// Process exit codes used by `make-meson-ops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CliExitCode {
    Success = 0,
    /// I/O failures and anything not classified below.
    Failure = 1,
    /// The input data or configuration is invalid; the batch is unusable.
    InvalidInput = 2,
}

impl From<CliExitCode> for ExitCode {
    fn from(code: CliExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&MesonOpsError> for CliExitCode {
    fn from(err: &MesonOpsError) -> Self {
        match err {
            MesonOpsError::NotFound(_)
            | MesonOpsError::DuplicateKey { .. }
            | MesonOpsError::DuplicateOperatorName(_)
            | MesonOpsError::DataInconsistency(_)
            | MesonOpsError::ShapeMismatch(_)
            | MesonOpsError::MalformedElemental { .. }
            | MesonOpsError::UnsupportedVersion(_)
            | MesonOpsError::ManifestParse { .. } => CliExitCode::InvalidInput,
        }
    }
}

/// Map any error from the pipeline to an exit code.
///
/// Context layers added with `.with_context` are looked through.
pub fn exit_code_for_error(err: &anyhow::Error) -> CliExitCode {
    match err.downcast_ref::<MesonOpsError>() {
        Some(kind) => CliExitCode::from(kind),
        None => CliExitCode::Failure,
    }
}

/// Returns the typed kind of an error, if it carries one.
pub fn kind_of(err: &anyhow::Error) -> Option<&MesonOpsError> {
    err.downcast_ref::<MesonOpsError>()
}
