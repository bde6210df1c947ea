//! Meson operator records, elemental and group alike.
//!
//! Nesting: operator -> time slices -> Ni x Nj dilution table -> momentum
//! projections -> one complex value per global time coordinate.

pub mod table;

pub use table::DilutionTable;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Momentum projected operator: a D-1 momentum and one value per time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomProjection {
    pub mom: Vec<i32>,
    pub op: Vec<Complex64>,
}

/// One dilution cell: a projection per enumerated momentum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dilution {
    pub mom_projs: Vec<MomProjection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlice {
    pub dilutions: DilutionTable,
    /// Actual time corresponding to the dilution timeslice.
    pub t0: i32,
}

/// Random-number seed identifying a quark source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(pub [u32; 4]);

/// A meson operator with its provenance header.
///
/// Descriptor fields (`dilution_*`, `*_smearing`) are opaque documents that
/// are carried through unchanged. `quark_sources_*` and `config_info` hold
/// the compact text of the header sections they were read from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MesonOperator {
    /// Tag used by analysis codes.
    pub id: String,
    /// Maximum |p|^2 of the momentum projections.
    pub mom2_max: i32,
    pub decay_dir: i32,
    pub seed_l: Seed,
    pub seed_r: Seed,
    pub dilution_l: Value,
    pub dilution_r: Value,
    pub quark_smearing: Value,
    pub link_smearing: Value,
    pub quark_sources_l: String,
    pub quark_sources_r: String,
    pub config_info: String,
    pub time_slices: Vec<TimeSlice>,
}

/// Binary payload, written field by field in this order.
#[derive(Debug, Serialize)]
pub struct PayloadRef<'a> {
    pub seed_l: &'a Seed,
    pub seed_r: &'a Seed,
    pub mom2_max: i32,
    pub decay_dir: i32,
    pub time_slices: &'a [TimeSlice],
}

/// Owned counterpart of [`PayloadRef`] for decoding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Payload {
    pub seed_l: Seed,
    pub seed_r: Seed,
    pub mom2_max: i32,
    pub decay_dir: i32,
    pub time_slices: Vec<TimeSlice>,
}

impl MesonOperator {
    /// An unshaped operator carrying only its id.
    pub fn named(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn payload(&self) -> PayloadRef<'_> {
        PayloadRef {
            seed_l: &self.seed_l,
            seed_r: &self.seed_r,
            mom2_max: self.mom2_max,
            decay_dir: self.decay_dir,
            time_slices: &self.time_slices,
        }
    }

    /// t0 of the first time slice. Elemental and group operators hold one.
    pub fn t0(&self) -> Option<i32> {
        self.time_slices.first().map(|ts| ts.t0)
    }

    /// Every momentum projection, in slice / row-major cell / momentum order.
    pub fn projections(&self) -> impl Iterator<Item = &MomProjection> {
        self.time_slices
            .iter()
            .flat_map(|ts| ts.dilutions.cells().iter())
            .flat_map(|d| d.mom_projs.iter())
    }

    /// Distinct time-sequence lengths found in the operator, sorted.
    pub fn sequence_lengths(&self) -> Vec<usize> {
        let mut lens: Vec<usize> = self.projections().map(|p| p.op.len()).collect();
        lens.sort_unstable();
        lens.dedup();
        lens
    }
}
