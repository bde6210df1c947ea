//! Header documents of elemental and group operator files.

use crate::input::OperatorKey;
use crate::operator::{MesonOperator, Seed};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which half of an operator pair a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Creation operator, written at the source time.
    Source,
    /// Annihilation operator.
    Sink,
}

impl Side {
    /// Root of an elemental file header.
    pub fn file_root(self) -> &'static str {
        match self {
            Side::Source => "SourceMesonOperator",
            Side::Sink => "SinkMesonOperator",
        }
    }

    /// Root of an elemental record header.
    pub fn record_root(self) -> &'static str {
        match self {
            Side::Source => "MesonCreationOperator",
            Side::Sink => "MesonAnnihilationOperator",
        }
    }

    pub fn group_file_root(self) -> &'static str {
        match self {
            Side::Source => "SourceGroupMesonOperator",
            Side::Sink => "SinkGroupMesonOperator",
        }
    }

    pub fn group_record_root(self) -> &'static str {
        match self {
            Side::Source => "CreationOperator",
            Side::Sink => "AnnihilationOperator",
        }
    }

    /// Suffix used in output file names.
    pub fn suffix(self) -> &'static str {
        match self {
            Side::Source => "src",
            Side::Sink => "snk",
        }
    }

    /// Section path below the elemental file root.
    pub fn path(self, rest: &str) -> String {
        format!("/{}/{}", self.file_root(), rest.trim_start_matches('/'))
    }
}

/// Body of an elemental file header (below `SourceMesonOperator` or
/// `SinkMesonOperator`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementalFileInfo {
    #[serde(rename = "Op_Info")]
    pub op_info: OperatorKey,

    #[serde(rename = "QuarkSources")]
    pub quark_sources: QuarkSources,

    /// Propagator parameters.
    #[serde(rename = "QuarkSinks", default)]
    pub quark_sinks: Value,

    #[serde(rename = "Config_info")]
    pub config_info: Value,

    #[serde(rename = "Params", default)]
    pub params: ElementalParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarkSources {
    #[serde(rename = "Quark_l")]
    pub quark_l: QuarkSource,
    #[serde(rename = "Quark_r")]
    pub quark_r: QuarkSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarkSource {
    #[serde(rename = "TimeSlice")]
    pub time_slice: SourceTimeSlice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTimeSlice {
    #[serde(rename = "Dilutions")]
    pub dilutions: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementalParams {
    #[serde(rename = "LinkSmearing", default)]
    pub link_smearing: Value,
}

/// Record header of an elemental file (`MesonCreationOperator` /
/// `MesonAnnihilationOperator`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementalRecordInfo {
    pub version: u32,
    pub id: String,
    pub mom2_max: i32,
    pub decay_dir: i32,
    pub seed_l: Seed,
    pub seed_r: Seed,
    pub dilution_l: Value,
    pub dilution_r: Value,
    #[serde(rename = "QuarkSmearing", default)]
    pub quark_smearing: Value,
}

/// Wrapper for the quark source provenance text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesText {
    #[serde(rename = "TimeSlices")]
    pub time_slices: String,
}

/// Full header of a group operator, written under `OpInfo` of the record
/// header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecordInfo {
    pub id: String,
    pub mom2_max: i32,
    pub decay_dir: i32,
    pub seed_l: Seed,
    pub seed_r: Seed,
    pub dilution_l: Value,
    pub dilution_r: Value,
    #[serde(rename = "QuarkSources_l")]
    pub quark_sources_l: SourcesText,
    #[serde(rename = "QuarkSources_r")]
    pub quark_sources_r: SourcesText,
    #[serde(rename = "LinkSmearing")]
    pub link_smearing: Value,
    #[serde(rename = "QuarkSmearing")]
    pub quark_smearing: Value,
}

impl From<&MesonOperator> for GroupRecordInfo {
    fn from(op: &MesonOperator) -> Self {
        GroupRecordInfo {
            id: op.id.clone(),
            mom2_max: op.mom2_max,
            decay_dir: op.decay_dir,
            seed_l: op.seed_l,
            seed_r: op.seed_r,
            dilution_l: op.dilution_l.clone(),
            dilution_r: op.dilution_r.clone(),
            quark_sources_l: SourcesText {
                time_slices: op.quark_sources_l.clone(),
            },
            quark_sources_r: SourcesText {
                time_slices: op.quark_sources_r.clone(),
            },
            link_smearing: op.link_smearing.clone(),
            quark_smearing: op.quark_smearing.clone(),
        }
    }
}
