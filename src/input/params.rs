//! Driver input document.
//!
//! JSON shape (element names follow the upstream `MakeMesonOps` document):
//! {
//!   "MakeMesonOps": {
//!     "Param": { "version": 1, "Layout": [4, 4, 4, 8], "Decay_dir": 3 },
//!     "InputFiles": {
//!       "CoeffFiles": ["ops.coeff"],
//!       "ElementalOpFiles": [
//!         { "Configs": [ { "DilutionTimeSlices": [
//!             { "CreationOperatorFile": "a_src.lime", "AnnihilationOperatorFile": "a_snk.lime" }
//!         ] } ] }
//!       ]
//!     },
//!     "OutputInfo": {
//!       "CfgOutputPaths": [ { "SourceOpOutputPath": "out/src/", "SinkOpOutputPath": "out/snk/" } ]
//!     }
//!   }
//! }
//!
//! `Param.CheckConsistency` (default true) and `Param.Parallel` (default false)
//! are optional.

use crate::Result;
use crate::error::MesonOpsError;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDocument {
    #[serde(rename = "MakeMesonOps")]
    pub make_meson_ops: MakeOpsInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MakeOpsInput {
    #[serde(rename = "Param")]
    pub param: Param,

    #[serde(rename = "InputFiles")]
    pub input_files: InputFiles,

    #[serde(rename = "OutputInfo")]
    pub output_info: OutputInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub version: u32,

    /// Lattice dimensions.
    #[serde(rename = "Layout")]
    pub layout: Vec<usize>,

    /// Time direction, an index into `layout`.
    #[serde(rename = "Decay_dir")]
    pub decay_dir: usize,

    #[serde(rename = "CheckConsistency", default = "default_true")]
    pub check_consistency: bool,

    #[serde(rename = "Parallel", default)]
    pub parallel: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFiles {
    /// Coefficient manifests of the group operators to build.
    #[serde(rename = "CoeffFiles")]
    pub coeff_files: Vec<String>,

    /// One manifest per available elemental operator.
    #[serde(rename = "ElementalOpFiles")]
    pub elem_op_files: Vec<ElementalOpFiles>,
}

/// Source and sink files of one elemental operator, per configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementalOpFiles {
    #[serde(rename = "Configs")]
    pub cfgs: Vec<ConfigFiles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFiles {
    /// Dilution timeslices live in separate files.
    #[serde(rename = "DilutionTimeSlices")]
    pub time_files: Vec<TimeFiles>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFiles {
    #[serde(rename = "CreationOperatorFile")]
    pub src_file: String,

    #[serde(rename = "AnnihilationOperatorFile")]
    pub snk_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputInfo {
    #[serde(rename = "CfgOutputPaths")]
    pub cfg_paths: Vec<OutputPaths>,
}

/// Output path prefixes for one configuration. File names are appended
/// verbatim, so a directory prefix needs its trailing separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPaths {
    #[serde(rename = "SourceOpOutputPath")]
    pub src_path: String,

    #[serde(rename = "SinkOpOutputPath")]
    pub snk_path: String,
}

impl ElementalOpFiles {
    pub fn num_cfgs(&self) -> usize {
        self.cfgs.len()
    }

    pub fn time_files(&self, cfg: usize, t0: usize) -> Option<&TimeFiles> {
        self.cfgs.get(cfg).and_then(|c| c.time_files.get(t0))
    }

    /// The file that identifies this operator: first config, first timeslice.
    pub fn first_src_file(&self) -> Option<&str> {
        self.time_files(0, 0).map(|tf| tf.src_file.as_str())
    }
}

/// Read and parse the driver input document.
pub fn load_input(path: &str) -> Result<InputDocument> {
    let text = fs::read_to_string(path).with_context(|| format!("read input file {}", path))?;
    let doc: InputDocument =
        serde_json::from_str(&text).with_context(|| format!("parse input file {}", path))?;
    Ok(doc)
}

impl MakeOpsInput {
    /// Structural checks that need no file access:
    /// - supported parameter version
    /// - decay direction inside the layout
    /// - every manifest has a first config and a first timeslice
    /// - one output path pair per configuration of the first manifest
    pub fn validate(&self) -> Result<()> {
        let param = &self.param;
        if param.version != 1 {
            bail!(MesonOpsError::UnsupportedVersion(param.version));
        }
        if param.layout.is_empty() {
            bail!(MesonOpsError::DataInconsistency(
                "Layout must list at least one lattice dimension".to_string()
            ));
        }
        if param.decay_dir >= param.layout.len() {
            bail!(MesonOpsError::DataInconsistency(format!(
                "Decay_dir {} is outside a {}-dimensional layout",
                param.decay_dir,
                param.layout.len()
            )));
        }

        let manifests = &self.input_files.elem_op_files;
        if manifests.is_empty() {
            bail!(MesonOpsError::DataInconsistency(
                "no elemental operator files given".to_string()
            ));
        }
        for (i, m) in manifests.iter().enumerate() {
            if m.first_src_file().is_none() {
                bail!(MesonOpsError::DataInconsistency(format!(
                    "elemental operator {} has no configurations or no dilution timeslices",
                    i
                )));
            }
        }

        let nbins = manifests[0].num_cfgs();
        if self.output_info.cfg_paths.len() != nbins {
            bail!(MesonOpsError::DataInconsistency(format!(
                "number of output config paths ({}) not equal to that of input ({})",
                self.output_info.cfg_paths.len(),
                nbins
            )));
        }

        // Output names are <prefix><op>_t<t0>_<side>; configs must not share a prefix.
        let mut src_seen = BTreeSet::new();
        let mut snk_seen = BTreeSet::new();
        for (cfg, paths) in self.output_info.cfg_paths.iter().enumerate() {
            if !src_seen.insert(paths.src_path.as_str()) {
                bail!(MesonOpsError::DataInconsistency(format!(
                    "source output path {:?} of cfg {} is used by an earlier config",
                    paths.src_path, cfg
                )));
            }
            if !snk_seen.insert(paths.snk_path.as_str()) {
                bail!(MesonOpsError::DataInconsistency(format!(
                    "sink output path {:?} of cfg {} is used by an earlier config",
                    paths.snk_path, cfg
                )));
            }
        }

        Ok(())
    }

    /// Number of lattice sites along the decay direction.
    pub fn time_extent(&self) -> usize {
        self.param
            .layout
            .get(self.param.decay_dir)
            .copied()
            .unwrap_or(0)
    }

    pub fn num_cfgs(&self) -> usize {
        self.input_files
            .elem_op_files
            .first()
            .map(ElementalOpFiles::num_cfgs)
            .unwrap_or(0)
    }

    pub fn num_timeslices(&self) -> usize {
        self.input_files
            .elem_op_files
            .first()
            .and_then(|m| m.cfgs.first())
            .map(|c| c.time_files.len())
            .unwrap_or(0)
    }
}
