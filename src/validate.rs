//! Cross-file consistency checks over all elemental operator manifests.
//!
//! Every elemental file entering a group operator must come from the same
//! gauge configurations, the same propagators and the same dilution scheme,
//! and must carry the operator identity of its manifest. These checks open
//! many files; they can be switched off with `CheckConsistency: false`.

use crate::Result;
use crate::error::MesonOpsError;
use crate::input::ElementalOpFiles;
use crate::lime::{self, Side, section, section_text};

use anyhow::bail;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What the validator looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    pub operators: usize,
    pub configs: usize,
    pub timeslices: usize,
    pub files_checked: usize,
}

/// Headers of each file read so far, keyed by path.
#[derive(Default)]
struct HeaderCache {
    headers: BTreeMap<String, (Value, Value)>,
}

impl HeaderCache {
    fn get(&mut self, path: &str) -> Result<&(Value, Value)> {
        if !self.headers.contains_key(path) {
            let h = lime::read_headers(path)?;
            self.headers.insert(path.to_string(), h);
        }
        match self.headers.get(path) {
            Some(h) => Ok(h),
            None => bail!(MesonOpsError::NotFound(format!("headers of {}", path))),
        }
    }

    fn text(&mut self, path: &str, section_path: &str) -> Result<String> {
        let (file_header, _) = self.get(path)?;
        section_text(file_header, section_path)
    }

    fn record_decay_dir(&mut self, path: &str, side: Side) -> Result<Option<i64>> {
        let (_, record_header) = self.get(path)?;
        let rec = section(record_header, &format!("/{}", side.record_root()))?;
        Ok(rec.get("decay_dir").and_then(Value::as_i64))
    }
}

fn inconsistent(msg: String) -> anyhow::Error {
    MesonOpsError::DataInconsistency(msg).into()
}

/// Check all manifests against the first one.
///
/// Structural checks (config and timeslice counts) run before any file is
/// opened. Then, per operator / config / timeslice:
/// - configuration info agrees with the first operator on that config
/// - propagator (`QuarkSinks`) info of the sink file agrees with the first file
/// - source and sink dilution schemes (`QuarkSources`) agree with the first operator
/// - source and sink `Op_Info` agree with the operator's identifying file
/// - record header `decay_dir` equals `decay_dir`, when given
pub fn check_consistency(
    manifests: &[ElementalOpFiles],
    decay_dir: Option<usize>,
) -> Result<ValidationReport> {
    let first = match manifests.first() {
        Some(m) => m,
        None => bail!(inconsistent("no elemental operators to check".to_string())),
    };
    let nbins = first.num_cfgs();
    let nt = first.cfgs.first().map(|c| c.time_files.len()).unwrap_or(0);
    if nbins == 0 || nt == 0 {
        bail!(inconsistent(
            "first elemental operator has no configurations or no timeslices".to_string()
        ));
    }

    // Phase 1: counts, no file access.
    for (i, op) in manifests.iter().enumerate() {
        if op.num_cfgs() != nbins {
            bail!(inconsistent(format!(
                "inconsistent (with first op) number of configs: op {} has {}, expected {}",
                i,
                op.num_cfgs(),
                nbins
            )));
        }
        for (n, cfg) in op.cfgs.iter().enumerate() {
            if cfg.time_files.len() != nt {
                bail!(inconsistent(format!(
                    "inconsistent number of time dilution files: op {} cfg {} has {}, expected {}",
                    i,
                    n,
                    cfg.time_files.len(),
                    nt
                )));
            }
        }
    }

    // Phase 2: header metadata.
    let mut cache = HeaderCache::default();
    let file = |op: &ElementalOpFiles, n: usize, t0: usize, side: Side| -> String {
        let tf = &op.cfgs[n].time_files[t0];
        match side {
            Side::Source => tf.src_file.clone(),
            Side::Sink => tf.snk_file.clone(),
        }
    };

    let src_cfg_section = Side::Source.path("Config_info");
    let src_dil_section = Side::Source.path("QuarkSources");
    let prop_info = cache.text(
        &file(first, 0, 0, Side::Source),
        &Side::Source.path("QuarkSinks"),
    )?;

    for (i, op) in manifests.iter().enumerate() {
        let op_info = cache.text(&file(op, 0, 0, Side::Source), &Side::Source.path("Op_Info"))?;

        for n in 0..nbins {
            let cfg_info = cache.text(&file(first, n, 0, Side::Source), &src_cfg_section)?;
            let curr_cfg_info = cache.text(&file(op, n, 0, Side::Source), &src_cfg_section)?;
            if cfg_info != curr_cfg_info {
                bail!(inconsistent(format!(
                    "configs do not match for all ops: op {} cfg {}",
                    i, n
                )));
            }

            for t0 in 0..nt {
                let src = file(op, n, t0, Side::Source);
                let snk = file(op, n, t0, Side::Sink);

                let snk_prop = cache.text(&snk, &Side::Sink.path("QuarkSinks"))?;
                if snk_prop != prop_info {
                    bail!(inconsistent(format!(
                        "propagator parameters do not match: op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }

                if cache.text(&snk, &Side::Sink.path("Config_info"))? != cfg_info {
                    bail!(inconsistent(format!(
                        "sink cfg info is inconsistent: op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }
                if cache.text(&src, &src_cfg_section)? != cfg_info {
                    bail!(inconsistent(format!(
                        "source cfg info is inconsistent: op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }

                // Every timeslice must use the first operator's dilutions, on both sides.
                let first_dil = cache.text(&file(first, 0, t0, Side::Source), &src_dil_section)?;
                if cache.text(&snk, &Side::Sink.path("QuarkSources"))? != first_dil {
                    bail!(inconsistent(format!(
                        "dilution scheme does not match: snk op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }
                if cache.text(&src, &src_dil_section)? != first_dil {
                    bail!(inconsistent(format!(
                        "dilution scheme does not match: src op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }

                // All files of one manifest belong to the same operator.
                if cache.text(&src, &Side::Source.path("Op_Info"))? != op_info {
                    bail!(inconsistent(format!(
                        "src op not the same: op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }
                if cache.text(&snk, &Side::Sink.path("Op_Info"))? != op_info {
                    bail!(inconsistent(format!(
                        "snk op not the same: op {} cfg {} t0 {}",
                        i, n, t0
                    )));
                }

                if let Some(dir) = decay_dir {
                    for (side, path) in [(Side::Source, &src), (Side::Sink, &snk)] {
                        let found = cache.record_decay_dir(path, side)?;
                        if found != Some(dir as i64) {
                            bail!(inconsistent(format!(
                                "{} decay_dir {:?} differs from configured {}: op {} cfg {} t0 {}",
                                side.suffix(),
                                found,
                                dir,
                                i,
                                n,
                                t0
                            )));
                        }
                    }
                }
            }
        }
        debug!(op = i, "elemental operator consistent");
    }

    let report = ValidationReport {
        operators: manifests.len(),
        configs: nbins,
        timeslices: nt,
        files_checked: cache.headers.len(),
    };
    info!(
        ops = report.operators,
        cfgs = report.configs,
        t0s = report.timeslices,
        files = report.files_checked,
        "consistency checks passed"
    );
    Ok(report)
}
