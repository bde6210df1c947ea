//! Shared fixture: elemental operator files, coefficient manifests and
//! driver input documents inside a temporary directory.

#![allow(dead_code)]

use meson_ops::input::{
    ConfigFiles, ElementalOpFiles, InputDocument, OperatorKey, QuarkInfo, TimeFiles,
};
use meson_ops::lime::header::{ElementalParams, QuarkSource, QuarkSources, SourceTimeSlice};
use meson_ops::lime::{ElementalFileInfo, Side, write_elemental};
use meson_ops::operator::{Dilution, DilutionTable, MesonOperator, MomProjection, Seed, TimeSlice};
use num_complex::Complex64;
use serde_json::{Value, json};
use tempfile::TempDir;

pub const DECAY_DIR: usize = 3;
pub const LAYOUT: [usize; 4] = [2, 2, 2, 4];
pub const NT: usize = 4;

pub fn key(spin_l: i32, spin_r: i32) -> OperatorKey {
    OperatorKey::new(QuarkInfo::new(spin_l, 0), QuarkInfo::new(spin_r, 0))
}

pub fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Per-file knobs; defaults describe a consistent data set.
#[derive(Clone)]
pub struct ElemFile {
    pub key: OperatorKey,
    pub cfg: usize,
    /// Dilution timeslice index.
    pub t_index: usize,
    /// Absolute source time.
    pub t0: i32,
    pub value: Complex64,
    pub nt: usize,
    pub ni: usize,
    pub decay_dir: i32,
    pub config_info: Value,
    pub dilutions: Value,
    /// Propagator section.
    pub quark_sinks: Value,
}

impl ElemFile {
    pub fn new(key: OperatorKey, cfg: usize, t_index: usize, value: Complex64) -> Self {
        Self {
            key,
            cfg,
            t_index,
            t0: 2 * t_index as i32,
            value,
            nt: NT,
            ni: 1,
            decay_dir: DECAY_DIR as i32,
            config_info: json!({"cfg": 1000 + cfg}),
            dilutions: json!([{"t_source": 2 * t_index}]),
            quark_sinks: json!({"Prop": "prop.lime"}),
        }
    }

    fn operator(&self) -> MesonOperator {
        let cell = Dilution {
            mom_projs: vec![MomProjection {
                mom: vec![0, 0, 0],
                op: vec![self.value; self.nt],
            }],
        };
        MesonOperator {
            mom2_max: 0,
            decay_dir: self.decay_dir,
            seed_l: Seed([1, 2, 3, 4]),
            seed_r: Seed([5, 6, 7, 8]),
            dilution_l: json!({"DilutionType": "TIME"}),
            dilution_r: json!({"DilutionType": "TIME"}),
            quark_smearing: json!({"wvf_kind": "GAUSSIAN"}),
            link_smearing: json!({"LinkSmearingType": "NONE"}),
            time_slices: vec![TimeSlice {
                dilutions: DilutionTable::filled(self.ni, 1, cell),
                t0: self.t0,
            }],
            ..MesonOperator::named("elem")
        }
    }

    fn info(&self) -> ElementalFileInfo {
        let source = QuarkSource {
            time_slice: SourceTimeSlice {
                dilutions: self.dilutions.clone(),
            },
        };
        ElementalFileInfo {
            op_info: self.key,
            quark_sources: QuarkSources {
                quark_l: source.clone(),
                quark_r: source,
            },
            quark_sinks: self.quark_sinks.clone(),
            config_info: self.config_info.clone(),
            params: ElementalParams {
                link_smearing: json!({"LinkSmearingType": "NONE"}),
            },
        }
    }
}

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }

    /// Write one source and one sink file; the sink carries `sink_value`.
    pub fn write_pair(&self, src: &ElemFile, sink_value: Complex64) -> TimeFiles {
        let snk = ElemFile {
            value: sink_value,
            ..src.clone()
        };
        self.write_files(src, &snk)
    }

    /// Write a source and a sink file described independently. File names
    /// follow the source description.
    pub fn write_files(&self, src: &ElemFile, snk: &ElemFile) -> TimeFiles {
        let (l, r) = (src.key.l, src.key.r);
        let tag = format!(
            "elem_{}_{}_{}_{}_cfg{}_t{}",
            l.spin, l.displacement, r.spin, r.displacement, src.cfg, src.t_index
        );
        let src_file = self.path(&format!("{}_src.lime", tag));
        let snk_file = self.path(&format!("{}_snk.lime", tag));

        write_elemental(&src_file, Side::Source, &src.info(), &src.operator()).unwrap();
        write_elemental(&snk_file, Side::Sink, &snk.info(), &snk.operator()).unwrap();

        TimeFiles { src_file, snk_file }
    }

    /// A full manifest of consistent files for `key`.
    pub fn manifest(
        &self,
        key: OperatorKey,
        ncfg: usize,
        nt0: usize,
        src_value: Complex64,
        snk_value: Complex64,
    ) -> ElementalOpFiles {
        ElementalOpFiles {
            cfgs: (0..ncfg)
                .map(|cfg| ConfigFiles {
                    time_files: (0..nt0)
                        .map(|t| self.write_pair(&ElemFile::new(key, cfg, t, src_value), snk_value))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn write_coeff(&self, name: &str, text: &str) -> String {
        let path = self.path(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    /// Input document with one output path pair per config, prefixes inside the fixture.
    pub fn input(
        &self,
        coeff_files: Vec<String>,
        manifests: Vec<ElementalOpFiles>,
    ) -> InputDocument {
        let ncfg = manifests.first().map(|m| m.cfgs.len()).unwrap_or(0);
        let doc = json!({
            "MakeMesonOps": {
                "Param": { "version": 1, "Layout": LAYOUT, "Decay_dir": DECAY_DIR },
                "InputFiles": {
                    "CoeffFiles": coeff_files,
                    "ElementalOpFiles": manifests,
                },
                "OutputInfo": {
                    "CfgOutputPaths": (0..ncfg)
                        .map(|cfg| json!({
                            "SourceOpOutputPath": self.path(&format!("cfg{}_", cfg)),
                            "SinkOpOutputPath": self.path(&format!("cfg{}_", cfg)),
                        }))
                        .collect::<Vec<_>>(),
                }
            }
        });
        serde_json::from_value(doc).unwrap()
    }

    pub fn write_input(&self, doc: &InputDocument) -> String {
        let path = self.path("input.json");
        std::fs::write(&path, serde_json::to_string_pretty(doc).unwrap()).unwrap();
        path
    }
}

pub fn assert_close(a: Complex64, b: Complex64) {
    assert!((a - b).norm() < 1e-12, "{} != {}", a, b);
}
