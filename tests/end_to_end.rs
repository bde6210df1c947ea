mod common;

use common::{Fixture, NT, assert_close, c, key};
use meson_ops::driver::{self, RunOptions};
use meson_ops::error::{MesonOpsError, kind_of};
use meson_ops::lime::{self, Side};
use meson_ops::report;
use pretty_assertions::assert_eq;

const PION: &str = "1\n2 pion\n1 1 0 0 (2.0,0.0)\n2 1 0 0 (-1.0,0.0)\n";

fn opts(parallel: bool) -> RunOptions {
    RunOptions {
        check_consistency: true,
        parallel,
    }
}

#[test]
fn weighted_sum_written_per_config_and_timeslice() {
    let fx = Fixture::new();
    // Source: 2*1 - 1 = 1. Sink: 2*i - i = i.
    let m1 = fx.manifest(key(1, 1), 2, 2, c(1.0, 0.0), c(0.0, 1.0));
    let m2 = fx.manifest(key(2, 1), 2, 2, c(1.0, 0.0), c(0.0, 1.0));
    let coeff = fx.write_coeff("pion.coeff", PION);
    let doc = fx.input(vec![coeff], vec![m1, m2]);

    let summary = driver::run(&doc.make_meson_ops, opts(false)).unwrap();
    assert_eq!(summary.operators.len(), 1);
    assert_eq!(summary.outputs.len(), 4);
    assert_eq!(summary.validation.map(|v| v.operators), Some(2));

    let names: Vec<(usize, i32, String)> = summary
        .outputs
        .iter()
        .map(|o| (o.cfg, o.t0, o.source.clone()))
        .collect();
    assert_eq!(
        names,
        vec![
            (0, 0, fx.path("cfg0_pion_t0_src.lime")),
            (0, 2, fx.path("cfg0_pion_t2_src.lime")),
            (1, 0, fx.path("cfg1_pion_t0_src.lime")),
            (1, 2, fx.path("cfg1_pion_t2_src.lime")),
        ]
    );

    let src = lime::read_group(&fx.path("cfg1_pion_t2_src.lime")).unwrap();
    assert_eq!(src.side, Side::Source);
    assert_eq!(src.operator.id, "pion");
    assert_eq!(src.operator.t0(), Some(2));
    assert_eq!(src.operator.config_info, r#"{"cfg":1001}"#);
    let proj = &src.operator.time_slices[0].dilutions.cells()[0].mom_projs[0];
    assert_eq!(proj.mom, vec![0, 0, 0]);
    assert_eq!(proj.op.len(), NT);
    for v in &proj.op {
        assert_close(*v, c(1.0, 0.0));
    }

    let snk = lime::read_group(&fx.path("cfg0_pion_t0_snk.lime")).unwrap();
    assert_eq!(snk.side, Side::Sink);
    for v in &snk.operator.time_slices[0].dilutions.cells()[0].mom_projs[0].op {
        assert_close(*v, c(0.0, 1.0));
    }
    assert_eq!(snk.definition["Terms"].as_array().map(Vec::len), Some(2));
}

#[test]
fn parallel_run_matches_sequential() {
    let fx = Fixture::new();
    let m1 = fx.manifest(key(1, 1), 3, 1, c(0.5, 0.5), c(1.0, 0.0));
    let m2 = fx.manifest(key(2, 1), 3, 1, c(0.0, 1.0), c(1.0, 0.0));
    let coeff = fx.write_coeff("pion.coeff", PION);
    let doc = fx.input(vec![coeff], vec![m1, m2]);

    let seq = driver::run(&doc.make_meson_ops, opts(false)).unwrap();
    let par = driver::run(&doc.make_meson_ops, opts(true)).unwrap();
    assert_eq!(seq.outputs, par.outputs);

    // 2*(0.5+0.5i) - i = 1
    let g = lime::read_group(&fx.path("cfg2_pion_t0_src.lime")).unwrap();
    let proj = &g.operator.time_slices[0].dilutions.cells()[0].mom_projs[0];
    assert_close(proj.op[3], c(1.0, 0.0));
}

#[test]
fn several_coeff_files_are_concatenated() {
    let fx = Fixture::new();
    let m1 = fx.manifest(key(1, 1), 1, 1, c(1.0, 0.0), c(1.0, 0.0));
    let m2 = fx.manifest(key(2, 1), 1, 1, c(3.0, 0.0), c(3.0, 0.0));
    let a = fx.write_coeff("a.coeff", PION);
    let b = fx.write_coeff("b.coeff", "1\n1 rho\n2 1 0 0 (0.0,1.0)\n");
    let doc = fx.input(vec![a, b], vec![m1, m2]);

    let summary = driver::run(&doc.make_meson_ops, opts(false)).unwrap();
    let names: Vec<&str> = summary.operators.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["pion", "rho"]);

    let rho = lime::read_group(&fx.path("cfg0_rho_t0_src.lime")).unwrap();
    let proj = &rho.operator.time_slices[0].dilutions.cells()[0].mom_projs[0];
    assert_close(proj.op[0], c(0.0, 3.0));
}

#[test]
fn missing_elemental_operator_fails_the_run() {
    let fx = Fixture::new();
    let m1 = fx.manifest(key(1, 1), 1, 1, c(1.0, 0.0), c(1.0, 0.0));
    let coeff = fx.write_coeff("pion.coeff", PION);
    let doc = fx.input(vec![coeff], vec![m1]);

    let err = driver::run(&doc.make_meson_ops, opts(false)).unwrap_err();
    assert!(matches!(kind_of(&err), Some(MesonOpsError::NotFound(_))));
}

#[test]
fn sequence_length_must_match_time_extent() {
    let fx = Fixture::new();
    let mut elem = common::ElemFile::new(key(1, 1), 0, 0, c(1.0, 0.0));
    elem.nt = NT + 1;
    let files = fx.write_pair(&elem, c(1.0, 0.0));
    let manifest = meson_ops::input::ElementalOpFiles {
        cfgs: vec![meson_ops::input::ConfigFiles {
            time_files: vec![files],
        }],
    };
    let coeff = fx.write_coeff("one.coeff", "1\n1 single\n1 1 0 0 (1.0,0.0)\n");
    let doc = fx.input(vec![coeff], vec![manifest]);

    let err = driver::run(&doc.make_meson_ops, opts(false)).unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(MesonOpsError::DataInconsistency(_))
    ));
    assert!(err.to_string().contains("lattice time extent 4"));
}

#[test]
fn output_document_lists_written_files() {
    let fx = Fixture::new();
    let m1 = fx.manifest(key(1, 1), 1, 1, c(1.0, 0.0), c(1.0, 0.0));
    let m2 = fx.manifest(key(2, 1), 1, 1, c(1.0, 0.0), c(1.0, 0.0));
    let coeff = fx.write_coeff("pion.coeff", PION);
    let doc = fx.input(vec![coeff], vec![m1, m2]);
    let input_path = fx.write_input(&doc);

    let loaded = meson_ops::input::load_input(&input_path).unwrap();
    let summary = driver::run(&loaded.make_meson_ops, opts(false)).unwrap();
    let out = fx.path("out.json");
    report::write_output_document(&out, &loaded, &summary).unwrap();

    let text = std::fs::read_to_string(&out).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    let body = &v["MakeMesonOps"];
    assert_eq!(body["GroupMesonOperators"][0]["Name"], "pion");
    assert_eq!(body["Outputs"][0]["sink"], fx.path("cfg0_pion_t0_snk.lime").as_str());
    assert_eq!(body["Validation"]["files_checked"], 4);
}

#[test]
fn repeated_t0_is_rejected_instead_of_overwritten() {
    let fx = Fixture::new();
    let first = common::ElemFile::new(key(1, 1), 0, 0, c(1.0, 0.0));
    let mut second = common::ElemFile::new(key(1, 1), 0, 1, c(7.0, 0.0));
    second.t0 = first.t0;
    let manifest = meson_ops::input::ElementalOpFiles {
        cfgs: vec![meson_ops::input::ConfigFiles {
            time_files: vec![
                fx.write_pair(&first, c(1.0, 0.0)),
                fx.write_pair(&second, c(7.0, 0.0)),
            ],
        }],
    };
    let coeff = fx.write_coeff("one.coeff", "1\n1 single\n1 1 0 0 (1.0,0.0)\n");
    let doc = fx.input(vec![coeff], vec![manifest]);

    let err = driver::run(&doc.make_meson_ops, opts(false)).unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(MesonOpsError::DataInconsistency(_))
    ));
    assert!(err.to_string().contains("cfg0_single_t0_src.lime produced twice"));

    // The result of the first timeslice is still on disk.
    let kept = lime::read_group(&fx.path("cfg0_single_t0_src.lime")).unwrap();
    let proj = &kept.operator.time_slices[0].dilutions.cells()[0].mom_projs[0];
    assert_close(proj.op[0], c(1.0, 0.0));
}

#[test]
fn configs_sharing_an_output_prefix_are_rejected() {
    let fx = Fixture::new();
    let m1 = fx.manifest(key(1, 1), 3, 1, c(1.0, 0.0), c(1.0, 0.0));
    let coeff = fx.write_coeff("one.coeff", "1\n1 single\n1 1 0 0 (1.0,0.0)\n");
    let mut doc = fx.input(vec![coeff], vec![m1]);
    let shared = doc.make_meson_ops.output_info.cfg_paths[0].clone();
    for paths in doc.make_meson_ops.output_info.cfg_paths.iter_mut() {
        *paths = shared.clone();
    }

    let err = driver::run(&doc.make_meson_ops, opts(true)).unwrap_err();
    assert!(matches!(
        kind_of(&err),
        Some(MesonOpsError::DataInconsistency(_))
    ));
    assert!(err.to_string().contains("of cfg 1 is used by an earlier config"));
    assert!(!std::path::Path::new(&fx.path("cfg0_single_t0_src.lime")).exists());
}
