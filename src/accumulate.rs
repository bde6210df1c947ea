//! Weighted accumulation of elemental operators into a group operator.
//!
//! The accumulator takes its shape (time slices, dilution table, momenta,
//! sequence length) from the first operand. Every later operand must match
//! that shape exactly; a mismatch is reported before anything is added.

use crate::Result;
use crate::error::MesonOpsError;
use crate::input::Term;
use crate::operator::{Dilution, DilutionTable, MesonOperator, MomProjection, TimeSlice};

use anyhow::{Context, bail};
use num_complex::Complex64;

/// Copy header metadata from `first` into `out` and give `out` the shape of
/// `first` with every value zero. Call once per output operator.
pub fn init_shape(out: &mut MesonOperator, first: &MesonOperator) {
    out.mom2_max = first.mom2_max;
    out.decay_dir = first.decay_dir;
    out.seed_l = first.seed_l;
    out.seed_r = first.seed_r;
    out.dilution_l = first.dilution_l.clone();
    out.dilution_r = first.dilution_r.clone();
    out.config_info = first.config_info.clone();
    out.quark_sources_l = first.quark_sources_l.clone();
    out.quark_sources_r = first.quark_sources_r.clone();
    out.quark_smearing = first.quark_smearing.clone();
    out.link_smearing = first.link_smearing.clone();

    out.time_slices = first
        .time_slices
        .iter()
        .map(|ts| TimeSlice {
            t0: ts.t0,
            dilutions: zeroed_table(&ts.dilutions),
        })
        .collect();
}

fn zeroed_table(src: &DilutionTable) -> DilutionTable {
    let mut table = DilutionTable::filled(src.ni(), src.nj(), Dilution { mom_projs: Vec::new() });
    for (dst, cell) in table.cells_mut().iter_mut().zip(src.cells()) {
        dst.mom_projs = cell
            .mom_projs
            .iter()
            .map(|p| MomProjection {
                mom: p.mom.clone(),
                op: vec![Complex64::new(0.0, 0.0); p.op.len()],
            })
            .collect();
    }
    table
}

/// Check that `operand` has exactly the shape of the accumulator `out`.
pub fn check_congruent(out: &MesonOperator, operand: &MesonOperator) -> Result<()> {
    if out.time_slices.len() != operand.time_slices.len() {
        bail!(MesonOpsError::ShapeMismatch(format!(
            "accumulator has {} time slices, operand has {}",
            out.time_slices.len(),
            operand.time_slices.len()
        )));
    }

    for (s, (acc, opd)) in out.time_slices.iter().zip(&operand.time_slices).enumerate() {
        if acc.t0 != opd.t0 {
            bail!(MesonOpsError::ShapeMismatch(format!(
                "time slice {}: accumulator t0 = {}, operand t0 = {}",
                s, acc.t0, opd.t0
            )));
        }
        let (a, o) = (&acc.dilutions, &opd.dilutions);
        if a.ni() != o.ni() || a.nj() != o.nj() {
            bail!(MesonOpsError::ShapeMismatch(format!(
                "time slice {}: dilution table {}x{} vs operand {}x{}",
                s,
                a.ni(),
                a.nj(),
                o.ni(),
                o.nj()
            )));
        }

        for ((i, j), acell) in a.iter() {
            // Same table dimensions, so the operand cell exists.
            let ocell = match o.get(i, j) {
                Some(c) => c,
                None => bail!(MesonOpsError::ShapeMismatch(format!(
                    "time slice {}: operand lacks dilution cell ({}, {})",
                    s, i, j
                ))),
            };
            if acell.mom_projs.len() != ocell.mom_projs.len() {
                bail!(MesonOpsError::ShapeMismatch(format!(
                    "dilution ({}, {}): {} momenta vs operand {}",
                    i,
                    j,
                    acell.mom_projs.len(),
                    ocell.mom_projs.len()
                )));
            }
            for (m, (ap, op)) in acell.mom_projs.iter().zip(&ocell.mom_projs).enumerate() {
                if ap.mom != op.mom {
                    bail!(MesonOpsError::ShapeMismatch(format!(
                        "dilution ({}, {}) momentum {}: {:?} vs operand {:?}",
                        i, j, m, ap.mom, op.mom
                    )));
                }
                if ap.op.len() != op.op.len() {
                    bail!(MesonOpsError::ShapeMismatch(format!(
                        "dilution ({}, {}) momentum {:?}: sequence length {} vs operand {}",
                        i,
                        j,
                        ap.mom,
                        ap.op.len(),
                        op.op.len()
                    )));
                }
            }
        }
    }

    Ok(())
}

/// out += coeff * operand, cell by cell and time by time.
///
/// The shapes are checked first; on mismatch `out` is left untouched.
pub fn accumulate(
    out: &mut MesonOperator,
    operand: &MesonOperator,
    coeff: Complex64,
) -> Result<()> {
    check_congruent(out, operand)?;

    for (acc, opd) in out.time_slices.iter_mut().zip(&operand.time_slices) {
        for (acell, ocell) in acc
            .dilutions
            .cells_mut()
            .iter_mut()
            .zip(opd.dilutions.cells())
        {
            for (ap, op) in acell.mom_projs.iter_mut().zip(&ocell.mom_projs) {
                for (a, &v) in ap.op.iter_mut().zip(&op.op) {
                    *a += v * coeff;
                }
            }
        }
    }

    Ok(())
}

/// Build one group operator from its terms, in term order.
///
/// `fetch` resolves a term's elemental operand; the first operand fixes the
/// shape and header of the result.
pub fn combine<F>(id: &str, terms: &[Term], mut fetch: F) -> Result<MesonOperator>
where
    F: FnMut(&Term) -> Result<MesonOperator>,
{
    let mut out = MesonOperator::named(id);
    let mut init = false;

    for (m, term) in terms.iter().enumerate() {
        let operand = fetch(term)?;
        if !init {
            init_shape(&mut out, &operand);
            init = true;
        }
        accumulate(&mut out, &operand, term.coeff)
            .with_context(|| format!("operator {} term {} ({})", id, m, term.key))?;
    }

    if !init {
        bail!(MesonOpsError::DataInconsistency(format!(
            "group operator {} has no terms",
            id
        )));
    }

    Ok(out)
}
