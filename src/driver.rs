//! Orchestration: configurations x group operators x dilution timeslices.
//!
//! For each triple a source and a sink group operator are combined from
//! their elemental operands and written to
//! `<path><name>_t<t0>_src.lime` / `<path><name>_t<t0>_snk.lime`, where `t0` is
//! the absolute time stored in the operands.

use crate::Result;
use crate::accumulate::combine;
use crate::error::MesonOpsError;
use crate::input::{GroupMesonOperator, MakeOpsInput, OutputPaths, read_coeff_files};
use crate::lime::{self, Side};
use crate::operator::MesonOperator;
use crate::registry::ElementalRegistry;
use crate::validate::{ValidationReport, check_consistency};

use anyhow::{Context, bail};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Switches resolved from the input document and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub check_consistency: bool,
    pub parallel: bool,
}

impl RunOptions {
    pub fn from_input(input: &MakeOpsInput) -> Self {
        Self {
            check_consistency: input.param.check_consistency,
            parallel: input.param.parallel,
        }
    }
}

/// One written pair of group operator files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub cfg: usize,
    pub name: String,
    pub t0: i32,
    pub source: String,
    pub sink: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub operators: Vec<GroupMesonOperator>,
    pub outputs: Vec<OutputRecord>,
    pub validation: Option<ValidationReport>,
}

pub fn output_file_name(prefix: &str, name: &str, t0: i32, side: Side) -> String {
    format!("{}{}_t{}_{}.lime", prefix, name, t0, side.suffix())
}

/// Run the whole batch. Any failure aborts it; files already written stay
/// on disk but the run as a whole is reported as failed.
pub fn run(input: &MakeOpsInput, opts: RunOptions) -> Result<RunSummary> {
    input.validate()?;

    info!("reading coefficient files");
    let operators = read_coeff_files(&input.input_files.coeff_files)?;

    let manifests = &input.input_files.elem_op_files;
    let validation = if opts.check_consistency {
        info!("performing sanity checks");
        Some(check_consistency(manifests, Some(input.param.decay_dir))?)
    } else {
        warn!("skipping consistency checks - not checking for dilution sanity");
        None
    };

    let registry = ElementalRegistry::build(manifests)?;

    let nbins = input.num_cfgs();
    let nt0 = input.num_timeslices();
    let ctx = BuildContext {
        registry: &registry,
        operators: &operators,
        nt0,
        time_extent: input.time_extent(),
        claimed: Mutex::new(BTreeSet::new()),
    };

    info!(
        cfgs = nbins,
        ops = operators.len(),
        t0s = nt0,
        parallel = opts.parallel,
        "constructing meson operators"
    );

    let per_cfg: Vec<Vec<OutputRecord>> = if opts.parallel {
        input.output_info.cfg_paths[..nbins]
            .par_iter()
            .enumerate()
            .map(|(cfg, paths)| ctx.build_config(cfg, paths))
            .collect::<Result<Vec<_>>>()?
    } else {
        input.output_info.cfg_paths[..nbins]
            .iter()
            .enumerate()
            .map(|(cfg, paths)| ctx.build_config(cfg, paths))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(RunSummary {
        operators,
        outputs: per_cfg.into_iter().flatten().collect(),
        validation,
    })
}

struct BuildContext<'a> {
    registry: &'a ElementalRegistry,
    operators: &'a [GroupMesonOperator],
    nt0: usize,
    /// Expected length of every time sequence.
    time_extent: usize,
    /// Output files written so far, shared by all configurations.
    claimed: Mutex<BTreeSet<String>>,
}

impl BuildContext<'_> {
    fn build_config(&self, cfg: usize, paths: &OutputPaths) -> Result<Vec<OutputRecord>> {
        info!(cfg, "forming ops");
        let mut written = Vec::with_capacity(self.operators.len() * self.nt0);

        for op in self.operators {
            for t0 in 0..self.nt0 {
                let (t_src, source) =
                    self.build_and_write(Side::Source, op, cfg, t0, &paths.src_path)?;
                // The sink uses the same dilution timeslice index as the source.
                let (_, sink) = self.build_and_write(Side::Sink, op, cfg, t0, &paths.snk_path)?;

                written.push(OutputRecord {
                    cfg,
                    name: op.name.clone(),
                    t0: t_src,
                    source,
                    sink,
                });
            }
        }

        Ok(written)
    }

    fn build_and_write(
        &self,
        side: Side,
        op: &GroupMesonOperator,
        cfg: usize,
        t0: usize,
        prefix: &str,
    ) -> Result<(i32, String)> {
        let start = Instant::now();
        debug!(op = %op.name, cfg, t0, side = side.suffix(), "making group meson op");

        let built = combine(&op.name, &op.terms, |term| match side {
            Side::Source => self.registry.source_operator(&term.key, cfg, t0),
            Side::Sink => self.registry.sink_operator(&term.key, cfg, t0),
        })
        .with_context(|| {
            format!(
                "build {} operator {} cfg {} t0 {}",
                side.suffix(),
                op.name,
                cfg,
                t0
            )
        })?;

        self.check_time_extent(&built, cfg, t0)?;
        let t_abs = match built.t0() {
            Some(t) => t,
            None => bail!(MesonOpsError::ShapeMismatch(format!(
                "operator {} has no time slice",
                op.name
            ))),
        };
        let built_secs = start.elapsed().as_secs_f64();

        let filename = output_file_name(prefix, &op.name, t_abs, side);
        self.claim(&filename, cfg, t0)?;
        lime::write_group(&filename, side, op, &built)
            .with_context(|| format!("write {} operator {}", side.suffix(), filename))?;

        debug!(
            file = %filename,
            build_secs = built_secs,
            total_secs = start.elapsed().as_secs_f64(),
            "group meson op written"
        );
        Ok((t_abs, filename))
    }

    /// Reserve an output file name. A name produced twice would overwrite an
    /// earlier result, e.g. two dilution timeslices with the same t0.
    fn claim(&self, filename: &str, cfg: usize, t0: usize) -> Result<()> {
        let mut claimed = self
            .claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !claimed.insert(filename.to_string()) {
            bail!(MesonOpsError::DataInconsistency(format!(
                "output file {} produced twice (cfg {} t0 {})",
                filename, cfg, t0
            )));
        }
        Ok(())
    }

    fn check_time_extent(&self, op: &MesonOperator, cfg: usize, t0: usize) -> Result<()> {
        for len in op.sequence_lengths() {
            if len != self.time_extent {
                bail!(MesonOpsError::DataInconsistency(format!(
                    "operator {} cfg {} t0 {}: time sequence length {} differs from \
                     lattice time extent {}",
                    op.id,
                    cfg,
                    t0,
                    len,
                    self.time_extent
                )));
            }
        }
        Ok(())
    }
}
