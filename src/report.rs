//! Run output document and file summaries for `inspect`.

use crate::Result;
use crate::driver::{OutputRecord, RunSummary};
use crate::error::MesonOpsError;
use crate::input::{GroupMesonOperator, InputDocument};
use crate::lime::{self, Side};
use crate::operator::MesonOperator;
use crate::validate::ValidationReport;

use anyhow::{Context, bail};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;

#[derive(Serialize)]
struct OutputDocument<'a> {
    #[serde(rename = "MakeMesonOps")]
    make_meson_ops: OutputBody<'a>,
}

#[derive(Serialize)]
struct OutputBody<'a> {
    /// Echo of the input document.
    #[serde(rename = "Input")]
    input: &'a InputDocument,
    #[serde(rename = "GroupMesonOperators")]
    operators: &'a [GroupMesonOperator],
    #[serde(rename = "Outputs")]
    outputs: &'a [OutputRecord],
    #[serde(rename = "Validation", skip_serializing_if = "Option::is_none")]
    validation: Option<ValidationSection>,
}

#[derive(Serialize)]
struct ValidationSection {
    operators: usize,
    configs: usize,
    timeslices: usize,
    files_checked: usize,
}

impl From<&ValidationReport> for ValidationSection {
    fn from(r: &ValidationReport) -> Self {
        Self {
            operators: r.operators,
            configs: r.configs,
            timeslices: r.timeslices,
            files_checked: r.files_checked,
        }
    }
}

/// Render the output document of a run.
pub fn render_output_document(input: &InputDocument, summary: &RunSummary) -> Result<String> {
    let doc = OutputDocument {
        make_meson_ops: OutputBody {
            input,
            operators: &summary.operators,
            outputs: &summary.outputs,
            validation: summary.validation.as_ref().map(ValidationSection::from),
        },
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn write_output_document(
    path: &str,
    input: &InputDocument,
    summary: &RunSummary,
) -> Result<()> {
    let text = render_output_document(input, summary)?;
    fs::write(path, text).with_context(|| format!("write output document {}", path))?;
    Ok(())
}

/// What kind of operator file `inspect` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Elemental(Side),
    Group(Side),
}

/// Header summary and shape of one operator file.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub kind: FileKind,
    pub operator: MesonOperator,
}

/// Open an elemental or group operator file and decode it.
pub fn describe_file(path: &str) -> Result<FileSummary> {
    let header = lime::read_file_header(path)?;
    let has = |root: &str| header.get(root).is_some();

    let kind = if has(Side::Source.group_file_root()) {
        FileKind::Group(Side::Source)
    } else if has(Side::Sink.group_file_root()) {
        FileKind::Group(Side::Sink)
    } else if has(Side::Source.file_root()) {
        FileKind::Elemental(Side::Source)
    } else if has(Side::Sink.file_root()) {
        FileKind::Elemental(Side::Sink)
    } else {
        bail!(MesonOpsError::MalformedElemental {
            path: path.to_string(),
            reason: "file header has no meson operator root".to_string(),
        });
    };

    let operator = match kind {
        FileKind::Group(_) => lime::read_group(path)?.operator,
        FileKind::Elemental(side) => lime::read_elemental(path, side)?,
    };
    Ok(FileSummary { kind, operator })
}

impl FileSummary {
    /// Plain text rendering, one fact per line.
    pub fn render(&self) -> String {
        let op = &self.operator;
        let kind = match self.kind {
            FileKind::Elemental(side) => format!("elemental {}", side.suffix()),
            FileKind::Group(side) => format!("group {}", side.suffix()),
        };

        let mut out = String::new();
        let _ = writeln!(out, "kind:       {}", kind);
        let _ = writeln!(out, "id:         {}", op.id);
        let _ = writeln!(out, "mom2_max:   {}", op.mom2_max);
        let _ = writeln!(out, "decay_dir:  {}", op.decay_dir);
        let _ = writeln!(out, "seed_l:     {:?}", op.seed_l.0);
        let _ = writeln!(out, "seed_r:     {:?}", op.seed_r.0);
        let _ = writeln!(out, "config:     {}", op.config_info);
        for ts in &op.time_slices {
            let nmom = ts
                .dilutions
                .cells()
                .first()
                .map(|d| d.mom_projs.len())
                .unwrap_or(0);
            let _ = writeln!(
                out,
                "timeslice:  t0={} dilutions={}x{} momenta={} lengths={:?}",
                ts.t0,
                ts.dilutions.ni(),
                ts.dilutions.nj(),
                nmom,
                op.sequence_lengths()
            );
        }
        out
    }
}
