//! Encoding and decoding of elemental and group operator files.

use crate::Result;
use crate::error::MesonOpsError;
use crate::input::{GroupMesonOperator, OperatorKey};
use crate::lime::header::{ElementalFileInfo, ElementalRecordInfo, GroupRecordInfo, Side};
use crate::lime::{read_file_header, read_record, rooted, section, section_text, write_record};
use crate::operator::{MesonOperator, Payload};

use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::Value;

/// Operator identity embedded in an elemental file header (`Op_Info`).
pub fn read_op_key(path: &str, side: Side) -> Result<OperatorKey> {
    let header = read_file_header(path)?;
    let op_info = section(&header, &side.path("Op_Info"))
        .with_context(|| format!("elemental file {}", path))?;
    let key: OperatorKey = serde_json::from_value(op_info.clone())
        .with_context(|| format!("bad Op_Info in {}", path))?;
    Ok(key)
}

fn decode_payload(path: &str, bytes: &[u8]) -> Result<Payload> {
    match bincode::deserialize::<Payload>(bytes) {
        Ok(p) => Ok(p),
        Err(e) => bail!(MesonOpsError::MalformedElemental {
            path: path.to_string(),
            reason: format!("cannot decode payload: {}", e),
        }),
    }
}

/// Read an elemental operator: payload plus the provenance sections of the
/// file header and the record header of `side`.
///
/// Seeds, `mom2_max` and `decay_dir` appear in both the record header and
/// the payload; they must agree.
pub fn read_elemental(path: &str, side: Side) -> Result<MesonOperator> {
    let raw = read_record(path)?;
    let fh = &raw.file_header;

    let quark_sources_l = section_text(fh, &side.path("QuarkSources/Quark_l/TimeSlice/Dilutions"))
        .with_context(|| format!("elemental file {}", path))?;
    let quark_sources_r = section_text(fh, &side.path("QuarkSources/Quark_r/TimeSlice/Dilutions"))
        .with_context(|| format!("elemental file {}", path))?;
    let config_info = section_text(fh, &side.path("Config_info"))
        .with_context(|| format!("elemental file {}", path))?;
    let link_smearing = section(fh, &side.path("Params/LinkSmearing"))
        .with_context(|| format!("elemental file {}", path))?
        .clone();

    let record_path = format!("/{}", side.record_root());
    let rec_value = section(&raw.record_header, &record_path)
        .with_context(|| format!("elemental file {}", path))?;
    let rec: ElementalRecordInfo = serde_json::from_value(rec_value.clone())
        .with_context(|| format!("bad {} header in {}", side.record_root(), path))?;

    let payload = decode_payload(path, &raw.payload)?;

    if rec.seed_l != payload.seed_l
        || rec.seed_r != payload.seed_r
        || rec.mom2_max != payload.mom2_max
        || rec.decay_dir != payload.decay_dir
    {
        bail!(MesonOpsError::DataInconsistency(format!(
            "record header and payload disagree on seeds, mom2_max or decay_dir in {}",
            path
        )));
    }

    Ok(MesonOperator {
        id: rec.id,
        mom2_max: payload.mom2_max,
        decay_dir: payload.decay_dir,
        seed_l: payload.seed_l,
        seed_r: payload.seed_r,
        dilution_l: rec.dilution_l,
        dilution_r: rec.dilution_r,
        quark_smearing: rec.quark_smearing,
        link_smearing,
        quark_sources_l,
        quark_sources_r,
        config_info,
        time_slices: payload.time_slices,
    })
}

/// Write an elemental operator file the way the upstream measurement does.
/// Header provenance comes from `info`; numbers and descriptors from `op`.
pub fn write_elemental(
    path: &str,
    side: Side,
    info: &ElementalFileInfo,
    op: &MesonOperator,
) -> Result<()> {
    let record = ElementalRecordInfo {
        version: 1,
        id: op.id.clone(),
        mom2_max: op.mom2_max,
        decay_dir: op.decay_dir,
        seed_l: op.seed_l,
        seed_r: op.seed_r,
        dilution_l: op.dilution_l.clone(),
        dilution_r: op.dilution_r.clone(),
        quark_smearing: op.quark_smearing.clone(),
    };
    write_record(
        path,
        &rooted(side.file_root(), info)?,
        &rooted(side.record_root(), &record)?,
        &op.payload(),
    )
}

#[derive(Serialize)]
struct GroupFileInfoRef<'a> {
    #[serde(rename = "OpInfo")]
    op_info: &'a GroupMesonOperator,
    #[serde(rename = "Config_info")]
    config_info: &'a str,
}

/// Write a group operator file: the operator definition and configuration
/// info in the file header, the full operator header in the record header.
pub fn write_group(
    path: &str,
    side: Side,
    def: &GroupMesonOperator,
    op: &MesonOperator,
) -> Result<()> {
    let file_header = rooted(
        side.group_file_root(),
        &GroupFileInfoRef {
            op_info: def,
            config_info: &op.config_info,
        },
    )?;
    let record_header = rooted(
        side.group_record_root(),
        &rooted("OpInfo", &GroupRecordInfo::from(op))?,
    )?;
    write_record(path, &file_header, &record_header, &op.payload())
}

/// A group operator file read back from disk.
#[derive(Debug, Clone)]
pub struct GroupFile {
    pub side: Side,
    /// Echo of the group operator definition.
    pub definition: Value,
    pub operator: MesonOperator,
}

pub fn read_group(path: &str) -> Result<GroupFile> {
    let raw = read_record(path)?;

    let side = match [Side::Source, Side::Sink]
        .into_iter()
        .find(|s| raw.file_header.get(s.group_file_root()).is_some())
    {
        Some(s) => s,
        None => bail!(MesonOpsError::NotFound(format!(
            "group operator header in {}",
            path
        ))),
    };

    let root = format!("/{}", side.group_file_root());
    let definition = section(&raw.file_header, &format!("{}/OpInfo", root))?.clone();
    let config_info = match section(&raw.file_header, &format!("{}/Config_info", root))? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let info_value = section(
        &raw.record_header,
        &format!("/{}/OpInfo", side.group_record_root()),
    )?;
    let info: GroupRecordInfo = serde_json::from_value(info_value.clone())
        .with_context(|| format!("bad group operator header in {}", path))?;

    let payload = decode_payload(path, &raw.payload)?;

    Ok(GroupFile {
        side,
        definition,
        operator: MesonOperator {
            id: info.id,
            mom2_max: payload.mom2_max,
            decay_dir: payload.decay_dir,
            seed_l: payload.seed_l,
            seed_r: payload.seed_r,
            dilution_l: info.dilution_l,
            dilution_r: info.dilution_r,
            quark_smearing: info.quark_smearing,
            link_smearing: info.link_smearing,
            quark_sources_l: info.quark_sources_l.time_slices,
            quark_sources_r: info.quark_sources_r.time_slices,
            config_info,
            time_slices: payload.time_slices,
        },
    })
}
