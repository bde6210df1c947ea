//! Elemental operator registry: operator key -> per config / per timeslice
//! source and sink files.
//!
//! The key of each manifest is read from the `Op_Info` section of its first
//! config's first timeslice source file. Operators are read from disk on every
//! fetch; nothing is cached because the driver asks for each
//! (key, config, timeslice) once per group operator.

use crate::Result;
use crate::error::MesonOpsError;
use crate::input::{ElementalOpFiles, OperatorKey};
use crate::lime::{self, Side};
use crate::operator::MesonOperator;

use anyhow::{Context, bail};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct ElementalEntry {
    /// Position of the manifest in the input list.
    index: usize,
    files: ElementalOpFiles,
}

#[derive(Debug, Clone, Default)]
pub struct ElementalRegistry {
    entries: BTreeMap<OperatorKey, ElementalEntry>,
}

impl ElementalRegistry {
    /// Open the identifying file of every manifest and index the manifests by
    /// the key found there. A key seen twice is an error.
    pub fn build(manifests: &[ElementalOpFiles]) -> Result<Self> {
        let mut keyed = Vec::with_capacity(manifests.len());
        for (i, files) in manifests.iter().enumerate() {
            let first = match files.first_src_file() {
                Some(f) => f,
                None => bail!(MesonOpsError::NotFound(format!(
                    "first source file of elemental operator {}",
                    i
                ))),
            };
            let key = lime::read_op_key(first, Side::Source)
                .with_context(|| format!("identify elemental operator {}", i))?;
            debug!(op = i, %key, file = first, "elemental operator identified");
            keyed.push((key, files.clone()));
        }

        let registry = Self::from_keyed(keyed)?;
        info!(nelem = registry.len(), "elemental operator map built");
        Ok(registry)
    }

    /// Build from keys already known. Fails on the first repeated key; the
    /// partially filled map is dropped.
    pub fn from_keyed(keyed: Vec<(OperatorKey, ElementalOpFiles)>) -> Result<Self> {
        let mut entries: BTreeMap<OperatorKey, ElementalEntry> = BTreeMap::new();
        for (index, (key, files)) in keyed.into_iter().enumerate() {
            if let Some(prev) = entries.get(&key) {
                bail!(MesonOpsError::DuplicateKey {
                    key,
                    index,
                    first: prev.index,
                });
            }
            entries.insert(key, ElementalEntry { index, files });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in their total order.
    pub fn keys(&self) -> impl Iterator<Item = &OperatorKey> {
        self.entries.keys()
    }

    pub fn files(&self, key: &OperatorKey) -> Option<&ElementalOpFiles> {
        self.entries.get(key).map(|e| &e.files)
    }

    /// Read the creation operator of `key` on config `cfg`, dilution timeslice `t0`.
    pub fn source_operator(
        &self,
        key: &OperatorKey,
        cfg: usize,
        t0: usize,
    ) -> Result<MesonOperator> {
        self.fetch(key, cfg, t0, Side::Source)
    }

    /// Read the annihilation operator of `key` on config `cfg`, dilution timeslice `t0`.
    pub fn sink_operator(
        &self,
        key: &OperatorKey,
        cfg: usize,
        t0: usize,
    ) -> Result<MesonOperator> {
        self.fetch(key, cfg, t0, Side::Sink)
    }

    fn fetch(
        &self,
        key: &OperatorKey,
        cfg: usize,
        t0: usize,
        side: Side,
    ) -> Result<MesonOperator> {
        let entry = match self.entries.get(key) {
            Some(e) => e,
            None => bail!(MesonOpsError::NotFound(format!(
                "{} elemental operator {} not in map",
                side.suffix(),
                key
            ))),
        };
        let tf = match entry.files.time_files(cfg, t0) {
            Some(tf) => tf,
            None => bail!(MesonOpsError::NotFound(format!(
                "elemental operator {} has no files for cfg {} t0 {}",
                key, cfg, t0
            ))),
        };
        let path = match side {
            Side::Source => tf.src_file.as_str(),
            Side::Sink => tf.snk_file.as_str(),
        };

        let op = lime::read_elemental(path, side)
            .with_context(|| format!("read elemental operator {} cfg {} t0 {}", key, cfg, t0))?;

        // Elemental files hold exactly one timeslice.
        if op.time_slices.len() != 1 {
            bail!(MesonOpsError::MalformedElemental {
                path: path.to_string(),
                reason: format!(
                    "each elemental op file must contain a single timeslice, found {}",
                    op.time_slices.len()
                ),
            });
        }

        Ok(op)
    }
}
