//! Identity of a two-quark elemental operator.
//!
//! In files the identity appears as `Op_Info`:
//! {"Quarks": [{"Spin": 1, "Displacement": 0}, {"Spin": 2, "Displacement": -1}]}
//!
//! We store it as a pair of `QuarkInfo` and derive ordering so it can be used
//! in BTreeMap. Field order makes the derived order lexicographic over
//! (displacement_l, spin_l, displacement_r, spin_r).

use crate::error::MesonOpsError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Spin and displacement of one quark. Both are 1-based in the upstream
/// conventions; displacements carry a sign for the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QuarkInfo {
    #[serde(rename = "Displacement")]
    pub displacement: i32,
    #[serde(rename = "Spin")]
    pub spin: i32,
}

impl QuarkInfo {
    pub fn new(spin: i32, displacement: i32) -> Self {
        Self { displacement, spin }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "TwoQuarkOp", into = "TwoQuarkOp")]
pub struct OperatorKey {
    pub l: QuarkInfo,
    pub r: QuarkInfo,
}

impl OperatorKey {
    pub fn new(l: QuarkInfo, r: QuarkInfo) -> Self {
        Self { l, r }
    }
}

impl fmt::Display for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(spin_l={},disp_l={},spin_r={},disp_r={})",
            self.l.spin, self.l.displacement, self.r.spin, self.r.displacement
        )
    }
}

/// Raw `Op_Info` shape: a list of quarks, which must hold exactly two entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoQuarkOp {
    #[serde(rename = "Quarks")]
    pub quarks: Vec<QuarkInfo>,
}

impl TryFrom<TwoQuarkOp> for OperatorKey {
    type Error = MesonOpsError;

    fn try_from(op: TwoQuarkOp) -> Result<Self, Self::Error> {
        match op.quarks.as_slice() {
            [l, r] => Ok(OperatorKey::new(*l, *r)),
            other => Err(MesonOpsError::DataInconsistency(format!(
                "two-quark operator must list exactly 2 quarks, found {}",
                other.len()
            ))),
        }
    }
}

impl From<OperatorKey> for TwoQuarkOp {
    fn from(key: OperatorKey) -> Self {
        TwoQuarkOp {
            quarks: vec![key.l, key.r],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn key(spin_l: i32, disp_l: i32, spin_r: i32, disp_r: i32) -> OperatorKey {
        OperatorKey::new(QuarkInfo::new(spin_l, disp_l), QuarkInfo::new(spin_r, disp_r))
    }

    #[test]
    fn displacement_dominates_spin() {
        // disp_l is compared before spin_l.
        assert!(key(4, 0, 1, 0) < key(1, 1, 1, 0));
        assert!(key(1, -1, 4, 3) < key(1, 0, 1, 0));
    }

    #[test]
    fn order_is_lexicographic_over_fields() {
        let mut grid = Vec::new();
        for dl in -1..=1 {
            for sl in 1..=2 {
                for dr in -1..=1 {
                    for sr in 1..=2 {
                        grid.push(key(sl, dl, sr, dr));
                    }
                }
            }
        }
        for a in &grid {
            for b in &grid {
                let fa = (a.l.displacement, a.l.spin, a.r.displacement, a.r.spin);
                let fb = (b.l.displacement, b.l.spin, b.r.displacement, b.r.spin);
                assert_eq!(a.cmp(b), fa.cmp(&fb));
                if a != b {
                    // Exactly one of a<b, b<a.
                    assert!((a < b) ^ (b < a));
                } else {
                    assert_eq!(a.cmp(b), Ordering::Equal);
                }
            }
        }
    }

    #[test]
    fn op_info_json_shape() {
        let k = key(1, 0, 2, -1);
        let json = serde_json::to_value(k).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Quarks": [
                {"Displacement": 0, "Spin": 1},
                {"Displacement": -1, "Spin": 2}
            ]})
        );
        let back: OperatorKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, k);
    }

    #[test]
    fn three_quarks_rejected() {
        let raw = serde_json::json!({"Quarks": [
            {"Displacement": 0, "Spin": 1},
            {"Displacement": 0, "Spin": 1},
            {"Displacement": 0, "Spin": 1}
        ]});
        let err = serde_json::from_value::<OperatorKey>(raw).unwrap_err();
        assert!(err.to_string().contains("exactly 2 quarks"));
    }
}
