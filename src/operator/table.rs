//! Dense Ni x Nj table of dilution cells, row-major.

use crate::operator::Dilution;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDilutionTable")]
pub struct DilutionTable {
    ni: usize,
    nj: usize,
    cells: Vec<Dilution>,
}

/// Wire shape before the cell count is checked against ni * nj.
#[derive(Deserialize)]
struct RawDilutionTable {
    ni: usize,
    nj: usize,
    cells: Vec<Dilution>,
}

impl TryFrom<RawDilutionTable> for DilutionTable {
    type Error = String;

    fn try_from(raw: RawDilutionTable) -> Result<Self, Self::Error> {
        DilutionTable::from_cells(raw.ni, raw.nj, raw.cells)
    }
}

impl DilutionTable {
    /// Build a table from row-major cells; `cells.len()` must equal `ni * nj`.
    pub fn from_cells(ni: usize, nj: usize, cells: Vec<Dilution>) -> Result<Self, String> {
        if ni.checked_mul(nj) != Some(cells.len()) {
            return Err(format!(
                "dilution table declares {}x{} cells but holds {}",
                ni,
                nj,
                cells.len()
            ));
        }
        Ok(Self { ni, nj, cells })
    }

    /// A table of `ni * nj` clones of `fill`.
    pub fn filled(ni: usize, nj: usize, fill: Dilution) -> Self {
        Self {
            ni,
            nj,
            cells: vec![fill; ni * nj],
        }
    }

    pub fn ni(&self) -> usize {
        self.ni
    }

    pub fn nj(&self) -> usize {
        self.nj
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&Dilution> {
        if i < self.ni && j < self.nj {
            self.cells.get(i * self.nj + j)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut Dilution> {
        if i < self.ni && j < self.nj {
            self.cells.get_mut(i * self.nj + j)
        } else {
            None
        }
    }

    /// Cells with their (i, j) indices, row-major.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &Dilution)> {
        let nj = self.nj.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(k, d)| ((k / nj, k % nj), d))
    }

    pub fn cells(&self) -> &[Dilution] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Dilution] {
        &mut self.cells
    }
}
