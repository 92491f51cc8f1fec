//! Layout definitions: the user-facing description of a grid of cells, and
//! the calculated result of running the grid engine against a display.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pure::{Rect, TrackSize};

pub mod orchestrator;

/// How multiple windows sharing one cell divide its rectangle.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StackMode {
    Vertical,
    Horizontal,
    Tabs,
}

impl Default for StackMode {
    fn default() -> Self {
        StackMode::Vertical
    }
}

/// A half-open, 1-indexed span over a track sequence: `[start, end)`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// The zero-indexed, inclusive range of track indices this span covers.
    fn track_indices(&self) -> std::ops::Range<usize> {
        (self.start - 1) as usize..(self.end - 1) as usize
    }
}

/// A cell within a [Layout]: an identifier and its column/row span.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: String,
    pub columns: Span,
    pub rows: Span,
    /// Per-cell stack mode override, highest priority in the effective
    /// stack-mode resolution hierarchy.
    pub stack_mode: Option<StackMode>,
}

/// An ordered grid of column/row tracks partitioned into named cells.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Layout {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub columns: Vec<TrackSize>,
    pub rows: Vec<TrackSize>,
    pub cells: Vec<Cell>,
    /// Layout-level stack mode overrides keyed by cell id, second in the
    /// resolution hierarchy below the per-cell override.
    pub stack_modes: HashMap<String, StackMode>,
}

impl Layout {
    /// Validate this layout's structural invariants: spans in range, unique
    /// cell ids.
    pub fn validate(&self) -> Result<()> {
        let ncols = self.columns.len() as u32;
        let nrows = self.rows.len() as u32;
        let mut seen = std::collections::HashSet::new();

        for cell in &self.cells {
            if !seen.insert(&cell.id) {
                return Err(Error::Config(format!(
                    "duplicate cell id {:?} in layout {:?}",
                    cell.id, self.id
                )));
            }
            if !(1 <= cell.columns.start
                && cell.columns.start < cell.columns.end
                && cell.columns.end <= ncols + 1)
            {
                return Err(Error::Config(format!(
                    "cell {:?} has an out-of-range column span",
                    cell.id
                )));
            }
            if !(1 <= cell.rows.start && cell.rows.start < cell.rows.end && cell.rows.end <= nrows + 1)
            {
                return Err(Error::Config(format!(
                    "cell {:?} has an out-of-range row span",
                    cell.id
                )));
            }
        }

        Ok(())
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id == id)
    }
}

/// The result of running the grid engine for a given [Layout] against a
/// concrete display rectangle: per-cell pixel rectangles plus the resolved
/// column widths and row heights they were built from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalculatedLayout {
    pub cells: HashMap<String, Rect>,
    pub column_widths: Vec<f64>,
    pub row_heights: Vec<f64>,
}

impl CalculatedLayout {
    pub fn cell_rect(&self, id: &str) -> Option<Rect> {
        self.cells.get(id).copied()
    }

    /// Cells sorted by visual position: top-to-bottom then left-to-right
    /// using cell centers, auto-flow ordering rule.
    pub fn cells_by_visual_position(&self) -> Vec<String> {
        let mut ids: Vec<&String> = self.cells.keys().collect();
        ids.sort_by(|a, b| {
            let (ax, ay) = self.cells[*a].center();
            let (bx, by) = self.cells[*b].center();
            ay.total_cmp(&by).then(ax.total_cmp(&bx)).then_with(|| a.cmp(b))
        });
        ids.into_iter().cloned().collect()
    }
}

impl Span {
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.track_indices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_layout() -> Layout {
        Layout {
            id: "two-col".into(),
            name: None,
            description: None,
            columns: vec![TrackSize::Fr { weight: 1.0 }, TrackSize::Fr { weight: 1.0 }],
            rows: vec![TrackSize::Fr { weight: 1.0 }],
            cells: vec![
                Cell {
                    id: "left".into(),
                    columns: Span::new(1, 2),
                    rows: Span::new(1, 2),
                    stack_mode: None,
                },
                Cell {
                    id: "right".into(),
                    columns: Span::new(2, 3),
                    rows: Span::new(1, 2),
                    stack_mode: None,
                },
            ],
            stack_modes: HashMap::new(),
        }
    }

    #[test]
    fn valid_layout_passes_validation() {
        assert!(simple_layout().validate().is_ok());
    }

    #[test]
    fn duplicate_cell_ids_rejected() {
        let mut l = simple_layout();
        l.cells[1].id = "left".into();
        assert!(l.validate().is_err());
    }

    #[test]
    fn out_of_range_span_rejected() {
        let mut l = simple_layout();
        l.cells[0].columns = Span::new(1, 4);
        assert!(l.validate().is_err());
    }
}
