//! The grid engine: turns a [`Layout`] plus a display rectangle into pixel
//! rectangles for every cell, and divides a cell rectangle among the
//! windows stacked inside it.
use std::collections::HashMap;

use crate::layout::{CalculatedLayout, Layout, StackMode};
use crate::pure::ratio;
use crate::pure::track::{size_tracks, track_starts};
use crate::pure::Rect;

/// Per-cell padding resolved to absolute pixel lengths, one per side.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

/// Run the grid engine: compute column widths, row heights, and every
/// cell's pixel rectangle, translated into `display`'s coordinate space.
pub fn compute_layout(layout: &Layout, display: Rect, gap: f64) -> CalculatedLayout {
    let column_widths = size_tracks(&layout.columns, display.w, gap);
    let row_heights = size_tracks(&layout.rows, display.h, gap);

    let col_starts = track_starts(&column_widths, gap, 0.0);
    let row_starts = track_starts(&row_heights, gap, 0.0);

    let mut cells = HashMap::with_capacity(layout.cells.len());

    for cell in &layout.cells {
        let col_range = cell.columns.indices();
        let row_range = cell.rows.indices();

        let x = col_starts[col_range.start];
        let y = row_starts[row_range.start];

        let w: f64 = column_widths[col_range.clone()].iter().sum::<f64>()
            + gap * (col_range.len().saturating_sub(1)) as f64;
        let h: f64 = row_heights[row_range.clone()].iter().sum::<f64>()
            + gap * (row_range.len().saturating_sub(1)) as f64;

        let rect = Rect::new(x, y, w, h).translated(display.x, display.y);
        cells.insert(cell.id.clone(), rect);
    }

    CalculatedLayout {
        cells,
        column_widths,
        row_heights,
    }
}

/// Divide `cell` among `n` windows arranged per `mode`, using `ratios`
/// (defaulted to equal shares if missing or mismatched in length) and
/// `padding` between adjacent windows.
pub fn window_rects_in_cell(
    cell: Rect,
    n: usize,
    mode: StackMode,
    ratios: &[f64],
    padding: f64,
) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }

    let ratios: Vec<f64> = if ratios.len() == n {
        ratios.to_vec()
    } else {
        ratio::initialize(n)
    };

    match mode {
        StackMode::Tabs => vec![cell; n],
        StackMode::Vertical => {
            let usable = (cell.h - padding * (n.saturating_sub(1)) as f64).max(0.0);
            let mut y = cell.y;
            let mut out = Vec::with_capacity(n);
            for r in &ratios {
                let h = usable * r;
                out.push(Rect::new(cell.x, y, cell.w, h));
                y += h + padding;
            }
            out
        }
        StackMode::Horizontal => {
            let usable = (cell.w - padding * (n.saturating_sub(1)) as f64).max(0.0);
            let mut x = cell.x;
            let mut out = Vec::with_capacity(n);
            for r in &ratios {
                let w = usable * r;
                out.push(Rect::new(x, cell.y, w, cell.h));
                x += w + padding;
            }
            out
        }
    }
}

/// Shrink `cell` by `padding` on all four sides before laying out windows.
pub fn apply_padding(cell: Rect, padding: Padding) -> Rect {
    cell.inset(padding.top, padding.right, padding.bottom, padding.left)
}
