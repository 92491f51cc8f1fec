//! Directional focus across cells, intra-cell cycling, and the
//! cross-cell "send" move.
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::layout::CalculatedLayout;
use crate::pure::ratio;
use crate::pure::{grid, Direction};
use crate::server::{GridServer, WindowId, WindowUpdate};
use crate::state::{CellState, FocusPointer, SpaceState};

fn signed_primary(from: (f64, f64), to: (f64, f64), dir: Direction) -> f64 {
    match dir {
        Direction::Left => from.0 - to.0,
        Direction::Right => to.0 - from.0,
        Direction::Up => from.1 - to.1,
        Direction::Down => to.1 - from.1,
    }
}

fn perpendicular(from: (f64, f64), to: (f64, f64), dir: Direction) -> f64 {
    match dir {
        Direction::Left | Direction::Right => (to.1 - from.1).abs(),
        Direction::Up | Direction::Down => (to.0 - from.0).abs(),
    }
}

fn is_on_the_requested_side(from: (f64, f64), to: (f64, f64), dir: Direction) -> bool {
    match dir {
        Direction::Left => to.0 < from.0,
        Direction::Right => to.0 > from.0,
        Direction::Up => to.1 < from.1,
        Direction::Down => to.1 > from.1,
    }
}

/// Find the best directional candidate cell from `source` using the
/// candidate-selection and distance rules below. Returns `None` if no
/// cell lies on the requested side.
pub fn find_directional_target(layout: &CalculatedLayout, source: &str, dir: Direction) -> Option<String> {
    let source_center = layout.cell_rect(source)?.center();

    layout
        .cells
        .iter()
        .filter(|(id, _)| id.as_str() != source)
        .filter(|(_, rect)| is_on_the_requested_side(source_center, rect.center(), dir))
        .map(|(id, rect)| {
            let center = rect.center();
            let distance = signed_primary(source_center, center, dir) + 2.0 * perpendicular(source_center, center, dir);
            (id, distance)
        })
        .min_by(|(id_a, dist_a), (id_b, dist_b)| dist_a.total_cmp(dist_b).then_with(|| id_a.cmp(id_b)))
        .map(|(id, _)| id.clone())
}

/// Wrap-around target: the cell on the opposite edge closest in the
/// perpendicular axis.
pub fn find_wrap_target(layout: &CalculatedLayout, source: &str, dir: Direction) -> Option<String> {
    let source_center = layout.cell_rect(source)?.center();

    layout
        .cells
        .iter()
        .filter(|(id, _)| id.as_str() != source)
        .map(|(id, rect)| {
            let center = rect.center();
            // A cell at the far edge opposite `dir` has a large signed
            // primary displacement in `dir`'s own direction; negating its
            // opposite-direction displacement rewards that extremity.
            let edge_score = -signed_primary(source_center, center, dir.opposite());
            let perp_offset = perpendicular(source_center, center, dir);
            let score = edge_score + 1000.0 * perp_offset;
            (id, score)
        })
        .min_by(|(id_a, score_a), (id_b, score_b)| score_a.total_cmp(score_b).then_with(|| id_a.cmp(id_b)))
        .map(|(id, _)| id.clone())
}

/// Resolve the directional target, falling back to wrap if requested and
/// no direct candidate exists. A single-cell layout legitimately wraps to
/// itself.
pub fn resolve_target(layout: &CalculatedLayout, source: &str, dir: Direction, wrap: bool) -> Option<String> {
    find_directional_target(layout, source, dir).or_else(|| {
        if !wrap {
            return None;
        }
        find_wrap_target(layout, source, dir).or_else(|| {
            if layout.cells.len() == 1 && layout.cells.contains_key(source) {
                Some(source.to_string())
            } else {
                None
            }
        })
    })
}

/// Move the focus pointer to `cell`'s first window and call
/// `window.focus`, falling back to `window.raise` on failure.
pub fn focus_cell(space: &mut SpaceState, server: &dyn GridServer, cell: &str) -> Result<()> {
    let window_id = space
        .cells
        .get(cell)
        .and_then(|c| c.windows.first().copied())
        .ok_or_else(|| Error::MissingEntity(format!("cell {cell:?} has no windows to focus")))?;

    space.focus = Some(FocusPointer { cell: cell.to_string(), window_index: 0 });

    if server.focus_window(window_id).is_err() {
        debug!(window_id, "focus_window failed, falling back to raise_window");
        server.raise_window(window_id)?;
    }

    Ok(())
}

/// Cycle the focused cell's window index by `step` (`+1` next, `-1`
/// previous). No-op on an empty cell.
pub fn cycle_within_cell(space: &mut SpaceState, step: i32) -> Result<()> {
    let pointer = space.focus.clone().ok_or(Error::NoDirectionalTarget)?;
    let cell = space
        .cells
        .get(&pointer.cell)
        .ok_or_else(|| Error::MissingEntity(format!("focused cell {:?} no longer exists", pointer.cell)))?;

    let n = cell.windows.len();
    if n == 0 {
        return Ok(());
    }

    let current = pointer.window_index as i64;
    let next = (current + step as i64).rem_euclid(n as i64) as usize;

    space.focus = Some(FocusPointer { cell: pointer.cell, window_index: next });
    Ok(())
}

fn effective_mode(config: &Config, space: &SpaceState, layout: &crate::layout::Layout, cell_id: &str) -> crate::layout::StackMode {
    space
        .cells
        .get(cell_id)
        .and_then(|c| c.stack_mode)
        .or_else(|| layout.cell(cell_id).and_then(|c| c.stack_mode))
        .or_else(|| layout.stack_modes.get(cell_id).copied())
        .unwrap_or(config.settings.default_stack_mode)
}

/// Recompute and push placements for one cell's current window list.
fn replace_cell(
    config: &Config,
    layout_def: &crate::layout::Layout,
    layout: &CalculatedLayout,
    space: &mut SpaceState,
    server: &dyn GridServer,
    gap: f64,
    cell_id: &str,
    windows: Vec<WindowId>,
) -> Result<()> {
    let ratios = ratio::initialize(windows.len());
    let mode = effective_mode(config, space, layout_def, cell_id);
    let rect = layout.cell_rect(cell_id).unwrap_or_default();
    let rects = grid::window_rects_in_cell(rect, windows.len(), mode, &ratios, gap);

    for (id, r) in windows.iter().zip(rects.iter()) {
        let (x, y, width, height) = r.rounded();
        server.update_window(WindowUpdate::geometry(*id, x, y, width, height))?;
    }

    space.cells.insert(cell_id.to_string(), CellState { windows, ratios, stack_mode: None });
    Ok(())
}

/// Move the focused window into the cell `dir` away from its current
/// cell (no wrap), recomputing placements for the two affected cells.
/// Returns `Ok(None)` if there is nothing in that direction — a
/// "nothing moved" result rather than an error.
pub fn send(
    config: &Config,
    layout_def: &crate::layout::Layout,
    layout: &CalculatedLayout,
    space: &mut SpaceState,
    server: &dyn GridServer,
    gap: f64,
    dir: Direction,
) -> Result<Option<String>> {
    let pointer = space.focus.clone().ok_or(Error::NoDirectionalTarget)?;

    let Some(window_id) = space
        .cells
        .get(&pointer.cell)
        .and_then(|c| c.windows.get(pointer.window_index).copied())
    else {
        return Err(Error::NoDirectionalTarget);
    };

    let Some(target_cell) = find_directional_target(layout, &pointer.cell, dir) else {
        return Ok(None);
    };

    send_to_cell(config, layout_def, layout, space, server, gap, &pointer.cell, window_id, &target_cell)?;
    Ok(Some(target_cell))
}

/// Move `window_id` (currently in `source_cell`) directly into
/// `target_cell`, recomputing placements for both (mechanics,
/// shared by the directional `send` above and the CLI's `cell send`
/// which names the destination explicitly).
pub fn send_to_cell(
    config: &Config,
    layout_def: &crate::layout::Layout,
    layout: &CalculatedLayout,
    space: &mut SpaceState,
    server: &dyn GridServer,
    gap: f64,
    source_cell: &str,
    window_id: WindowId,
    target_cell: &str,
) -> Result<()> {
    let mut source_windows = space.cells.get(source_cell).map(|c| c.windows.clone()).unwrap_or_default();
    source_windows.retain(|id| *id != window_id);

    let mut target_windows = space.cells.get(target_cell).map(|c| c.windows.clone()).unwrap_or_default();
    target_windows.insert(0, window_id);

    replace_cell(config, layout_def, layout, space, server, gap, source_cell, source_windows)?;
    replace_cell(config, layout_def, layout, space, server, gap, target_cell, target_windows)?;

    space.focus = Some(FocusPointer { cell: target_cell.to_string(), window_index: 0 });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pure::Rect;
    use crate::server::mock::MockServer;
    use crate::server::Snapshot;
    use std::collections::HashMap;

    fn three_across() -> CalculatedLayout {
        let mut cells = HashMap::new();
        cells.insert("left".to_string(), Rect::new(0.0, 0.0, 100.0, 100.0));
        cells.insert("mid".to_string(), Rect::new(100.0, 0.0, 100.0, 100.0));
        cells.insert("right".to_string(), Rect::new(200.0, 0.0, 100.0, 100.0));
        CalculatedLayout { cells, column_widths: vec![100.0; 3], row_heights: vec![100.0] }
    }

    fn layout_def() -> crate::layout::Layout {
        use crate::layout::{Cell, Span};
        crate::layout::Layout {
            id: "three-across".into(),
            name: None,
            description: None,
            columns: vec![crate::pure::TrackSize::Fr { weight: 1.0 }; 3],
            rows: vec![crate::pure::TrackSize::Fr { weight: 1.0 }],
            cells: vec![
                Cell { id: "left".into(), columns: Span::new(1, 2), rows: Span::new(1, 2), stack_mode: None },
                Cell { id: "mid".into(), columns: Span::new(2, 3), rows: Span::new(1, 2), stack_mode: None },
                Cell { id: "right".into(), columns: Span::new(3, 4), rows: Span::new(1, 2), stack_mode: None },
            ],
            stack_modes: HashMap::new(),
        }
    }

    #[test]
    fn directional_target_picks_the_immediate_neighbor() {
        let layout = three_across();
        assert_eq!(find_directional_target(&layout, "mid", Direction::Right), Some("right".to_string()));
        assert_eq!(find_directional_target(&layout, "mid", Direction::Left), Some("left".to_string()));
    }

    #[test]
    fn directional_target_is_none_at_the_edge_without_wrap() {
        let layout = three_across();
        assert_eq!(find_directional_target(&layout, "right", Direction::Right), None);
    }

    #[test]
    fn wrap_picks_the_opposite_edge() {
        let layout = three_across();
        let wrapped = find_wrap_target(&layout, "right", Direction::Right);
        assert_eq!(wrapped, Some("left".to_string()));
    }

    #[test]
    fn single_cell_layout_wraps_to_itself() {
        let mut cells = HashMap::new();
        cells.insert("only".to_string(), Rect::new(0.0, 0.0, 100.0, 100.0));
        let layout = CalculatedLayout { cells, column_widths: vec![100.0], row_heights: vec![100.0] };

        assert_eq!(resolve_target(&layout, "only", Direction::Right, true), Some("only".to_string()));
    }

    #[test]
    fn cycle_within_cell_wraps_around() {
        let mut space = SpaceState::default();
        space.cells.insert("a".into(), CellState::new(vec![1, 2, 3]));
        space.focus = Some(FocusPointer { cell: "a".into(), window_index: 2 });

        cycle_within_cell(&mut space, 1).unwrap();
        assert_eq!(space.focus.as_ref().unwrap().window_index, 0);

        cycle_within_cell(&mut space, -1).unwrap();
        assert_eq!(space.focus.as_ref().unwrap().window_index, 2);
    }

    #[test]
    fn send_moves_focused_window_and_refocuses_it() {
        let layout = three_across();
        let def = layout_def();
        let config = Config::default();

        let mut space = SpaceState::default();
        space.cells.insert("mid".into(), CellState::new(vec![1]));
        space.cells.insert("right".into(), CellState::new(vec![2]));
        space.focus = Some(FocusPointer { cell: "mid".into(), window_index: 0 });

        let snap = Snapshot { active_space: "1".into(), active_display: Rect::new(0.0, 0.0, 300.0, 100.0), windows: vec![], focused_window: None };
        let server = MockServer::new(snap);

        let moved = send(&config, &def, &layout, &mut space, &server, 0.0, Direction::Right).unwrap();
        assert_eq!(moved, Some("right".to_string()));
        assert!(space.cells["mid"].windows.is_empty());
        assert_eq!(space.cells["right"].windows, vec![1, 2]);
        assert_eq!(space.focus, Some(FocusPointer { cell: "right".into(), window_index: 0 }));
    }

    #[test]
    fn send_at_the_edge_returns_nothing_moved() {
        let layout = three_across();
        let def = layout_def();
        let config = Config::default();

        let mut space = SpaceState::default();
        space.cells.insert("right".into(), CellState::new(vec![1]));
        space.focus = Some(FocusPointer { cell: "right".into(), window_index: 0 });

        let snap = Snapshot { active_space: "1".into(), active_display: Rect::new(0.0, 0.0, 300.0, 100.0), windows: vec![], focused_window: None };
        let server = MockServer::new(snap);

        let moved = send(&config, &def, &layout, &mut space, &server, 0.0, Direction::Right).unwrap();
        assert_eq!(moved, None);
        assert_eq!(space.cells["right"].windows, vec![1]);
    }
}
