//! The layout orchestrator: apply, cycle and reapply operations.
//! Operates on an already-fetched [`Snapshot`] and an already-reconciled
//! [`SpaceState`]; persistence is the caller's job.
use tracing::{error, warn};

use crate::assignment::{self, AssignmentStrategy};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pure::grid;
use crate::pure::ratio;
use crate::server::{GridServer, Snapshot, WindowUpdate};
use crate::state::{CellState, SpaceState};

use super::StackMode;

/// What `apply` actually did, for the CLI to render under `--json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub layout_id: String,
    pub placements: usize,
    pub failures: usize,
}

fn available_layouts(config: &Config, space_id: &str) -> Vec<String> {
    config
        .spaces
        .get(space_id)
        .filter(|s| !s.layouts.is_empty())
        .map(|s| s.layouts.clone())
        .unwrap_or_else(|| config.layouts.iter().map(|l| l.id.clone()).collect())
}

pub(crate) fn effective_gap(config: &Config) -> f64 {
    config.settings.window_spacing.resolve(config.settings.base_spacing).unwrap_or(0.0)
}

pub(crate) fn effective_padding(config: &Config) -> grid::Padding {
    let p = config.settings.default_padding.resolve(config.settings.base_spacing).unwrap_or(0.0);
    grid::Padding::uniform(p)
}

/// Resolve a cell's effective stack mode: cell-state override →
/// per-cell layout override → layout-level mode map → settings default.
pub(crate) fn effective_stack_mode(
    config: &Config,
    layout: &crate::layout::Layout,
    cell_id: &str,
    cell_state: Option<&CellState>,
) -> StackMode {
    cell_state
        .and_then(|c| c.stack_mode)
        .or_else(|| layout.cell(cell_id).and_then(|c| c.stack_mode))
        .or_else(|| layout.stack_modes.get(cell_id).copied())
        .unwrap_or(config.settings.default_stack_mode)
}

/// The focus pointer must reference an existing cell with an in-bounds
/// window index. A fresh assignment can drop the focused cell entirely or
/// shrink its window list, so clamp the index down or clear the pointer
/// outright rather than leave a stale reference behind after a successful
/// `apply`.
fn revalidate_focus(space: &mut SpaceState) {
    let Some(focus) = space.focus.clone() else { return };

    match space.cells.get(&focus.cell) {
        Some(cell) if !cell.windows.is_empty() => {
            let clamped = focus.window_index.min(cell.windows.len() - 1);
            if clamped != focus.window_index {
                space.focus = Some(crate::state::FocusPointer { cell: focus.cell, window_index: clamped });
            }
        }
        _ => space.focus = None,
    }
}

/// Apply `layout_id` to `space_id` using `strategy`. Pre-conditions: the
/// caller has already fetched `snapshot` and reconciled `space` against
/// it.
pub fn apply(
    config: &Config,
    space: &mut SpaceState,
    snapshot: &Snapshot,
    server: &dyn GridServer,
    space_id: &str,
    layout_id: &str,
    strategy: AssignmentStrategy,
) -> Result<ApplyOutcome> {
    let layout = config
        .layout(layout_id)
        .ok_or_else(|| Error::MissingEntity(format!("no layout named {layout_id:?}")))?;

    let gap = effective_gap(config);
    let padding = effective_padding(config);
    let calculated = grid::compute_layout(layout, snapshot.active_display, gap);

    let windows: Vec<crate::server::Window> = snapshot.windows_on_space(space_id).cloned().collect();

    let previous: assignment::PreviousAssignment = space
        .cells
        .iter()
        .map(|(id, cell)| (id.clone(), cell.windows.clone()))
        .collect();

    let result = assignment::assign(strategy, &windows, &calculated, &config.app_rules, &previous);

    let window_by_id: std::collections::HashMap<_, _> = windows.iter().map(|w| (w.id, w)).collect();

    let mut placements = 0usize;
    let mut failures = 0usize;
    let mut new_cells: std::collections::BTreeMap<String, CellState> = std::collections::BTreeMap::new();

    let mut cell_ids: Vec<&String> = result.assignments.keys().collect();
    cell_ids.sort();

    for cell_id in cell_ids {
        let window_ids = &result.assignments[cell_id];
        let cell_rect = calculated.cell_rect(cell_id).unwrap_or_default();
        let inset = grid::apply_padding(cell_rect, padding);

        let mode = effective_stack_mode(config, layout, cell_id, space.cells.get(cell_id));

        let unchanged = space.cells.get(cell_id).map(|c| &c.windows) == Some(window_ids);
        let ratios = if unchanged {
            space.cells[cell_id].ratios.clone()
        } else {
            ratio::initialize(window_ids.len())
        };

        let rects = grid::window_rects_in_cell(inset, window_ids.len(), mode, &ratios, gap);

        for (id, rect) in window_ids.iter().zip(rects.iter()) {
            let (x, y, width, height) = rect.rounded();
            let update = WindowUpdate::geometry(*id, x, y, width, height);

            match server.update_window(update) {
                Ok(()) => placements += 1,
                Err(e) => {
                    failures += 1;
                    let app = window_by_id.get(id).map(|w| w.app.as_str()).unwrap_or("?");
                    warn!(window_id = id, app, error = %e, "placement failed, continuing batch");
                }
            }
        }

        new_cells.insert(
            cell_id.clone(),
            CellState { windows: window_ids.clone(), ratios, stack_mode: space.cells.get(cell_id).and_then(|c| c.stack_mode) },
        );
    }

    let total = placements + failures;
    if total > 0 && placements == 0 {
        error!(layout = layout_id, "every window placement failed");
        return Err(Error::AllPlacementsFailed(total));
    }

    let available = available_layouts(config, space_id);
    let cycle_index = available.iter().position(|id| id == layout_id).unwrap_or(0);

    space.layout_id = Some(layout_id.to_string());
    space.cycle_index = cycle_index;
    space.cells = new_cells;
    revalidate_focus(space);

    Ok(ApplyOutcome { layout_id: layout_id.to_string(), placements, failures })
}

/// Advance to the next layout in the space's cycle (or the global list)
/// and apply it with the `preserve` strategy.
pub fn cycle(
    config: &Config,
    space: &mut SpaceState,
    snapshot: &Snapshot,
    server: &dyn GridServer,
    space_id: &str,
) -> Result<ApplyOutcome> {
    let available = available_layouts(config, space_id);
    if available.is_empty() {
        return Err(Error::MissingEntity(format!("no layouts configured for space {space_id:?}")));
    }

    let next_index = (space.cycle_index + 1) % available.len();
    let next_id = available[next_index].clone();

    apply(config, space, snapshot, server, space_id, &next_id, AssignmentStrategy::Preserve)
}

/// Re-run `apply` with the currently recorded layout id.
pub fn reapply(
    config: &Config,
    space: &mut SpaceState,
    snapshot: &Snapshot,
    server: &dyn GridServer,
    space_id: &str,
    strategy: AssignmentStrategy,
) -> Result<ApplyOutcome> {
    let layout_id = space
        .layout_id
        .clone()
        .ok_or_else(|| Error::MissingEntity(format!("space {space_id:?} has no applied layout")))?;

    apply(config, space, snapshot, server, space_id, &layout_id, strategy)
}

/// If reconciliation turned up tileable windows that no cell references,
/// and the space already has a layout applied, place the new arrivals
/// with the `preserve` strategy so existing assignments are left
/// untouched. A no-op when there is no current layout or nothing new to
/// place — callers that are about to `apply` an explicit layout anyway
/// don't need this, since `apply` already assigns every window on the
/// space from scratch.
pub fn autoplace_new_windows(
    config: &Config,
    space: &mut SpaceState,
    snapshot: &Snapshot,
    server: &dyn GridServer,
    space_id: &str,
    report: &crate::reconcile::ReconcileReport,
) -> Result<Option<ApplyOutcome>> {
    if report.new_tileable_windows.is_empty() {
        return Ok(None);
    }
    let Some(layout_id) = space.layout_id.clone() else {
        return Ok(None);
    };

    apply(config, space, snapshot, server, space_id, &layout_id, AssignmentStrategy::Preserve).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RawGrid, RawLayout};
    use crate::pure::Rect;
    use crate::server::mock::MockServer;
    use crate::server::Window;

    fn config_with_two_col_layout() -> Config {
        let raw = RawLayout {
            id: "two-col".into(),
            name: None,
            description: None,
            grid: RawGrid { columns: vec!["1fr".into(), "1fr".into()], rows: vec!["1fr".into()] },
            cells: vec![
                crate::config::RawCell { id: "a".into(), column: "1/2".into(), row: "1/2".into(), stack_mode: None },
                crate::config::RawCell { id: "b".into(), column: "2/3".into(), row: "1/2".into(), stack_mode: None },
            ],
            areas: vec![],
        };

        Config {
            settings: Default::default(),
            layouts: vec![raw.parse().unwrap()],
            spaces: Default::default(),
            app_rules: Default::default(),
        }
    }

    fn window(id: u64) -> Window {
        Window {
            id,
            app: "App".into(),
            bundle_id: None,
            frame: Rect::default(),
            spaces: vec!["1".into()],
            flags: crate::server::WindowFlags::empty(),
            level: 0,
            subrole: None,
            role: None,
            can_fullscreen: true,
        }
    }

    fn snapshot(windows: Vec<Window>) -> Snapshot {
        Snapshot {
            active_space: "1".into(),
            active_display: Rect::new(0.0, 0.0, 1000.0, 1000.0),
            windows,
            focused_window: None,
        }
    }

    #[test]
    fn apply_places_every_window_and_records_layout() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1), window(2)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        let outcome = apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();

        assert_eq!(outcome.placements, 2);
        assert_eq!(outcome.failures, 0);
        assert_eq!(space.layout_id, Some("two-col".to_string()));
        assert_eq!(server.calls().len(), 2);
    }

    #[test]
    fn apply_clears_focus_on_a_cell_that_no_longer_exists() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1), window(2)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();
        space.focus = Some(crate::state::FocusPointer { cell: "ghost".into(), window_index: 0 });

        apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();

        assert_eq!(space.focus, None);
    }

    #[test]
    fn apply_clamps_focus_window_index_that_shrank_out_of_range() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();
        space.cells.insert("a".into(), CellState::new(vec![1, 2, 3]));
        space.focus = Some(crate::state::FocusPointer { cell: "a".into(), window_index: 2 });

        apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();

        let focus = space.focus.expect("focus retained on surviving cell");
        assert_eq!(focus.cell, "a");
        assert!(focus.window_index < space.cells["a"].windows.len());
    }

    #[test]
    fn apply_fails_when_layout_is_missing() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        let err = apply(&config, &mut space, &snap, &server, "1", "nope", AssignmentStrategy::AutoFlow).unwrap_err();
        assert!(matches!(err, Error::MissingEntity(_)));
    }

    #[test]
    fn apply_survives_partial_placement_failures() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1), window(2)]);
        let mut server = MockServer::new(snap.clone());
        server.failing_window_ids.push(1);
        let mut space = SpaceState::default();

        let outcome = apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();
        assert_eq!(outcome.placements, 1);
        assert_eq!(outcome.failures, 1);
    }

    #[test]
    fn apply_fails_only_when_every_placement_fails() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1)]);
        let mut server = MockServer::new(snap.clone());
        server.failing_window_ids.push(1);
        let mut space = SpaceState::default();

        let err = apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap_err();
        assert!(matches!(err, Error::AllPlacementsFailed(_)));
    }

    #[test]
    fn apply_then_reapply_with_no_snapshot_changes_is_a_state_no_op() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1), window(2), window(3)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();
        let after_apply = space.clone();

        reapply(&config, &mut space, &snap, &server, "1", AssignmentStrategy::Preserve).unwrap();

        assert_eq!(space, after_apply);
    }

    #[test]
    fn cycle_advances_and_wraps() {
        let mut config = config_with_two_col_layout();
        let monocle = RawLayout {
            id: "monocle".into(),
            name: None,
            description: None,
            grid: RawGrid { columns: vec!["1fr".into()], rows: vec!["1fr".into()] },
            cells: vec![crate::config::RawCell { id: "main".into(), column: "1/2".into(), row: "1/2".into(), stack_mode: None }],
            areas: vec![],
        };
        config.layouts.push(monocle.parse().unwrap());

        let snap = snapshot(vec![window(1)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();
        let outcome = cycle(&config, &mut space, &snap, &server, "1").unwrap();
        assert_eq!(outcome.layout_id, "monocle");

        let outcome2 = cycle(&config, &mut space, &snap, &server, "1").unwrap();
        assert_eq!(outcome2.layout_id, "two-col");
    }

    #[test]
    fn reapply_without_prior_layout_is_missing_entity() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        let err = reapply(&config, &mut space, &snap, &server, "1", AssignmentStrategy::Preserve).unwrap_err();
        assert!(matches!(err, Error::MissingEntity(_)));
    }

    #[test]
    fn autoplace_places_newly_arrived_windows_without_disturbing_existing() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1), window(2)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        apply(&config, &mut space, &snap, &server, "1", "two-col", AssignmentStrategy::AutoFlow).unwrap();
        assert_eq!(space.cells["a"].windows, vec![1]);
        assert_eq!(space.cells["b"].windows, vec![2]);

        let snap_with_new = snapshot(vec![window(1), window(2), window(3)]);
        let report = crate::reconcile::reconcile(&mut space, &snap_with_new, "1", &config.app_rules);
        assert_eq!(report.new_tileable_windows, std::collections::BTreeSet::from([3]));

        let outcome =
            autoplace_new_windows(&config, &mut space, &snap_with_new, &server, "1", &report).unwrap();
        assert!(outcome.is_some());
        assert_eq!(space.cells["a"].windows, vec![1]);
        assert_eq!(space.cells["b"].windows, vec![2, 3]);
    }

    #[test]
    fn autoplace_is_a_no_op_without_a_current_layout() {
        let config = config_with_two_col_layout();
        let snap = snapshot(vec![window(1)]);
        let server = MockServer::new(snap.clone());
        let mut space = SpaceState::default();

        let report = crate::reconcile::reconcile(&mut space, &snap, "1", &config.app_rules);
        let outcome = autoplace_new_windows(&config, &mut space, &snap, &server, "1", &report).unwrap();
        assert!(outcome.is_none());
    }
}
