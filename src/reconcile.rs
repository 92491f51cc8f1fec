//! Reconciles persisted [`SpaceState`] against a live [`Snapshot`]:
//! drops windows that no longer exist, re-initialises ratios for
//! any cell whose membership changed, and reports the set of tileable
//! windows the orchestrator still needs to place.
use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::assignment::{classify, Classification};
use crate::config::AppRules;
use crate::pure::ratio;
use crate::server::{Snapshot, Window, WindowId};
use crate::state::model::ObservedContext;
use crate::state::SpaceState;

/// What changed during one reconciliation pass, surfaced for logging and
/// for the orchestrator's "place the new arrivals" step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub cells_changed: Vec<String>,
    pub windows_dropped: BTreeSet<WindowId>,
    pub new_tileable_windows: BTreeSet<WindowId>,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        !self.cells_changed.is_empty()
    }
}

/// Drop stale window references and re-initialise ratios for any cell whose
/// membership changed, mutating `space` in place. Persisting the result and
/// re-running the orchestrator for newly-tileable windows are the caller's
/// responsibility.
pub fn reconcile(space: &mut SpaceState, snapshot: &Snapshot, space_id: &str, rules: &AppRules) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    let tileable_on_space: Vec<&Window> = snapshot
        .windows_on_space(space_id)
        .filter(|w| classify(w, rules) == Classification::Tileable)
        .collect();

    let present: BTreeSet<WindowId> = tileable_on_space.iter().map(|w| w.id).collect();

    for (cell_id, cell) in space.cells.iter_mut() {
        let filtered: Vec<WindowId> = cell.windows.iter().copied().filter(|id| present.contains(id)).collect();

        if filtered.len() != cell.windows.len() {
            let dropped: BTreeSet<WindowId> = cell.windows.iter().copied().filter(|id| !present.contains(id)).collect();
            report.windows_dropped.extend(&dropped);
            report.cells_changed.push(cell_id.clone());

            debug!(cell = %cell_id, dropped = ?dropped, "dropping stale window references during reconciliation");

            cell.ratios = ratio::initialize(filtered.len());
            cell.windows = filtered;
        }
    }

    let referenced: BTreeSet<WindowId> = space.assigned_windows().collect();
    report.new_tileable_windows = present.difference(&referenced).copied().collect();

    if report.changed() || !report.new_tileable_windows.is_empty() {
        info!(
            space = %space_id,
            cells_changed = report.cells_changed.len(),
            windows_dropped = report.windows_dropped.len(),
            new_windows = report.new_tileable_windows.len(),
            "reconciled runtime state against live snapshot"
        );
    }

    let current_context = ObservedContext {
        active_display: snapshot.active_display,
        active_space: space_id.to_string(),
        focused_window: snapshot.focused_window,
    };

    if space.last_context.as_ref() != Some(&current_context) {
        info!(
            previous = ?space.last_context,
            current = ?current_context,
            "observed context changed"
        );
        space.last_context = Some(current_context);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pure::Rect;
    use crate::state::CellState;

    fn window(id: WindowId) -> Window {
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
    fn closed_window_is_dropped_and_ratios_reinitialised() {
        let mut space = SpaceState::default();
        space.cells.insert("a".into(), CellState::new(vec![1, 2]));

        let snap = snapshot(vec![window(1)]);
        let report = reconcile(&mut space, &snap, "1", &AppRules::default());

        assert_eq!(space.cells["a"].windows, vec![1]);
        assert_eq!(space.cells["a"].ratios, vec![1.0]);
        assert!(report.windows_dropped.contains(&2));
        assert_eq!(report.cells_changed, vec!["a".to_string()]);
    }

    #[test]
    fn untouched_cell_is_not_reported_as_changed() {
        let mut space = SpaceState::default();
        space.cells.insert("a".into(), CellState::new(vec![1]));

        let snap = snapshot(vec![window(1)]);
        let report = reconcile(&mut space, &snap, "1", &AppRules::default());

        assert!(!report.changed());
    }

    #[test]
    fn unreferenced_tileable_window_is_reported_as_new() {
        let mut space = SpaceState::default();
        space.cells.insert("a".into(), CellState::new(vec![1]));

        let snap = snapshot(vec![window(1), window(2)]);
        let report = reconcile(&mut space, &snap, "1", &AppRules::default());

        assert_eq!(report.new_tileable_windows, BTreeSet::from([2]));
    }

    #[test]
    fn last_context_is_recorded_after_reconciliation() {
        let mut space = SpaceState::default();
        let snap = snapshot(vec![window(1)]);

        reconcile(&mut space, &snap, "1", &AppRules::default());

        let ctx = space.last_context.expect("context recorded");
        assert_eq!(ctx.active_space, "1");
        assert_eq!(ctx.active_display, snap.active_display);
        assert_eq!(ctx.focused_window, None);
    }

    #[test]
    fn unchanged_context_is_not_rewritten() {
        let mut space = SpaceState::default();
        let snap = snapshot(vec![window(1)]);

        reconcile(&mut space, &snap, "1", &AppRules::default());
        let first = space.last_context.clone();

        reconcile(&mut space, &snap, "1", &AppRules::default());
        assert_eq!(space.last_context, first);
    }
}
