//! The assignment engine: window classification and the four strategies
//! that map a window set onto a layout's cells.
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::AppRules;
use crate::layout::CalculatedLayout;
use crate::server::{Window, WindowId};

/// Known terminal/editor applications exempted from the "lacks a
/// fullscreen affordance" floating heuristic.
const FULLSCREEN_EXCEPTION_APPS: &[&str] = &["Terminal", "iTerm2", "kitty", "Alacritty", "WezTerm", "Code", "Xcode"];

/// How a window was classified for tiling eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Excluded,
    Floating,
    Tileable,
}

/// Classify a single window, consulting `rules` for an
/// explicit float flag before falling back to the accessibility-metadata
/// heuristics.
pub fn classify(window: &Window, rules: &AppRules) -> Classification {
    if window.is_minimized() || window.is_hidden() || window.is_elevated() {
        return Classification::Excluded;
    }

    if rules.wants_float(&window.app, window.bundle_id.as_deref()) {
        return Classification::Floating;
    }

    let is_dialog_like = matches!(
        window.subrole.as_deref(),
        Some("AXDialog") | Some("AXSystemDialog") | Some("AXFloatingWindow")
    );
    if is_dialog_like {
        return Classification::Floating;
    }

    if !window.can_fullscreen && !FULLSCREEN_EXCEPTION_APPS.contains(&window.app.as_str()) {
        return Classification::Floating;
    }

    Classification::Tileable
}

/// One of the four strategies that map tileable windows onto cells.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AssignmentStrategy {
    AutoFlow,
    Pinned,
    Preserve,
    ByPosition,
}

impl AssignmentStrategy {
    /// Parse a strategy name from config, accepting a few historical
    /// spellings of each (`auto-flow`/`auto_flow`/`autoflow`,
    /// `by-position`/`by_position`/`byposition`/`positional`); callers that
    /// need *a* default should use [`AssignmentStrategy::default_strategy`]
    /// rather than guessing.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "auto-flow" | "auto_flow" | "autoflow" => Some(AssignmentStrategy::AutoFlow),
            "pinned" => Some(AssignmentStrategy::Pinned),
            "preserve" => Some(AssignmentStrategy::Preserve),
            "by-position" | "by_position" | "byposition" | "positional" => {
                Some(AssignmentStrategy::ByPosition)
            }
            _ => None,
        }
    }

    /// The canonical default strategy when configuration is silent.
    pub fn default_strategy() -> Self {
        AssignmentStrategy::AutoFlow
    }
}

/// The outcome of running an assignment strategy: three disjoint sets
/// covering the full input window list ("Assignment coverage"
/// property).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    pub assignments: BTreeMap<String, Vec<WindowId>>,
    pub floating: BTreeSet<WindowId>,
    pub excluded: BTreeSet<WindowId>,
}

/// Previously persisted per-cell window order, used by the `preserve`
/// strategy.
pub type PreviousAssignment = BTreeMap<String, Vec<WindowId>>;

/// Run `strategy` against `windows`, restricted to the cells present in
/// `layout`.
pub fn assign(
    strategy: AssignmentStrategy,
    windows: &[Window],
    layout: &CalculatedLayout,
    rules: &AppRules,
    previous: &PreviousAssignment,
) -> AssignmentResult {
    let mut result = AssignmentResult::default();
    let mut tileable: Vec<&Window> = Vec::new();

    for w in windows {
        match classify(w, rules) {
            Classification::Excluded => {
                result.excluded.insert(w.id);
            }
            Classification::Floating => {
                result.floating.insert(w.id);
            }
            Classification::Tileable => tileable.push(w),
        }
    }

    let cell_ids: Vec<String> = {
        let mut ids: Vec<String> = layout.cells.keys().cloned().collect();
        ids.sort();
        ids
    };

    if cell_ids.is_empty() {
        return result;
    }

    for id in &cell_ids {
        result.assignments.entry(id.clone()).or_default();
    }

    match strategy {
        AssignmentStrategy::AutoFlow => auto_flow(&tileable, layout, &mut result),
        AssignmentStrategy::Pinned => pinned(&tileable, &cell_ids, rules, &mut result),
        AssignmentStrategy::Preserve => preserve(&tileable, &cell_ids, previous, &mut result),
        AssignmentStrategy::ByPosition => by_position(&tileable, layout, &cell_ids, &mut result),
    }

    result
}

/// The cell id with the fewest assigned windows so far, alphabetical
/// tiebreak (determinism rule).
fn least_populated(cell_ids: &[String], result: &AssignmentResult) -> String {
    cell_ids
        .iter()
        .min_by_key(|id| {
            (
                result.assignments.get(*id).map(Vec::len).unwrap_or(0),
                (*id).clone(),
            )
        })
        .cloned()
        .unwrap_or_else(|| cell_ids[0].clone())
}

fn auto_flow(tileable: &[&Window], layout: &CalculatedLayout, result: &mut AssignmentResult) {
    let ordered_cells = layout.cells_by_visual_position();
    if ordered_cells.is_empty() {
        return;
    }

    for (i, w) in tileable.iter().enumerate() {
        let cell = &ordered_cells[i % ordered_cells.len()];
        result.assignments.entry(cell.clone()).or_default().push(w.id);
    }
}

fn pinned(tileable: &[&Window], cell_ids: &[String], rules: &AppRules, result: &mut AssignmentResult) {
    let mut remaining = Vec::new();

    for w in tileable {
        match rules.preferred_cell(&w.app, w.bundle_id.as_deref()) {
            Some(cell_id) if cell_ids.contains(&cell_id) => {
                result.assignments.entry(cell_id).or_default().push(w.id);
            }
            _ => remaining.push(*w),
        }
    }

    for w in remaining {
        let empty_cell = cell_ids
            .iter()
            .find(|id| result.assignments.get(*id).map(Vec::len).unwrap_or(0) == 0);

        let target = match empty_cell {
            Some(id) => id.clone(),
            None => least_populated(cell_ids, result),
        };

        result.assignments.entry(target).or_default().push(w.id);
    }
}

fn preserve(
    tileable: &[&Window],
    cell_ids: &[String],
    previous: &PreviousAssignment,
    result: &mut AssignmentResult,
) {
    for w in tileable {
        let prior_cell = previous
            .iter()
            .find(|(cell_id, ids)| cell_ids.contains(cell_id) && ids.contains(&w.id))
            .map(|(cell_id, _)| cell_id.clone());

        let target = match prior_cell {
            Some(cell_id) => cell_id,
            None => least_populated(cell_ids, result),
        };

        result.assignments.entry(target).or_default().push(w.id);
    }

    // Reorder within each cell to retain prior relative order; new arrivals
    // (never seen in `previous`) keep whatever order they were appended in.
    for (cell_id, ids) in previous {
        let Some(current) = result.assignments.get_mut(cell_id) else {
            continue;
        };
        let current_set: BTreeSet<WindowId> = current.iter().copied().collect();
        let mut reordered: Vec<WindowId> = ids.iter().copied().filter(|id| current_set.contains(id)).collect();
        let known: BTreeSet<WindowId> = reordered.iter().copied().collect();
        reordered.extend(current.iter().copied().filter(|id| !known.contains(id)));
        *current = reordered;
    }
}

fn by_position(
    tileable: &[&Window],
    layout: &CalculatedLayout,
    cell_ids: &[String],
    result: &mut AssignmentResult,
) {
    for w in tileable {
        let best = cell_ids
            .iter()
            .map(|id| (id, layout.cells[id].overlap_area(&w.frame)))
            .filter(|(_, area)| *area > 0.0)
            .max_by(|(id_a, area_a), (id_b, area_b)| area_a.total_cmp(area_b).then_with(|| id_b.cmp(id_a)))
            .map(|(id, _)| id.clone());

        let target = best.unwrap_or_else(|| least_populated(cell_ids, result));
        result.assignments.entry(target).or_default().push(w.id);
    }
}
