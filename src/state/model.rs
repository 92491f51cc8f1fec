//! The runtime state data model: what gets persisted between
//! invocations, keyed by space.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::StackMode;
use crate::pure::{ratio, Rect};
use crate::server::WindowId;

/// The current on-disk schema version. Bump this and add a migration to
/// `state::persist::MIGRATIONS` when the shape below changes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// `(focused cell id, focused window index within that cell)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusPointer {
    pub cell: String,
    pub window_index: usize,
}

/// Per-cell persisted state: window order, split ratios, and an optional
/// stack-mode override (invariant: `len(windows) == len(ratios)`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub windows: Vec<WindowId>,
    pub ratios: Vec<f64>,
    pub stack_mode: Option<StackMode>,
}

impl CellState {
    pub fn new(windows: Vec<WindowId>) -> Self {
        let ratios = ratio::initialize(windows.len());
        Self { windows, ratios, stack_mode: None }
    }

    /// Whether this cell state satisfies the window/ratio invariants:
    /// matching lengths, ratios summing to 1, and the minimum-ratio rule.
    pub fn is_valid(&self) -> bool {
        if self.windows.len() != self.ratios.len() {
            return false;
        }
        if self.windows.len() < 2 {
            return self.ratios.iter().all(|r| (r - 1.0).abs() < 1e-9) || self.ratios.is_empty();
        }
        ratio::is_valid(&self.ratios, 1e-4)
    }
}

/// Observed context at the moment of the last reconciliation, kept purely
/// for operator-visible logging, never consulted for
/// semantics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObservedContext {
    pub active_display: Rect,
    pub active_space: String,
    pub focused_window: Option<WindowId>,
}

/// Per-space state: the applied layout, the cycle cursor, every cell's
/// contents, and the current focus pointer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpaceState {
    pub layout_id: Option<String>,
    pub cycle_index: usize,
    pub cells: BTreeMap<String, CellState>,
    pub focus: Option<FocusPointer>,
    pub last_context: Option<ObservedContext>,
}

impl SpaceState {
    /// A space is empty until a layout has been applied.
    pub fn is_empty(&self) -> bool {
        self.layout_id.is_none()
    }

    /// Every window id currently assigned to a cell on this space.
    pub fn assigned_windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.cells.values().flat_map(|c| c.windows.iter().copied())
    }

    /// The focus pointer, if set, must reference a cell that exists and
    /// a window index within bounds.
    pub fn focus_is_valid(&self) -> bool {
        match &self.focus {
            None => true,
            Some(p) => self
                .cells
                .get(&p.cell)
                .map(|c| p.window_index < c.windows.len())
                .unwrap_or(false),
        }
    }
}

/// The full persisted record: schema version plus every space's
/// state.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeState {
    pub schema_version: u32,
    #[serde(default)]
    pub spaces: BTreeMap<String, SpaceState>,
    pub updated_at: DateTime<Utc>,
}

impl RuntimeState {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            spaces: BTreeMap::new(),
            updated_at: now,
        }
    }

    /// Lazily create a space's state on first reference.
    pub fn space_mut(&mut self, space: &str) -> &mut SpaceState {
        self.spaces.entry(space.to_string()).or_default()
    }

    pub fn space(&self, space: &str) -> Option<&SpaceState> {
        self.spaces.get(space)
    }

    /// Every crate-wide invariant, checked in one pass. Used by tests
    /// and by `state show` to flag corruption before it is trusted.
    pub fn is_valid(&self) -> bool {
        self.spaces.values().all(|space| {
            let mut seen = std::collections::HashSet::new();
            let no_cross_cell_duplicates = space
                .cells
                .values()
                .flat_map(|c| c.windows.iter())
                .all(|id| seen.insert(*id));

            no_cross_cell_duplicates
                && space.cells.values().all(CellState::is_valid)
                && space.focus_is_valid()
        })
    }
}
