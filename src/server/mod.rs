//! The boundary between the core and the window-manager server: a typed
//! [`GridServer`] trait, the window/snapshot data model, and the two
//! concrete implementations (a real Unix-socket JSON-RPC client and an
//! in-memory mock used in tests).
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pure::Rect;

pub mod mock;
pub mod rpc;
pub mod snapshot;

pub use snapshot::parse_dump;

/// Numeric identifier for a window, as assigned by the server.
pub type WindowId = u64;

bitflags! {
    /// The boolean attributes the server reports for a window. Kept as
    /// flags rather than separate `bool` fields so classification can
    /// test membership with `contains`/`intersects` the way window-level
    /// bitmasks are tested elsewhere in this family of tools.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowFlags: u8 {
        const MINIMIZED = 0b001;
        const HIDDEN    = 0b010;
    }
}

/// A window as reported by the server's `dump` RPC.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Window {
    pub id: WindowId,
    pub app: String,
    pub bundle_id: Option<String>,
    pub frame: Rect,
    pub spaces: Vec<String>,
    pub flags: WindowFlags,
    pub level: i32,
    pub subrole: Option<String>,
    pub role: Option<String>,
    pub can_fullscreen: bool,
}

impl Window {
    pub fn is_minimized(&self) -> bool {
        self.flags.contains(WindowFlags::MINIMIZED)
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(WindowFlags::HIDDEN)
    }

    /// `true` for any window-level that is not the normal layer (a
    /// non-zero window level).
    pub fn is_elevated(&self) -> bool {
        self.level != 0
    }
}

/// A parsed, space-scoped view of the server's `dump` result.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub active_space: String,
    pub active_display: Rect,
    pub windows: Vec<Window>,
    pub focused_window: Option<WindowId>,
}

impl Snapshot {
    /// Windows belonging to the given space.
    pub fn windows_on_space<'a>(&'a self, space: &'a str) -> impl Iterator<Item = &'a Window> {
        self.windows.iter().filter(move |w| w.spaces.iter().any(|s| s == space))
    }
}

/// Parameters for the `updateWindow` RPC. Every field but `window_id` is
/// optional, matching the server's params shape (`{ windowId, x?, y?,
/// width?, height?, spaceId?, displayUuid? }`); a geometry change and a
/// move to another space/display can be requested independently or
/// together.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WindowUpdate {
    pub window_id: WindowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_uuid: Option<String>,
}

impl WindowUpdate {
    /// A pure geometry move/resize, as issued by the grid engine.
    pub fn geometry(window_id: WindowId, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            window_id,
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            space_id: None,
            display_uuid: None,
        }
    }

    /// Send a window to a different space, leaving its geometry alone.
    pub fn to_space(window_id: WindowId, space_id: String) -> Self {
        Self { window_id, x: None, y: None, width: None, height: None, space_id: Some(space_id), display_uuid: None }
    }

    /// Send a window to a different display, leaving its geometry alone.
    pub fn to_display(window_id: WindowId, display_uuid: String) -> Self {
        Self { window_id, x: None, y: None, width: None, height: None, space_id: None, display_uuid: Some(display_uuid) }
    }
}

/// Server liveness/capability info, returned by `getServerInfo`.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub platform: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// The opaque RPC peer: the six methods the core actually calls.
/// Framing/correlation is the concrete implementation's concern, not this
/// trait's.
pub trait GridServer {
    /// `ping`: liveness check.
    fn ping(&self) -> Result<()>;
    /// `getServerInfo`.
    fn server_info(&self) -> Result<ServerInfo>;
    /// `dump`, already adapted into a [`Snapshot`] scoped to `space`.
    fn dump(&self, space: &str) -> Result<Snapshot>;
    /// `updateWindow`. Individual failures are represented as `Err` by the
    /// implementation; batching/partial-failure policy lives in the
    /// orchestrator, not here.
    fn update_window(&self, update: WindowUpdate) -> Result<()>;
    /// `window.focus`.
    fn focus_window(&self, id: WindowId) -> Result<()>;
    /// `window.raise`, used as a fallback for focus.
    fn raise_window(&self, id: WindowId) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_update_omits_space_and_display_fields() {
        let update = WindowUpdate::geometry(1, 10, 20, 300, 400);
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v["x"], 10);
        assert!(v.get("spaceId").is_none());
        assert!(v.get("displayUuid").is_none());
    }

    #[test]
    fn to_space_update_omits_geometry_fields() {
        let update = WindowUpdate::to_space(1, "2".into());
        let v = serde_json::to_value(&update).unwrap();
        assert_eq!(v["spaceId"], "2");
        assert!(v.get("x").is_none());
        assert!(v.get("width").is_none());
    }

    #[test]
    fn window_elevated_level_is_excluded_from_tiling() {
        let w = Window {
            id: 1,
            app: "A".into(),
            bundle_id: None,
            frame: Rect::default(),
            spaces: vec!["1".into()],
            flags: WindowFlags::empty(),
            level: 1,
            subrole: None,
            role: None,
            can_fullscreen: true,
        };
        assert!(w.is_elevated());
    }
}
