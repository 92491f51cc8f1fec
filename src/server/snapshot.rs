//! Converts the generic JSON object returned by the server's `dump`
//! method into a typed, space-scoped [`Snapshot`].
use serde_json::Value;

use crate::error::{Error, Result};
use crate::pure::Rect;
use crate::server::{Snapshot, Window};

/// Parse the `result` object of a `dump` RPC response, scoping the window
/// list to `target_space`.
pub fn parse_dump(raw: &Value, target_space: &str) -> Result<Snapshot> {
    let metadata = raw
        .get("metadata")
        .ok_or_else(|| Error::ServerUnavailable("dump result missing metadata".into()))?;

    let active_space = metadata
        .get("activeSpace")
        .and_then(Value::as_str)
        .unwrap_or(target_space)
        .to_string();

    let focused_window = metadata.get("focusedWindowId").and_then(coerce_u64);

    let active_display_uuid = metadata.get("activeDisplay").and_then(Value::as_str);

    let displays = raw
        .get("displays")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let active_display = displays
        .iter()
        .find(|d| {
            active_display_uuid
                .map(|uuid| d.get("uuid").and_then(Value::as_str) == Some(uuid))
                .unwrap_or(true)
        })
        .or_else(|| displays.first())
        .map(display_rect)
        .transpose()?
        .unwrap_or_default();

    let windows = raw
        .get("windows")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(parse_window).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    Ok(Snapshot {
        active_space,
        active_display,
        windows,
        focused_window,
    })
}

fn display_rect(display: &Value) -> Result<Rect> {
    let frame = display
        .get("visibleFrame")
        .or_else(|| display.get("frame"))
        .ok_or_else(|| Error::ServerUnavailable("display missing frame/visibleFrame".into()))?;

    parse_rect(frame)
}

/// Tolerates both `{x, y, w, h}`/`{x, y, width, height}` object forms and a
/// two-pair-array form `[[x, y], [w, h]]`.
fn parse_rect(v: &Value) -> Result<Rect> {
    if let Some(arr) = v.as_array() {
        if arr.len() == 2 {
            let origin = arr[0]
                .as_array()
                .ok_or_else(|| Error::ServerUnavailable("malformed rect array".into()))?;
            let extent = arr[1]
                .as_array()
                .ok_or_else(|| Error::ServerUnavailable("malformed rect array".into()))?;
            return Ok(Rect::new(
                coerce_f64(&origin[0])?,
                coerce_f64(&origin[1])?,
                coerce_f64(&extent[0])?,
                coerce_f64(&extent[1])?,
            ));
        }
    }

    let x = field_f64(v, &["x"])?;
    let y = field_f64(v, &["y"])?;
    let w = field_f64(v, &["w", "width"])?;
    let h = field_f64(v, &["h", "height"])?;

    Ok(Rect::new(x, y, w, h))
}

fn field_f64(v: &Value, names: &[&str]) -> Result<f64> {
    for name in names {
        if let Some(inner) = v.get(name) {
            return coerce_f64(inner);
        }
    }
    Err(Error::ServerUnavailable(format!(
        "rect missing field among {names:?}"
    )))
}

/// Coerce either a JSON integer or a JSON float into `f64`.
fn coerce_f64(v: &Value) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| Error::ServerUnavailable(format!("expected a number, got {v}")))
}

fn coerce_u64(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))
}

fn parse_window(v: &Value) -> Result<Window> {
    let id = v
        .get("id")
        .and_then(coerce_u64)
        .ok_or_else(|| Error::ServerUnavailable("window missing id".into()))?;

    let app = v
        .get("app")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let bundle_id = v.get("bundleId").and_then(Value::as_str).map(String::from);

    let frame = v
        .get("frame")
        .map(parse_rect)
        .transpose()?
        .unwrap_or_default();

    let spaces = v
        .get("spaces")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(String::from).or_else(|| s.as_u64().map(|n| n.to_string())))
                .collect()
        })
        .unwrap_or_default();

    let mut flags = crate::server::WindowFlags::empty();
    if v.get("minimized").and_then(Value::as_bool).unwrap_or(false) {
        flags |= crate::server::WindowFlags::MINIMIZED;
    }
    if v.get("hidden").and_then(Value::as_bool).unwrap_or(false) {
        flags |= crate::server::WindowFlags::HIDDEN;
    }
    let level = v
        .get("level")
        .and_then(Value::as_i64)
        .unwrap_or(0) as i32;

    let subrole = v.get("subrole").and_then(Value::as_str).map(String::from);
    let role = v.get("role").and_then(Value::as_str).map(String::from);
    let can_fullscreen = v
        .get("canFullscreen")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    Ok(Window {
        id,
        app,
        bundle_id,
        frame,
        spaces,
        flags,
        level,
        subrole,
        role,
        can_fullscreen,
    })
}
