//! User configuration: settings, layout definitions, per-space defaults
//! and per-application rules. Loading/parsing is an ambient concern;
//! syntax and top-level shape are dictated by the config file formats.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::assignment::AssignmentStrategy;
use crate::error::{Error, Result};
use crate::layout::{Cell, Layout, Span, StackMode};
use crate::pure::track::parse_track_size;

mod areas;

/// A length expressed either as a literal pixel count or as an `Nx`
/// multiplier of the configured base spacing unit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum SpacingValue {
    Pixels(f64),
    Multiplier(String),
}

impl SpacingValue {
    /// Resolve to an absolute pixel length given the base spacing unit.
    pub fn resolve(&self, base: f64) -> Result<f64> {
        match self {
            SpacingValue::Pixels(px) => Ok(*px),
            SpacingValue::Multiplier(raw) => {
                let factor = raw
                    .trim()
                    .strip_suffix('x')
                    .ok_or_else(|| Error::Config(format!("invalid spacing multiplier: {raw}")))?
                    .parse::<f64>()
                    .map_err(|_| Error::Config(format!("invalid spacing multiplier: {raw}")))?;
                Ok(factor * base)
            }
        }
    }
}

impl Default for SpacingValue {
    fn default() -> Self {
        SpacingValue::Pixels(0.0)
    }
}

/// Global settings (`settings` key).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub default_stack_mode: StackMode,
    #[serde(default = "default_base_spacing")]
    pub base_spacing: f64,
    #[serde(default)]
    pub default_padding: SpacingValue,
    #[serde(default)]
    pub window_spacing: SpacingValue,
    #[serde(default)]
    pub focus_follows_mouse: bool,
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

fn default_base_spacing() -> f64 {
    8.0
}

fn default_min_ratio() -> f64 {
    crate::pure::ratio::MIN_RATIO
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_stack_mode: StackMode::default(),
            base_spacing: default_base_spacing(),
            default_padding: SpacingValue::default(),
            window_spacing: SpacingValue::default(),
            focus_follows_mouse: false,
            min_ratio: default_min_ratio(),
        }
    }
}

/// A single cell as it appears in the config file's `cells` list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawCell {
    pub id: String,
    pub column: String,
    pub row: String,
    pub stack_mode: Option<StackMode>,
}

fn parse_span(raw: &str) -> Result<Span> {
    let (start, end) = raw
        .split_once('/')
        .ok_or_else(|| Error::Config(format!("span must be 'start/end': {raw}")))?;
    let start = start
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("invalid span start: {raw}")))?;
    let end = end
        .trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("invalid span end: {raw}")))?;
    Ok(Span::new(start, end))
}

/// A layout as it appears in the config file, before track strings and
/// cell spans are parsed into [`Layout`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawLayout {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub grid: RawGrid,
    #[serde(default)]
    pub cells: Vec<RawCell>,
    #[serde(default)]
    pub areas: Vec<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawGrid {
    pub columns: Vec<String>,
    pub rows: Vec<String>,
}

impl RawLayout {
    pub fn parse(&self) -> Result<Layout> {
        let columns = self
            .grid
            .columns
            .iter()
            .map(|s| parse_track_size(s))
            .collect::<Result<Vec<_>>>()?;
        let rows = self
            .grid
            .rows
            .iter()
            .map(|s| parse_track_size(s))
            .collect::<Result<Vec<_>>>()?;

        let cells = if !self.areas.is_empty() {
            areas::cells_from_areas(&self.areas)?
        } else {
            self.cells
                .iter()
                .map(|c| {
                    Ok(Cell {
                        id: c.id.clone(),
                        columns: parse_span(&c.column)?,
                        rows: parse_span(&c.row)?,
                        stack_mode: c.stack_mode,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        let layout = Layout {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            columns,
            rows,
            cells,
            stack_modes: HashMap::new(),
        };

        layout.validate()?;
        Ok(layout)
    }
}

/// Per-space configuration: which layouts are available, the default, and
/// whether to apply it automatically.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpaceConfig {
    #[serde(default)]
    pub layouts: Vec<String>,
    pub default_layout: Option<String>,
    #[serde(default)]
    pub auto_apply: bool,
}

/// A single `appRules` entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppRule {
    pub app: Option<String>,
    pub bundle_id: Option<String>,
    pub preferred_cell: Option<String>,
    #[serde(default)]
    pub layouts: Vec<String>,
    #[serde(default)]
    pub float: bool,
    pub preferred_stack_mode: Option<StackMode>,
}

impl AppRule {
    fn matches(&self, app: &str, bundle_id: Option<&str>) -> bool {
        let app_match = self.app.as_deref().map(|a| a == app).unwrap_or(false);
        let bundle_match = match (&self.bundle_id, bundle_id) {
            (Some(rule_bundle), Some(window_bundle)) => rule_bundle == window_bundle,
            _ => false,
        };
        app_match || bundle_match
    }
}

/// The full set of `appRules`, queried by the assignment engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AppRules {
    pub rules: Vec<AppRule>,
}

impl AppRules {
    pub fn wants_float(&self, app: &str, bundle_id: Option<&str>) -> bool {
        self.rules.iter().any(|r| r.matches(app, bundle_id) && r.float)
    }

    pub fn preferred_cell(&self, app: &str, bundle_id: Option<&str>) -> Option<String> {
        self.rules
            .iter()
            .find(|r| r.matches(app, bundle_id))
            .and_then(|r| r.preferred_cell.clone())
    }

    pub fn preferred_stack_mode(&self, app: &str, bundle_id: Option<&str>) -> Option<StackMode> {
        self.rules
            .iter()
            .find(|r| r.matches(app, bundle_id))
            .and_then(|r| r.preferred_stack_mode)
    }
}

/// The fully parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub settings: Settings,
    pub layouts: Vec<Layout>,
    pub spaces: HashMap<String, SpaceConfig>,
    pub app_rules: AppRules,
}

/// The raw, pre-parse shape of the config file.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    layouts: Vec<RawLayout>,
    #[serde(default)]
    spaces: HashMap<String, SpaceConfig>,
    #[serde(default)]
    app_rules: Vec<AppRule>,
}

impl Config {
    fn from_raw(raw: RawConfig) -> Result<Self> {
        let layouts = raw
            .layouts
            .iter()
            .map(RawLayout::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut seen = std::collections::HashSet::new();
        for l in &layouts {
            if !seen.insert(&l.id) {
                return Err(Error::Config(format!("duplicate layout id: {}", l.id)));
            }
        }

        Ok(Config {
            settings: raw.settings,
            layouts,
            spaces: raw.spaces,
            app_rules: AppRules { rules: raw.app_rules },
        })
    }

    pub fn layout(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            settings: Settings::default(),
            layouts: Vec::new(),
            spaces: HashMap::new(),
            app_rules: AppRules::default(),
        }
    }
}

/// Directories following the platform's config convention.
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "grid-ctl")
        .ok_or_else(|| Error::Config("could not determine a home directory for this platform".into()))
}

/// Resolve the path to the config file, trying `.yaml`, `.yml`, then
/// `.json` in that order under the platform config directory.
pub fn resolve_path() -> Result<Option<PathBuf>> {
    let dirs = project_dirs()?;
    let base = dirs.config_dir();

    for ext in ["yaml", "yml", "json"] {
        let candidate = base.join(format!("config.{ext}"));
        if candidate.exists() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Load configuration from `path`, selecting the parser by file extension.
pub fn load_from(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;

    let raw: RawConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)?,
        _ => serde_yaml::from_str(&text)?,
    };

    Config::from_raw(raw)
}

/// Load the user's config, or a default empty one if no file exists.
pub fn load_or_default() -> Result<Config> {
    match resolve_path()? {
        Some(path) => load_from(&path),
        None => Ok(Config::default()),
    }
}

/// Load the user's config, treating a missing file as fatal. Used by
/// `config show`/`config validate`, which asked to see something concrete.
pub fn load_required() -> Result<Config> {
    match resolve_path()? {
        Some(path) => load_from(&path),
        None => Err(Error::Config("no config file found".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_multiplier_resolves_against_base() {
        let v = SpacingValue::Multiplier("2x".into());
        assert_eq!(v.resolve(8.0).unwrap(), 16.0);
    }

    #[test]
    fn spacing_pixels_ignores_base() {
        let v = SpacingValue::Pixels(12.0);
        assert_eq!(v.resolve(8.0).unwrap(), 12.0);
    }

    #[test]
    fn parses_cells_form() {
        let raw = RawLayout {
            id: "l".into(),
            name: None,
            description: None,
            grid: RawGrid { columns: vec!["1fr".into(), "1fr".into()], rows: vec!["1fr".into()] },
            cells: vec![
                RawCell { id: "left".into(), column: "1/2".into(), row: "1/2".into(), stack_mode: None },
                RawCell { id: "right".into(), column: "2/3".into(), row: "1/2".into(), stack_mode: None },
            ],
            areas: vec![],
        };

        let parsed = raw.parse().unwrap();
        assert_eq!(parsed.cells.len(), 2);
    }

    #[test]
    fn app_rules_match_by_app_name() {
        let rules = AppRules {
            rules: vec![AppRule {
                app: Some("Finder".into()),
                float: true,
                ..Default::default()
            }],
        };
        assert!(rules.wants_float("Finder", None));
        assert!(!rules.wants_float("Terminal", None));
    }
}
