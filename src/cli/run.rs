//! Dispatches a parsed [`Cli`] command to the core, wiring together
//! config, runtime state and the RPC client. Kept thin: no
//! business logic lives here that doesn't already live in a core module.
use std::time::Duration;

use serde_json::json;
use tracing::info;

use crate::assignment::AssignmentStrategy;
use crate::cli::args::{
    CellAction, Cli, Command, ConfigAction, FocusAction, LayoutAction, ListTarget, ResizeAction, ShowTarget,
    StateAction, WindowAction,
};
use crate::config::{self, Config};
use crate::error::{Error, Result};
use crate::focus;
use crate::layout::orchestrator::{self, effective_gap, effective_padding, effective_stack_mode};
use crate::pure::ratio;
use crate::reconcile;
use crate::server::rpc::RpcClient;
use crate::server::{GridServer, Snapshot, WindowUpdate};
use crate::state::StateStore;

/// Run the command described by `cli`, printing to stdout and returning
/// `Ok(())` on success. Errors propagate to the caller, which maps them
/// to a process exit code ("non-zero on any fatal error").
pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Config { action } => return run_config(action, cli.json),
        _ => {}
    }

    let server = RpcClient::connect(&cli.socket, Duration::from_millis(cli.timeout_ms))?;
    let config = config::load_or_default()?;

    match &cli.command {
        Command::Ping => ping(&server, cli.json),
        Command::Info => info_cmd(&server, cli.json),
        Command::Dump { space } => dump(&server, space.as_deref(), cli.json),
        Command::List { what } => list(&server, what, cli.json),
        Command::Window { action } => window(&server, &config, action, cli.json),
        Command::Layout { action } => layout_cmd(&server, &config, action, cli.json),
        Command::Focus { action } => focus_cmd(&server, &config, action, cli.json),
        Command::Resize { action } => resize_cmd(&server, &config, action, cli.json),
        Command::Cell { action } => cell_cmd(&server, &config, action, cli.json),
        Command::State { action } => state_cmd(&server, action, cli.json),
        Command::Render => render(&server, &config, cli.json),
        Command::Show { target } => show(&server, &config, target, cli.json),
        Command::Config { .. } => unreachable!("handled above"),
    }
}

fn print_line(json_mode: bool, value: serde_json::Value, plain: impl FnOnce() -> String) {
    if json_mode {
        println!("{value}");
    } else {
        println!("{}", plain());
    }
}

fn ping(server: &RpcClient, json_mode: bool) -> Result<()> {
    server.ping()?;
    print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
    Ok(())
}

fn info_cmd(server: &RpcClient, json_mode: bool) -> Result<()> {
    let info = server.server_info()?;
    print_line(
        json_mode,
        json!({ "name": info.name, "version": info.version, "platform": info.platform, "capabilities": info.capabilities }),
        || format!("{} {} ({})", info.name, info.version, info.platform),
    );
    Ok(())
}

fn fetch_snapshot(server: &dyn GridServer, space: Option<&str>) -> Result<Snapshot> {
    let mut snap = server.dump(space.unwrap_or(""))?;
    if space.is_none() {
        // The initial call may not have known the active space; if the
        // server told us, nothing further is needed since `dump` doesn't
        // actually filter server-side — the snapshot already
        // carries every window regardless of the space argument.
        let _ = &mut snap;
    }
    Ok(snap)
}

fn dump(server: &RpcClient, space: Option<&str>, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, space)?;
    print_line(
        json_mode,
        json!({
            "activeSpace": snap.active_space,
            "activeDisplay": snap.active_display,
            "focusedWindow": snap.focused_window,
            "windowCount": snap.windows.len(),
        }),
        || format!("space {} — {} windows", snap.active_space, snap.windows.len()),
    );
    Ok(())
}

fn list(server: &RpcClient, what: &ListTarget, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;

    match what {
        ListTarget::Windows => {
            print_line(json_mode, json!(snap.windows), || {
                snap.windows.iter().map(|w| format!("{}\t{}", w.id, w.app)).collect::<Vec<_>>().join("\n")
            });
        }
        ListTarget::Spaces => {
            let spaces: std::collections::BTreeSet<&str> =
                snap.windows.iter().flat_map(|w| w.spaces.iter().map(String::as_str)).collect();
            print_line(json_mode, json!(spaces), || spaces.iter().cloned().collect::<Vec<_>>().join("\n"));
        }
        ListTarget::Displays => {
            print_line(json_mode, json!([snap.active_display]), || format!("{:?}", snap.active_display));
        }
        ListTarget::Apps => {
            let apps: std::collections::BTreeSet<&str> = snap.windows.iter().map(|w| w.app.as_str()).collect();
            print_line(json_mode, json!(apps), || apps.iter().cloned().collect::<Vec<_>>().join("\n"));
        }
    }
    Ok(())
}

fn window(server: &RpcClient, _config: &Config, action: &WindowAction, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;

    match action {
        WindowAction::Get { id } => {
            let w = snap
                .windows
                .iter()
                .find(|w| w.id == *id)
                .ok_or_else(|| Error::MissingEntity(format!("no window with id {id}")))?;
            print_line(json_mode, json!(w), || format!("{w:?}"));
        }
        WindowAction::Find { app } => {
            let matches: Vec<_> = snap.windows.iter().filter(|w| w.app.eq_ignore_ascii_case(app)).collect();
            print_line(json_mode, json!(matches), || {
                matches.iter().map(|w| w.id.to_string()).collect::<Vec<_>>().join("\n")
            });
        }
        WindowAction::Update { id, x, y, width, height } => {
            let current = snap.windows.iter().find(|w| w.id == *id);
            let (cx, cy, cw, ch) = current.map(|w| w.frame.rounded()).unwrap_or((0, 0, 0, 0));
            server.update_window(WindowUpdate::geometry(
                *id,
                x.unwrap_or(cx),
                y.unwrap_or(cy),
                width.unwrap_or(cw),
                height.unwrap_or(ch),
            ))?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        WindowAction::ToSpace { id, space } => {
            server.update_window(WindowUpdate::to_space(*id, space.clone()))?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        WindowAction::ToDisplay { id, display } => {
            server.update_window(WindowUpdate::to_display(*id, display.clone()))?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        WindowAction::Move { dir, wrap, extend: _ } => {
            let store = StateStore::load()?;
            let config = config::load_or_default()?;
            reconcile_and_autoplace(&config, server, &store, &snap)?;
            let layout_def = space_layout(&store, &config, &snap)?;
            let gap = effective_gap(&config);
            let calc = crate::pure::grid::compute_layout(&layout_def, snap.active_display, gap);

            store.write(|state| -> Result<()> {
                let space_state = state.space_mut(&snap.active_space);
                let outcome = focus::send(&config, &layout_def, &calc, space_state, server, gap, (*dir).into());
                match outcome? {
                    Some(target) => print_line(json_mode, json!({ "moved": true, "target": target }), || format!("moved to {target}")),
                    None => print_line(json_mode, json!({ "moved": false }), || "nothing to do".to_string()),
                }
                let _ = wrap; // send never wraps; accepted for CLI surface symmetry with focus.
                Ok(())
            })?;
            store.persist()?;
        }
    }
    Ok(())
}

/// Drop stale window references from the active space's state and place
/// any newly-arrived tileable window with the `preserve` strategy when a
/// layout is already applied. Called by every command that reads or
/// mutates per-space state but doesn't already go through
/// `orchestrator::apply` itself (which assigns the full window set from
/// scratch and so needs no separate auto-place step).
fn reconcile_and_autoplace(config: &Config, server: &dyn GridServer, store: &StateStore, snap: &Snapshot) -> Result<()> {
    store.write(|state| -> Result<()> {
        let space_state = state.space_mut(&snap.active_space);
        let report = reconcile::reconcile(space_state, snap, &snap.active_space, &config.app_rules);
        orchestrator::autoplace_new_windows(config, space_state, snap, server, &snap.active_space, &report)?;
        Ok(())
    })
}

fn space_layout(store: &StateStore, config: &Config, snap: &Snapshot) -> Result<crate::layout::Layout> {
    let layout_id = store
        .read(|s| s.space(&snap.active_space).and_then(|sp| sp.layout_id.clone()))
        .ok_or_else(|| Error::MissingEntity(format!("space {:?} has no applied layout", snap.active_space)))?;
    config
        .layout(&layout_id)
        .cloned()
        .ok_or_else(|| Error::MissingEntity(format!("no layout named {layout_id:?}")))
}

fn layout_cmd(server: &RpcClient, config: &Config, action: &LayoutAction, json_mode: bool) -> Result<()> {
    match action {
        LayoutAction::List => {
            let ids: Vec<&str> = config.layouts.iter().map(|l| l.id.as_str()).collect();
            print_line(json_mode, json!(ids), || ids.join("\n"));
        }
        LayoutAction::Show { id } => {
            let layout = config.layout(id).ok_or_else(|| Error::MissingEntity(format!("no layout named {id:?}")))?;
            print_line(json_mode, json!(layout), || format!("{layout:?}"));
        }
        LayoutAction::Apply { id, strategy } => {
            let strategy = strategy
                .as_deref()
                .map(|s| AssignmentStrategy::parse(s).ok_or_else(|| Error::Config(format!("unknown strategy: {s}"))))
                .transpose()?
                .unwrap_or_else(AssignmentStrategy::default_strategy);

            let snap = fetch_snapshot(server, None)?;
            let store = StateStore::load()?;

            let outcome = store.write(|state| -> Result<orchestrator::ApplyOutcome> {
                let space_state = state.space_mut(&snap.active_space);
                reconcile::reconcile(space_state, &snap, &snap.active_space, &config.app_rules);
                orchestrator::apply(config, space_state, &snap, server, &snap.active_space, id, strategy)
            })?;
            store.persist()?;

            print_line(
                json_mode,
                json!({ "layout": outcome.layout_id, "placements": outcome.placements, "failures": outcome.failures }),
                || format!("applied {} ({} placed, {} failed)", outcome.layout_id, outcome.placements, outcome.failures),
            );
        }
        LayoutAction::Cycle => {
            let snap = fetch_snapshot(server, None)?;
            let store = StateStore::load()?;
            let outcome = store.write(|state| -> Result<orchestrator::ApplyOutcome> {
                let space_state = state.space_mut(&snap.active_space);
                reconcile::reconcile(space_state, &snap, &snap.active_space, &config.app_rules);
                orchestrator::cycle(config, space_state, &snap, server, &snap.active_space)
            })?;
            store.persist()?;
            print_line(json_mode, json!({ "layout": outcome.layout_id }), || format!("cycled to {}", outcome.layout_id));
        }
        LayoutAction::Current => {
            let snap = fetch_snapshot(server, None)?;
            let store = StateStore::load()?;
            let current = store.read(|s| s.space(&snap.active_space).and_then(|sp| sp.layout_id.clone()));
            print_line(json_mode, json!({ "layout": current }), || current.unwrap_or_else(|| "none".to_string()));
        }
        LayoutAction::Reapply => {
            let snap = fetch_snapshot(server, None)?;
            let store = StateStore::load()?;
            let outcome = store.write(|state| -> Result<orchestrator::ApplyOutcome> {
                let space_state = state.space_mut(&snap.active_space);
                reconcile::reconcile(space_state, &snap, &snap.active_space, &config.app_rules);
                orchestrator::reapply(config, space_state, &snap, server, &snap.active_space, AssignmentStrategy::Preserve)
            })?;
            store.persist()?;
            print_line(json_mode, json!({ "layout": outcome.layout_id }), || format!("reapplied {}", outcome.layout_id));
        }
    }
    Ok(())
}

fn focus_cmd(server: &RpcClient, config: &Config, action: &FocusAction, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;
    let store = StateStore::load()?;
    reconcile_and_autoplace(config, server, &store, &snap)?;

    match action {
        FocusAction::Cell { id } => {
            store.write(|state| -> Result<()> {
                let space_state = state.space_mut(&snap.active_space);
                focus::focus_cell(space_state, server, id)
            })?;
            store.persist()?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        FocusAction::Next => {
            store.write(|state| focus::cycle_within_cell(state.space_mut(&snap.active_space), 1))?;
            store.persist()?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        FocusAction::Prev => {
            store.write(|state| focus::cycle_within_cell(state.space_mut(&snap.active_space), -1))?;
            store.persist()?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
        FocusAction::Left { wrap, extend: _ }
        | FocusAction::Right { wrap, extend: _ }
        | FocusAction::Up { wrap, extend: _ }
        | FocusAction::Down { wrap, extend: _ } => {
            let dir = match action {
                FocusAction::Left { .. } => crate::pure::Direction::Left,
                FocusAction::Right { .. } => crate::pure::Direction::Right,
                FocusAction::Up { .. } => crate::pure::Direction::Up,
                FocusAction::Down { .. } => crate::pure::Direction::Down,
                _ => unreachable!(),
            };

            let layout_def = space_layout(&store, config, &snap)?;
            let calc = crate::pure::grid::compute_layout(&layout_def, snap.active_display, effective_gap(config));
            let current_cell = store.read(|s| s.space(&snap.active_space).and_then(|sp| sp.focus.clone()).map(|f| f.cell));
            let current_cell = current_cell.ok_or(Error::NoDirectionalTarget)?;

            match focus::resolve_target(&calc, &current_cell, dir, *wrap) {
                Some(target) => {
                    store.write(|state| focus::focus_cell(state.space_mut(&snap.active_space), server, &target))?;
                    store.persist()?;
                    print_line(json_mode, json!({ "focused": target }), || format!("focused {target}"));
                }
                None => print_line(json_mode, json!({ "focused": false }), || "nothing to do".to_string()),
            }
        }
    }
    Ok(())
}

fn resize_cmd(server: &RpcClient, config: &Config, action: &ResizeAction, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;
    let store = StateStore::load()?;
    reconcile_and_autoplace(config, server, &store, &snap)?;
    let layout_def = space_layout(&store, config, &snap)?;
    let calc = crate::pure::grid::compute_layout(&layout_def, snap.active_display, effective_gap(config));

    let min_ratio = config.settings.min_ratio;
    let gap = effective_gap(config);
    let padding = effective_padding(config);

    store.write(|state| -> Result<()> {
        let space_state = state.space_mut(&snap.active_space);
        let cell_id = space_state
            .focus
            .as_ref()
            .map(|f| f.cell.clone())
            .ok_or_else(|| Error::MissingEntity("no focused cell".into()))?;
        let cell = space_state
            .cells
            .get_mut(&cell_id)
            .ok_or_else(|| Error::MissingEntity(format!("focused cell {cell_id:?} no longer exists")))?;

        match action {
            ResizeAction::Grow { delta } => {
                cell.ratios = ratio::adjust(&cell.ratios, 0, *delta, min_ratio)?;
            }
            ResizeAction::Shrink { delta } => {
                cell.ratios = ratio::adjust(&cell.ratios, 0, -*delta, min_ratio)?;
            }
            ResizeAction::Reset => {
                cell.ratios = ratio::initialize(cell.windows.len());
            }
        }

        let mode = effective_stack_mode(config, &layout_def, &cell_id, Some(&*cell));
        let rect = calc.cell_rect(&cell_id).unwrap_or_default();
        let inset = crate::pure::grid::apply_padding(rect, padding);
        let rects = crate::pure::grid::window_rects_in_cell(inset, cell.windows.len(), mode, &cell.ratios, gap);

        for (id, r) in cell.windows.iter().zip(rects.iter()) {
            let (x, y, width, height) = r.rounded();
            server.update_window(WindowUpdate::geometry(*id, x, y, width, height))?;
        }

        Ok(())
    })?;
    store.persist()?;

    print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
    Ok(())
}

fn cell_cmd(server: &RpcClient, config: &Config, action: &CellAction, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;
    let store = StateStore::load()?;
    reconcile_and_autoplace(config, server, &store, &snap)?;
    let layout_def = space_layout(&store, config, &snap)?;
    let gap = effective_gap(config);
    let calc = crate::pure::grid::compute_layout(&layout_def, snap.active_display, gap);

    match action {
        CellAction::Send { target } => {
            store.write(|state| -> Result<()> {
                let space_state = state.space_mut(&snap.active_space);
                let pointer = space_state.focus.clone().ok_or(Error::NoDirectionalTarget)?;
                let window_id = space_state
                    .cells
                    .get(&pointer.cell)
                    .and_then(|c| c.windows.get(pointer.window_index).copied())
                    .ok_or(Error::NoDirectionalTarget)?;

                focus::send_to_cell(config, &layout_def, &calc, space_state, server, gap, &pointer.cell, window_id, target)
            })?;
            store.persist()?;
            print_line(json_mode, json!({ "moved": true, "target": target }), || format!("moved to {target}"));
        }
    }
    Ok(())
}

fn state_cmd(server: &RpcClient, action: &StateAction, json_mode: bool) -> Result<()> {
    match action {
        StateAction::Show => {
            let store = StateStore::load()?;
            let snapshot = store.snapshot();
            print_line(json_mode, json!(snapshot), || format!("{snapshot:?}"));
        }
        StateAction::Reset { all } => {
            let store = StateStore::load()?;
            if *all {
                store.write(|state| state.spaces.clear());
            } else {
                let snap = fetch_snapshot(server, None)?;
                store.write(|state| {
                    state.spaces.remove(&snap.active_space);
                });
            }
            store.persist()?;
            print_line(json_mode, json!({ "ok": true }), || "ok".to_string());
        }
    }
    Ok(())
}

fn render(server: &RpcClient, config: &Config, json_mode: bool) -> Result<()> {
    let snap = fetch_snapshot(server, None)?;
    let store = StateStore::load()?;
    let layout_def = space_layout(&store, config, &snap)?;
    let calc = crate::pure::grid::compute_layout(&layout_def, snap.active_display, effective_gap(config));

    print_line(json_mode, json!(calc.cells), || {
        let mut ids: Vec<&String> = calc.cells.keys().collect();
        ids.sort();
        ids.iter().map(|id| format!("{id}: {:?}", calc.cells[*id])).collect::<Vec<_>>().join("\n")
    });
    Ok(())
}

fn show(server: &RpcClient, config: &Config, target: &ShowTarget, json_mode: bool) -> Result<()> {
    match target {
        ShowTarget::Layout => render(server, config, json_mode),
        ShowTarget::Display => {
            let snap = fetch_snapshot(server, None)?;
            print_line(json_mode, json!(snap.active_display), || format!("{:?}", snap.active_display));
            Ok(())
        }
    }
}

fn run_config(action: &ConfigAction, json_mode: bool) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = config::load_required()?;
            print_line(json_mode, json!(config.settings), || format!("{:?}", config.settings));
        }
        ConfigAction::Validate => {
            config::load_required()?;
            print_line(json_mode, json!({ "valid": true }), || "config is valid".to_string());
        }
        ConfigAction::Init => {
            let dirs = config::project_dirs()?;
            let path = dirs.config_dir().join("config.yaml");
            if path.exists() {
                return Err(Error::Config(format!("{} already exists", path.display())));
            }
            std::fs::create_dir_all(dirs.config_dir())?;
            std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
            info!(path = %path.display(), "wrote default config");
            print_line(json_mode, json!({ "path": path.to_string_lossy() }), || format!("wrote {}", path.display()));
        }
    }
    Ok(())
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"settings:
  defaultStackMode: vertical
  baseSpacing: 8
  focusFollowsMouse: false

layouts:
  - id: main-stack
    grid:
      columns: ["2fr", "1fr"]
      rows: ["1fr"]
    cells:
      - id: main
        column: "1/2"
        row: "1/2"
      - id: stack
        column: "2/3"
        row: "1/2"

spaces: {}
appRules: []
"#;
