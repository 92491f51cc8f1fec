//! The command-line surface: a thin shell over the core. Parsing
//! is handled entirely by `clap`'s derive API; no business logic lives
//! here.
use clap::{Parser, Subcommand};

use crate::pure::Direction;

#[derive(Parser, Debug)]
#[command(name = "grid", version, about = "Layout engine and CLI client for a tiling window manager server")]
pub struct Cli {
    /// Path to the server's Unix-domain socket.
    #[arg(long, global = true, default_value = crate::server::rpc::DEFAULT_SOCKET_PATH)]
    pub socket: String,

    /// RPC request timeout in milliseconds.
    #[arg(long = "timeout", global = true, default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Emit machine-readable JSON instead of plain text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Raise the log filter from `warn` to `debug`.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Liveness check against the server.
    Ping,
    /// Server name/version/platform/capabilities.
    Info,
    /// Raw `dump` result, adapted into a snapshot.
    Dump {
        /// Space id to scope the snapshot to; defaults to the active space.
        space: Option<String>,
    },
    List {
        #[command(subcommand)]
        what: ListTarget,
    },
    Window {
        #[command(subcommand)]
        action: WindowAction,
    },
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },
    Focus {
        #[command(subcommand)]
        action: FocusAction,
    },
    Resize {
        #[command(subcommand)]
        action: ResizeAction,
    },
    Cell {
        #[command(subcommand)]
        action: CellAction,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Print the calculated layout for the active space.
    Render,
    Show {
        #[command(subcommand)]
        target: ShowTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum ListTarget {
    Windows,
    Spaces,
    Displays,
    Apps,
}

#[derive(Subcommand, Debug)]
pub enum WindowAction {
    Get { id: u64 },
    Find { app: String },
    Update {
        id: u64,
        #[arg(long)]
        x: Option<i64>,
        #[arg(long)]
        y: Option<i64>,
        #[arg(long)]
        width: Option<i64>,
        #[arg(long)]
        height: Option<i64>,
    },
    Move {
        dir: CliDirection,
        #[arg(long, default_value_t = true)]
        wrap: bool,
        #[arg(long, default_value_t = false)]
        extend: bool,
    },
    /// Move a window to another space without changing its geometry.
    ToSpace { id: u64, space: String },
    /// Move a window to another display without changing its geometry.
    ToDisplay { id: u64, display: String },
}

#[derive(Subcommand, Debug)]
pub enum LayoutAction {
    List,
    Show { id: String },
    Apply {
        id: String,
        #[arg(long)]
        strategy: Option<String>,
    },
    Cycle,
    Current,
    Reapply,
}

#[derive(Subcommand, Debug)]
pub enum FocusAction {
    Left {
        #[arg(long, default_value_t = true)]
        wrap: bool,
        /// Cross-display focus movement; accepted for CLI surface
        /// symmetry but not yet implemented (the grid engine computes
        /// one display's cells at a time).
        #[arg(long, default_value_t = false)]
        extend: bool,
    },
    Right {
        #[arg(long, default_value_t = true)]
        wrap: bool,
        #[arg(long, default_value_t = false)]
        extend: bool,
    },
    Up {
        #[arg(long, default_value_t = true)]
        wrap: bool,
        #[arg(long, default_value_t = false)]
        extend: bool,
    },
    Down {
        #[arg(long, default_value_t = true)]
        wrap: bool,
        #[arg(long, default_value_t = false)]
        extend: bool,
    },
    Next,
    Prev,
    Cell { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ResizeAction {
    Grow {
        #[arg(default_value_t = crate::pure::ratio::DEFAULT_RESIZE_DELTA)]
        delta: f64,
    },
    Shrink {
        #[arg(default_value_t = crate::pure::ratio::DEFAULT_RESIZE_DELTA)]
        delta: f64,
    },
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum CellAction {
    Send { target: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    Show,
    Validate,
    Init,
}

#[derive(Subcommand, Debug)]
pub enum StateAction {
    Show,
    Reset {
        #[arg(long)]
        all: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ShowTarget {
    Layout,
    Display,
}

/// A `clap`-friendly mirror of [`Direction`]; converted at the call site
/// to keep the pure core free of CLI parsing concerns.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum CliDirection {
    Left,
    Right,
    Up,
    Down,
}

impl From<CliDirection> for Direction {
    fn from(d: CliDirection) -> Self {
        match d {
            CliDirection::Left => Direction::Left,
            CliDirection::Right => Direction::Right,
            CliDirection::Up => Direction::Up,
            CliDirection::Down => Direction::Down,
        }
    }
}
