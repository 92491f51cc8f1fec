//! `grid-ctl`: the client-side brain of a tiling window manager.
//!
//! This crate implements the layout engine and its supporting
//! state/reconciliation machinery — the hard, precisely-specified part of
//! the system — against an opaque server reachable over a JSON-RPC Unix
//! socket. The command dispatcher in [`cli`] is a thin shell over the
//! modules below.
pub mod assignment;
pub mod config;
pub mod error;
pub mod focus;
pub mod layout;
pub mod pure;
pub mod reconcile;
pub mod server;
pub mod state;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{Error, Result};
