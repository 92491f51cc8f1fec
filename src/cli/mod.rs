//! The command dispatcher: a thin shell over the core. [`args`] defines
//! the `clap` surface; [`run`] wires a parsed [`args::Cli`] into config,
//! runtime state and the RPC client and executes one subcommand.
pub mod args;
pub mod run;

pub use args::Cli;
pub use run::run;
