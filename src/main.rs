//! `grid` CLI entrypoint: parse arguments, configure logging, dispatch to
//! the core, and translate the result into a process exit code.
use clap::Parser;
use grid_ctl::cli::Cli;
use grid_ctl::Error;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    let json_mode = cli.json;

    match grid_ctl::cli::run(cli) {
        Ok(()) => {}
        Err(Error::NoDirectionalTarget) => {
            if json_mode {
                println!("{}", serde_json::json!({ "ok": false, "reason": "nothing to do" }));
            } else {
                println!("nothing to do");
            }
        }
        Err(err) => {
            if json_mode {
                eprintln!("{}", serde_json::json!({ "ok": false, "error": err.to_string() }));
            } else {
                eprintln!("error: {err}");
            }
            std::process::exit(1);
        }
    }
}
