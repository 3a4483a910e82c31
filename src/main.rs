//! CLI entry point. `server [<port>] [<password>] [--config <path>]`:
//! CLI arguments override the config file for port and password; the
//! config file (optional) supplies the server name, MOTD and tunables.
//! Exit codes: 0 normal shutdown, 1 argument error, 2 bind/listen error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use ircd::config::Config;
use ircd::server::Server;

#[derive(Parser, Debug)]
#[command(name = "ircd", about = "A single-threaded, readiness-loop IRC daemon")]
struct Args {
    /// Port to listen on (overrides the config file).
    port: Option<u16>,

    /// Connection password clients must supply via PASS (overrides the config file).
    password: Option<String>,

    /// Path to an optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    flexi_logger::Logger::try_with_env_or_str("info")
        .expect("valid log filter")
        .start()
        .expect("logger starts exactly once");

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load config file {}: {e}", path.display());
                return ExitCode::from(1);
            }
        },
        None => Config::default(),
    };

    // Port and password are a pair on the CLI: if a port was given at all,
    // the password takes on exactly what was given alongside it (including
    // "nothing"), rather than falling back to the config file's default.
    if let Some(port) = args.port {
        config.network.port = port;
        config.network.password = args.password.clone();
    }

    let port = config.network.port;
    let mut server = match Server::bind(config, port) {
        Ok(server) => server,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    match server.run() {
        Ok(()) => ExitCode::from(0),
        Err(e) => {
            error!("{e}");
            ExitCode::from(2)
        }
    }
}
