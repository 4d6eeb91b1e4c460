// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging and run one command.
// - Every failure ends here: it is printed once and the process exits 1.

use analytics_catalog_cli::cli::{normalize_args, Cli};
use analytics_catalog_cli::{commands, ui};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let level = match cli.global.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {}", e);
    }

    if let Err(e) = commands::run(cli) {
        ui::failed(&format!("{:#}", e));
        std::process::exit(1);
    }
}
