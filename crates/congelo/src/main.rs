use clap::Parser;
use congelo::{cli::Cli, config::Config, orchestrator};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result =
        Config::load(cli.config.as_deref()).and_then(|config| orchestrator::run(&cli, &config));
    if let Err(error) = result {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` still takes precedence when set; `-v` only raises the default.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "info",
        1 => "congelo=debug",
        _ => "congelo=trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp(None)
        .init();
}
