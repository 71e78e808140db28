use clap::Parser;

use photobooth::cli::{self, Args, Command};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let result = match args.command {
        Some(Command::ListCameras { test_pattern }) => cli::list_cameras(test_pattern),
        Some(Command::Compose(ref compose)) => cli::compose_files(compose).map(|_| ()),
        Some(Command::Config { action }) => cli::handle_config_action(action),
        Some(Command::Shoot(ref shoot)) => cli::shoot(shoot).map(|_| ()),
        None => cli::shoot(&args.shoot).map(|_| ()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
