// src/main.rs — pomotask entry point

use clap::Parser;

use pomotask::cli::timer::TimerArgs;
use pomotask::cli::{Cli, Commands};
use pomotask::infra::config::Config;
use pomotask::infra::{logger, paths};

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        let mut config = Config::load_from(std::path::Path::new(path))?;
        config.apply_env();
        config.validate()?;
        config
    } else {
        Config::load()?
    };
    paths::ensure_dirs().await?;

    match cli.command {
        Commands::Serve { port } => pomotask::cli::serve::run_serve(&config, port).await,
        Commands::Timer {
            user,
            duration,
            task,
            server,
        } => {
            pomotask::cli::timer::run_timer(
                &config,
                TimerArgs {
                    user: &user,
                    duration,
                    task,
                    server: server.as_deref(),
                },
            )
            .await
        }
        Commands::Stats { user } => pomotask::cli::stats::run_stats(&config, &user).await,
        Commands::AddUser { name } => pomotask::cli::account::run_adduser(&config, &name).await,
        Commands::Migrate { status, rollback } => {
            pomotask::cli::migrate::run_migrate(&config.database.resolved_path(), status, rollback)
                .await
        }
    }
}
