// src/cli/mod.rs — CLI definition (clap derive)

pub mod account;
pub mod migrate;
pub mod serve;
pub mod stats;
pub mod timer;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pomotask", about = "Task manager with a Pomodoro timer", version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides [server] port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a Pomodoro timer in the terminal against a running server
    Timer {
        /// Account to log in as
        #[arg(short, long)]
        user: String,
        /// Session length in minutes (must be an allowed duration)
        #[arg(short, long)]
        duration: Option<u32>,
        /// Task to attach the session to
        #[arg(short, long)]
        task: Option<i64>,
        /// Server URL (overrides [client] server_url)
        #[arg(long)]
        server: Option<String>,
    },
    /// Print productivity statistics from the local database
    Stats {
        /// Account to report on
        #[arg(short, long)]
        user: String,
    },
    /// Create an account
    #[command(name = "adduser")]
    AddUser {
        /// Username for the new account
        name: String,
    },
    /// Show or change the database schema version
    Migrate {
        #[arg(long)]
        status: bool,
        #[arg(long)]
        rollback: bool,
    },
}

/// Password from `POMOTASK_PASSWORD`, else a masked prompt.
pub fn read_password(prompt: &str) -> anyhow::Result<String> {
    if let Ok(p) = std::env::var("POMOTASK_PASSWORD") {
        if !p.is_empty() {
            return Ok(p);
        }
    }
    let password = inquire::Password::new(prompt)
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timer_command() {
        let cli = Cli::try_parse_from([
            "pomotask", "timer", "--user", "ada", "--duration", "50", "--task", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Timer {
                user,
                duration,
                task,
                server,
            } => {
                assert_eq!(user, "ada");
                assert_eq!(duration, Some(50));
                assert_eq!(task, Some(3));
                assert_eq!(server, None);
            }
            _ => panic!("expected timer command"),
        }
    }

    #[test]
    fn test_parse_adduser_and_global_config() {
        let cli = Cli::try_parse_from(["pomotask", "adduser", "bob", "--config", "/tmp/p.toml"])
            .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/tmp/p.toml"));
        assert!(matches!(cli.command, Commands::AddUser { ref name } if name == "bob"));
    }

    #[test]
    fn test_timer_requires_user() {
        assert!(Cli::try_parse_from(["pomotask", "timer"]).is_err());
    }
}
