use crate::board;
use crate::config::Config;
use crate::queue::{self, EntryCommands, TimerCommands};
use crate::server;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Walk-in queue CLI interface
#[derive(Parser, Debug)]
#[command(name = "walkin", about = "Walk-in queue manager")]
pub struct Cli {
    /// Database file (overrides WALKIN_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8888)]
        port: u16,
    },
    /// Queue entry commands
    #[command(subcommand)]
    Entry(EntryCommands),
    /// Turn timer commands for the now-serving entry
    #[command(subcommand)]
    Timer(TimerCommands),
    /// Reassign evenly spaced ranks to the whole queue
    Renumber,
    /// Show the now serving / up next board, refreshing periodically
    Watch {
        /// Seconds between refreshes from the store
        #[arg(long, default_value_t = 5)]
        interval: u64,
        /// How many upcoming entries to show
        #[arg(long, default_value_t = 13)]
        limit: usize,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        // Logging first, so configuration warnings are visible. stdout
        // belongs to command output and the board.
        tracing_subscriber::fmt().with_writer(std::io::stderr).init();
        let mut cfg = Config::from_env();
        if let Some(db) = self.db {
            cfg.db_path = db;
        }
        match self.command {
            Commands::Serve { port } => server::run_server(&cfg, port).await,
            Commands::Entry(cmd) => queue::run_entry_command(&cfg, cmd).await,
            Commands::Timer(cmd) => queue::run_timer_command(&cfg, cmd).await,
            Commands::Renumber => {
                let service = queue::connect(&cfg).await?;
                let n = service.renumber().await?;
                println!("Renumbered {} entr{}", n, if n == 1 { "y" } else { "ies" });
                Ok(())
            }
            Commands::Watch { interval, limit } => {
                let service = queue::connect(&cfg).await?;
                board::run_board(service, Duration::from_secs(interval.max(1)), Some(limit)).await
            }
        }
    }
}
