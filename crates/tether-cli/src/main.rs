//! tether - inspect, replay and resume streaming agent sessions

mod commands;
mod config;
mod session;

use clap::{CommandFactory, Parser, Subcommand};
use commands::{
    DiffCommand, DiffTarget, ReplayCommand, ResumeCommand, SessionsCommand, WatchCommand,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// tether - streaming chat core for AI coding agent sessions
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output (debug logging for tether crates)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Override the sessions directory
    #[arg(long, global = true)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed a recorded event stream (JSON lines) through the assembler
    Replay {
        /// Recorded events file
        path: PathBuf,

        /// Stop after this many events, leaving the turn mid-stream
        #[arg(long)]
        stop_after: Option<usize>,

        /// Save the result as a new session
        #[arg(long, conflicts_with = "into")]
        save: bool,

        /// Continue an existing session instead of starting empty
        #[arg(long, value_name = "SESSION_ID")]
        into: Option<String>,
    },

    /// Reconstruct a saved session, including a partially streamed turn
    Resume {
        /// Session ID
        id: String,
    },

    /// List saved sessions
    Sessions,

    /// Poll a session's background agents until they complete
    Watch {
        /// Session ID
        id: String,

        /// Poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Print the diff of an edit
    Diff {
        /// File the edit applies to
        #[arg(long, requires_all = ["old", "new"], conflicts_with = "session")]
        file: Option<PathBuf>,

        /// Text before the edit
        #[arg(long)]
        old: Option<String>,

        /// Text after the edit
        #[arg(long)]
        new: Option<String>,

        /// Session holding the edit tool call
        #[arg(long, requires = "message")]
        session: Option<String>,

        /// Tool call message ID (or bare tool-use ID)
        #[arg(long)]
        message: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tether=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Initialize config and exit
    if args.init_config {
        let path = config::Config::init()?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let cfg = config::Config::load();
    let store = session::SessionStore::new(
        args.sessions_dir
            .unwrap_or_else(|| cfg.sessions_dir()),
    );

    match command {
        Command::Replay {
            path,
            stop_after,
            save,
            into,
        } => ReplayCommand::execute(&path, stop_after, save, into.as_deref(), &store).await,
        Command::Resume { id } => ResumeCommand::execute(&id, &store),
        Command::Sessions => SessionsCommand::execute(&store),
        Command::Watch { id, interval_ms } => {
            let mut poller = cfg.poller_config();
            if let Some(ms) = interval_ms {
                poller.interval = Duration::from_millis(ms.max(1));
            }
            WatchCommand::execute(&id, &store, poller).await
        }
        Command::Diff {
            file,
            old,
            new,
            session,
            message,
        } => {
            let target = match (file, session, message) {
                (Some(file), _, _) => DiffTarget::Edit {
                    file,
                    old: old.unwrap_or_default(),
                    new: new.unwrap_or_default(),
                },
                (None, Some(session), Some(message)) => DiffTarget::Message { session, message },
                _ => anyhow::bail!("pass either --file/--old/--new or --session/--message"),
            };
            DiffCommand::execute(target, &store, cfg.diff.context_lines).await
        }
    }
}
