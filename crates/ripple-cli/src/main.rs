// Ripple CLI
//
// Decision: Identity is sent as the x-user-id header; `ingest` defaults it to the actor.
// Decision: `watch` reconnects forever and catches up through the list endpoint.

mod client;
mod commands;
mod output;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ripple")]
#[command(about = "Ripple CLI - Record activity, read feeds, follow notifications")]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(long, env = "RIPPLE_API_URL", default_value = "http://localhost:9000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    /// Acting user
    #[arg(long, short, env = "RIPPLE_USER_ID")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record an activity event
    Ingest {
        /// Who performed the action
        actor: String,

        /// What they did, e.g. "starred"
        verb: String,

        /// Kind of object acted on, e.g. "repository"
        object_type: String,

        /// Object identifier, e.g. "acme/x"
        object_id: String,

        /// User to notify (repeatable)
        #[arg(long = "target", short)]
        targets: Vec<String>,

        /// JSON object attached to the event
        #[arg(long)]
        metadata: Option<String>,

        /// Event time (RFC 3339); defaults to now on the server
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show the activity feed of the acting user
    Feed {
        /// Page size (1-100)
        #[arg(long, short)]
        limit: Option<u32>,

        /// Only events older than this timestamp
        #[arg(long)]
        cursor: Option<DateTime<Utc>>,

        /// Follow cursors until the feed is exhausted
        #[arg(long)]
        all: bool,
    },

    /// List recent notifications of the acting user
    Notifications {
        /// Only notifications newer than this timestamp
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },

    /// Mark a notification read
    Read {
        /// Notification ID
        id: uuid::Uuid,
    },

    /// Show the most frequent verbs and objects
    Top {
        /// Window: 1m, 5m or 1h
        #[arg(long, short, default_value = "1h", value_parser = ["1m", "5m", "1h"])]
        window: String,

        /// Entries per ranking
        #[arg(long, short, default_value = "10")]
        k: usize,
    },

    /// Follow live notifications of the acting user
    Watch,
}

fn require_user(user: Option<&str>) -> Result<&str> {
    match user {
        Some(user) if !user.trim().is_empty() => Ok(user),
        _ => bail!("No user given. Pass --user or set RIPPLE_USER_ID"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Ingest {
            actor,
            verb,
            object_type,
            object_id,
            targets,
            metadata,
            at,
        } => {
            let caller = cli.user.clone().unwrap_or_else(|| actor.clone());
            let client = client::Client::new(&cli.api_url, Some(caller));
            commands::ingest::run(
                &client,
                output_format,
                cli.quiet,
                commands::ingest::IngestArgs {
                    actor,
                    verb,
                    object_type,
                    object_id,
                    targets,
                    metadata,
                    at,
                },
            )
            .await
        }
        Commands::Feed { limit, cursor, all } => {
            let client = client::Client::new(&cli.api_url, cli.user.clone());
            let user = require_user(client.user_id())?;
            commands::feed::run(&client, output_format, user, limit, cursor, all).await
        }
        Commands::Notifications { since } => {
            let client = client::Client::new(&cli.api_url, cli.user.clone());
            let user = require_user(client.user_id())?;
            commands::notifications::run(&client, output_format, user, since).await
        }
        Commands::Read { id } => {
            let client = client::Client::new(&cli.api_url, cli.user.clone());
            commands::read::run(&client, output_format, cli.quiet, id).await
        }
        Commands::Top { window, k } => {
            let client = client::Client::new(&cli.api_url, cli.user.clone());
            commands::top::run(&client, output_format, &window, k).await
        }
        Commands::Watch => {
            let client = client::Client::new(&cli.api_url, cli.user.clone());
            let user = require_user(client.user_id())?;
            commands::watch::run(&client, output_format, cli.quiet, user).await
        }
    }
}
