use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod accounts;
pub mod agenda;
pub mod init;
pub mod migrate;
pub mod serve;
pub mod sign;

#[derive(Subcommand)]
enum Command {
    /// Create the local SQLite database and its schema
    Init {},
    /// Apply pending schema migrations to the local SQLite database
    Migrate {},
    /// Run the webhook server
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "3000")]
        port: String,
    },
    /// Register a local profile so booking events for its email are stored
    AddAccount {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
        /// Defaults to a random UUID
        #[arg(long)]
        id: Option<String>,
    },
    /// Show a user's upcoming and past bookings
    Bookings {
        #[arg(long)]
        email: String,
    },
    /// Print the signature a webhook sender would attach to a payload
    Sign {
        /// File holding the exact request body
        #[arg(long)]
        file: PathBuf,
        /// Defaults to CAL_WEBHOOK_SECRET
        #[arg(long)]
        secret: Option<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format! {
                    "{}=debug,tower_http=debug,axum::rejection=trace",
                    env!("CARGO_CRATE_NAME")
                }
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    // Handle each sub command
    match args.command {
        Some(Command::Init {}) => {
            init::run().await?;
        }
        Some(Command::Migrate {}) => {
            migrate::run().await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port).await?;
        }
        Some(Command::AddAccount { email, name, id }) => {
            accounts::run(email, name, id).await?;
        }
        Some(Command::Bookings { email }) => {
            agenda::run(&email).await?;
        }
        Some(Command::Sign { file, secret }) => {
            sign::run(&file, secret)?;
        }
        None => {}
    }

    Ok(())
}
