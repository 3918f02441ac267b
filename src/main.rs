use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use dbcreds::{AsyncConnection, CredentialsStore, Engine, Result, SyncConnection};
use tracing_subscriber::EnvFilter;

/// Inspect and check stored database credentials
#[derive(Parser)]
#[command(name = "dbcreds", version)]
struct Cli {
    /// Credentials file holding `[blocks.<name>]` tables
    #[arg(long, short, value_name = "FILE", default_value = "dbcreds.toml")]
    file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the stored block names
    List,
    /// Print the masked URL and engine mode of a block
    Show {
        /// Block name
        name: String,
    },
    /// Open one connection through the block's engine
    Check {
        /// Block name
        name: String,
    },
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbcreds=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let store = CredentialsStore::from_file(&cli.file)?;

    match cli.command {
        Command::List => {
            for name in store.names() {
                println!("{}", name);
            }
        }
        Command::Show { name } => {
            let credentials = store.load(&name)?;
            let mode = if credentials.async_supported() {
                "async"
            } else {
                "sync"
            };
            println!("{} ({})", credentials.rendered_url(), mode);
        }
        Command::Check { name } => {
            let credentials = store.load(&name)?;
            let version = match credentials.get_engine()? {
                Engine::Sync(engine) => {
                    let mut connection = engine.connect()?;
                    connection.server_version()?
                }
                Engine::Async(engine) => {
                    let runtime = tokio::runtime::Runtime::new()?;
                    runtime.block_on(async {
                        let connection = engine.connect().await?;
                        connection.server_version().await
                    })?
                }
            };
            println!("{}: {}", name, version);
        }
    }
    Ok(())
}
