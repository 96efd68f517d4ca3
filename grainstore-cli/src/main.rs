use clap::Parser;
use eyre::WrapErr;
use grainstore::{
    ActorState, Revision, StorageAdapter, StorageConfig,
    store::{ArangoDocumentStore, DocumentStore},
};

mod actor_arg;
use actor_arg::ActorArg;

#[derive(clap::Parser)]
pub(crate) struct Args {
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
pub(crate) struct ConnectionArgs {
    #[arg(long, env = "GRAINSTORE_URL", default_value = "http://localhost:8529")]
    url: url::Url,
    #[arg(long, env = "GRAINSTORE_DATABASE", default_value = "Orleans")]
    database: String,
    #[arg(long, env = "GRAINSTORE_USERNAME", default_value = "root")]
    username: String,
    #[arg(
        long,
        env = "GRAINSTORE_PASSWORD",
        default_value = "password",
        hide_env_values = true
    )]
    password: String,
    #[arg(
        long,
        env = "GRAINSTORE_WAIT_FOR_SYNC",
        default_value_t = true,
        action = clap::ArgAction::Set,
        help = "Whether the server syncs to disk before acknowledging writes"
    )]
    wait_for_sync: bool,
}

#[derive(clap::Subcommand)]
pub(crate) enum Command {
    /// List the collections in the database
    Collections,
    /// Print the stored state of an actor
    Read(ActorTarget),
    /// Store new state for an actor
    Write(WriteCommand),
    /// Remove the stored state of an actor
    Clear(ActorTarget),
}

#[derive(clap::Args)]
pub(crate) struct ActorTarget {
    #[arg(
        long,
        help = "Type name of the actor, the collection is its last segment (e.g. app::Counter)"
    )]
    actor_type: String,
    #[arg(long, help = "The actor, e.g. Counter/int:1 or Room/str:lobby")]
    actor: ActorArg,
}

#[derive(clap::Args)]
pub(crate) struct WriteCommand {
    #[command(flatten)]
    target: ActorTarget,
    #[arg(long, help = "The new state as JSON")]
    state: String,
    #[arg(
        long,
        help = "The revision the stored state must still have; omit to create the document"
    )]
    etag: Option<String>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let Args {
        connection,
        command,
    } = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = StorageConfig {
        database_name: connection.database,
        url: connection.url,
        username: connection.username,
        password: connection.password,
        wait_for_sync: connection.wait_for_sync,
    };
    tracing::debug!(?config, "connecting");
    let adapter = StorageAdapter::connect("grainstore-cli", &config).await?;

    let result = run(&adapter, command).await;
    adapter.close().await;
    result
}

async fn run(adapter: &StorageAdapter<ArangoDocumentStore>, command: Command) -> eyre::Result<()> {
    match command {
        Command::Collections => {
            let mut collections = adapter.store().list_collections().await?;
            collections.sort();
            for name in collections {
                println!("{name}");
            }
        }
        Command::Read(ActorTarget { actor_type, actor }) => {
            let mut slot = ActorState::new(serde_json::Value::Null);
            adapter.read_state(&actor_type, &actor.0, &mut slot).await?;
            match slot.etag {
                None => tracing::info!(actor = %actor.0, "no stored state"),
                Some(etag) => {
                    let output = serde_json::json!({ "etag": etag, "state": slot.state });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
        }
        Command::Write(WriteCommand {
            target: ActorTarget { actor_type, actor },
            state,
            etag,
        }) => {
            let state: serde_json::Value =
                serde_json::from_str(&state).wrap_err("--state is not valid JSON")?;
            let mut slot = ActorState {
                state,
                etag: etag.map(Revision::from),
            };
            adapter.write_state(&actor_type, &actor.0, &mut slot).await?;
            if let Some(etag) = slot.etag {
                println!("{etag}");
            }
        }
        Command::Clear(ActorTarget { actor_type, actor }) => {
            let mut slot = ActorState::new(serde_json::Value::Null);
            adapter.clear_state(&actor_type, &actor.0, &mut slot).await?;
            tracing::info!(actor = %actor.0, "cleared");
        }
    }
    Ok(())
}
