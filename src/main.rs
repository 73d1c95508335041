use std::sync::Arc;

use brandaid::config::{AppConfig, ChatMode, ConfigError};
use brandaid::net::api::{ApiError, HttpRecordApi};
use brandaid::net::types::{Record, RecordFields};
use brandaid::state::conversation::{ChatTurn, ConversationEngine, ExchangeId, Role};
use brandaid::state::draft::{DraftRecord, FieldPatch, patch_draft};
use brandaid::state::records::{RecordStore, StoreError};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Client(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Error saving item: {0}")]
    Save(StoreError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "brandaid", about = "BrandAid records and research assistant CLI")]
struct Cli {
    /// Record service base URL. Defaults to `RAILWAY_API_URL` or http://localhost:3001.
    #[arg(long, env = "RAILWAY_API_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Create(CreateArgs),
    Update(UpdateArgs),
    Delete {
        id: String,
    },
    Chat {
        /// `simulated` or `delegated`. Defaults to `CHAT_MODE`.
        #[arg(long)]
        mode: Option<ChatMode>,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: String,
    #[arg(long)]
    price: String,
    #[arg(long)]
    note: String,
}

#[derive(Args, Debug)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_url = base_url.trim_end_matches('/').to_owned();
    }

    let api = HttpRecordApi::new(&config.api_url, config.timeouts)?;
    let store = Arc::new(RecordStore::new(Arc::new(api)));

    match cli.command {
        Command::List => {
            let records = store.list().await?;
            print_records(&records)
        }
        Command::Create(args) => run_create(&store, args).await,
        Command::Update(args) => run_update(&store, args).await,
        Command::Delete { id } => {
            initial_load(&store).await;
            applied(store.delete(&id).await)?;
            print_records(&store.snapshot().await)
        }
        Command::Chat { mode } => {
            let mode = mode.unwrap_or(config.chat.mode);
            let engine = match mode {
                ChatMode::Simulated => {
                    ConversationEngine::simulated(config.chat.simulated_delay(), config.chat.simulated_reply.clone())
                }
                ChatMode::Delegated => {
                    initial_load(&store).await;
                    ConversationEngine::delegated(Arc::clone(&store))
                }
            };
            run_chat(engine).await
        }
    }
}

/// Mount-time listing. A failure here is logged and does not stop the command.
async fn initial_load(store: &RecordStore) {
    if let Err(e) = store.list().await {
        tracing::warn!(error = %e, "initial record listing failed");
    }
}

async fn run_create(store: &RecordStore, args: CreateArgs) -> Result<(), CliError> {
    initial_load(store).await;
    store
        .patch_draft(FieldPatch {
            id: Some(args.id),
            name: Some(args.name),
            description: Some(args.description),
            price: Some(args.price),
            note: Some(args.note),
        })
        .await;
    applied(store.submit_draft().await).map_err(save_error)?;
    print_records(&store.snapshot().await)
}

async fn run_update(store: &RecordStore, args: UpdateArgs) -> Result<(), CliError> {
    initial_load(store).await;
    let patch = FieldPatch {
        id: None,
        name: args.name,
        description: args.description,
        price: args.price,
        note: args.note,
    };

    if store.begin_edit(&args.id).await.is_some() {
        store.patch_edit(patch).await;
        applied(store.submit_edit().await).map_err(save_error)?;
    } else {
        // Not in the local snapshot: send what was given and let the service decide.
        let base = DraftRecord { id: args.id, fields: RecordFields::default() };
        let draft = patch_draft(&base, patch);
        applied(store.update(&draft.id, draft.fields).await).map_err(save_error)?;
    }
    print_records(&store.snapshot().await)
}

async fn run_chat(mut engine: ConversationEngine) -> Result<(), CliError> {
    eprintln!("Ask me anything about your market. Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        engine.set_input(line);
        let Some(exchange) = engine.submit_input() else {
            continue;
        };
        print_turns(&engine.transcript(), exchange, None);
        engine.settle().await;
        print_turns(&engine.transcript(), exchange, Some(Role::Assistant));
    }

    engine.shutdown();
    Ok(())
}

/// Treat a write the service accepted as done even if the refresh failed.
/// The last good snapshot is printed in that case.
fn applied(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(e) if e.is_applied() => {
            tracing::warn!(error = %e, "showing the last known records");
            Ok(())
        }
        other => other,
    }
}

fn save_error(err: StoreError) -> CliError {
    match err {
        StoreError::Validation(_) => CliError::Store(err),
        other => CliError::Save(other),
    }
}

fn print_turns(turns: &[ChatTurn], exchange: ExchangeId, role: Option<Role>) {
    let selected = turns
        .iter()
        .filter(|t| t.exchange == exchange && role.is_none_or(|r| t.role == r));
    for turn in selected {
        if turn.pending {
            println!("{}: {} (thinking)", turn.role.as_str(), turn.text);
        } else {
            println!("{}: {}", turn.role.as_str(), turn.text);
        }
    }
}

fn print_records(records: &[Record]) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(records)?;
    println!("{rendered}");
    Ok(())
}
