//! Terminal chat with the Pip wine assistant.

use anyhow::{Context, bail};
use autoagents_llm::LLMProvider;
use autoagents_llm::backends::openai::OpenAI;
use autoagents_llm::builder::LLMBuilder;
use clap::Parser;
use directories::ProjectDirs;
use log::{debug, info, warn};
use pip_rs_config::PipConfig;
use pip_rs_core::{FileStore, LlmCompleter, LlmEmbedder, Orchestrator};
use pip_rs_knowledge::{
    CatalogIndex, Embedder, InMemoryCatalogIndex, InMemoryKnowledgeIndex, KnowledgeIndex,
};
use pip_rs_protocol::{
    Attachment, Card, ConfirmationRequest, Message, ProcessRequest, ProcessResponse,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Command-line options for the chat client.
#[derive(Parser)]
#[command(name = "pip", version)]
struct Cli {
    /// Optional path to a pip.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Signed-in user id; cellar and profile features need one
    #[arg(long)]
    user: Option<String>,
    /// Model name override
    #[arg(long)]
    model: Option<String>,
    /// Directory for cellar and profile files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Print each response as JSON
    #[arg(long)]
    json: bool,
}

/// Conversation state the caller owns between turns.
#[derive(Default)]
struct Session {
    history: Vec<Message>,
    confirmation: Option<ConfirmationRequest>,
}

enum SlashCommand {
    Quit,
    New,
    Photo(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let orchestrator = build_orchestrator(&cli, config).await?;
    info!(
        "pip ready (user_set={}, json={})",
        cli.user.is_some(),
        cli.json
    );

    let mut session = Session::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut attachment = None;
        let mut text = line.to_string();
        match parse_slash(line) {
            Some(SlashCommand::Quit) => break,
            Some(SlashCommand::New) => {
                session = Session::default();
                println!("Started a new conversation.");
                continue;
            }
            Some(SlashCommand::Photo(rest)) => {
                let (path, caption) = rest.split_once(' ').unwrap_or((rest.as_str(), ""));
                attachment = Some(Attachment::image(path));
                text = caption.trim().to_string();
            }
            None => {}
        }

        let mut request = ProcessRequest::new(text.clone())
            .with_history(session.history.clone())
            .with_confirmation(session.confirmation.take());
        if let Some(user) = cli.user.as_ref() {
            request = request.with_user(user.clone());
        }
        if let Some(attachment) = attachment {
            request = request.with_attachment(attachment);
        }

        let response = orchestrator.process(request).await;
        debug!("turn finished (trace={:?})", response.trace);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&response).context("failed to encode response")?
            );
        } else {
            print_response(&response);
        }

        session.history.push(Message::user(text));
        session.history.push(response.to_message());
        session.confirmation = response.confirmation;
    }
    Ok(())
}

fn parse_slash(line: &str) -> Option<SlashCommand> {
    let command = line.strip_prefix('/')?;
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    match name {
        "quit" | "exit" => Some(SlashCommand::Quit),
        "new" => Some(SlashCommand::New),
        "photo" if !rest.trim().is_empty() => Some(SlashCommand::Photo(rest.trim().to_string())),
        _ => None,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PipConfig> {
    let mut config = if let Some(path) = cli.config.as_ref() {
        PipConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        info!("loading layered config from cwd: {}", cwd.display());
        let layered = PipConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(model) = cli.model.as_ref() {
        config.llm.model = model.clone();
    }
    Ok(config)
}

async fn build_orchestrator(cli: &Cli, config: PipConfig) -> anyhow::Result<Orchestrator> {
    if config.llm.provider != "openai" {
        bail!("unsupported llm provider: {}", config.llm.provider);
    }
    let api_key = std::env::var(&config.llm.api_key_env)
        .with_context(|| format!("{} is required to run pip", config.llm.api_key_env))?;
    info!("building LLM provider (model={})", config.llm.model);
    let llm: Arc<dyn LLMProvider> = LLMBuilder::<OpenAI>::new()
        .api_key(api_key)
        .model(config.llm.model.clone())
        .build()
        .context("failed to build OpenAI LLM provider")?;
    let embedder = Arc::new(LlmEmbedder::new(llm.clone()));

    let knowledge: Arc<dyn KnowledgeIndex> = match config.data.knowledge_path.as_deref() {
        Some(path) => Arc::new(
            InMemoryKnowledgeIndex::load_jsonl(path, embedder.as_ref())
                .await
                .with_context(|| format!("failed to load knowledge from {path}"))?,
        ),
        None => {
            warn!("no knowledge file configured; answers will rely on the model alone");
            Arc::new(InMemoryKnowledgeIndex::default())
        }
    };
    let catalog: Arc<dyn CatalogIndex> = match config.data.catalog_path.as_deref() {
        Some(path) => Arc::new(load_catalog(path, embedder.as_ref()).await?),
        None => {
            warn!("no catalog file configured; recommendations will come back empty");
            Arc::new(InMemoryCatalogIndex::new(Vec::new()))
        }
    };

    let store_root = store_root(cli, &config)?;
    let store = Arc::new(FileStore::new(&store_root).context("failed to open data directory")?);

    Orchestrator::builder(config)
        .completer(Arc::new(LlmCompleter::new(llm)))
        .embedder(embedder)
        .knowledge(knowledge)
        .catalog(catalog)
        .cellar_store(store.clone())
        .profile_store(store)
        .build()
        .context("failed to build orchestrator")
}

async fn load_catalog(path: &str, embedder: &dyn Embedder) -> anyhow::Result<InMemoryCatalogIndex> {
    let catalog = InMemoryCatalogIndex::load_jsonl(path, embedder)
        .await
        .with_context(|| format!("failed to load catalog from {path}"))?;
    info!("catalog loaded (wines={})", catalog.len());
    Ok(catalog)
}

/// `--data-dir`, then the configured store path, then the platform data dir.
fn store_root(cli: &Cli, config: &PipConfig) -> anyhow::Result<PathBuf> {
    if let Some(dir) = cli.data_dir.as_ref() {
        return Ok(dir.clone());
    }
    if let Some(path) = config.data.store_path.as_deref() {
        return Ok(Path::new(path).to_path_buf());
    }
    let dirs = ProjectDirs::from("", "", "pip").context("no home directory for pip data")?;
    Ok(dirs.data_dir().to_path_buf())
}

fn print_response(response: &ProcessResponse) {
    println!("{}", response.response_text);
    for card in &response.cards {
        match card {
            Card::Wine(wine) => {
                let price = wine
                    .price_usd
                    .map(|price| format!(" (${price:.2})"))
                    .unwrap_or_default();
                println!("  * {}{}", wine.name, price);
                if let Some(explanation) = wine.explanation.as_deref() {
                    println!("    {explanation}");
                }
            }
            other => {
                if let Some(name) = other.name() {
                    println!("  * {name}");
                }
            }
        }
    }
    if !response.actions.is_empty() {
        let labels = response
            .actions
            .iter()
            .map(|action| format!("[{}]", action.label))
            .collect::<Vec<_>>();
        println!("  {}", labels.join(" "));
    }
    if response.requires_auth {
        println!("  (restart with --user <id> to use your cellar)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse() {
        assert!(matches!(parse_slash("/quit"), Some(SlashCommand::Quit)));
        assert!(matches!(parse_slash("/new"), Some(SlashCommand::New)));
        assert!(matches!(
            parse_slash("/photo label.jpg what is this?"),
            Some(SlashCommand::Photo(rest)) if rest == "label.jpg what is this?"
        ));
        assert!(parse_slash("/photo").is_none());
        assert!(parse_slash("red wine please").is_none());
    }
}
