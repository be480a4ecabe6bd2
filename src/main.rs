use std::io::{Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use llm_vault::history::record_exchange;
use llm_vault::ConversationTurn;
use llm_vault::{KnowledgeBase, OpenAiClient, Vault, VaultConfig, VaultError, eval, ingest, server};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "llm-vault",
    about = "Ask questions about your documents and compare job descriptions against them"
)]
struct Cli {
    /// Knowledge base file produced by `ingest`
    #[arg(long, global = true, env = "VAULT_KB_PATH", default_value = "kb.json")]
    kb_path: PathBuf,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(
        long,
        global = true,
        env = "OPENAI_BASE_URL",
        default_value = "https://api.openai.com/v1"
    )]
    api_base: String,

    /// Embedding model; must match the one used to build the knowledge base
    #[arg(long, global = true, env = "VAULT_EMBED_MODEL", default_value = "text-embedding-3-small")]
    embed_model: String,

    /// Chat model used for refinement, answers, and gap analysis
    #[arg(long, global = true, env = "VAULT_CHAT_MODEL", default_value = "gpt-4o-mini")]
    chat_model: String,

    /// Number of chunks retrieved per question
    #[arg(long, global = true, env = "VAULT_TOP_K", default_value_t = llm_vault::config::DEFAULT_TOP_K)]
    top_k: usize,

    /// Minimum best-match similarity for a grounded answer
    #[arg(
        long,
        global = true,
        env = "VAULT_SIM_THRESHOLD",
        default_value_t = llm_vault::config::DEFAULT_SIM_THRESHOLD
    )]
    sim_threshold: f32,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive question loop with conversation history (default)
    Chat,
    /// Answer a single question
    Ask { question: String },
    /// Run a gap analysis on a job description file, or `-` for stdin
    Gap { file: PathBuf },
    /// Build the knowledge base from a directory of .txt/.md/.pdf/.docx files
    Ingest {
        dir: PathBuf,
        /// Where to write the knowledge base; defaults to --kb-path
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Paragraph chunk size in characters
        #[arg(long, default_value_t = llm_vault::config::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Measure retrieval accuracy against labelled cases
    Eval { file: PathBuf },
    /// Serve the JSON HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
    },
    /// Print configuration and knowledge base statistics
    Status,
}

impl Cli {
    fn config(&self) -> VaultConfig {
        VaultConfig {
            kb_path: self.kb_path.clone(),
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone().unwrap_or_default(),
            embed_model: self.embed_model.clone(),
            chat_model: self.chat_model.clone(),
            top_k: self.top_k,
            sim_threshold: self.sim_threshold,
            ..VaultConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = cli.config();
    let command = cli.command.unwrap_or(Command::Chat);
    if let Command::Ingest { chunk_size, .. } = &command {
        config.chunk_size = *chunk_size;
    }
    config.validate()?;

    match command {
        Command::Chat => chat(&build_vault(&config)?).await,
        Command::Ask { question } => ask(&build_vault(&config)?, &question).await,
        Command::Gap { file } => {
            let jd = read_input(&file)?;
            let vault = build_vault(&config)?;
            println!("{}", vault.gap_analysis(&jd).await?);
            Ok(())
        }
        Command::Ingest { dir, output, .. } => {
            let output = output.unwrap_or_else(|| config.kb_path.clone());
            let client = OpenAiClient::from_config(&config)?;
            let (records, report) =
                ingest::build_records(&client, &dir, config.chunk_size).await?;
            ingest::write_knowledge_base(&output, &records).await?;
            println!(
                "Embedded {} chunks from {} files into {} ({} chunks failed, {} files unreadable)",
                report.chunks,
                report.files,
                output.display(),
                report.failed_chunks,
                report.failed_files
            );
            Ok(())
        }
        Command::Eval { file } => {
            let cases = eval::load_cases(&file).await?;
            let report = eval::run(&build_vault(&config)?, &cases).await;
            for outcome in report.outcomes.iter().filter(|o| !o.passed) {
                println!(
                    "FAIL {}: expected {:?}, retrieved {:?}",
                    outcome.id, outcome.expected, outcome.retrieved
                );
            }
            println!(
                "Retrieval accuracy: {}/{} ({:.1}%), {} skipped",
                report.passed(),
                report.evaluated(),
                report.accuracy(),
                report.skipped
            );
            Ok(())
        }
        Command::Serve { bind } => {
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind}"))?;
            server::serve(Arc::new(build_vault(&config)?), addr).await?;
            Ok(())
        }
        Command::Status => print_status(&config).await,
    }
}

fn build_vault(config: &VaultConfig) -> Result<Vault> {
    let client = Arc::new(OpenAiClient::from_config(config)?);
    let kb = Arc::new(KnowledgeBase::open(&config.kb_path));
    Ok(Vault::new(kb, client.clone(), client, config))
}

async fn ask(vault: &Vault, question: &str) -> Result<()> {
    let answer = vault.answer(question, &[]).await?;
    println!("{}", answer.text);
    if !answer.used_context.is_empty() {
        println!("\n--- SOURCES ---");
        for record in &answer.used_context {
            println!("{} ({})", record.metadata.filename, record.id);
        }
    }
    Ok(())
}

async fn chat(vault: &Vault) -> Result<()> {
    let records = vault.knowledge_base().load().await?;
    println!("Loaded {} chunks. Ask me anything (or 'exit').", records.len());
    converse(vault, BufReader::new(tokio::io::stdin())).await?;
    Ok(())
}

/// Answers one question per input line until `exit`, `quit` or EOF, and
/// returns the conversation so far.
async fn converse(
    vault: &Vault,
    input: impl AsyncBufRead + Unpin,
) -> Result<Vec<ConversationTurn>> {
    let mut lines = input.lines();
    let mut history = Vec::new();
    loop {
        print!("\n>> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        match vault.answer(question, &history).await {
            Ok(answer) => {
                println!("\n--- ANSWER ---\n{}", answer.text);
                record_exchange(&mut history, question, answer.text);
            }
            Err(err @ VaultError::NotFound { .. }) => return Err(err.into()),
            Err(err) => {
                tracing::error!(error = %err, "answer failed");
                eprintln!("Sorry, something went wrong answering that. Please try again.");
            }
        }
    }
    Ok(history)
}

async fn print_status(config: &VaultConfig) -> Result<()> {
    println!("LLM Vault status");
    println!("  chat model:       {}", config.chat_model);
    println!("  embedding model:  {}", config.embed_model);
    println!("  chunk size:       {} chars", config.chunk_size);
    println!("  retrieval:        cosine similarity, top {}", config.top_k);
    println!("  threshold:        {:.2}", config.sim_threshold);
    println!("  knowledge base:   {}", config.kb_path.display());

    let kb = KnowledgeBase::open(&config.kb_path);
    let stats = kb.stats().await?;
    println!("  chunks:           {}", stats.records);
    if let Some(dims) = stats.dimension {
        println!("  dimensions:       {dims}");
    }
    for (category, count) in &stats.categories {
        println!("    {category}: {count}");
    }
    Ok(())
}

fn read_input(file: &Path) -> Result<String> {
    if file.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use llm_vault::{ChatMessage, CompletionProvider, EmbeddingProvider};

    struct Echo;

    #[async_trait]
    impl EmbeddingProvider for Echo {
        async fn embed(&self, _text: &str) -> llm_vault::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[async_trait]
    impl CompletionProvider for Echo {
        async fn complete(&self, messages: &[ChatMessage]) -> llm_vault::Result<String> {
            Ok(format!("re: {}", messages.last().map(|m| m.content.as_str()).unwrap_or("")))
        }
    }

    fn echo_vault() -> Vault {
        let kb = Arc::new(KnowledgeBase::from_records(Vec::new()).unwrap());
        let echo = Arc::new(Echo);
        Vault::new(kb, echo.clone(), echo, &VaultConfig::default())
    }

    #[tokio::test]
    async fn test_converse_stops_at_exit_and_skips_blank_lines() {
        let input: &[u8] = b"first question\n\n   \nexit\nnever asked\n";
        let history = converse(&echo_vault(), input).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "first question");
        assert_eq!(history[1].content, "re: first question");
    }

    #[tokio::test]
    async fn test_converse_ends_on_eof() {
        let input: &[u8] = b"one\ntwo";
        let history = converse(&echo_vault(), input).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].content, "two");
    }

    #[test]
    fn test_ingest_output_flag() {
        let cli = Cli::try_parse_from(["llm-vault", "ingest", "docs", "--output", "out/kb.json"])
            .unwrap();
        match cli.command {
            Some(Command::Ingest { dir, output, .. }) => {
                assert_eq!(dir, PathBuf::from("docs"));
                assert_eq!(output, Some(PathBuf::from("out/kb.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["llm-vault", "ingest", "docs"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Ingest { output: None, .. })));
    }
}
