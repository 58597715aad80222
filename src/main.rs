use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pdf_rag_chatbot::server::{self, AppState};
use pdf_rag_chatbot::{
    AnswerOptions, AnswerService, Embedder, FastEmbedder, IngestParams, IngestionPipeline,
    OllamaClient, PdfDirectoryLoader, QdrantIndex, RagError, RecursiveChunker, Settings,
    SettingsArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-rag-chatbot",
    about = "Index PDF documents into a vector store and answer questions from them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load, split, embed and store every PDF in the data directory
    Ingest {
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Answer a single question and print the sources used
    Ask {
        #[arg(long)]
        question: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Serve the chat API over HTTP
    Serve {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Ingest { settings } => ingest(load_settings(settings)?).await,
        Command::Ask { question, settings } => ask(load_settings(settings)?, &question).await,
        Command::Serve { settings } => serve(load_settings(settings)?).await,
    }
}

fn load_settings(args: SettingsArgs) -> Result<Settings> {
    Settings::try_from(args).context("invalid configuration")
}

async fn ingest(settings: Settings) -> Result<()> {
    let index = QdrantIndex::connect(
        &settings.qdrant_url,
        &settings.qdrant_api_key,
        settings.upsert_batch_size,
    )?;
    let chunker = RecursiveChunker::from_settings(&settings.chunking)?;
    let pipeline = IngestionPipeline::new(
        Arc::new(PdfDirectoryLoader),
        Arc::new(chunker),
        Arc::new(index),
        IngestParams::from(&settings),
    );

    let embedding = settings.embedding.clone();
    let report = pipeline
        .run(move || Ok(Arc::new(FastEmbedder::new(&embedding)?) as Arc<dyn Embedder>))
        .await?;
    tracing::info!(
        documents = report.documents,
        chunks = report.chunks,
        records = report.records,
        "ingestion complete"
    );
    Ok(())
}

fn answer_service(settings: &Settings) -> Result<AnswerService, RagError> {
    let embedder = FastEmbedder::new(&settings.embedding)?;
    let index = QdrantIndex::connect(
        &settings.qdrant_url,
        &settings.qdrant_api_key,
        settings.upsert_batch_size,
    )?;
    let llm = OllamaClient::new(&settings.llm.base_url, settings.llm.model.clone())?;
    Ok(AnswerService::new(
        Arc::new(embedder),
        Arc::new(index),
        Arc::new(llm),
        settings.index_name.clone(),
        settings.top_k,
    ))
}

fn default_options(settings: &Settings) -> AnswerOptions {
    AnswerOptions {
        temperature: settings.llm.temperature,
        mode: settings.llm.mode,
    }
}

async fn ask(settings: Settings, question: &str) -> Result<()> {
    let service = answer_service(&settings)?;
    let answer = service
        .answer(question, default_options(&settings))
        .await
        .context("failed to answer question")?;

    println!("{}", answer.answer.trim());
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!(
                "- {} #{} (score {:.3})",
                source.metadata.source_path, source.metadata.chunk_index, source.score
            );
        }
    }
    Ok(())
}

async fn serve(settings: Settings) -> Result<()> {
    let service = answer_service(&settings)?;
    let state = Arc::new(AppState::new(service, default_options(&settings)));
    server::serve(settings.listen_addr, state).await
}
