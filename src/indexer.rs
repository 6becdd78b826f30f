use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use rag_chat::application::{services::documents_from_pairs, DatasetService};
use rag_chat::infrastructure::config::IndexBackend;
use rag_chat::infrastructure::{
    bootstrap, dataset, embedding, init_tracing, AppConfig, IndexLocator, QdrantVectorStore,
};

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Clean conversation datasets and build the retrieval index")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize raw dialogs into question/answer pairs
    Clean {
        /// Raw dataset (Persona-Chat JSON or CSV with a chat column)
        #[arg(long)]
        input: PathBuf,

        /// Output CSV (defaults to indexing.cleaned_path)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Embed cleaned pairs into the configured index
    Build {
        /// Cleaned pairs CSV (defaults to indexing.cleaned_path)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Index directory for the local backend
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the small placeholder knowledge base
    Seed {
        /// Index directory (defaults to the first configured candidate)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("indexer=info,rag_chat=info");

    let args = Args::parse();
    let config = AppConfig::load()?;

    match args.command {
        Command::Clean { input, output } => {
            let output = output.unwrap_or_else(|| config.config.indexing.cleaned_path.clone());
            clean(&input, &output)
        }
        Command::Build { input, output } => {
            let input = input.unwrap_or_else(|| config.config.indexing.cleaned_path.clone());
            build(&config, &input, output).await
        }
        Command::Seed { output } => {
            let dir = index_dir(&config, output)?;
            let embedding = embedding::from_config(&config.config.embedding)?;
            let stats =
                bootstrap::seed_fallback(&dir, embedding, &config.config.indexing).await?;
            info!(dir = %dir.display(), documents = stats.documents, "fallback index written");
            Ok(())
        }
    }
}

fn clean(input: &Path, output: &Path) -> anyhow::Result<()> {
    let pairs = DatasetService::default()
        .process(input)
        .with_context(|| format!("cleaning {}", input.display()))?;
    if pairs.is_empty() {
        bail!("no conversation pairs found in {}", input.display());
    }

    dataset::write_pairs_csv(output, &pairs)?;
    info!(pairs = pairs.len(), output = %output.display(), "cleaned dataset saved");
    Ok(())
}

async fn build(config: &AppConfig, input: &Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    let pairs = dataset::read_pairs_csv(input)
        .with_context(|| format!("reading cleaned pairs from {}", input.display()))?;
    if pairs.is_empty() {
        bail!("{} contains no pairs", input.display());
    }

    let c = &config.config;
    let embedding = embedding::from_config(&c.embedding)?;

    let stats = match c.index.backend {
        IndexBackend::Local => {
            let dir = index_dir(config, output)?;
            let stats = bootstrap::write_local_index(
                documents_from_pairs(&pairs),
                &dir,
                embedding,
                &c.indexing,
            )
            .await?;
            info!(dir = %dir.display(), "vector database saved");
            stats
        }
        IndexBackend::Qdrant => {
            let store = QdrantVectorStore::new(
                &c.index.qdrant_url,
                &c.index.collection,
                c.embedding.dimension,
            )
            .await?;
            bootstrap::indexing_service(embedding, Arc::new(store), &c.indexing)
                .index_pairs(&pairs)
                .await?
        }
    };

    info!(documents = stats.documents, chunks = stats.chunks, "index built");
    Ok(())
}

/// `--output`, else the explicit `index.dir`, else the first root candidate.
fn index_dir(config: &AppConfig, output: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(dir) = output {
        return Ok(dir);
    }
    IndexLocator::from_config(&config.config.index)
        .primary()
        .map(Path::to_path_buf)
        .context("no index directory configured")
}
