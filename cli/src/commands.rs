use crate::config::Backend;
use crate::config::DocragConfig;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use docrag_embeddings::EmbeddingGateway;
use docrag_embeddings::EmbeddingProvider;
use docrag_embeddings::HttpEmbeddingConfig;
use docrag_embeddings::HttpEmbeddingProvider;
use docrag_embeddings::LocalEmbeddingConfig;
use docrag_embeddings::LocalEmbeddingProvider;
use docrag_recall_eval::EvalOptions;
use docrag_recall_eval::Evaluator;
use docrag_recall_eval::GenerationOptions;
use docrag_recall_eval::HttpCompletionConfig;
use docrag_recall_eval::HttpCompletionModel;
use docrag_recall_eval::QuestionGenerator;
use docrag_recall_eval::dataset::read_dataset;
use docrag_retrieval::HttpReranker;
use docrag_retrieval::HttpRerankerConfig;
use docrag_retrieval::RetrievalEngine;
use docrag_retrieval::RetrieveOptions;
use docrag_vector_store::ChunkStore;
use docrag_vector_store::ChunkStoreConfig;
use docrag_vector_store::DocumentEntry;
use docrag_vector_store::DocumentRegistry;
use docrag_vector_store::FileRegistry;
use docrag_vector_store::HttpIndex;
use docrag_vector_store::HttpIndexConfig;
use docrag_vector_store::LocalIndex;
use docrag_vector_store::LocalIndexConfig;
use docrag_vector_store::VectorIndex;
use docrag_vector_store::document_fingerprint;
use owo_colors::OwoColorize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
pub struct UpsertArgs {
    /// Display name of the document; its fingerprint prefixes every chunk id
    #[arg(long, value_name = "NAME")]
    pub name: String,

    /// Pre-segmented text file, chunks separated by blank lines
    #[arg(long, value_name = "PATH")]
    pub chunks: PathBuf,
}

#[derive(Debug, Parser)]
pub struct DeleteArgs {
    /// Fingerprint of the document to delete
    #[arg(long, value_name = "FINGERPRINT")]
    pub document: String,
}

#[derive(Debug, Parser)]
pub struct RetrievalArgs {
    /// Number of results to return
    #[arg(short = 'k', long, value_name = "N")]
    pub top_k: Option<usize>,

    /// Skip the rerank pass
    #[arg(long)]
    pub no_rerank: bool,

    /// Dense candidates handed to the reranker (capped at 50)
    #[arg(long, value_name = "N")]
    pub pool: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// Search query
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Show chunk text in results
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct EvalArgs {
    /// JSONL file of {chunk_id, question} items
    #[arg(long, value_name = "PATH")]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// Items evaluated at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Write the full report (metrics and per-item results) as JSON
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct GenQuestionsArgs {
    /// Number of chunks to sample
    #[arg(long, default_value_t = 70)]
    pub sample_size: usize,

    /// Questions per chunk (clamped to 2..=5)
    #[arg(long, default_value_t = 2)]
    pub questions: usize,

    /// Only sample chunk ids with this prefix
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Dataset file to append to (defaults to [generation].output)
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

/// Resolved configuration plus the `$DOCRAG_HOME` it was loaded from
pub struct CommandContext {
    pub config: DocragConfig,
    pub home: PathBuf,
}

impl CommandContext {
    fn store_config(&self) -> ChunkStoreConfig {
        ChunkStoreConfig {
            namespace: self.config.index.namespace.clone(),
            ..Default::default()
        }
    }

    async fn index(&self) -> Result<Arc<dyn VectorIndex>> {
        let section = &self.config.index;
        match section.backend {
            Backend::Local => {
                let path = self.config.index_path(&self.home);
                let config = LocalIndexConfig {
                    page_size: section.page_size,
                };
                let index = LocalIndex::open(&path, config)
                    .await
                    .with_context(|| format!("Failed to open local index at {}", path.display()))?;
                Ok(Arc::new(index))
            }
            Backend::Hosted => {
                let mut config = HttpIndexConfig::new(
                    section.host.clone().unwrap_or_default(),
                    section.api_key.clone().unwrap_or_default(),
                );
                config.page_size = section.page_size;
                config.timeout_secs = self.config.request_timeout_secs;
                let index = HttpIndex::new(config).context("Failed to create index client")?;
                Ok(Arc::new(index))
            }
        }
    }

    fn gateway(&self) -> Result<EmbeddingGateway> {
        let section = &self.config.embedding;
        let provider: Arc<dyn EmbeddingProvider> = match section.provider {
            Backend::Local => {
                let config = LocalEmbeddingConfig {
                    model: section.local_model,
                    batch_size: section.batch_size,
                    show_download_progress: true,
                };
                Arc::new(
                    LocalEmbeddingProvider::new(config)
                        .context("Failed to initialize local embedding model")?,
                )
            }
            Backend::Hosted => {
                let mut config = HttpEmbeddingConfig::new(
                    section.base_url.clone(),
                    section.api_key.clone().unwrap_or_default(),
                );
                config.model = section.model.clone();
                config.batch_size = section.batch_size;
                config.timeout_secs = self.config.request_timeout_secs;
                Arc::new(
                    HttpEmbeddingProvider::new(config)
                        .context("Failed to create embedding client")?,
                )
            }
        };
        Ok(EmbeddingGateway::new(provider))
    }

    async fn store(&self) -> Result<ChunkStore> {
        let store = ChunkStore::new(self.index().await?, self.gateway()?, self.store_config())
            .context("Invalid chunk store configuration")?;
        Ok(store)
    }

    async fn registry(&self) -> Result<FileRegistry> {
        let path = self.config.registry_path(&self.home);
        FileRegistry::open(&path)
            .await
            .with_context(|| format!("Failed to open document registry at {}", path.display()))
    }

    async fn engine(&self) -> Result<RetrievalEngine> {
        let engine = RetrievalEngine::from_store(&self.store().await?);
        let section = &self.config.rerank;
        if !section.enabled {
            return Ok(engine);
        }
        let Some(api_key) = section.api_key.clone() else {
            tracing::info!("No rerank API key configured; results use dense order");
            return Ok(engine);
        };

        let mut config = HttpRerankerConfig::new(section.base_url.clone(), api_key);
        config.model = section.model.clone();
        config.timeout_secs = self.config.request_timeout_secs;
        let reranker = HttpReranker::new(config).context("Failed to create rerank client")?;
        Ok(engine.with_reranker(Arc::new(reranker)))
    }

    /// Options from the config, overridden by command-line flags
    pub fn retrieve_options(&self, args: &RetrievalArgs) -> Result<RetrieveOptions> {
        let top_k = args.top_k.unwrap_or(self.config.retrieval.top_k);
        if top_k == 0 {
            anyhow::bail!("-k must be greater than 0");
        }

        let mut options = RetrieveOptions::with_top_k(top_k);
        if let Some(pool) = args.pool.or(self.config.retrieval.rerank_pool_size) {
            options.rerank_pool_size = pool;
        }
        options.use_rerank = self.config.rerank.enabled && !args.no_rerank;
        options.namespace = self.config.index.namespace.clone();
        Ok(options)
    }
}

/// Split pre-segmented text into chunks at blank lines
pub fn split_chunks(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                chunks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }
    chunks
}

pub async fn run_upsert(ctx: &CommandContext, args: UpsertArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.chunks)
        .await
        .with_context(|| format!("Failed to read {}", args.chunks.display()))?;
    let chunks = split_chunks(&content);
    if chunks.is_empty() {
        anyhow::bail!("{} contains no chunks", args.chunks.display());
    }

    let fingerprint = document_fingerprint(&args.name);
    println!(
        "{} Uploading {} chunks of {}",
        "▶".bright_blue(),
        chunks.len().bright_cyan(),
        args.name
    );

    let store = ctx.store().await?;
    let written = store
        .upsert(&fingerprint, &args.name, &chunks)
        .await
        .context("Failed to upsert chunks")?;

    let registry = ctx.registry().await?;
    registry
        .register(DocumentEntry::new(&args.name, &fingerprint))
        .await
        .context("Failed to register document")?;

    println!("{} Stored {written} chunks", "✓".bright_green());
    println!("  Fingerprint: {}", fingerprint.bright_cyan());
    Ok(())
}

pub async fn run_delete(ctx: &CommandContext, args: DeleteArgs) -> Result<()> {
    let store = ctx.store().await?;
    let deleted = store
        .delete_by_document(&args.document)
        .await
        .context("Failed to delete document chunks")?;

    let registry = ctx.registry().await?;
    let was_registered = registry
        .remove(&args.document)
        .await
        .context("Failed to update document registry")?;

    if deleted == 0 && !was_registered {
        println!("{} No document with fingerprint {}", "✗".bright_red(), args.document);
        return Ok(());
    }
    println!("{} Deleted {deleted} chunks", "✓".bright_green());
    Ok(())
}

pub async fn run_documents(ctx: &CommandContext) -> Result<()> {
    let registry = ctx.registry().await?;
    let entries = registry.list().await.context("Failed to list documents")?;

    if entries.is_empty() {
        println!("No documents registered yet.");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  {}  {}",
            entry.fingerprint.bright_cyan(),
            entry.created_at.format("%Y-%m-%d %H:%M").bright_black(),
            entry.name
        );
    }
    Ok(())
}

pub async fn run_search(ctx: &CommandContext, args: SearchArgs) -> Result<()> {
    let options = ctx.retrieve_options(&args.retrieval)?;
    let engine = ctx.engine().await?;

    let retrieval = engine
        .retrieve(&args.query, &options)
        .await
        .context("Search failed")?;

    if retrieval.is_empty() {
        println!("{} No results found", "✗".bright_red());
        return Ok(());
    }

    println!(
        "{} Found {} results in {}ms\n",
        "✓".bright_green(),
        retrieval.len().to_string().bright_cyan(),
        retrieval.stats.total_time_ms.to_string().bright_cyan()
    );

    for (i, chunk) in retrieval.chunks.iter().enumerate() {
        println!(
            "{}. {} {}",
            (i + 1).to_string().bright_yellow(),
            chunk.metadata.document_name.bright_cyan(),
            chunk.id.as_str().bright_black()
        );
        println!(
            "   {} {:.3} {} {:?}",
            "Score:".bright_black(),
            chunk.score.bright_green(),
            "Source:".bright_black(),
            chunk.source
        );

        if args.verbose {
            for line in chunk.text().lines().take(10) {
                println!("   {}", line.dimmed());
            }
            if chunk.text().lines().count() > 10 {
                println!("   {}", "...".dimmed());
            }
        }
        println!();
    }

    if args.verbose {
        let stats = &retrieval.stats;
        println!("{}", "Search Statistics:".bright_blue());
        println!("  Embedding: {}ms", stats.embed_time_ms);
        println!(
            "  Dense search: {}ms ({} candidates)",
            stats.dense_time_ms, stats.dense_count
        );
        println!(
            "  Reranking: {}ms ({} reranked)",
            stats.rerank_time_ms, stats.reranked_count
        );
        if stats.rerank_fallback {
            println!("  {} Reranker failed, dense order used", "⚠".bright_yellow());
        }
    }
    Ok(())
}

pub async fn run_eval(ctx: &CommandContext, args: EvalArgs) -> Result<()> {
    let options = EvalOptions {
        retrieval: ctx.retrieve_options(&args.retrieval)?,
        concurrency: args.concurrency,
    };
    let items = read_dataset(&args.dataset)
        .await
        .with_context(|| format!("Failed to read dataset {}", args.dataset.display()))?;
    if items.is_empty() {
        anyhow::bail!("{} has no usable items", args.dataset.display());
    }

    println!(
        "{} Evaluating {} questions",
        "▶".bright_blue(),
        items.len().bright_cyan()
    );
    let engine = ctx.engine().await?;
    let report = Evaluator::new(engine)
        .evaluate(&items, &options)
        .await
        .context("Evaluation failed")?;

    let stats = report.stats();
    println!("\n{}", "Recall Evaluation:".bright_blue());
    println!("  Questions:  {}", stats.size);
    println!(
        "  top_k: {}  rerank: {}  pool: {}",
        stats.top_k, stats.use_rerank, stats.rerank_pool_size
    );
    println!("  Recall@1:   {}", stats.recall_at_1.bright_cyan());
    println!("  Recall@3:   {}", stats.recall_at_3.bright_cyan());
    println!("  Recall@5:   {}", stats.recall_at_5.bright_cyan());
    println!("  Recall@10:  {}", stats.recall_at_10.bright_cyan());
    println!("  MRR@10:     {}", stats.mrr_at_10.bright_cyan());

    if let Some(path) = &args.output {
        write_json(path, &report).await?;
        println!("\n{} Report written to {}", "✓".bright_green(), path.display());
    }
    Ok(())
}

pub async fn run_gen_questions(ctx: &CommandContext, args: GenQuestionsArgs) -> Result<()> {
    let api_key = ctx.config.generation_api_key()?;
    let mut config = HttpCompletionConfig::new(api_key);
    config.base_url = ctx.config.generation.base_url.clone();
    config.model = ctx.config.generation.model.clone();
    let model = HttpCompletionModel::new(config).context("Failed to create completion client")?;

    let output = args
        .out
        .unwrap_or_else(|| ctx.config.generation.output.clone());
    let options = GenerationOptions {
        sample_size: args.sample_size,
        questions_per_chunk: args.questions,
        prefix: args.prefix,
        namespace: ctx.config.index.namespace.clone(),
        output: Some(output.clone()),
    };

    let generator = QuestionGenerator::new(ctx.store().await?, Arc::new(model));
    let report = generator
        .generate(&options)
        .await
        .context("Question generation failed")?;

    println!(
        "{} Wrote {} questions from {} chunks to {}",
        "✓".bright_green(),
        report.items.len().bright_cyan(),
        report.chunks_sampled,
        output.display()
    );
    if report.chunks_skipped > 0 {
        println!(
            "  {} {} chunks produced no questions",
            "⚠".bright_yellow(),
            report.chunks_skipped
        );
    }
    Ok(())
}

async fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
