//! The `docrag` command line: upload and delete documents, search, evaluate
//! recall and generate evaluation questions.

mod commands;
pub mod config;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;

pub use commands::CommandContext;
pub use commands::DeleteArgs;
pub use commands::EvalArgs;
pub use commands::GenQuestionsArgs;
pub use commands::RetrievalArgs;
pub use commands::SearchArgs;
pub use commands::UpsertArgs;
pub use commands::split_chunks;
pub use config::ConfigError;
pub use config::DocragConfig;

#[derive(Debug, Parser)]
#[command(name = "docrag", version, about = "Document retrieval and recall evaluation")]
pub struct Cli {
    /// Config file (defaults to $DOCRAG_HOME/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Index namespace, overriding [index].namespace
    #[arg(long, global = true, value_name = "NAME")]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Embed and store the chunks of a document
    Upsert(UpsertArgs),

    /// Delete every chunk of a document
    Delete(DeleteArgs),

    /// List uploaded documents
    Documents,

    /// Search the index
    Search(SearchArgs),

    /// Measure recall@k and MRR@10 over a question dataset
    Eval(EvalArgs),

    /// Generate an evaluation dataset from stored chunks
    GenQuestions(GenQuestionsArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let home = config::docrag_home()?;
        let mut config = DocragConfig::load(self.config.as_deref(), &home).await?;
        config.apply_env(|name| std::env::var(name).ok());
        if let Some(namespace) = self.namespace {
            config.index.namespace = Some(namespace);
        }
        config.validate().context("Invalid configuration")?;

        let ctx = CommandContext { config, home };
        match self.command {
            Command::Upsert(args) => commands::run_upsert(&ctx, args).await,
            Command::Delete(args) => commands::run_delete(&ctx, args).await,
            Command::Documents => commands::run_documents(&ctx).await,
            Command::Search(args) => commands::run_search(&ctx, args).await,
            Command::Eval(args) => commands::run_eval(&ctx, args).await,
            Command::GenQuestions(args) => commands::run_gen_questions(&ctx, args).await,
        }
    }
}
