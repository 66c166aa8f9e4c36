//! Tarjama CLI.
//!
//! Runs the document translation pipeline in-process over a raw
//! extraction dump (the serialized `RawDocument` format) and prints the
//! finished job record as JSON. Useful for exercising segmentation,
//! normalization, and translation without a server or real model
//! backends: `--passthrough` registers an identity translator for dry
//! runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tarjama::backends::{register_translation_backend, Backend};
use tarjama::config::{JobConfig, OcrEngineSelection, PipelineConfig};
use tarjama::extraction::RawDocument;
use tarjama::job::{Job, JobStore, MemoryJobStore, Worker};
use tarjama::translation::TranslationBackend;

#[derive(Parser)]
#[command(name = "tarjama", version, about = "Structured document translation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a raw extraction dump through the full pipeline.
    Process {
        /// Path to a RawDocument JSON dump.
        input: PathBuf,

        /// Pipeline configuration TOML file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Source language tag passed to the translation backend.
        #[arg(long, default_value = "ara_Arab")]
        source_lang: String,

        /// Target language tag passed to the translation backend.
        #[arg(long, default_value = "eng_Latn")]
        target_lang: String,

        /// OCR engine selection: an engine name, or "ensemble".
        #[arg(long)]
        ocr_engine: Option<String>,

        /// Translation batch size.
        #[arg(long, default_value_t = 32)]
        batch_size: usize,

        /// Register an identity translation backend for dry runs.
        #[arg(long)]
        passthrough: bool,

        /// Pretty-print the job record.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a raw extraction dump and print its page/fragment counts.
    Inspect {
        /// Path to a RawDocument JSON dump.
        input: PathBuf,
    },
}

/// Identity translator for dry runs.
struct PassthroughTranslator;

impl Backend for PassthroughTranslator {
    fn name(&self) -> &str {
        "passthrough"
    }
}

#[async_trait]
impl TranslationBackend for PassthroughTranslator {
    async fn translate_batch(
        &self,
        texts: &[String],
        _source_lang: &str,
        _target_lang: &str,
    ) -> tarjama::Result<Vec<String>> {
        Ok(texts.to_vec())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process {
            input,
            config,
            source_lang,
            target_lang,
            ocr_engine,
            batch_size,
            passthrough,
            pretty,
        } => {
            process(
                input,
                config,
                source_lang,
                target_lang,
                ocr_engine,
                batch_size,
                passthrough,
                pretty,
            )
            .await
        }
        Command::Inspect { input } => inspect(input),
    }
}

#[allow(clippy::too_many_arguments)]
async fn process(
    input: PathBuf,
    config_path: Option<PathBuf>,
    source_lang: String,
    target_lang: String,
    ocr_engine: Option<String>,
    batch_size: usize,
    passthrough: bool,
    pretty: bool,
) -> Result<()> {
    let raw = load_dump(&input)?;

    let mut pipeline_config = match config_path {
        Some(path) => PipelineConfig::from_toml_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if passthrough {
        register_translation_backend(Arc::new(PassthroughTranslator))
            .context("failed to register passthrough translator")?;
        pipeline_config.translation_backend = "passthrough".to_string();
    }

    let job_config = JobConfig {
        ocr_engine: ocr_engine
            .map(OcrEngineSelection::from)
            .unwrap_or_else(|| OcrEngineSelection::Single(pipeline_config.primary_ocr_engine.clone())),
        source_language: source_lang,
        target_language: target_lang,
        batch_size,
        ..JobConfig::default()
    };

    let file_size = std::fs::metadata(&input).map(|m| m.len()).unwrap_or(0);
    let store = Arc::new(MemoryJobStore::new());
    let job = Job::new(raw.filename.clone(), input.clone(), file_size, raw.file_type, job_config);
    let job_id = job.id.clone();
    store.create(job).context("failed to enqueue job")?;

    let worker = Worker::new(Arc::clone(&store) as Arc<dyn JobStore>, pipeline_config);
    let finished = worker
        .run_job(&job_id, &raw)
        .await
        .context("job execution failed")?;

    let rendered = if pretty {
        serde_json::to_string_pretty(&finished)?
    } else {
        serde_json::to_string(&finished)?
    };
    println!("{rendered}");

    if finished.status == tarjama::JobStatus::Failed {
        anyhow::bail!(
            "job failed: {}",
            finished.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn inspect(input: PathBuf) -> Result<()> {
    let raw = load_dump(&input)?;
    println!("file:  {}", raw.filename);
    println!("type:  {:?}", raw.file_type);
    println!("pages: {}", raw.pages.len());
    for (index, page) in raw.pages.iter().enumerate() {
        let summary = match page {
            tarjama::extraction::SourcePage::Vector { words } => {
                format!("vector, {} words", words.len())
            }
            tarjama::extraction::SourcePage::Styled { elements } => {
                format!("styled, {} elements", elements.len())
            }
            tarjama::extraction::SourcePage::Raster { image } => {
                format!("raster, {}x{}", image.width, image.height)
            }
        };
        println!("  page {index}: {summary}");
    }
    Ok(())
}

fn load_dump(path: &PathBuf) -> Result<RawDocument> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    RawDocument::from_json(&json).with_context(|| format!("invalid document dump in {}", path.display()))
}
