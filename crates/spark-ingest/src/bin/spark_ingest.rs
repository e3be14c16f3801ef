//! Ingestion harness
//!
//! Run with: cargo run -p spark-ingest --features cli -- notes.pdf --title "Week 1" --topic Cells

use clap::Parser;
use std::path::PathBuf;

use spark_ingest::{
    providers::AuthTokens, IngestConfig, IngestPipeline, MaterialClient, MaterialDetails,
    UploadedFile,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "spark-ingest", version, about = "Validate, extract and chunk a course material file")]
struct Args {
    /// File to ingest (.pdf, .docx or .txt)
    file: PathBuf,

    /// Material title
    #[arg(long)]
    title: String,

    /// Material topic
    #[arg(long)]
    topic: String,

    /// Optional subject
    #[arg(long)]
    subject: Option<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the chunk token budget
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Override the overlap word count
    #[arg(long)]
    overlap_words: Option<usize>,

    /// Send the payload instead of printing it
    #[arg(long)]
    submit: bool,

    /// Override the API base URL
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token for the material API
    #[arg(long, requires = "submit")]
    access_token: Option<String>,

    /// Refresh token used when the access token expires
    #[arg(long, requires = "access_token")]
    refresh_token: Option<String>,

    /// Poll until the backend finishes processing
    #[arg(long, requires = "submit")]
    wait: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spark_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    if let Some(max_tokens) = args.max_tokens {
        config.chunking.max_tokens = max_tokens;
    }
    if let Some(overlap_words) = args.overlap_words {
        config.chunking.overlap_words = overlap_words;
    }
    if let Some(api_url) = &args.api_url {
        config.api.base_url = api_url.clone();
    }
    config.validate()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Max file size: {} bytes", config.upload.max_file_size);
    tracing::info!("  - Chunk budget: {} tokens", config.chunking.max_tokens);
    tracing::info!("  - Overlap: {} words", config.chunking.overlap_words);

    let file = UploadedFile::from_path(&args.file).await?;
    let mut details = MaterialDetails::new(args.title, args.topic);
    details.subject = args.subject;

    let pipeline = IngestPipeline::new(&config);
    let prepared = pipeline.prepare(&file, details).await.map_err(|e| {
        tracing::error!("{}", e);
        anyhow::anyhow!(e.user_message())
    })?;

    if !args.submit {
        println!("{}", serde_json::to_string_pretty(&prepared.request)?);
        return Ok(());
    }

    let tokens = args.access_token.map(|access| {
        let tokens = AuthTokens::new(access);
        match args.refresh_token {
            Some(refresh) => tokens.with_refresh_token(refresh),
            None => tokens,
        }
    });
    let client = MaterialClient::new(&config.api, tokens)?;

    let mut receipt = pipeline.submit(&prepared, &client).await?;
    if args.wait {
        receipt = client.wait_until_settled(&receipt.id).await?;
    }

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
