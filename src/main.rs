use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use record_pdf::{
    config::{self, Config},
    pipeline::{JobRequest, Pipeline, Settings},
    secret::{EnvSecrets, SecretSource as _},
    source::airtable,
    storage::{self, ObjectStore},
};
use tokio::io::AsyncReadExt as _;
use tracing::{error, warn};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "RECORD_PDF_CONFIG")]
    config: PathBuf,
    /// Prefix prepended to secret ids before reading them from the environment.
    #[clap(long, env = "RECORD_PDF_SECRET_PREFIX")]
    secret_prefix: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one record given its ids.
    Render {
        #[clap(long)]
        base_id: String,
        #[clap(long)]
        table_id: String,
        #[clap(long)]
        record_id: String,
        #[clap(long)]
        view_id: String,
        /// Attachment field receiving the rendered document.
        #[clap(long)]
        target_field: String,
    },
    /// Render the record described by a JSON job body, read from a file or stdin.
    Job {
        #[clap(default_value = "-")]
        input: PathBuf,
    },
}

async fn read_job(input: &PathBuf) -> anyhow::Result<JobRequest> {
    let body = if input.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .with_context(|| "read job from stdin")?;
        body
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("read job from {}", input.display()))?
    };
    serde_json::from_str(&body).with_context(|| "parse job body")
}

async fn execute<S: ObjectStore + Sync>(
    config: &Config,
    secrets: &EnvSecrets,
    store: &S,
    job: &JobRequest,
) -> anyhow::Result<url::Url> {
    let token = secrets
        .get(&config.source.secret)
        .await
        .map_err(|error| record_pdf::Error::Secret(Box::new(error)))?;
    let source = airtable::Client::new(config.source.api_base()?, token);
    let fetcher = airtable::Downloader::new();
    let settings = Settings {
        scratch_root: config.scratch_dir.clone(),
        output_filename: config.output_filename.clone(),
        web_base: config.source.web_base()?,
        presign_ttl: config.presign_ttl(),
    };
    let pipeline = Pipeline {
        source: &source,
        fetcher: &fetcher,
        store,
        settings: &settings,
    };
    let rendered = pipeline.run(job).await?;
    for notice in &rendered.notices {
        warn!(record = %job.record_id, %notice, "record notice");
    }
    Ok(rendered.url)
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let config = tokio::fs::read_to_string(&opts.config)
        .await
        .with_context(|| "read config")?;
    let config: Config = serde_yaml::from_str(&config)
        .with_context(|| format!("parse config from {}", opts.config.display()))?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;

    let job = match opts.command {
        Command::Render {
            base_id,
            table_id,
            record_id,
            view_id,
            target_field,
        } => JobRequest {
            base_id,
            record_id,
            table_id,
            target_attachment_field_name_or_id: target_field,
            view_id,
        },
        Command::Job { input } => read_job(&input).await?,
    };
    let secrets = match opts.secret_prefix {
        Some(prefix) => EnvSecrets::with_prefix(prefix),
        None => EnvSecrets::new(),
    };

    let url = match &config.storage {
        config::Storage::S3 {
            bucket,
            region,
            endpoint,
        } => {
            let store =
                storage::s3::Store::new(bucket.clone(), region.clone(), endpoint.clone()).await;
            execute(&config, &secrets, &store, &job).await?
        }
        config::Storage::Local { dir } => {
            let store = storage::local::Store::new(dir)
                .with_context(|| format!("open local storage at {}", dir.display()))?;
            execute(&config, &secrets, &store, &job).await?
        }
    };
    println!("{url}");
    Ok(())
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Err(e) = run(opts).await {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
