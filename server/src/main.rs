use anyhow::Result;
use axum::Router;
use clap::Parser;
use jobrec::VectorizerConfig;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Model artifact to load at startup and write on checkpoint
    #[arg(long, default_value = "./model/model.bin")]
    model: PathBuf,
    /// Jobs JSON/JSONL fitted when the model artifact does not exist yet
    #[arg(long)]
    jobs: Option<PathBuf>,
    /// Precomputed similarity matrix produced by `trainer similarity`
    #[arg(long)]
    similarity: Option<PathBuf>,
    /// Directory of the interaction/metadata catalog
    #[arg(long, default_value = "./data/catalog")]
    catalog: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
    /// Recommendations returned when a request does not ask for a count
    #[arg(long, default_value_t = 5)]
    top_n: usize,
    /// Use ln(N/df) + 1 instead of the smoothed idf
    #[arg(long, default_value_t = false)]
    plain_idf: bool,
    /// Use raw term counts instead of 1 + ln(tf)
    #[arg(long, default_value_t = false)]
    raw_tf: bool,
    /// Refit the live model on every job metadata update
    #[arg(long, default_value_t = false)]
    refit_on_metadata: bool,
    /// Serve admin routes without ADMIN_TOKEN (local development only)
    #[arg(long, default_value_t = false)]
    insecure_admin: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::new(self.model, self.catalog).with_env();
        config.jobs_path = self.jobs;
        config.similarity_path = self.similarity;
        config.default_top_n = self.top_n;
        config.vectorizer = VectorizerConfig { sublinear_tf: !self.raw_tf, smooth_idf: !self.plain_idf };
        config.refit_on_metadata_update = self.refit_on_metadata;
        config.insecure_admin = self.insecure_admin;
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let app: Router = build_app(args.into_config())?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
