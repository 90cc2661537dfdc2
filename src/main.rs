/*============================================================
  Synavera Project: Syn-Gate
  Module: syngate_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for Syn-Gate Core. Parses one catalog request
    from the command line, runs it through the gateway and
    emits the JSON payload, redirect target or artifact bytes.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS requests to
    configured backends only; failures surface as a status and
    message pair without backend detail.

  Dependencies:
    clap for CLI parsing, chrono for timestamps, tokio for I/O.

  Operational Scope:
    Invoked by operators or a routing layer for single
    requests; one process per request.

  Revision History:
    2025-10-28 COD  Authored Syn-Syu Core runtime.
    2025-11-12 COD  Re-targeted to Syn-Gate catalog requests.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use syngate_core::config::GatewayConfig;
use syngate_core::download::{ByteStream, DownloadOutcome};
use syngate_core::error::{GatewayError, Result};
use syngate_core::kv::MemoryStore;
use syngate_core::license::LicenseClient;
use syngate_core::logger::Logger;
use syngate_core::object_store::{LocalObjectStore, StaticFederation};
use syngate_core::portal::PortalClient;
use syngate_core::request::{Channel, RequestContext, RequestDescriptor};
use syngate_core::strategy::{Persona, ProductStrategyDeps};
use syngate_core::upstream::UpstreamCatalogClient;
use syngate_core::Gateway;

/// Command-line arguments for Syn-Gate-Core.
#[derive(Debug, Parser)]
#[command(
    name = "Syn-Gate-Core",
    version,
    author = "Synavera Systems",
    about = "Package catalog gateway for Syn-Gate"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Override the configured persona.
    #[arg(long, value_name = "PERSONA", global = true)]
    persona: Option<String>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List product ids visible to the persona.
    Products {
        /// Include end-of-life products.
        #[arg(long, action = ArgAction::SetTrue)]
        eol: bool,
    },
    /// List platform ids and display names.
    Platforms,
    /// List architecture ids.
    Architectures,
    /// List package managers known to the key-value store.
    PackageManagers,
    /// Latest version of a product.
    Latest(RequestArgs),
    /// All versions of a product visible to the persona.
    Versions(RequestArgs),
    /// Package tree for the resolved version.
    Packages(RequestArgs),
    /// Metadata for one package.
    Metadata(RequestArgs),
    /// Artifact filename for one package.
    Filename(RequestArgs),
    /// Redirect target or artifact bytes for one package.
    Download {
        #[command(flatten)]
        request: RequestArgs,
        /// Write streamed artifacts here instead of stdout.
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Request fields in the gateway's parameter vocabulary.
#[derive(Debug, Args)]
struct RequestArgs {
    #[arg(long, default_value = "stable")]
    channel: String,
    #[arg(long)]
    product: String,
    /// Version or version prefix; empty means latest.
    #[arg(short = 'v', long = "product-version", default_value = "")]
    version: String,
    #[arg(short = 'p', long = "platform", default_value = "")]
    platform: String,
    #[arg(long = "pv", default_value = "")]
    platform_version: String,
    #[arg(short = 'm', long = "arch", default_value = "")]
    architecture: String,
    #[arg(long = "pm", default_value = "")]
    package_manager: String,
    #[arg(long = "license-id", default_value = "")]
    license_id: String,
    #[arg(long, action = ArgAction::SetTrue)]
    eol: bool,
}

impl RequestArgs {
    fn descriptor(&self) -> Result<RequestDescriptor> {
        let channel: Channel = self.channel.parse()?;
        Ok(RequestDescriptor::new(channel, self.product.trim())
            .with_version(self.version.trim())
            .with_target(&self.platform, &self.platform_version, &self.architecture)
            .with_package_manager(&self.package_manager)
            .with_license(&self.license_id)
            .with_eol(self.eol))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            let failure = err.failure();
            eprintln!("[Syn-Gate-Core] {} {}", failure.status, failure.message);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load_from_optional_path(cli.config.as_deref())?;
    if let Some(persona) = cli.persona.as_deref() {
        config.gateway.persona = persona.parse::<Persona>()?;
    }

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("gate_{session_stamp}.log"))));
    let logger = Arc::new(Logger::new(log_path, cli.verbose)?);
    logger.info(
        "INIT",
        format!("Syn-Gate Core awakening as {} persona.", config.gateway.persona),
    );

    let ctx = RequestContext::new(
        format!("cli-{}", Utc::now().timestamp_millis()),
        config.gateway.base_url.clone(),
    );
    let gateway = Gateway::new(build_deps(config)?, logger.clone());

    let result = dispatch(&gateway, &ctx, cli.command, &logger).await;
    match &result {
        Ok(_) => logger.info("COMPLETE", "Request served."),
        Err(err) => logger.warn("COMPLETE", format!("Request failed: {err}")),
    }
    logger.finalize()?;
    result.map(|_| ExitCode::SUCCESS)
}

/// Production collaborators for every backend.
fn build_deps(config: GatewayConfig) -> Result<ProductStrategyDeps> {
    let store = match config.store.snapshot.as_deref() {
        Some(path) => MemoryStore::from_json_file(path)?,
        None => MemoryStore::new(),
    };
    let object_root = config.object_store.root.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("syn-gate")
            .join("objects")
    });

    Ok(ProductStrategyDeps {
        store: Arc::new(store),
        catalog: Arc::new(UpstreamCatalogClient::new(&config.upstream)?),
        license: Arc::new(LicenseClient::new(&config.license)?),
        portal: Arc::new(PortalClient::new(&config.portal)?),
        federation: Arc::new(StaticFederation::new(config.object_store.credential_ttl_secs)),
        objects: Arc::new(LocalObjectStore::new(object_root)),
        config: Arc::new(config),
    })
}

async fn dispatch(gateway: &Gateway, ctx: &RequestContext, command: Command, logger: &Logger) -> Result<()> {
    match command {
        Command::Products { eol } => print_json(&gateway.products(ctx, eol).await?),
        Command::Platforms => print_json(&gateway.platforms(ctx).await?),
        Command::Architectures => print_json(&gateway.architectures(ctx).await?),
        Command::PackageManagers => print_json(&gateway.package_managers(ctx).await?),
        Command::Latest(args) => print_json(&gateway.latest_version(ctx, &args.descriptor()?).await?),
        Command::Versions(args) => print_json(&gateway.all_versions(ctx, &args.descriptor()?).await?),
        Command::Packages(args) => print_json(&gateway.packages(ctx, &args.descriptor()?).await?),
        Command::Metadata(args) => print_json(&gateway.metadata(ctx, &args.descriptor()?).await?),
        Command::Filename(args) => print_json(&gateway.file_name(ctx, &args.descriptor()?).await?),
        Command::Download { request, output } => {
            match gateway.download(ctx, &request.descriptor()?).await? {
                DownloadOutcome::Redirect(url) => {
                    println!("{url}");
                    Ok(())
                }
                DownloadOutcome::Metadata(record) => print_json(&record),
                DownloadOutcome::Stream(artifact) => {
                    for (name, value) in artifact.headers() {
                        logger.debug("DOWNLOAD", format!("{name}: {value}"));
                    }
                    let written = write_stream(artifact.body, output.as_deref()).await?;
                    logger.info("DOWNLOAD", format!("Streamed {written} bytes"));
                    Ok(())
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|err| GatewayError::Serialization(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

/// Copy the artifact chunk by chunk; the body is never held whole.
async fn write_stream(mut body: ByteStream, output: Option<&Path>) -> Result<u64> {
    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => Box::new(tokio::fs::File::create(path).await?),
        None => Box::new(tokio::io::stdout()),
    };
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;
    Ok(written)
}
