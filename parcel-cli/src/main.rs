use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use error::AppError;
use indicatif::MultiProgress;
use parcel_engine::{DownloadContext, Downloader, DownloaderConfig, Options, ProxyConfig, ProxyType};
use tokio::io::AsyncWriteExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

mod cli;
mod error;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;
use utils::{format_bytes, parse_header};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!("parcel {}", env!("CARGO_PKG_VERSION"));

    let config = build_config(&args)?;
    let downloader = Downloader::with_config(config)?;

    let ctx = match args.timeout {
        0 => DownloadContext::new(),
        secs => {
            info!("Transfer deadline set to {secs}s");
            DownloadContext::with_timeout(Duration::from_secs(secs))
        }
    };

    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, canceling download");
            token.cancel();
        }
    });

    let multi = MultiProgress::new();
    let progress = if args.show_progress {
        ProgressManager::new(multi)
    } else {
        ProgressManager::new_disabled(multi)
    };

    let mut options = Options::new();
    if let Some(workers) = args.concurrency {
        options = options.with_concurrency(move |_| workers);
    }
    if !progress.is_disabled() {
        options.proxy = Some(progress.proxy_fn());
    }

    let started = Instant::now();
    let mut file = match downloader.open_with_context(ctx, &args.url, options).await {
        Ok(file) => {
            progress.finish();
            file
        }
        Err(e) => {
            progress.abandon();
            if e.is_interrupted() {
                info!("Partial chunks were kept, run the same command again to resume");
            }
            return Err(e.into());
        }
    };

    let info = file.stat()?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(info.name()));
    debug!(output = %output.display(), size = info.len(), "Writing output");

    let mut out = tokio::fs::File::create(&output).await?;
    let copied = tokio::io::copy(&mut file, &mut out).await?;
    out.flush().await?;
    file.close().await?;

    info!(
        "Saved {} ({}) in {:.2?}",
        output.display(),
        format_bytes(copied),
        started.elapsed()
    );
    Ok(())
}

fn build_config(args: &CliArgs) -> Result<DownloaderConfig, AppError> {
    let mut builder = DownloaderConfig::builder()
        .with_connect_timeout(Duration::from_secs(args.connect_timeout));

    for header in &args.headers {
        if let Some((name, value)) = parse_header(header) {
            info!("Adding header: {}: {}", name, value);
            builder = builder.with_header(name, value);
        }
    }

    if let Some(root) = &args.staging_dir {
        builder = builder.with_staging_root(root);
    }

    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        builder = builder.with_system_proxy(false);
    } else if let Some(proxy_url) = &args.proxy {
        let proxy_type = match args.proxy_type.as_str() {
            "http" => ProxyType::Http,
            "https" => ProxyType::Https,
            "socks5" => ProxyType::Socks5,
            "all" => ProxyType::All,
            other => {
                return Err(AppError::InvalidInput(format!(
                    "Invalid proxy type: '{other}'"
                )));
            }
        };
        info!(proxy_url = %proxy_url, proxy_type = ?proxy_type, "Using explicit proxy configuration");
        builder = builder.with_proxy(ProxyConfig {
            url: proxy_url.clone(),
            proxy_type,
        });
    }

    Ok(builder.build())
}
