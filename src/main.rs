//! scour: a metasearch engine
//!
//! This is the main entry point for the application.

use anyhow::{bail, Context, Result};
use scour::config::Settings;
use scour::search::Searcher;
use scour::web::{create_router, AppState};
use scour::{engines, stats};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("starting scour v{}", scour::VERSION);

    let settings = load_settings()?;

    if !settings.pprof.is_empty() {
        // The profiling listener is an optional extra; nothing in the
        // pipeline depends on it.
        warn!("pprof listener is not available in this build, ignoring");
    }

    let searcher = Searcher::from_settings(&settings, engines::builtin())?;
    info!("initialized {} engines", searcher.engine_names().len());

    let shutdown = CancellationToken::new();
    let pinger = tokio::spawn(stats::pinger(
        searcher.engines(),
        searcher.stats(),
        settings.ping_interval.get(),
        shutdown.clone(),
    ));

    let addr = settings.socket_addr()?;
    let state = AppState::new(settings, searcher)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move {
                let _ = tokio::signal::ctrl_c().await;
                shutdown.cancel();
            }
        })
        .await
        .context("server failed")?;

    shutdown.cancel();
    let _ = pinger.await;

    Ok(())
}

/// Load settings from the `-conf` flag, falling back to `./config.yaml`
/// when present, falling back to the defaults.
fn load_settings() -> Result<Settings> {
    let mut conf: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-conf" | "--conf" => {
                let Some(path) = args.next() else {
                    bail!("-conf requires a path");
                };
                conf = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}"),
        }
    }

    if conf.is_none() {
        let fallback = PathBuf::from("./config.yaml");
        if fallback.exists() {
            conf = Some(fallback);
        }
    }

    match conf {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            Settings::from_file(&path).context("failed to load config file")
        }
        None => {
            info!("no configuration file found, using defaults");
            Ok(Settings::default())
        }
    }
}

fn print_usage() {
    println!(
        r#"scour v{}
A metasearch engine.

USAGE:
    scour [-conf <FILE>]

OPTIONS:
    -conf <FILE>    Path to the configuration file;
                    ./config.yaml is used if it exists
    -h, --help      Print this help
"#,
        scour::VERSION
    );
}
