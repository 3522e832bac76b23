//! # Chessmate CLI
//!
//! Process entrypoint: loads [`config::Config`] from the environment,
//! initializes logging, wires every collaborator (`wiring::build`), and
//! runs the query server alongside the embedding workers until a signal
//! asks it to stop (spec.md §9 "Configuration": a single frozen config
//! value, assembled once at startup).

mod cli_args;
pub mod config;
mod shutdown;
mod wiring;

use clap::Parser;
use cli_args::Cli;
use log::{error, info};
use std::net::SocketAddr;
use std::time::Duration;

pub async fn run() -> anyhow::Result<()> {
    env_logger::init();

    let args = Cli::parse();

    let mut config = config::Config::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(worker_count) = args.worker_count {
        config.worker_count = worker_count;
    }

    info!(
        "starting chessmate: bind={} workers={} qdrant_collection={}",
        config.bind_addr, config.worker_count, config.qdrant_collection_name
    );

    let built = wiring::build(&config).await?;
    let router = chessmate_server::build_router(built.state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", listener.local_addr()?);

    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::wait_for_signal());

    let mut worker_handles = Vec::new();
    if let Some(worker) = built.worker {
        for index in 0..config.worker_count.max(1) {
            let worker = worker.clone();
            worker_handles.push(tokio::spawn(async move {
                info!("embedding worker {index} starting");
                worker.run(None).await;
            }));
        }
    } else {
        info!("no OPENAI_API_KEY configured: embedding workers disabled, query serving only");
    }

    if let Err(err) = server.await {
        error!("server exited with error: {err}");
        return Err(err.into());
    }

    for handle in worker_handles {
        handle.abort();
    }

    let pool = built.db_pool;
    tokio::time::timeout(Duration::from_secs(5), pool.close()).await.ok();

    info!("chessmate shut down cleanly");
    Ok(())
}
