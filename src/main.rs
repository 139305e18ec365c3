use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};

use clap::Parser;
use minnow::{in_memory, mongo, routes};

#[derive(Parser)]
#[command(name = "minnow", version, about = "small social-networking backend")]
struct Cli {
    /// Socket address to serve on.
    #[arg(long, env = "MINNOW_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// MongoDB connection string; when omitted, state lives in memory.
    #[arg(long, env = "MINNOW_MONGO_URI")]
    mongo_uri: Option<String>,

    /// Database name for the mongo backend.
    #[arg(long, env = "MINNOW_MONGO_DB", default_value = "minnow")]
    mongo_db: String,
}

async fn async_main(cli: Cli) -> ::anyhow::Result<()> {
    let handler = match cli.mongo_uri {
        Some(uri) => mongo(uri, cli.mongo_db).await?,
        None => {
            tracing::warn!("no mongo uri given, falling back to in-memory storage");
            in_memory()
        },
    };

    let listener = tokio::net::TcpListener::bind(cli.bind).await?;
    tracing::info!("listening on {}", cli.bind);

    axum::serve(listener, routes::router(handler).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    static NUM: AtomicU32 = AtomicU32::new(0);
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name_fn(|| format!("minnow-worker-{}", NUM.fetch_add(1, Ordering::Relaxed)))
        .build()
    {
        Ok(r) => r,
        Err(e) => return eprintln!("{}", e),
    };

    if let Err(e) = rt.block_on(async_main(cli)) {
        eprintln!("server returned: {:#}", e);
    }
}
