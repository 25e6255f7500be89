//! routeway demo server.
//!
//! ```text
//! GET  /health               → "ok"
//! GET  /hello/:name          → greeting, `?greeting=` overrides the word
//! GET  /static/:file         → files below `static_files.root` (if set)
//! POST /api/User             → echoes a JSON user (guarded)
//! GET  /api/User/:id         → user id lookup
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use routeway::config::{load_config, ServerConfig};
use routeway::lifecycle::shutdown_signal;
use routeway::middleware::{json_body, require_content_type, require_header};
use routeway::observability::{logging, metrics};
use routeway::{handler_fn, handlers, Reply, Request, Router, Routes, Server, StaticDir};

#[derive(Debug, Parser)]
#[command(name = "routeway", version, about = "Minimal HTTP server framework demo")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides `listener.port`).
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory served under /static (overrides `static_files.root`).
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct User {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = args.static_dir {
        config.static_files.root = Some(dir);
    }
    let port = args.port.unwrap_or(config.listener.port);

    logging::init_logging(&config.observability);
    tracing::info!("routeway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        host = %config.listener.host,
        port,
        max_connections = config.listener.max_connections,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = build_app(config);
    let running = server.listen(port).await?;
    tracing::info!(address = %running.local_addr(), "Listening for connections");

    shutdown_signal().await;
    running.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(config: ServerConfig) -> Server {
    let static_root = config.static_files.root.clone();
    let mut server = Server::with_config(config);

    server
        .get("/health", "ok")
        .get(
            "/hello/:name",
            handler_fn(|req: Request| async move {
                let greeting = req.query_param("greeting").unwrap_or_else(|| "Hello".to_owned());
                format!("{greeting}, {}!", req.param("name").unwrap_or("stranger"))
            }),
        );

    if let Some(root) = static_root {
        tracing::info!(root = %root.display(), "Serving static files");
        server.get("/static/:file", StaticDir::new(root));
    }

    let mut api = Router::new();
    api.middleware(require_header(
        "X-Requested-With",
        r#"Header "X-Requested-With" must be sent."#,
    ))
    .post(
        "/User",
        handlers![
            require_content_type("application/json"),
            json_body::<User>(),
            handler_fn(|req: Request| async move {
                let user: User = req.json_as().await?;
                Reply::new().json(&user)
            }),
        ],
    )
    .get(
        "/User/:id",
        handler_fn(|req: Request| async move {
            Reply::new().json(&serde_json::json!({ "id": req.param("id") }))
        }),
    );
    server.route("/api", api);

    server
}
