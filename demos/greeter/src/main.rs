mod handlers;

use anyhow::Context as _;
use clap::Parser;
use oasrouter::logging::{init_logging_with_config, LogConfig};
use oasrouter::middleware::{error_handler, request_logger};
use oasrouter::runtime_config::RuntimeConfig;
use oasrouter::server::{HttpServer, RouterService};
use oasrouter::{load_spec, Group, RouterBuilder, RouterOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Greeter demo server
#[derive(Parser)]
#[command(name = "greeter")]
#[command(about = "Serve the greeter OpenAPI specification", long_about = None)]
struct Args {
    /// Path to the OpenAPI specification file (YAML or JSON)
    #[arg(short, long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/openapi.yaml"))]
    spec: PathBuf,

    /// Router options (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    addr: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    RuntimeConfig::from_env().apply();

    let spec = load_spec(&args.spec)?;
    let options = match &args.config {
        Some(path) => RouterOptions::from_yaml_file(path)?,
        None => RouterOptions::default(),
    };

    let secured = Group::new()
        .use_middleware(handlers::require_auth())
        .with_operation("messageOfTheDay", handlers::message_of_the_day(), vec![]);

    let router = RouterBuilder::new(spec)
        .with_options(options)
        .use_middleware(request_logger())
        .use_middleware(error_handler())
        .with_operation("greet", handlers::greet(), vec![])
        .with_operation("listGreetings", handlers::list_greetings(), vec![])
        .with_group(secured)
        .build()?;
    info!(routes = router.route_count(), "greeter ready");

    let handle = HttpServer(RouterService::new(Arc::new(router)))
        .start(args.addr.as_str())
        .with_context(|| format!("failed to listen on {}", args.addr))?;
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server failed: {e:?}"))?;
    Ok(())
}
