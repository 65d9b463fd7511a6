//! Demo server hosting the actuator under `/api/actuator`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use actuator::config::Settings;
use actuator::telemetry;
use actuator::utils::{read_properties, shutdown_signal};
use actuator::{Actuator, ActuatorConfig, ActuatorRequest, Component};

/// Path prefix the demo mounts the actuator under.
const MOUNT: &str = "/api/actuator";

/// Demo server for the actuator endpoints.
#[derive(Parser, Debug)]
#[command(name = "actuator-demo")]
#[command(about = "Serve health, info and metrics endpoints")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides ACTUATOR_PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the actuator (default).
    Serve,

    /// Check configuration validity.
    CheckConfig,

    /// Print the resolved route table.
    Routes,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("actuator=debug,actuator_demo=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    telemetry::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Routes) => cmd_routes(args.port),
        Some(Command::Serve) | None => cmd_serve(args.port).await,
    }
}

fn load_settings(port: Option<u16>) -> anyhow::Result<Settings> {
    let mut settings = Settings::load()?;
    settings.validate()?;
    if let Some(port) = port {
        settings.port = port;
    }
    Ok(settings)
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("ACTUATOR - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let settings = match Settings::load() {
        Ok(s) => {
            println!("OK");
            s
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    if let Err(e) = settings.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }
    println!("OK");

    let endpoints = settings.endpoints();
    let show = |path: &Option<String>| path.clone().unwrap_or_else(|| "disabled".to_string());

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Disabled: {}", settings.disabled);
    println!("  Health: {}", show(&endpoints.health));
    println!("  Metrics: {}", show(&endpoints.metrics));
    println!("  Info: {}", show(&endpoints.info));
    println!("  Build ID: {:?}", settings.build_id_source());
    println!("  Route Match: {}", settings.route_match);
    println!("  Port: {}", settings.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Print the resolved route table.
fn cmd_routes(port: Option<u16>) -> anyhow::Result<()> {
    let settings = load_settings(port)?;
    let actuator = Actuator::new(demo_config(&settings));

    if actuator.routes().is_empty() {
        println!("(actuator disabled)");
        return Ok(());
    }
    for route in actuator.routes().routes() {
        println!("GET {}{:<28} {:?}", MOUNT, route.suffix, route.endpoint);
    }
    Ok(())
}

/// Serve the actuator until shutdown.
async fn cmd_serve(port: Option<u16>) -> anyhow::Result<()> {
    let settings = load_settings(port)?;
    let actuator = Actuator::new(demo_config(&settings));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    info!(
        routes = actuator.routes().routes().len(),
        "Actuator mounted under {}", MOUNT
    );

    let router = actuator.router().layer(TraceLayer::new_for_http());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Demo configuration: a self-check, a broken dependency and app/git info.
fn demo_config(settings: &Settings) -> ActuatorConfig {
    let info_url = settings
        .endpoints()
        .info
        .map(|path| format!("http://127.0.0.1:{}{}{}", settings.port, MOUNT, path));

    let builder = ActuatorConfig::builder()
        .component(
            "internal",
            Component::from_fn(move |_: ActuatorRequest| {
                let info_url = info_url.clone();
                async move { self_check(info_url.as_deref()).await }
            })
            .with_detail("description", "Dog-fooding our own implementation"),
        )
        .component(
            "external",
            Component::from_fn(|_| async { Ok(404u16) })
                .with_detail("description", "Burning the whole house down"),
        )
        .info(|| async { Ok(application_info().await) });

    settings.apply(builder).build()
}

/// Up when our own info endpoint reports this application's name.
async fn self_check(info_url: Option<&str>) -> anyhow::Result<bool> {
    let Some(url) = info_url else {
        return Ok(false);
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let body: Value = client.get(url).send().await?.json().await?;

    Ok(body["application"]["name"] == env!("CARGO_PKG_NAME"))
}

/// Application metadata plus git details when `git.properties` is present.
async fn application_info() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "application".to_string(),
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "author": env!("CARGO_PKG_AUTHORS"),
        }),
    );

    match read_properties(Path::new("git.properties")).await {
        Ok(git) => {
            let get = |key: &str| git.get(key).cloned();
            fields.insert(
                "git".to_string(),
                json!({
                    "time": get("git.commit.time"),
                    "branch": get("git.branch"),
                    "id": {
                        "full": get("git.commit.id"),
                        "short": get("git.commit.id.abbrev"),
                    },
                    "message": {
                        "full": get("git.commit.message.full"),
                        "short": get("git.commit.message.short"),
                    },
                    "author": {
                        "email": get("git.commit.user.email"),
                        "name": get("git.commit.user.name"),
                    },
                }),
            );
        }
        Err(e) => warn!(error = %e, "git.properties unavailable"),
    }

    fields
}
