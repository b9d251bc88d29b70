//! Pi-cam-snapshot HTTP server.

use clap::Parser;
use pi_cam_snapshot::config::DEFAULT_CONFIG_PATH;
use pi_cam_snapshot::server;
use pi_cam_snapshot::{CaptureCoordinator, GpioLight, SnapshotConfig, V4L2Provider};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_http::Server;

/// On-demand camera snapshots over HTTP.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file; defaults apply when it does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Listen address, overriding `[server] bind`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,
}

fn main() {
    pi_cam_snapshot::init_logging();

    if let Err(err) = run(Args::parse()) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = SnapshotConfig::load_from_file(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let settings = config.capture_settings()?;
    let light: Option<GpioLight> = config.gpio_light();
    match &light {
        Some(light) => log::info!(
            "light on {}:{} (settle {:?})",
            light.chip().display(),
            light.line(),
            settings.settle
        ),
        None => log::info!("no light configured"),
    }

    let coordinator = Arc::new(CaptureCoordinator::new(V4L2Provider, light, settings));
    let http = Server::http(&config.server.bind)
        .map_err(|err| format!("failed to bind {}: {err}", config.server.bind))?;
    log::info!("listening on {}", config.server.bind);

    server::serve(&http, &coordinator, config.request_defaults());
    Ok(())
}
