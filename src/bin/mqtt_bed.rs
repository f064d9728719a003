//! MQTT to BLE bridge for motorized bed bases.
//!
//! Subscribes to the command topic, writes each command to the bed, keeps
//! the connection alive and republishes the derived bed state.
//!
//! # Usage
//!
//! ```sh
//! mqtt-bed --config /etc/mqtt-bed.toml
//! mqtt-bed --model dewertokin --address 00:11:22:33:44:55 --log-level debug
//! ```
//!
//! Precedence, lowest first: built-in defaults, the config file, the
//! `BED_ADDRESS`/`BLE_ADDRESS`/`BED_TYPE` environment variables, then the
//! command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mqtt_bed::hal::{PretendGatt, SystemClock};
use mqtt_bed::services::MqttBridge;
use mqtt_bed::{spawn_keepalive, BedModel, CancelToken, Config, ConnectionEngine, EngineError};

type Engine = ConnectionEngine<PretendGatt, SystemClock>;

#[derive(Parser, Debug)]
#[command(name = "mqtt-bed")]
#[command(about = "Control a motorized bed base over BLE from MQTT", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, env = "MQTT_BED_CONFIG")]
    config: Option<PathBuf>,

    /// Bed hardware address, e.g. 7C:EC:79:FF:6D:02
    #[arg(long)]
    address: Option<String>,

    /// Bed model: serta, jiecang, dewertokin, dewertokin-old or linak
    #[arg(long)]
    model: Option<String>,

    /// Log filter, e.g. `info` or `mqtt_bed=debug` (default: $RUST_LOG, then info)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = load_config(&args)?;
    let address = config.bed.address()?;
    let descriptor = config.bed.model.descriptor();

    info!(
        model = descriptor.model.as_str(),
        product = descriptor.product,
        %address,
        "mqtt-bed starting"
    );
    warn!("no BLE stack available, using the pretend backend (writes are logged only)");

    let shutdown = CancelToken::new();
    let engine = Arc::new(
        ConnectionEngine::new(
            descriptor,
            address,
            PretendGatt::new(),
            SystemClock::new(),
            config.timing.clone(),
        )
        .with_cancel_token(shutdown.clone()),
    );
    info!(commands = engine.commands().len(), "command table loaded");

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(run(engine, config, shutdown))
}

async fn run(engine: Arc<Engine>, config: Config, shutdown: CancelToken) -> anyhow::Result<()> {
    // The first connect blocks until the bed answers; keep Ctrl-C responsive
    let connector = Arc::clone(&engine);
    let connect = tokio::task::spawn_blocking(move || connector.connect());
    tokio::select! {
        result = connect => match result.context("connect task failed")? {
            Ok(()) => {}
            Err(EngineError::Cancelled) => return Ok(()),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted while connecting");
            shutdown.cancel();
            return Ok(());
        }
    }

    let prober =
        spawn_keepalive(Arc::clone(&engine)).context("failed to start keepalive thread")?;

    let bridge = MqttBridge::new(Arc::clone(&engine), config.mqtt);
    tokio::select! {
        _ = bridge.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("shutting down");
        }
    }

    shutdown.cancel();
    if let Some(prober) = prober {
        let joined = tokio::task::spawn_blocking(move || prober.join())
            .await
            .context("join task failed")?;
        if joined.is_err() {
            warn!("keepalive thread panicked");
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => Config::default(),
    };
    config = config.apply_process_env()?;

    if let Some(address) = &args.address {
        config.bed.address = address.clone();
    }
    if let Some(model) = &args.model {
        config.bed.model =
            BedModel::from_text(model).ok_or_else(|| anyhow!("unknown bed model {model:?}"))?;
    }

    config.validate()?;
    Ok(config)
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}
