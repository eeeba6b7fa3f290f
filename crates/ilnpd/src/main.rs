//! Entry point for one ILNP sensor overlay node: loads its configuration, brings up the UDP
//! multicast link, and spawns the listener, router, and control-plane tasks, plus either a mock
//! sensor send loop or a sink receive loop depending on the node's role.
//!
//! Grounded on `main.py`'s node bring-up, rendered with `clap` for the CLI surface and
//! `tokio::spawn` for the three cooperating tasks instead of `threading.Thread`s.

use clap::Parser;
use colorful::{
    Color,
    Colorful,
};
use ilnp_common::Address;
use ilnpd::battery::Battery;
use ilnpd::config::NodeConfig;
use ilnpd::control::ControlPlane;
use ilnpd::monitor::Monitor;
use ilnpd::net::listener;
use ilnpd::net::udp::UdpLinkInterface;
use ilnpd::router;
use ilnpd::sensor::{
    self,
    MockSensorGenerator,
    SinkLog,
};
use log::{
    error,
    info,
    warn,
    LevelFilter,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "ilnpd", about = "ILNP sensor overlay routing daemon")]
struct Cli {
    /// Path to the node's TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Section of the configuration file naming this node, defaulting to the document root.
    #[arg(long, default_value = "node")]
    section: String,
}

fn init_logging() {
    if let Err(error) = simple_logger::SimpleLogger::new().with_level(LevelFilter::Info).init() {
        println!("unable to initialize logging: {error}");
    }
}

fn print_banner() {
    let header = r#"  _ _                 _
 (_) |_ __  _ __   __| |
 | | | '_ \| '_ \ / _` |
 | | | | | | |_) | (_| |
 |_|_|_| |_| .__/ \__,_|
           |_|  ILNP sensor overlay daemon"#;
    println!("{}\n", header.gradient(Color::Blue).bold());
}

async fn run_sender(handle: router::RouterHandle<UdpLinkInterface>, origin_id: u64, sink_id: u64, interval: Duration, battery: Arc<Battery>, shutdown: Arc<AtomicBool>) {
    let mut generator = MockSensorGenerator::new(origin_id);
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    while !shutdown.load(Ordering::Relaxed) {
        ticker.tick().await;
        if battery.is_exhausted() {
            break;
        }

        let reading = generator.next_reading();
        if let Err(err) = handle.send(reading.pack(), sink_id).await {
            warn!("sensor send failed: {err}");
            break;
        }
    }
}

async fn run_sink(handle: router::RouterHandle<UdpLinkInterface>, sink_log_path: Option<PathBuf>) {
    let mut log = SinkLog::new();

    loop {
        let Some((payload, _src_id)) = handle.receive().await else {
            break;
        };
        match sensor::SensorReading::unpack(&payload) {
            Some(reading) => log.record(reading),
            None => warn!("sink received malformed sensor reading ({} bytes)", payload.len()),
        }
    }

    if let Some(path) = sink_log_path {
        if let Err(err) = log.save(&path) {
            error!("unable to save sink log to {}: {err}", path.display());
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = NodeConfig::load(&cli.config, &cli.section)?;

    info!("starting node {}:{}", config.section.my_locator, config.section.my_id);

    let my_address = Address::new(config.section.my_locator, config.section.my_id);
    let battery = Arc::new(Battery::new(config.section.max_sends as u64));
    let monitor = Arc::new(Monitor::new(config.section.my_id));

    let link = Arc::new(UdpLinkInterface::bind(&config, battery.clone())?);
    let control_plane = Arc::new(ControlPlane::new(my_address, battery.clone(), monitor.clone(), link.clone()));

    let (router, handle, to_route_tx, to_route_rx) = router::build(my_address, control_plane.clone(), link.clone());

    let shutdown = Arc::new(AtomicBool::new(false));

    let listener_task = tokio::spawn(listener::run(link.clone(), to_route_tx, shutdown.clone()));
    let router_task = tokio::spawn(router.run(to_route_rx, shutdown.clone()));
    let control_plane_task = tokio::spawn(control_plane.clone().run_keepalive(shutdown.clone()));

    let role_task = if let Some(sink_id) = config.section.sink_id {
        if config.section.my_id == sink_id {
            tokio::spawn(run_sink(handle, config.section.sink_log_file.clone()))
        } else {
            let interval = Duration::from_secs(config.section.interval_secs.max(1));
            tokio::spawn(run_sender(handle, config.section.my_id, sink_id, interval, battery.clone(), shutdown.clone()))
        }
    } else {
        tokio::spawn(async {})
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
        _ = wait_for_exhaustion(battery.clone()) => {
            warn!("battery exhausted, shutting down");
        }
    }

    shutdown.store(true, Ordering::Relaxed);

    let _ = tokio::time::timeout(Duration::from_secs(5), listener_task).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), router_task).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), control_plane_task).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), role_task).await;

    if let Some(results_path) = &config.section.results_file {
        if let Err(err) = monitor.save(results_path) {
            error!("unable to save packet monitor results to {}: {err}", results_path.display());
        }
    }

    info!("node shut down cleanly");
    Ok(())
}

async fn wait_for_exhaustion(battery: Arc<Battery>) {
    loop {
        if battery.is_exhausted() {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    print_banner();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("fatal error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
