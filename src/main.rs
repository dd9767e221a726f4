use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use tokio::sync::broadcast;
use tokio::time::{interval, sleep, MissedTickBehavior};

use hwinfo_bridge::core::supervisor::{Supervisor, SupervisorState, WorkerConfig};
use hwinfo_bridge::BridgeConfig;
use hwinfo_bridge::HardwareService;

#[tokio::main]
async fn main() -> Result<()> {
    hwinfo_bridge::init_logging();

    let matches = Command::new("hwinfo-bridge")
        .version("0.1.0")
        .about("Query live HWiNFO sensor telemetry through a supervised worker process")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("poll-time").about("Show the timestamp of the last HWiNFO poll"))
        .subcommand(Command::new("sensors").about("List all sensors (key and name)"))
        .subcommand(
            Command::new("readings")
                .about("List the readings of one sensor")
                .arg(
                    Arg::new("sensor")
                        .help("Sensor key as printed by 'sensors'")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Print one reading every second until interrupted")
                .arg(
                    Arg::new("sensor")
                        .help("Sensor key as printed by 'sensors'")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("reading")
                        .help("Reading id as printed by 'readings'")
                        .required(true)
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change the persisted configuration")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("get").about("Print the current configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Change configuration values")
                        .arg(
                            Arg::new("poll-interval-ms")
                                .long("poll-interval-ms")
                                .value_name("MS")
                                .help("Shared memory poll interval"),
                        )
                        .arg(
                            Arg::new("worker-path")
                                .long("worker-path")
                                .value_name("PATH")
                                .help("Path to the hwinfo-worker executable"),
                        )
                        .arg(
                            Arg::new("region-file")
                                .long("region-file")
                                .value_name("PATH")
                                .help("Raw region dump to read instead of live shared memory"),
                        ),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("config", sub)) => run_config(sub),
        Some(("poll-time", _)) => with_supervisor(cmd_poll_time).await,
        Some(("sensors", _)) => with_supervisor(cmd_sensors).await,
        Some(("readings", sub)) => {
            let sensor = sub.get_one::<String>("sensor").unwrap().clone();
            with_supervisor(move |hw| cmd_readings(hw, sensor)).await
        }
        Some(("watch", sub)) => {
            let sensor = sub.get_one::<String>("sensor").unwrap().clone();
            let reading: u32 = sub
                .get_one::<String>("reading")
                .unwrap()
                .parse()
                .context("reading id must be a number")?;
            cmd_watch(sensor, reading).await
        }
        _ => unreachable!("subcommand required"),
    }
}

/// Resolve the worker executable: config override first, then the binary
/// sitting next to the host executable.
fn worker_config(config: &BridgeConfig) -> Result<WorkerConfig> {
    let program = match &config.worker_path {
        Some(path) => PathBuf::from(path),
        None => {
            let exe = std::env::current_exe().context("cannot locate own executable")?;
            let dir = exe.parent().context("executable has no parent directory")?;
            dir.join(if cfg!(windows) {
                "hwinfo-worker.exe"
            } else {
                "hwinfo-worker"
            })
        }
    };

    let mut worker = WorkerConfig::new(program);
    worker.respawn_delay = Duration::from_millis(config.respawn_delay_ms);
    worker
        .args
        .push(format!("--poll-interval-ms={}", config.poll_interval_ms));
    if let Some(region_file) = &config.region_file {
        worker.args.push(format!("--region-file={region_file}"));
    }
    Ok(worker)
}

/// Start the supervisor, wait for the worker to come up, run one command
/// against it, and tear the worker down deterministically.
async fn with_supervisor<F, Fut>(f: F) -> Result<()>
where
    F: FnOnce(Arc<Supervisor>) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    let config = BridgeConfig::load()?;
    let supervisor = Supervisor::start(worker_config(&config)?);

    // Kill the worker and its process group even if we are interrupted.
    let (sig_tx, mut sig_rx) = broadcast::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = sig_tx.send(());
    })
    .context("failed to install signal handler")?;

    let result = tokio::select! {
        result = run_when_ready(Arc::clone(&supervisor), f) => result,
        _ = sig_rx.recv() => Err(anyhow::anyhow!("interrupted")),
    };

    supervisor.shutdown().await;
    result
}

async fn run_when_ready<F, Fut>(supervisor: Arc<Supervisor>, f: F) -> Result<()>
where
    F: FnOnce(Arc<Supervisor>) -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    // The first spawn + handshake takes a moment; do not fail queries that
    // merely raced it.
    for _ in 0..100 {
        if supervisor.state() == SupervisorState::Running {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    f(supervisor).await
}

async fn cmd_poll_time(hw: Arc<Supervisor>) -> Result<()> {
    let ts = hw.poll_time().await?;
    match chrono::DateTime::from_timestamp(ts as i64, 0) {
        Some(when) => println!("{ts} ({when})"),
        None => println!("{ts}"),
    }
    Ok(())
}

async fn cmd_sensors(hw: Arc<Supervisor>) -> Result<()> {
    let sensors = hw.sensors().await?;
    if sensors.is_empty() {
        println!("no sensors reported");
        return Ok(());
    }
    println!("{:<12} NAME", "KEY");
    for sensor in sensors {
        println!("{:<12} {}", sensor.id, sensor.name);
    }
    Ok(())
}

async fn cmd_readings(hw: Arc<Supervisor>, sensor: String) -> Result<()> {
    let readings = hw.readings_for_sensor(&sensor).await?;
    if readings.is_empty() {
        println!("sensor {sensor} has no readings");
        return Ok(());
    }
    println!(
        "{:<10} {:<8} {:<40} {:<8} {:>12} {:>12} {:>12} {:>12}",
        "ID", "TYPE", "LABEL", "UNIT", "VALUE", "MIN", "MAX", "AVG"
    );
    for r in readings {
        println!(
            "{:<10} {:<8} {:<40} {:<8} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            r.id, r.type_name, r.label, r.unit, r.value, r.value_min, r.value_max, r.value_avg
        );
    }
    Ok(())
}

async fn cmd_watch(sensor: String, reading_id: u32) -> Result<()> {
    let config = BridgeConfig::load()?;
    let supervisor = Supervisor::start(worker_config(&config)?);

    let (sig_tx, mut sig_rx) = broadcast::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = sig_tx.send(());
    })
    .context("failed to install signal handler")?;

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match supervisor.readings_for_sensor(&sensor).await {
                    Ok(readings) => match readings.iter().find(|r| r.id == reading_id) {
                        Some(r) => println!("{} {} = {:.3} {}", r.type_name, r.label, r.value, r.unit),
                        None => println!("reading {reading_id} not present on sensor {sensor}"),
                    },
                    // Transient while the worker respawns; keep watching.
                    Err(e) => println!("unavailable: {e}"),
                }
            }
            _ = sig_rx.recv() => break,
        }
    }

    supervisor.shutdown().await;
    Ok(())
}

fn run_config(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("get", _)) => {
            let config = BridgeConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Some(("set", sub)) => {
            let mut config = BridgeConfig::load()?;
            let mut changed = false;
            if let Some(ms) = sub.get_one::<String>("poll-interval-ms") {
                config.poll_interval_ms = ms.parse().context("poll interval must be a number")?;
                changed = true;
            }
            if let Some(path) = sub.get_one::<String>("worker-path") {
                config.worker_path = Some(path.clone());
                changed = true;
            }
            if let Some(path) = sub.get_one::<String>("region-file") {
                config.region_file = Some(path.clone());
                changed = true;
            }
            if !changed {
                bail!("nothing to set; see 'hwinfo-bridge config set --help'");
            }
            config.save()?;
            println!("configuration saved");
            Ok(())
        }
        _ => unreachable!("subcommand required"),
    }
}
