// hwinfo-worker: supervised subprocess owning the shared memory access.
//
// Launched by the hwinfo-bridge host, never by hand: the host passes a magic
// cookie in the environment and reads a single announcement line from stdout
// (`HWINFO-BRIDGE|<version>|<addr>`), then connects to the printed address.
// All logging goes to stderr to keep stdout clean for the announcement.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Arg, Command};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use hwinfo_bridge::core::poller::{poll_task, DEFAULT_POLL_INTERVAL};
use hwinfo_bridge::core::service::{HardwareService, SensorHub};
use hwinfo_bridge::ipc::proto::announce_line;
use hwinfo_bridge::ipc::{server, COOKIE_ENV, MAGIC_COOKIE};
use hwinfo_bridge::platform::{FileRegionSource, RegionSource};

fn build_source(region_file: Option<&String>) -> Result<Box<dyn RegionSource>> {
    if let Some(path) = region_file {
        return Ok(Box::new(FileRegionSource::new(path.clone())));
    }
    #[cfg(windows)]
    {
        Ok(Box::new(
            hwinfo_bridge::platform::SharedMemorySource::new(),
        ))
    }
    #[cfg(not(windows))]
    {
        bail!("live HWiNFO shared memory is only available on Windows; pass --region-file");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    hwinfo_bridge::init_worker_logging();

    let matches = Command::new("hwinfo-worker")
        .version("0.1.0")
        .about("HWiNFO bridge worker process (launched by hwinfo-bridge)")
        .arg(
            Arg::new("poll-interval-ms")
                .long("poll-interval-ms")
                .value_name("MS")
                .help("Shared memory poll interval in milliseconds"),
        )
        .arg(
            Arg::new("region-file")
                .long("region-file")
                .value_name("PATH")
                .help("Read the region from a raw dump file instead of shared memory"),
        )
        .get_matches();

    // Refuse to run standalone: this binary is an implementation detail of
    // the host and its protocol is not a public interface.
    if std::env::var(COOKIE_ENV).as_deref() != Ok(MAGIC_COOKIE) {
        bail!(
            "hwinfo-worker is an internal helper of hwinfo-bridge and cannot be run directly"
        );
    }

    let poll_interval = matches
        .get_one::<String>("poll-interval-ms")
        .map(|ms| ms.parse::<u64>())
        .transpose()?
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    let source = build_source(matches.get_one::<String>("region-file"))?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    // The announcement must be the first and only line on stdout.
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", announce_line(&addr))?;
    stdout.flush()?;

    let hub = Arc::new(SensorHub::new());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    tokio::spawn(poll_task(
        Arc::clone(&hub),
        source,
        poll_interval,
        shutdown_tx.subscribe(),
    ));

    // Orphan watchdog: the host holds our stdin open for our entire
    // lifetime, so EOF means the host is gone and we must not linger.
    let watchdog_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = [0u8; 64];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
        log::info!("host went away, shutting down");
        let _ = watchdog_shutdown.send(());
    });

    let service: Arc<dyn HardwareService> = hub;
    server::serve(listener, service, shutdown_tx.subscribe()).await;
    Ok(())
}
