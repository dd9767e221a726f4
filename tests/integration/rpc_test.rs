use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use hwinfo_bridge::core::service::{HardwareService, SensorHub};
use hwinfo_bridge::core::shmem::Snapshot;
use hwinfo_bridge::ipc::proto::{Frame, Request};
use hwinfo_bridge::ipc::{server, RpcClient, MAGIC_COOKIE};
use hwinfo_bridge::BridgeError;

use super::fixtures::small_region;

async fn start_server(region: Vec<u8>) -> (String, broadcast::Sender<()>) {
    let hub = SensorHub::new();
    hub.publish(Snapshot::decode(region).unwrap());
    let service: Arc<dyn HardwareService> = Arc::new(hub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let (shutdown_tx, _) = broadcast::channel(1);
    tokio::spawn(server::serve(listener, service, shutdown_tx.subscribe()));
    (addr, shutdown_tx)
}

#[tokio::test]
async fn full_query_round_trip() {
    let (addr, _shutdown) = start_server(small_region(1_700_000_000)).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    assert_eq!(client.poll_time().await.unwrap(), 1_700_000_000);

    let sensors = client.sensors().await.unwrap();
    assert_eq!(sensors.len(), 2);
    assert_eq!(sensors[0].id, "502");
    assert_eq!(sensors[0].name, "CPU [#0]: AMD Ryzen");

    let readings = client.readings_for_sensor("700").await.unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[1].label, "Chassis2 Fan");
    assert_eq!(readings[1].unit, "RPM");
    assert_eq!(readings[1].value, 1200.0);
}

#[tokio::test]
async fn error_taxonomy_crosses_the_wire() {
    let (addr, _shutdown) = start_server(small_region(1)).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    assert!(matches!(
        client.readings_for_sensor("404404").await.unwrap_err(),
        BridgeError::NotFound(_)
    ));
    // The connection stays usable after an error reply.
    assert_eq!(client.sensors().await.unwrap().len(), 2);
}

#[tokio::test]
async fn sequential_queries_on_one_connection() {
    let (addr, _shutdown) = start_server(small_region(1)).await;
    let client = RpcClient::connect(&addr).await.unwrap();
    for _ in 0..10 {
        assert_eq!(client.sensors().await.unwrap().len(), 2);
    }
}

async fn raw_hello(addr: &str, cookie: &str, version: u32) -> Frame {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = serde_json::to_string(&Request::Hello {
        cookie: cookie.to_string(),
        version,
    })
    .unwrap();
    line.push('\n');
    writer.write_all(line.as_bytes()).await.unwrap();

    let mut reply = String::new();
    reader.read_line(&mut reply).await.unwrap();
    serde_json::from_str(&reply).unwrap()
}

#[tokio::test]
async fn version_mismatch_is_rejected_before_any_query() {
    let (addr, _shutdown) = start_server(small_region(1)).await;
    let reply = raw_hello(&addr, MAGIC_COOKIE, 999).await;
    assert!(matches!(reply, Frame::Error { .. }));
}

#[tokio::test]
async fn wrong_cookie_is_rejected() {
    let (addr, _shutdown) = start_server(small_region(1)).await;
    let reply = raw_hello(&addr, "intruder", 1).await;
    assert!(matches!(reply, Frame::Error { .. }));
}

#[tokio::test]
async fn query_before_handshake_is_rejected() {
    let (addr, _shutdown) = start_server(small_region(1)).await;
    let stream = TcpStream::connect(&addr).await.unwrap();
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = serde_json::to_string(&Request::Sensors).unwrap();
    line.push('\n');
    writer.write_all(line.as_bytes()).await.unwrap();

    let mut reply = String::new();
    reader.read_line(&mut reply).await.unwrap();
    let frame: Frame = serde_json::from_str(&reply).unwrap();
    assert!(matches!(frame, Frame::Error { .. }));

    // Server drops the connection after the rejection.
    let mut next = String::new();
    assert_eq!(reader.read_line(&mut next).await.unwrap(), 0);
}
