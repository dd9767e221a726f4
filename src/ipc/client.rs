//! Host-side RPC client implementing [`HardwareService`] over the wire.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::proto::{Frame, Request};
use super::{MAGIC_COOKIE, PROTOCOL_VERSION};
use crate::core::service::{HardwareService, ReadingInfo, SensorInfo};
use crate::error::{BridgeError, Result};

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn send(&mut self, request: &Request) -> Result<()> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Frame> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(BridgeError::unavailable("worker closed the connection"));
        }
        Ok(serde_json::from_str(&line)?)
    }
}

/// One connection to the worker. Requests are serialised behind a mutex so a
/// streamed list is never interleaved with another call.
pub struct RpcClient {
    conn: Mutex<Connection>,
}

impl RpcClient {
    /// Connect and perform the cookie/version handshake. A mismatch is
    /// rejected before any query is allowed to proceed.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        let mut conn = Connection {
            reader: BufReader::new(read_half),
            writer,
        };

        conn.send(&Request::Hello {
            cookie: MAGIC_COOKIE.to_string(),
            version: PROTOCOL_VERSION,
        })
        .await?;

        match conn.recv().await? {
            Frame::HelloOk { version } if version == PROTOCOL_VERSION => Ok(RpcClient {
                conn: Mutex::new(conn),
            }),
            Frame::HelloOk { version } => Err(BridgeError::protocol(format!(
                "worker answered handshake with protocol v{version}"
            ))),
            Frame::Error { kind, message } => Err(kind.into_error(message)),
            other => Err(BridgeError::protocol(format!(
                "unexpected handshake reply: {other:?}"
            ))),
        }
    }

    async fn collect_sensors(conn: &mut Connection) -> Result<Vec<SensorInfo>> {
        let mut sensors = Vec::new();
        loop {
            match conn.recv().await? {
                Frame::Sensor { sensor } => sensors.push(sensor),
                Frame::End => return Ok(sensors),
                Frame::Error { kind, message } => return Err(kind.into_error(message)),
                other => {
                    return Err(BridgeError::protocol(format!(
                        "unexpected frame in sensor stream: {other:?}"
                    )))
                }
            }
        }
    }

    async fn collect_readings(conn: &mut Connection) -> Result<Vec<ReadingInfo>> {
        let mut readings = Vec::new();
        loop {
            match conn.recv().await? {
                Frame::Reading { reading } => readings.push(reading),
                Frame::End => return Ok(readings),
                Frame::Error { kind, message } => return Err(kind.into_error(message)),
                other => {
                    return Err(BridgeError::protocol(format!(
                        "unexpected frame in reading stream: {other:?}"
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl HardwareService for RpcClient {
    async fn poll_time(&self) -> Result<u64> {
        let mut conn = self.conn.lock().await;
        conn.send(&Request::PollTime).await?;
        match conn.recv().await? {
            Frame::PollTime { poll_time } => Ok(poll_time),
            Frame::Error { kind, message } => Err(kind.into_error(message)),
            other => Err(BridgeError::protocol(format!(
                "unexpected poll_time reply: {other:?}"
            ))),
        }
    }

    async fn sensors(&self) -> Result<Vec<SensorInfo>> {
        let mut conn = self.conn.lock().await;
        conn.send(&Request::Sensors).await?;
        Self::collect_sensors(&mut conn).await
    }

    async fn readings_for_sensor(&self, id: &str) -> Result<Vec<ReadingInfo>> {
        let mut conn = self.conn.lock().await;
        conn.send(&Request::ReadingsForSensor { id: id.to_string() })
            .await?;
        Self::collect_readings(&mut conn).await
    }
}
