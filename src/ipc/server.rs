//! Worker-side RPC server.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use super::proto::{Frame, Request};
use super::{MAGIC_COOKIE, PROTOCOL_VERSION};
use crate::core::service::HardwareService;
use crate::error::{BridgeError, Result};

/// Accept loop. Each connection is handled on its own task; a failed
/// connection never takes the server down.
pub async fn serve(
    listener: TcpListener,
    service: Arc<dyn HardwareService>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("rpc connection from {peer}");
                        let service = Arc::clone(&service);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, service).await {
                                log::warn!("rpc connection {peer} ended: {e}");
                            }
                        });
                    }
                    Err(e) => log::warn!("rpc accept failed: {e}"),
                }
            }
            _ = shutdown.recv() => {
                log::info!("rpc server shutting down");
                break;
            }
        }
    }
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Frame) -> Result<()> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

async fn read_request(reader: &mut BufReader<OwnedReadHalf>) -> Result<Option<Request>> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&line)?))
}

/// Validate the handshake, then answer queries until the peer disconnects.
async fn handle_connection(stream: TcpStream, service: Arc<dyn HardwareService>) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // The first request must be a matching hello; anything else is rejected
    // before any query is allowed through.
    match read_request(&mut reader).await? {
        Some(Request::Hello { cookie, version }) => {
            if cookie != MAGIC_COOKIE || version != PROTOCOL_VERSION {
                let err = BridgeError::protocol(format!(
                    "handshake mismatch: peer version {version}, host requires {PROTOCOL_VERSION}"
                ));
                write_frame(&mut writer, &Frame::error(&err)).await?;
                return Err(err);
            }
            write_frame(
                &mut writer,
                &Frame::HelloOk {
                    version: PROTOCOL_VERSION,
                },
            )
            .await?;
        }
        Some(_) => {
            let err = BridgeError::protocol("query received before handshake");
            write_frame(&mut writer, &Frame::error(&err)).await?;
            return Err(err);
        }
        None => return Ok(()),
    }

    while let Some(request) = read_request(&mut reader).await? {
        match request {
            Request::Hello { .. } => {
                let err = BridgeError::protocol("duplicate handshake");
                write_frame(&mut writer, &Frame::error(&err)).await?;
            }
            Request::PollTime => match service.poll_time().await {
                Ok(poll_time) => write_frame(&mut writer, &Frame::PollTime { poll_time }).await?,
                Err(e) => write_frame(&mut writer, &Frame::error(&e)).await?,
            },
            Request::Sensors => match service.sensors().await {
                Ok(sensors) => {
                    for sensor in sensors {
                        write_frame(&mut writer, &Frame::Sensor { sensor }).await?;
                    }
                    write_frame(&mut writer, &Frame::End).await?;
                }
                Err(e) => write_frame(&mut writer, &Frame::error(&e)).await?,
            },
            Request::ReadingsForSensor { id } => match service.readings_for_sensor(&id).await {
                Ok(readings) => {
                    for reading in readings {
                        write_frame(&mut writer, &Frame::Reading { reading }).await?;
                    }
                    write_frame(&mut writer, &Frame::End).await?;
                }
                Err(e) => write_frame(&mut writer, &Frame::error(&e)).await?,
            },
        }
    }

    Ok(())
}
