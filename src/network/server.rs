use crate::device::{MuxDevice, Session};
use crate::error::{MuxError, MuxResult};
use crate::network::protocol::{ControlRequest, ControlResponse, RequestType, ResponseStatus};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// TCP front end of a [`MuxDevice`].
pub struct MuxServer {
    listener: TcpListener,
    device: Arc<MuxDevice>,
}

impl MuxServer {
    pub async fn bind(addr: SocketAddr, device: Arc<MuxDevice>) -> MuxResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Multiplexer daemon listening on {}", listener.local_addr()?);
        Ok(Self { listener, device })
    }

    /// Bound address; useful when binding port 0.
    pub fn local_addr(&self) -> MuxResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept clients until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> MuxResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Multiplexer daemon shutting down");
                    break;
                }
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, addr)) => {
                            let device = self.device.clone();
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_client(socket, addr, device).await {
                                    warn!("Client {} error: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => error!("Accept error: {}", e),
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_client<S>(mut socket: S, addr: SocketAddr, device: Arc<MuxDevice>) -> MuxResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        info!("Client connected: {}", addr);

        let mut session = device.open();

        let result = loop {
            let request = match ControlRequest::read_from(&mut socket).await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    info!("Client {} disconnected", addr);
                    break Ok(());
                }
                Err(MuxError::Protocol(message)) => {
                    error!("Failed to decode request from {}: {}", addr, message);
                    let response = ControlResponse::error(
                        0,
                        ResponseStatus::InvalidRequest,
                        format!("Failed to decode request: {}", message),
                    );
                    if let Err(e) = response.write_to(&mut socket).await {
                        debug!("Failed to report decode error to {}: {}", addr, e);
                    }
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            let response = Self::process_request(&device, &mut session, request);
            if let Err(e) = response.write_to(&mut socket).await {
                error!("Failed to write response: {}", e);
                break Err(e);
            }
        };

        device.close(session);
        info!("Client {} session closed", addr);

        result
    }

    fn process_request(
        device: &MuxDevice,
        session: &mut Session,
        request: ControlRequest,
    ) -> ControlResponse {
        let request_id = request.request_id;
        debug!(request_id, kind = ?request.request_type, "request");

        match request.request_type {
            RequestType::Read => {
                let capacity = match request.payload_u32() {
                    Ok(capacity) => capacity as usize,
                    Err(e) => return invalid(request_id, e),
                };
                match device.read_to_vec(session, capacity) {
                    Ok(bytes) => ControlResponse::success(request_id, bytes),
                    Err(e) => ControlResponse::error(request_id, (&e).into(), e.to_string()),
                }
            }
            RequestType::Write => {
                let consumed = device.write(session, &request.payload);
                ControlResponse::success(request_id, (consumed as u32).to_le_bytes().to_vec())
            }
            RequestType::Select => {
                let index = match request.payload_u32() {
                    Ok(index) => index as usize,
                    Err(e) => return invalid(request_id, e),
                };
                match device.select(index) {
                    Ok(index) => {
                        ControlResponse::success(request_id, (index as u32).to_le_bytes().to_vec())
                    }
                    Err(e) => ControlResponse::error(request_id, (&e).into(), e.to_string()),
                }
            }
            RequestType::Status => match serde_json::to_vec(&device.status()) {
                Ok(json) => ControlResponse::success(request_id, json),
                Err(e) => ControlResponse::error(request_id, ResponseStatus::Error, e.to_string()),
            },
        }
    }
}

fn invalid(request_id: u32, err: MuxError) -> ControlResponse {
    ControlResponse::error(request_id, ResponseStatus::InvalidRequest, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_core::SignalTable;
    use mux_driver_mock::MockLineBackend;
    use tokio::io::AsyncWriteExt;
    use tracing_test::traced_test;

    fn device() -> MuxDevice {
        let device = MuxDevice::new(SignalTable::builtin(), Arc::new(MockLineBackend::new()));
        device.on_start().unwrap();
        device
    }

    #[test]
    fn test_read_while_down_is_not_ready() {
        let device = MuxDevice::new(SignalTable::builtin(), Arc::new(MockLineBackend::new()));
        let mut session = device.open();
        let response =
            MuxServer::process_request(&device, &mut session, ControlRequest::read(1, 16));
        assert_eq!(response.status, ResponseStatus::NotReady);
        assert_eq!(session.offset(), 0);
    }

    #[test]
    fn test_read_with_bad_payload_is_invalid() {
        let device = device();
        let mut session = device.open();
        let request = ControlRequest::new(2, RequestType::Read, vec![1]);
        let response = MuxServer::process_request(&device, &mut session, request);
        assert_eq!(response.status, ResponseStatus::InvalidRequest);
    }

    #[test]
    fn test_write_reports_length_and_toggles() {
        let device = device();
        let mut session = device.open();
        let response =
            MuxServer::process_request(&device, &mut session, ControlRequest::write(3, b"abc"));
        assert_eq!(response.status, ResponseStatus::Success);
        assert_eq!(response.payload, 3u32.to_le_bytes());
        assert_eq!(device.active_signal(), 1);
    }

    #[test]
    fn test_select_out_of_range() {
        let device = device();
        let mut session = device.open();
        let response =
            MuxServer::process_request(&device, &mut session, ControlRequest::select(4, 9));
        assert_eq!(response.status, ResponseStatus::InvalidRequest);
        assert!(response.error_message.contains("out of range"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unsent_decode_error_is_logged() {
        let device = Arc::new(device());
        let (mut client, server) = tokio::io::duplex(256);

        let mut frame = ControlRequest::status(5).encode();
        frame[0] = 99;
        client.write_all(&frame).await.unwrap();
        // Peer gone before the error reply can be written.
        drop(client);

        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        MuxServer::handle_client(server, addr, device.clone())
            .await
            .unwrap();

        assert!(logs_contain("Failed to report decode error"));
        assert_eq!(device.status().sessions, 0);
    }
}
