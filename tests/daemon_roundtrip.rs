//! Daemon and client over a real TCP socket on the loopback interface.

use gpio_mux::device::MuxDevice;
use gpio_mux::error::MuxError;
use gpio_mux::network::protocol::{ControlRequest, ControlResponse, ResponseStatus};
use gpio_mux::network::{MuxClient, MuxServer};
use mux_core::{LineId, SignalTable};
use mux_driver_mock::MockLineBackend;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

struct Harness {
    addr: SocketAddr,
    device: Arc<MuxDevice>,
    backend: Arc<MockLineBackend>,
    shutdown: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start(up: bool) -> Self {
        let backend = Arc::new(MockLineBackend::new());
        let device = Arc::new(MuxDevice::new(SignalTable::builtin(), backend.clone()));
        if up {
            device.on_start().unwrap();
        }

        let server = MuxServer::bind("127.0.0.1:0".parse().unwrap(), device.clone())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            device,
            backend,
            shutdown: Some(tx),
            server,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.server.await.unwrap();
    }
}

/// Wait until the daemon has noticed `expected` open sessions.
async fn wait_for_sessions(device: &MuxDevice, expected: usize) {
    for _ in 0..100 {
        if device.status().sessions == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("daemon never reached {} sessions", expected);
}

#[tokio::test]
async fn test_read_write_read_over_tcp() {
    let harness = Harness::start(true).await;
    harness.backend.set_level(LineId(25), true);

    let mut client = MuxClient::connect(harness.addr).await.unwrap();
    assert_eq!(client.read(16).await.unwrap(), b"0000");
    assert!(client.read(16).await.unwrap().is_empty());
    assert_eq!(client.write(b"a").await.unwrap(), 1);
    drop(client);

    let mut client = MuxClient::connect(harness.addr).await.unwrap();
    assert_eq!(client.read(16).await.unwrap(), b"0010");
    drop(client);

    harness.stop().await;
}

#[tokio::test]
async fn test_no_space_reported_as_status() {
    let harness = Harness::start(true).await;

    let mut client = MuxClient::connect(harness.addr).await.unwrap();
    let err = client.read(2).await.unwrap_err();
    assert!(
        matches!(err, MuxError::Remote { ref status, .. } if status == "no_space"),
        "{}",
        err
    );
    // The failed read did not consume the session.
    assert_eq!(client.read(4).await.unwrap(), b"0000");

    harness.stop().await;
}

#[tokio::test]
async fn test_select_and_status() {
    let harness = Harness::start(true).await;

    let mut client = MuxClient::connect(harness.addr).await.unwrap();
    assert_eq!(client.select(1).await.unwrap(), 1);

    let status = client.status().await.unwrap();
    assert!(status.up);
    assert_eq!(status.backend, "mock");
    assert_eq!(status.active_name, "s2");
    assert_eq!(status.signals.len(), 2);
    assert_eq!(status.sessions, 1);

    let err = client.select(7).await.unwrap_err();
    assert!(matches!(err, MuxError::Remote { ref status, .. } if status == "invalid_request"));

    drop(client);
    wait_for_sessions(&harness.device, 0).await;
    harness.stop().await;
}

#[tokio::test]
async fn test_device_down_reports_not_ready_but_toggles() {
    let harness = Harness::start(false).await;

    let mut client = MuxClient::connect(harness.addr).await.unwrap();
    let err = client.read(16).await.unwrap_err();
    assert!(matches!(err, MuxError::Remote { ref status, .. } if status == "not_ready"));

    assert_eq!(client.write(b"ab").await.unwrap(), 2);
    assert_eq!(harness.device.active_signal(), 1);

    let status = client.status().await.unwrap();
    assert!(!status.up);
    assert_eq!(status.sessions, 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_malformed_frame_gets_invalid_request() {
    let harness = Harness::start(true).await;

    let mut stream = TcpStream::connect(harness.addr).await.unwrap();
    let mut frame = ControlRequest::status(5).encode();
    frame[0] = 99;
    tokio::io::AsyncWriteExt::write_all(&mut stream, &frame)
        .await
        .unwrap();

    let response = ControlResponse::read_from(&mut stream).await.unwrap();
    assert_eq!(response.status, ResponseStatus::InvalidRequest);
    assert_eq!(response.request_id, 0);

    drop(stream);
    wait_for_sessions(&harness.device, 0).await;
    harness.stop().await;
}
