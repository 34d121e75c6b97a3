use crate::device::StatusReport;
use crate::error::{MuxError, MuxResult};
use crate::network::protocol::{ControlRequest, ControlResponse, ResponseStatus};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tracing::debug;

/// Client for the multiplexer daemon.
///
/// The connection is one stream session: the first [`read`](Self::read)
/// yields the sample, later reads on the same client return empty. Connect
/// again for a fresh sample.
pub struct MuxClient {
    stream: TcpStream,
    next_id: u32,
}

impl MuxClient {
    pub async fn connect(addr: SocketAddr) -> MuxResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!("Connected to multiplexer daemon at {}", addr);
        Ok(Self { stream, next_id: 1 })
    }

    /// Read with a buffer of `capacity` bytes.
    pub async fn read(&mut self, capacity: u32) -> MuxResult<Vec<u8>> {
        let id = self.next_id();
        self.call(ControlRequest::read(id, capacity)).await
    }

    /// Control write; returns the byte count the daemon consumed.
    pub async fn write(&mut self, bytes: &[u8]) -> MuxResult<usize> {
        let id = self.next_id();
        let payload = self.call(ControlRequest::write(id, bytes)).await?;
        decode_u32(&payload).map(|n| n as usize)
    }

    /// Select signal `index`; returns the new active index.
    pub async fn select(&mut self, index: u32) -> MuxResult<usize> {
        let id = self.next_id();
        let payload = self.call(ControlRequest::select(id, index)).await?;
        decode_u32(&payload).map(|n| n as usize)
    }

    pub async fn status(&mut self) -> MuxResult<StatusReport> {
        let id = self.next_id();
        let payload = self.call(ControlRequest::status(id)).await?;
        Ok(serde_json::from_slice(&payload)?)
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    async fn call(&mut self, request: ControlRequest) -> MuxResult<Vec<u8>> {
        request.write_to(&mut self.stream).await?;
        let response = ControlResponse::read_from(&mut self.stream).await?;

        if response.status != ResponseStatus::Success {
            return Err(MuxError::Remote {
                status: response.status.to_string(),
                message: response.error_message,
            });
        }
        if response.request_id != request.request_id {
            return Err(MuxError::Protocol(format!(
                "Response id {} does not match request id {}",
                response.request_id, request.request_id
            )));
        }

        Ok(response.payload)
    }
}

fn decode_u32(payload: &[u8]) -> MuxResult<u32> {
    let bytes: [u8; 4] = payload
        .try_into()
        .map_err(|_| MuxError::Protocol(format!("Expected 4-byte payload, got {}", payload.len())))?;
    Ok(u32::from_le_bytes(bytes))
}
