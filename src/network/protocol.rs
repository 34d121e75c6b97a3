//! Daemon wire protocol.
//!
//! Frames are little-endian and length-prefixed:
//!
//! ```text
//! request:  type:u8 | request_id:u32 | payload_len:u32 | payload
//! response: status:u8 | request_id:u32 | payload_len:u32 | payload | error_len:u32 | error (UTF-8)
//! ```

use crate::error::{MuxError, ReadError, SelectError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted in either direction.
pub const MAX_PAYLOAD: usize = 64 * 1024;

const REQUEST_HEADER: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestType {
    Read = 0,
    Write = 1,
    Select = 2,
    Status = 3,
}

impl RequestType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RequestType::Read),
            1 => Some(RequestType::Write),
            2 => Some(RequestType::Select),
            3 => Some(RequestType::Status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResponseStatus {
    Success = 0,
    NoSpace = 1,
    FaultyBuffer = 2,
    Hardware = 3,
    NotReady = 4,
    InvalidRequest = 5,
    Error = 6,
}

impl ResponseStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ResponseStatus::Success),
            1 => Some(ResponseStatus::NoSpace),
            2 => Some(ResponseStatus::FaultyBuffer),
            3 => Some(ResponseStatus::Hardware),
            4 => Some(ResponseStatus::NotReady),
            5 => Some(ResponseStatus::InvalidRequest),
            6 => Some(ResponseStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::NoSpace => "no_space",
            Self::FaultyBuffer => "faulty_buffer",
            Self::Hardware => "hardware",
            Self::NotReady => "not_ready",
            Self::InvalidRequest => "invalid_request",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

impl From<&ReadError> for ResponseStatus {
    fn from(err: &ReadError) -> Self {
        match err {
            ReadError::NoSpace { .. } => Self::NoSpace,
            ReadError::FaultyBuffer => Self::FaultyBuffer,
            ReadError::Hardware(_) => Self::Hardware,
            ReadError::NotReady => Self::NotReady,
        }
    }
}

impl From<&SelectError> for ResponseStatus {
    fn from(_: &SelectError) -> Self {
        Self::InvalidRequest
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRequest {
    pub request_id: u32,
    pub request_type: RequestType,
    pub payload: Vec<u8>,
}

impl ControlRequest {
    pub fn new(request_id: u32, request_type: RequestType, payload: Vec<u8>) -> Self {
        Self {
            request_id,
            request_type,
            payload,
        }
    }

    /// Read with the given buffer capacity.
    pub fn read(request_id: u32, capacity: u32) -> Self {
        Self::new(request_id, RequestType::Read, capacity.to_le_bytes().to_vec())
    }

    /// Control write carrying `bytes`.
    pub fn write(request_id: u32, bytes: &[u8]) -> Self {
        Self::new(request_id, RequestType::Write, bytes.to_vec())
    }

    /// Select signal `index`.
    pub fn select(request_id: u32, index: u32) -> Self {
        Self::new(request_id, RequestType::Select, index.to_le_bytes().to_vec())
    }

    /// Status snapshot.
    pub fn status(request_id: u32) -> Self {
        Self::new(request_id, RequestType::Status, Vec::new())
    }

    /// Payload interpreted as a little-endian `u32`.
    pub fn payload_u32(&self) -> Result<u32, MuxError> {
        let bytes: [u8; 4] = self.payload.as_slice().try_into().map_err(|_| {
            MuxError::Protocol(format!(
                "{:?} expects a 4-byte payload, got {}",
                self.request_type,
                self.payload.len()
            ))
        })?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(REQUEST_HEADER + self.payload.len());

        buf.push(self.request_type as u8);
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);

        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, MuxError> {
        if data.len() < REQUEST_HEADER {
            return Err(MuxError::Protocol(
                "Insufficient data for ControlRequest".to_string(),
            ));
        }

        let request_type = RequestType::from_u8(data[0])
            .ok_or_else(|| MuxError::Protocol(format!("Invalid request type {}", data[0])))?;

        let request_id = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let payload_len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;

        if data.len() != REQUEST_HEADER + payload_len {
            return Err(MuxError::Protocol("Payload size mismatch".to_string()));
        }

        Ok(ControlRequest {
            request_id,
            request_type,
            payload: data[REQUEST_HEADER..].to_vec(),
        })
    }

    /// Read one request from `reader`; `Ok(None)` on clean end of stream.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Self>, MuxError> {
        let mut header = [0u8; REQUEST_HEADER];
        match reader.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let payload_len = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
        if payload_len > MAX_PAYLOAD {
            return Err(MuxError::Protocol(format!(
                "Payload of {} bytes exceeds limit of {}",
                payload_len, MAX_PAYLOAD
            )));
        }

        let mut frame = header.to_vec();
        frame.resize(REQUEST_HEADER + payload_len, 0);
        reader.read_exact(&mut frame[REQUEST_HEADER..]).await?;
        Self::decode(&frame).map(Some)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), MuxError> {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlResponse {
    pub request_id: u32,
    pub status: ResponseStatus,
    pub payload: Vec<u8>,
    pub error_message: String,
}

impl ControlResponse {
    pub fn new(request_id: u32, status: ResponseStatus, payload: Vec<u8>) -> Self {
        Self {
            request_id,
            status,
            payload,
            error_message: String::new(),
        }
    }

    pub fn success(request_id: u32, payload: Vec<u8>) -> Self {
        Self::new(request_id, ResponseStatus::Success, payload)
    }

    pub fn error(request_id: u32, status: ResponseStatus, message: String) -> Self {
        Self {
            request_id,
            status,
            payload: Vec::new(),
            error_message: message,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.push(self.status as u8);
        buf.extend_from_slice(&self.request_id.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.payload);

        let error_bytes = self.error_message.as_bytes();
        buf.extend_from_slice(&(error_bytes.len() as u32).to_le_bytes());
        buf.extend_from_slice(error_bytes);

        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, MuxError> {
        if data.len() < 13 {
            return Err(MuxError::Protocol(
                "Insufficient data for ControlResponse".to_string(),
            ));
        }

        let status = ResponseStatus::from_u8(data[0])
            .ok_or_else(|| MuxError::Protocol(format!("Invalid response status {}", data[0])))?;

        let request_id = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        let payload_len = u32::from_le_bytes([data[5], data[6], data[7], data[8]]) as usize;

        let payload_end = 9 + payload_len;
        if data.len() < payload_end + 4 {
            return Err(MuxError::Protocol("Payload size mismatch".to_string()));
        }

        let payload = data[9..payload_end].to_vec();

        let error_len = u32::from_le_bytes([
            data[payload_end],
            data[payload_end + 1],
            data[payload_end + 2],
            data[payload_end + 3],
        ]) as usize;

        let error_end = payload_end + 4 + error_len;
        if data.len() != error_end {
            return Err(MuxError::Protocol("Error message size mismatch".to_string()));
        }

        let error_message = String::from_utf8(data[payload_end + 4..error_end].to_vec())
            .map_err(|e| MuxError::Protocol(e.to_string()))?;

        Ok(ControlResponse {
            request_id,
            status,
            payload,
            error_message,
        })
    }

    /// Read one response from `reader`.
    pub async fn read_from<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, MuxError> {
        let mut frame = vec![0u8; 9];
        reader.read_exact(&mut frame).await?;

        let payload_len = u32::from_le_bytes([frame[5], frame[6], frame[7], frame[8]]) as usize;
        if payload_len > MAX_PAYLOAD {
            return Err(MuxError::Protocol(format!(
                "Payload of {} bytes exceeds limit of {}",
                payload_len, MAX_PAYLOAD
            )));
        }
        let mut rest = vec![0u8; payload_len + 4];
        reader.read_exact(&mut rest).await?;
        frame.extend_from_slice(&rest);

        let tail = frame.len() - 4;
        let error_len = u32::from_le_bytes([frame[tail], frame[tail + 1], frame[tail + 2], frame[tail + 3]])
            as usize;
        if error_len > MAX_PAYLOAD {
            return Err(MuxError::Protocol("Error message too long".to_string()));
        }
        let mut message = vec![0u8; error_len];
        reader.read_exact(&mut message).await?;
        frame.extend_from_slice(&message);

        Self::decode(&frame)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), MuxError> {
        writer.write_all(&self.encode()).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let encoded = ControlRequest::read(7, 16).encode();
        assert_eq!(encoded[0], RequestType::Read as u8);
        assert_eq!(&encoded[1..5], &7u32.to_le_bytes());
        assert_eq!(&encoded[5..9], &4u32.to_le_bytes());
        assert_eq!(&encoded[9..], &16u32.to_le_bytes());

        let decoded = ControlRequest::decode(&encoded).unwrap();
        assert_eq!(decoded.payload_u32().unwrap(), 16);
    }

    #[test]
    fn test_request_rejects_unknown_type() {
        let mut encoded = ControlRequest::status(1).encode();
        encoded[0] = 42;
        assert!(ControlRequest::decode(&encoded).is_err());
    }

    #[test]
    fn test_request_rejects_truncated_payload() {
        let mut encoded = ControlRequest::write(1, b"abc").encode();
        encoded.pop();
        assert!(ControlRequest::decode(&encoded).is_err());
    }

    #[test]
    fn test_payload_u32_wrong_size() {
        let request = ControlRequest::new(1, RequestType::Select, vec![1, 2]);
        assert!(request.payload_u32().is_err());
    }

    #[test]
    fn test_error_response_carries_message() {
        let response =
            ControlResponse::error(3, ResponseStatus::NoSpace, "too small".to_string());
        let decoded = ControlResponse::decode(&response.encode()).unwrap();
        assert_eq!(decoded.status, ResponseStatus::NoSpace);
        assert_eq!(decoded.error_message, "too small");
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_status_from_read_error() {
        let status = ResponseStatus::from(&ReadError::NoSpace {
            needed: 4,
            capacity: 2,
        });
        assert_eq!(status, ResponseStatus::NoSpace);
        assert_eq!(status.to_string(), "no_space");
    }

    #[tokio::test]
    async fn test_async_framing_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(256);

        ControlRequest::write(9, b"a").write_to(&mut client).await.unwrap();
        let request = ControlRequest::read_from(&mut server).await.unwrap().unwrap();
        assert_eq!(request.request_type, RequestType::Write);
        assert_eq!(request.payload, b"a");

        ControlResponse::success(9, b"0010".to_vec())
            .write_to(&mut server)
            .await
            .unwrap();
        let response = ControlResponse::read_from(&mut client).await.unwrap();
        assert_eq!(response.request_id, 9);
        assert_eq!(response.payload, b"0010");

        drop(client);
        assert!(ControlRequest::read_from(&mut server).await.unwrap().is_none());
    }
}
