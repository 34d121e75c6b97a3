//! Daemon transport.
//!
//! The daemon serves one [`MuxDevice`](crate::device::MuxDevice) over TCP.
//! Each connection is one stream session: it is opened on accept and closed
//! on disconnect, so the single-shot read contract holds per connection.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::MuxClient;
pub use protocol::{ControlRequest, ControlResponse, RequestType, ResponseStatus};
pub use server::MuxServer;
