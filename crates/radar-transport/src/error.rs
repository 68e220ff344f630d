use std::net::SocketAddr;

/// Errors returned by the radar transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("send on {device} failed: {source}")]
    Send {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("frame encoding failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("frame decoding failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("no devices configured and responder disabled")]
    NoDevices,

    #[error("invalid device '{spec}': {reason}")]
    InvalidDevice { spec: String, reason: String },
}
