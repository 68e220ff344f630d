//! Radar transport layer.
//!
//! Sends probe bouquets as UDP broadcasts on every configured interface
//! and attributes each reply to `(peer ip, device, arrival time)`.
//! Answers the probes of other nodes when responding is enabled.
//!
//! Wire format: MessagePack (compact binary).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use radar_transport::{Device, RadarSocket, RadarSocketConfig};
//!
//! # async fn example() -> Result<(), radar_transport::TransportError> {
//! let eth0: Device = "eth0=192.168.1.10/192.168.1.255".parse()?;
//! let (socket, mut replies) = RadarSocket::bind(RadarSocketConfig::new().device(eth0)).await?;
//!
//! socket.send_probe(1, 0).await?;
//! while let Some(reply) = replies.recv().await {
//!     println!("{} answered on {}", reply.ip, reply.device);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod frame;
mod socket;

pub use config::{Device, RadarSocketConfig, DEFAULT_PORT};
pub use error::TransportError;
pub use frame::{ProbeFrame, MAX_FRAME_SIZE};
pub use socket::{RadarSocket, ReplyEvent};
