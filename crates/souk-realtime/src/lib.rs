//! Realtime transport: a reconnecting duplex WebSocket per chat surface.

pub mod error;
pub mod frames;
pub mod reconnect;
pub mod socket;

pub use error::{SocketError, SocketResult};
pub use frames::{ChatFrame, ConnectionStatus, Frame, Sender};
pub use reconnect::ReconnectPolicy;
pub use socket::{ChatSocket, SocketConfig, SocketEvent, SocketState};
