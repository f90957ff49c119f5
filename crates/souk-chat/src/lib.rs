//! Chat surfaces: message history merged with the live stream, plus the
//! unread-count poller.

pub mod error;
pub mod log;
pub mod session;
pub mod unread;

pub use error::{ChatError, ChatResult};
pub use log::{ChatMessage, MessageLog};
pub use session::ChatSession;
pub use unread::UnreadPoller;
