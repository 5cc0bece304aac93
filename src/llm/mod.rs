//! LLM transport, parallel dispatch and council synthesis

mod council;
mod dispatch;
mod message;
mod provider;

pub use council::*;
pub use dispatch::*;
pub use message::*;
pub use provider::*;
