//! LLM Council
//!
//! Sends one prompt to a council of models at once, then asks a chairman
//! model to merge the answers that came back.

pub mod config;
pub mod error;
pub mod llm;
pub mod storage;

pub use config::Config;
pub use error::{CouncilError, Result};
pub use llm::{Council, CouncilOutcome, Dispatcher, Message, QueryResult, ResultSet};
pub use storage::{Conversation, ConversationStore};
