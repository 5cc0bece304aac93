//! Conversation storage
//!
//! One JSON file per conversation under the configured data directory.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::llm::{CouncilOutcome, MemberResponse, Message, Synthesis};

const DEFAULT_TITLE: &str = "New Conversation";
const TITLE_MAX_CHARS: usize = 50;

/// A stored turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum StoredMessage {
    User {
        content: String,
    },
    Assistant {
        responses: Vec<MemberResponse>,
        synthesis: Synthesis,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub messages: Vec<StoredMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        let content = content.into();
        if self.messages.is_empty() {
            self.title = make_title(&content);
        }
        self.messages.push(StoredMessage::User { content });
    }

    pub fn add_assistant_message(&mut self, outcome: CouncilOutcome) {
        self.messages.push(StoredMessage::Assistant {
            responses: outcome.responses,
            synthesis: outcome.synthesis,
        });
    }

    /// Prior turns as chat messages; assistant turns are the chairman's answers
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .map(|m| match m {
                StoredMessage::User { content } => Message::user(content.clone()),
                StoredMessage::Assistant { synthesis, .. } => {
                    Message::assistant(synthesis.content.clone())
                }
            })
            .collect()
    }
}

fn make_title(prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return DEFAULT_TITLE.to_string();
    }
    if prompt.chars().count() <= TITLE_MAX_CHARS {
        prompt.to_string()
    } else {
        let cut: String = prompt.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Listing entry, without the message bodies
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub message_count: usize,
}

/// File-based conversation store
pub struct ConversationStore {
    data_dir: PathBuf,
}

impl ConversationStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Initialize data directory
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", id))
    }

    /// Start a conversation with a fresh id. Nothing is written until `save`.
    pub fn create(&self) -> Conversation {
        Conversation::new(uuid::Uuid::new_v4().to_string())
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> Result<Option<Conversation>> {
        // ids are file stems; anything path-like can't name a stored conversation
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Ok(None);
        }

        let path = self.conversation_path(id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        self.init()?;
        let content = serde_json::to_string_pretty(conversation)?;
        fs::write(self.conversation_path(&conversation.id), content)?;
        Ok(())
    }

    /// All stored conversations, newest first. Unreadable files are skipped.
    pub fn list(&self) -> Result<Vec<ConversationMetadata>> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut conversations = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(conversation) = serde_json::from_str::<Conversation>(&content) {
                        conversations.push(ConversationMetadata {
                            id: conversation.id,
                            created_at: conversation.created_at,
                            title: conversation.title,
                            message_count: conversation.messages.len(),
                        });
                    }
                }
            }
        }

        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(conversations)
    }
}
