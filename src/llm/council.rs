//! LLM Council - parallel answers plus chairman synthesis

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{CouncilError, Result};
use crate::llm::dispatch::Dispatcher;
use crate::llm::message::{Message, ResultSet};
use crate::llm::provider::ChatCompletionsProvider;

/// A council member's successful answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub model: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<Value>,
}

/// The chairman's final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub model: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_details: Option<Value>,
}

/// Everything one council round produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouncilOutcome {
    pub responses: Vec<MemberResponse>,
    pub synthesis: Synthesis,
}

/// Council of models that answer in parallel, plus the chairman
pub struct Council {
    dispatcher: Dispatcher,
    members: Vec<String>,
    chairman: String,
}

impl Council {
    pub fn new(dispatcher: Dispatcher, members: Vec<String>, chairman: impl Into<String>) -> Self {
        Self {
            dispatcher,
            members,
            chairman: chairman.into(),
        }
    }

    /// Build a council talking to the backend selected in `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.endpoint();
        if endpoint.is_none() {
            warn!(
                backend = config.provider_backend.as_str(),
                "No endpoint configured; every council query will fail"
            );
        }

        let transport = ChatCompletionsProvider::new(config.provider_backend.as_str(), endpoint);
        let dispatcher = Dispatcher::new(Arc::new(transport)).with_timeout(config.timeout()?);

        Ok(Self::new(
            dispatcher,
            config.council.models.clone(),
            config.council.chairman.clone(),
        ))
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn chairman(&self) -> &str {
        &self.chairman
    }

    /// Run one full round: ask every member, then have the chairman synthesize
    pub async fn process(&self, history: &[Message], query: &str) -> Result<CouncilOutcome> {
        let mut messages = history.to_vec();
        messages.push(Message::user(query));

        let responses = self.collect_responses(&messages).await;
        info!(
            members = self.members.len(),
            answered = responses.len(),
            "Council responses collected"
        );

        let synthesis = self.synthesize(query, &responses).await?;

        Ok(CouncilOutcome {
            responses,
            synthesis,
        })
    }

    /// Ask every member and keep only the successful answers, in roster order
    pub async fn collect_responses(&self, messages: &[Message]) -> Vec<MemberResponse> {
        let results = self
            .dispatcher
            .query_models_parallel(self.members.as_slice(), messages)
            .await;

        successful_responses(&self.members, results)
    }

    /// Have the chairman turn the members' answers into one response.
    ///
    /// Runs even when `responses` is empty; the prompt tells the chairman so.
    pub async fn synthesize(&self, query: &str, responses: &[MemberResponse]) -> Result<Synthesis> {
        let prompt = synthesis_prompt(query, responses);

        let result = self
            .dispatcher
            .query_model(&self.chairman, &[Message::user(prompt)])
            .await;

        match result.and_then(|r| r.content.map(|content| (content, r.reasoning_details))) {
            Some((content, reasoning_details)) => Ok(Synthesis {
                model: self.chairman.clone(),
                content,
                reasoning_details,
            }),
            None => Err(CouncilError::ChairmanFailed(self.chairman.clone())),
        }
    }
}

fn successful_responses(members: &[String], mut results: ResultSet) -> Vec<MemberResponse> {
    members
        .iter()
        .filter_map(|model| {
            // remove() also collapses repeated roster entries
            let result = results.remove(model).flatten()?;
            let content = result.content?;
            Some(MemberResponse {
                model: model.clone(),
                content,
                reasoning_details: result.reasoning_details,
            })
        })
        .collect()
}

fn synthesis_prompt(query: &str, responses: &[MemberResponse]) -> String {
    let evidence = if responses.is_empty() {
        "(No council member returned a response.)".to_string()
    } else {
        responses
            .iter()
            .map(|r| format!("=== {} ===\n{}\n", r.model, r.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are the Chairman of an LLM Council. Several AI models have answered \
        the user's question independently.\n\n\
        Original question: {}\n\n\
        Council responses:\n{}\n\n\
        Synthesize these responses into a single, comprehensive answer that:\n\
        1. Incorporates the best ideas from each response\n\
        2. Resolves any contradictions\n\
        3. Maintains clarity and usefulness\n\n\
        If no responses are available, answer the question yourself and say that \
        the council could not be reached.\n\n\
        Provide only the final answer, without meta-commentary.",
        query, evidence
    )
}
