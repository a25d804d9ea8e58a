//! The agent seam.
//!
//! Anything that can answer a prompt implements [`Pattern`]. The evaluator
//! sends an [`AgentState`] holding the task prompt and reads the answer back
//! from the returned state; what happens in between is opaque.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation recorded on a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// Conversation state exchanged with a pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub messages: Vec<Message>,
    /// Asks the agent to drop decorative formatting from its answer.
    #[serde(default)]
    pub evaluation_mode: bool,
    /// Plain answer for agents that do not append an assistant message.
    #[serde(default)]
    pub output: Option<String>,
}

impl AgentState {
    /// Initial state for one task: a single user message, evaluation mode on.
    pub fn for_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            evaluation_mode: true,
            output: None,
        }
    }

    /// The answer carried by this state: the last message's content, else
    /// `output`, else empty.
    pub fn final_output(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .or(self.output.as_deref())
            .unwrap_or_default()
    }

    pub fn tool_call_count(&self) -> usize {
        self.messages.iter().map(|m| m.tool_calls.len()).sum()
    }
}

/// An agent implementation under evaluation.
#[async_trait]
pub trait Pattern: Send + Sync {
    /// Run the agent on `state` and return the updated state.
    async fn invoke(&self, state: AgentState) -> anyhow::Result<AgentState>;
}
