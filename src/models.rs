use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Bot,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Bot => "bot",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inbound payload. Every field is optional here so that missing fields
/// surface as a validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: Option<String>,
    pub model: Option<String>,
    pub user_id: Option<String>,
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub reply: String,
}

/// One row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub role: MessageRole,
    pub message: String,
    pub model: String,
    pub user_id: String,
}

impl MessageRecord {
    /// The user/bot pair for one completed exchange, user first.
    pub fn transcript(request: &ChatRequest, completion: &CompletionResult) -> [MessageRecord; 2] {
        [
            MessageRecord {
                role: MessageRole::User,
                message: request.message.clone(),
                model: request.model.clone(),
                user_id: request.user_id.clone(),
            },
            MessageRecord {
                role: MessageRole::Bot,
                message: completion.reply.clone(),
                model: request.model.clone(),
                user_id: request.user_id.clone(),
            },
        ]
    }
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}
