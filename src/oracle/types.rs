use crate::protocol::ChatMessage;
use serde::Deserialize;

/// One completion call: model, sampling temperature and the full transcript.
/// Nothing else crosses the port.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f64,
    pub messages: &'a [ChatMessage],
}

/// Completion response as the engine sees it. Provider SDK shapes stop at
/// the client; this is the whole surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletion {
    /// Single-choice completion carrying plain text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: ChoiceMessage {
                    content: Some(content.into()),
                },
                finish_reason: Some("stop".to_string()),
            }],
            model: None,
        }
    }

    /// Completion with no choices at all.
    pub fn empty() -> Self {
        Self {
            choices: Vec::new(),
            model: None,
        }
    }
}
