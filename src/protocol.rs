use anyhow::Context;
use serde::{Deserialize, Serialize};

// ─── Transcript messages ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in a conversation transcript. Transcripts are append-only and
/// owned by a single engine run; they are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

// ─── Protocol turns ─────────────────────────────────────────────────────────

/// Wire form of one oracle turn: a single JSON object discriminated by
/// `action`. An unknown action is a parse error, never a silent fallthrough.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum WireReply {
    ReadFiles { files: Vec<String> },
    Generate { code: String },
    Fix { code: String },
    Success { code: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactAction {
    Generate,
    Fix,
    Success,
}

/// A finished artifact carried by a terminal protocol turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactResult {
    pub action: ArtifactAction,
    pub code: String,
}

/// Parsed view of one oracle turn. Exactly one variant per turn: the oracle
/// either asks for more file context or delivers an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleReply {
    FileRequest { files: Vec<String> },
    Artifact(ArtifactResult),
}

impl OracleReply {
    /// Parse one oracle turn. The payload may be wrapped in markdown fences
    /// or surrounded by prose; the JSON object itself must be well formed and
    /// carry a known `action`.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let payload = extract_payload(text)
            .ok_or_else(|| anyhow::anyhow!("no JSON object found in oracle turn"))?;
        let wire: WireReply =
            serde_json::from_str(payload).context("oracle turn is not a valid protocol object")?;

        Ok(match wire {
            WireReply::ReadFiles { files } => Self::FileRequest { files },
            WireReply::Generate { code } => Self::Artifact(ArtifactResult {
                action: ArtifactAction::Generate,
                code,
            }),
            WireReply::Fix { code } => Self::Artifact(ArtifactResult {
                action: ArtifactAction::Fix,
                code,
            }),
            WireReply::Success { code } => Self::Artifact(ArtifactResult {
                action: ArtifactAction::Success,
                code,
            }),
        })
    }
}

/// Locate the JSON payload inside an oracle turn.
///
/// Tries a ```json fence first, then a bare fence opening on `{`, then falls
/// back to the widest brace span.
pub fn extract_payload(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let json_start = start + "```json".len();
        let rest = &text[json_start..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate);
            }
        }
    }

    if let Some(start) = text.find("```\n{") {
        let json_start = start + "```\n".len();
        let rest = &text[json_start..];
        if let Some(end) = rest.find("```") {
            let candidate = rest[..end].trim();
            if !candidate.is_empty() {
                return Some(candidate);
            }
        }
    }

    let open = text.find('{')?;
    let close = text.rfind('}')?;
    if close > open {
        return Some(&text[open..=close]);
    }

    None
}

/// Remove a markdown fence wrapping an entire artifact body. Fences inside
/// the body stay untouched; only a whole-document wrapper is stripped.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let Some(first_newline) = trimmed.find('\n') else {
        return trimmed.to_string();
    };

    let body = &trimmed[first_newline + 1..];
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
