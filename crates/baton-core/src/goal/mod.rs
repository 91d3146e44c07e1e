//! Goal document: YAML frontmatter for machine configuration, a markdown
//! body for humans.
//!
//! Only the body is checksummed, so edits to the frontmatter never count as
//! a goal change. Steering messages are written into the body, just below
//! the frontmatter.

mod config;

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::EngineError;

pub use config::{normalize_cron, parse_duration, ContinuousConfig, GoalConfig, ModelSpec};

const DELIMITER: &str = "---";

/// A goal document split at its frontmatter delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalDocument {
    /// Raw frontmatter between the delimiters; `None` when absent or unclosed.
    pub frontmatter: Option<String>,
    pub body: String,
}

/// Byte offsets of a well-formed frontmatter block.
struct Split {
    /// Start of the frontmatter content (after the opening line).
    content_start: usize,
    /// Start of the closing delimiter line.
    content_end: usize,
    /// First byte after the closing delimiter line, including its newline.
    body_start: usize,
}

fn split(text: &str) -> Option<Split> {
    let first_end = text.find('\n')?;
    if text[..first_end].trim_end() != DELIMITER {
        return None;
    }

    let content_start = first_end + 1;
    let mut offset = content_start;
    for line in text[content_start..].split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some(Split {
                content_start,
                content_end: offset,
                body_start: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

impl GoalDocument {
    pub fn parse(text: &str) -> Self {
        match split(text) {
            Some(s) => Self {
                frontmatter: Some(text[s.content_start..s.content_end].to_string()),
                body: text[s.body_start..].to_string(),
            },
            None => Self {
                frontmatter: None,
                body: text.to_string(),
            },
        }
    }

    pub async fn load(path: &Path) -> Result<Self, EngineError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::Io(format!("Failed to read goal '{}': {}", path.display(), e))
        })?;
        Ok(Self::parse(&text))
    }

    pub fn config(&self) -> Result<GoalConfig, EngineError> {
        GoalConfig::from_frontmatter(self.frontmatter.as_deref().unwrap_or_default())
    }

    pub fn checksum(&self) -> String {
        hex_sha256(&self.body)
    }
}

fn hex_sha256(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 of the document body, frontmatter excluded.
pub fn body_checksum(text: &str) -> String {
    GoalDocument::parse(text).checksum()
}

pub async fn checksum_file(path: &Path) -> Result<String, EngineError> {
    Ok(GoalDocument::load(path).await?.checksum())
}

/// Insert `message` at the top of the body: right after the closing
/// frontmatter delimiter, or at the very top when there is no well-formed
/// frontmatter. Everything else is kept byte for byte.
pub fn prepend_to_text(text: &str, message: &str) -> String {
    let block = format!("{}\n\n", message.trim_end());
    match split(text) {
        Some(s) => {
            let head = &text[..s.body_start];
            let mut out = String::with_capacity(text.len() + block.len() + 1);
            out.push_str(head);
            if !head.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&block);
            out.push_str(&text[s.body_start..]);
            out
        }
        None => format!("{}{}", block, text),
    }
}

pub async fn prepend_steering_message(path: &Path, message: &str) -> Result<(), EngineError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        EngineError::Io(format!("Failed to read goal '{}': {}", path.display(), e))
    })?;
    let updated = prepend_to_text(&text, message);
    crate::store::write_atomic(path, updated.as_bytes()).await?;
    tracing::info!("[Goal] Prepended steering message to {}", path.display());
    Ok(())
}
