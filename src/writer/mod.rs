//! Story text generation. The hosted agent does the writing; this module only
//! builds the brief, calls it, and splits the reply into title and body.

pub mod agent;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use agent::AgentStoryWriter;

#[derive(Debug, Clone, Error)]
pub enum WriterError {
    #[error("story writer is not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("agent returned no story")]
    Empty,
}

/// What the reader asked for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryPrompt {
    pub age_group: String,
    pub language: String,
    pub topic: String,
    pub subtopic: String,
    pub style: String,
    pub first_name: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoryDraft {
    pub title: String,
    pub content: String,
}

#[async_trait]
pub trait StoryWriter: Send + Sync {
    async fn write(&self, prompt: &StoryPrompt) -> Result<StoryDraft, WriterError>;
}

/// Stand-in used when no agent endpoint is configured.
pub struct DisabledStoryWriter;

#[async_trait]
impl StoryWriter for DisabledStoryWriter {
    async fn write(&self, _prompt: &StoryPrompt) -> Result<StoryDraft, WriterError> {
        Err(WriterError::NotConfigured)
    }
}

pub fn build_prompt(prompt: &StoryPrompt) -> String {
    let mut brief = format!(
        "Write a bedtime story for children aged {age} in {language}.\n\
         Topic: {topic} ({subtopic}).\n\
         Style: {style}.\n",
        age = prompt.age_group.trim(),
        language = prompt.language.trim(),
        topic = prompt.topic.trim(),
        subtopic = prompt.subtopic.trim(),
        style = prompt.style.trim(),
    );

    let name = prompt.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let gender = prompt.gender.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (name, gender) {
        (Some(name), Some(gender)) => {
            brief.push_str(&format!("The hero is a {gender} child named {name}.\n"))
        }
        (Some(name), None) => brief.push_str(&format!("The hero is a child named {name}.\n")),
        _ => {}
    }

    brief.push_str(
        "Start your answer with a single line of the form `Title: <title>`, \
         then a blank line, then the story.",
    );
    brief
}

/// Split an agent reply into title and body. A reply without a `Title:` line
/// uses its first line as the title.
pub fn parse_draft(text: &str) -> Option<StoryDraft> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let decoration = |c: char| c == '*' || c == '#' || c == '"';
    let first = first.trim().trim_matches(decoration).trim();
    let title = first
        .strip_prefix("Title:")
        .or_else(|| first.strip_prefix("title:"))
        .unwrap_or(first)
        .trim()
        .trim_matches(decoration)
        .trim()
        .to_string();
    let content = rest.trim().to_string();

    if title.is_empty() || content.is_empty() {
        return None;
    }
    Some(StoryDraft { title, content })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> StoryPrompt {
        StoryPrompt {
            age_group: "3-5".into(),
            language: "English".into(),
            topic: "Animals".into(),
            subtopic: "Owls".into(),
            style: "Rhyming".into(),
            ..Default::default()
        }
    }

    #[test]
    fn prompt_mentions_every_setting() {
        let text = build_prompt(&prompt());
        for needle in ["3-5", "English", "Animals", "Owls", "Rhyming", "Title:"] {
            assert!(text.contains(needle), "missing {needle}");
        }
        assert!(!text.contains("hero"));
    }

    #[test]
    fn prompt_includes_named_hero() {
        let text = build_prompt(&StoryPrompt {
            first_name: Some("Mila".into()),
            gender: Some("girl".into()),
            ..prompt()
        });
        assert!(text.contains("a girl child named Mila"));
    }

    #[test]
    fn parse_draft_reads_title_line() {
        let draft = parse_draft("Title: The Sleepy Owl\n\nOnce upon a time...").unwrap();
        assert_eq!(draft.title, "The Sleepy Owl");
        assert_eq!(draft.content, "Once upon a time...");
    }

    #[test]
    fn parse_draft_strips_markdown_decoration() {
        let draft = parse_draft("**Title: Moonlight**\nThe moon rose.").unwrap();
        assert_eq!(draft.title, "Moonlight");
    }

    #[test]
    fn parse_draft_falls_back_to_first_line() {
        let draft = parse_draft("# The Brave Fox\nThe fox was brave.").unwrap();
        assert_eq!(draft.title, "The Brave Fox");
    }

    #[test]
    fn parse_draft_rejects_empty_bodies() {
        assert!(parse_draft("").is_none());
        assert!(parse_draft("Title: Only a title").is_none());
    }
}
