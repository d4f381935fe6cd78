//! Configuration module for Groundwise.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnswerPrompts, Prompts};
pub use settings::{
    AnswerSettings, ApiSettings, ChunkingSettings, CorpusSettings, CredentialSettings,
    FallbackSettings, GeneralSettings, IngestSettings, PromptSettings, Settings, VideoSettings,
};
