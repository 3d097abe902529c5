//! comfy-notes - translate the notes of ComfyUI workflows.
//!
//! This library provides functionality for:
//! - Loading and saving ComfyUI workflow JSON without disturbing the graph
//! - Finding `Note` nodes and replacing their text in place
//! - Translating through Google's free endpoint or an OpenAI-compatible API

pub mod config;
pub mod console;
pub mod error;
pub mod notes;
pub mod pipeline;
pub mod translator;
pub mod workflow;

// Re-export commonly used types
pub use config::{BackendKind, Config};
pub use console::Console;
pub use error::{ConfigError, DocumentError, TranslationError};
pub use notes::{NoteTranslator, RunSummary};
pub use pipeline::{RunReport, process_workflow};
pub use translator::{TranslationBackend, TranslationOutcome, UnchangedReason};
pub use workflow::Workflow;
