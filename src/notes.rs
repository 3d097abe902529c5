//! Note-node discovery and in-place text substitution.
//!
//! Walks the nodes of a workflow in document order, sends the text of every
//! eligible `Note` node to a backend, and writes accepted translations back
//! into `widgets_values[0]`. Nothing a backend does can abort the walk.

use crate::console::{Console, preview};
use crate::translator::{TranslationBackend, TranslationOutcome, UnchangedReason};
use crate::workflow::Workflow;
use serde_json::Value;

/// Node type carrying free-text annotations.
pub const NOTE_TYPE: &str = "Note";

/// Attribute holding a node's widget values.
const WIDGETS_KEY: &str = "widgets_values";

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// All nodes in the document.
    pub total_nodes: usize,
    /// `Note` nodes seen, eligible or not.
    pub processed_notes: usize,
    /// Notes whose text was replaced.
    pub translated_notes: usize,
}

impl RunSummary {
    /// Prints the summary block.
    pub fn print(&self, console: &Console) {
        console.section("Summary");
        console.summary_line("Total nodes in file:", self.total_nodes);
        console.summary_line("Note nodes processed:", self.processed_notes);
        console.summary_line("Notes translated:", self.translated_notes);
    }
}

/// What happened to a single node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteState {
    /// Not a note, or a note with nothing to translate.
    Skip,
    /// The note text was replaced.
    Translated,
    /// The backend was asked but the original text was kept.
    Unchanged,
}

/// Returns true if the node is a `Note` node.
pub fn is_note(node: &Value) -> bool {
    node.get("type").and_then(Value::as_str) == Some(NOTE_TYPE)
}

/// Returns the note text of a `Note` node, if `widgets_values[0]` is a string.
pub fn note_text(node: &Value) -> Option<&str> {
    node.get(WIDGETS_KEY)
        .and_then(Value::as_array)
        .and_then(|values| values.first())
        .and_then(Value::as_str)
}

/// Identifier for log lines; falls back to the node's position.
fn node_label(node: &Value, index: usize) -> String {
    match node.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("index_{}", index),
    }
}

/// Replaces `widgets_values[0]` of a node.
fn set_note_text(node: &mut Value, text: String) {
    if let Some(slot) = node
        .get_mut(WIDGETS_KEY)
        .and_then(Value::as_array_mut)
        .and_then(|values| values.first_mut())
    {
        *slot = Value::String(text);
    }
}

/// Translates the notes of a workflow using one backend.
pub struct NoteTranslator<'a> {
    backend: &'a dyn TranslationBackend,
    source: String,
    target: String,
    console: &'a Console,
}

impl<'a> NoteTranslator<'a> {
    /// Create a new NoteTranslator for a language pair.
    pub fn new(
        backend: &'a dyn TranslationBackend,
        source: &str,
        target: &str,
        console: &'a Console,
    ) -> Self {
        Self {
            backend,
            source: source.trim().to_string(),
            target: target.trim().to_string(),
            console,
        }
    }

    /// Walks all nodes, translating notes in place.
    pub async fn translate_workflow(&self, workflow: &mut Workflow) -> RunSummary {
        let mut summary = RunSummary {
            total_nodes: workflow.nodes().len(),
            ..RunSummary::default()
        };

        for (index, node) in workflow.nodes_mut().iter_mut().enumerate() {
            if !is_note(node) {
                continue;
            }
            summary.processed_notes += 1;

            if self.translate_node(node, index, summary.processed_notes).await
                == NoteState::Translated
            {
                summary.translated_notes += 1;
            }
        }

        summary
    }

    /// Handles one `Note` node.
    pub async fn translate_node(
        &self,
        node: &mut Value,
        index: usize,
        note_number: usize,
    ) -> NoteState {
        let label = node_label(node, index);

        let Some(original) = note_text(node).map(str::to_string) else {
            self.console.warning(&format!(
                "Note node {} has no text in '{}', skipping",
                label, WIDGETS_KEY
            ));
            return NoteState::Skip;
        };

        if original.trim().is_empty() {
            self.console
                .info(&format!("Note node {} is empty, skipping", label));
            return NoteState::Skip;
        }

        self.console
            .step(&format!("Note node {} (note #{})", label, note_number));
        self.console
            .detail(&format!("original: {}", preview(&original)));

        let outcome = self
            .backend
            .translate(&original, &self.source, &self.target)
            .await;

        match outcome {
            TranslationOutcome::Translated(translated) => {
                if translated.trim().is_empty() {
                    self.console
                        .warning("Translation came back empty, keeping the original");
                    NoteState::Unchanged
                } else if translated == original {
                    self.console
                        .info("Translation is identical to the original, nothing to change");
                    NoteState::Unchanged
                } else {
                    self.console
                        .detail(&format!("translated: {}", preview(&translated)));
                    set_note_text(node, translated);
                    NoteState::Translated
                }
            }
            TranslationOutcome::Unchanged(UnchangedReason::SameLanguage) => {
                self.console
                    .info("Note is already in the target language, nothing to change");
                NoteState::Unchanged
            }
            TranslationOutcome::Unchanged(reason) => {
                self.console.warning(&format!(
                    "{} did not translate this note ({}), keeping the original",
                    self.backend.name(),
                    reason
                ));
                NoteState::Unchanged
            }
        }
    }
}
