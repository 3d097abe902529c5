//! The load → translate → save run over one workflow file.

use crate::config::LanguageConfig;
use crate::console::Console;
use crate::error::DocumentError;
use crate::notes::{NoteTranslator, RunSummary};
use crate::translator::{TranslationBackend, language_name};
use crate::workflow::{NO_TRANSLATION_SUFFIX, Workflow, output_path, translated_suffix};
use std::path::{Path, PathBuf};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Node counts.
    pub summary: RunSummary,
    /// Where the result was written.
    pub output_path: PathBuf,
    /// True if source and target were the same and nothing was translated.
    pub skipped_translation: bool,
}

/// Translates the notes of `input` and writes the result beside it.
///
/// Load errors and the final write error are returned; everything that
/// goes wrong inside a backend only leaves the affected note untranslated.
pub async fn process_workflow(
    input: &Path,
    backend: &dyn TranslationBackend,
    languages: &LanguageConfig,
    console: &Console,
) -> Result<RunReport, DocumentError> {
    console.step(&format!("Loading {}", input.display()));
    let mut workflow = Workflow::load(input)?;
    console.success(&format!(
        "Loaded workflow with {} nodes",
        workflow.nodes().len()
    ));

    if languages.is_same_language() {
        let output = output_path(input, NO_TRANSLATION_SUFFIX);
        console.warning(&format!(
            "Source and target language are both {}, copying without translation",
            language_name(&languages.target)
        ));
        workflow.copy_unchanged(&output)?;
        console.success(&format!("Copy saved as {}", output.display()));

        return Ok(RunReport {
            summary: RunSummary {
                total_nodes: workflow.nodes().len(),
                ..RunSummary::default()
            },
            output_path: output,
            skipped_translation: true,
        });
    }

    console.info(&format!(
        "Translating notes with {} from {} to {}",
        backend.name(),
        source_label(languages),
        language_name(&languages.target)
    ));

    let summary = NoteTranslator::new(backend, &languages.source, &languages.target, console)
        .translate_workflow(&mut workflow)
        .await;
    summary.print(console);

    let suffix = translated_suffix(backend.kind().tag(), &languages.source, &languages.target);
    let output = output_path(input, &suffix);
    workflow.save(&output)?;
    console.success(&format!("Translated workflow saved as {}", output.display()));

    Ok(RunReport {
        summary,
        output_path: output,
        skipped_translation: false,
    })
}

/// Source language as shown to the user.
fn source_label(languages: &LanguageConfig) -> String {
    if languages.is_auto() {
        "auto-detected language".to_string()
    } else {
        language_name(&languages.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslationError;
    use crate::notes::tests::ScriptedBackend;
    use serde_json::Value;
    use tempfile::tempdir;

    const WORKFLOW: &str = r#"{
  "last_node_id": 2,
  "nodes": [
    {
      "id": 1,
      "type": "Note",
      "pos": [10, 20],
      "widgets_values": ["Tip: use more steps."]
    },
    {
      "id": 2,
      "type": "CheckpointLoader",
      "pos": [300, 20],
      "widgets_values": ["sd_xl_base_1.0.safetensors"]
    }
  ]
}"#;

    fn languages(source: &str, target: &str) -> LanguageConfig {
        LanguageConfig {
            source: source.to_string(),
            target: target.to_string(),
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_translation() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, WORKFLOW).unwrap();

        let backend = ScriptedBackend::new(|_| Ok("Consejo: usa más pasos.".to_string()));
        let console = Console::with_colors(false);

        let report = process_workflow(&input, &backend, &languages("en", "es"), &console)
            .await
            .unwrap();

        assert_eq!(
            report.output_path,
            dir.path().join("flow_translated_google_en_to_es.json")
        );
        assert_eq!(report.summary.translated_notes, 1);
        assert_eq!(report.summary.processed_notes, 1);
        assert!(!report.skipped_translation);

        let original = read_json(&input);
        let output = read_json(&report.output_path);
        assert_eq!(
            output["nodes"][0]["widgets_values"][0],
            "Consejo: usa más pasos."
        );
        assert_eq!(output["nodes"][1], original["nodes"][1]);
        assert_eq!(output["nodes"][0]["pos"], original["nodes"][0]["pos"]);

        // The input is left as it was.
        assert_eq!(std::fs::read_to_string(&input).unwrap(), WORKFLOW);
    }

    #[tokio::test]
    async fn test_network_error_completes_run() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, WORKFLOW).unwrap();

        let backend = ScriptedBackend::new(|_| {
            Err(TranslationError::ApiError("network unreachable".to_string()))
        });
        let console = Console::with_colors(false);

        let report = process_workflow(&input, &backend, &languages("en", "es"), &console)
            .await
            .unwrap();

        assert_eq!(report.summary.translated_notes, 0);
        let output = read_json(&report.output_path);
        assert_eq!(
            output["nodes"][0]["widgets_values"][0],
            "Tip: use more steps."
        );
    }

    #[tokio::test]
    async fn test_same_language_copies_without_calls() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, WORKFLOW).unwrap();

        let backend = ScriptedBackend::new(|_| Ok("never".to_string()));
        let console = Console::with_colors(false);

        let report = process_workflow(&input, &backend, &languages("es", "ES"), &console)
            .await
            .unwrap();

        assert!(report.skipped_translation);
        assert_eq!(backend.call_count(), 0);
        assert_eq!(
            report.output_path,
            dir.path().join("flow_processed_no_translation.json")
        );
        assert_eq!(
            std::fs::read(&report.output_path).unwrap(),
            WORKFLOW.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_missing_nodes_writes_nothing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, r#"{"links": []}"#).unwrap();

        let backend = ScriptedBackend::new(|_| Ok("x".to_string()));
        let console = Console::with_colors(false);

        let err = process_workflow(&input, &backend, &languages("en", "es"), &console)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::SchemaViolation(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_auto_source_is_kept_in_filename() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, WORKFLOW).unwrap();

        let backend = ScriptedBackend::new(|_| Ok("Astuce".to_string()));
        let console = Console::with_colors(false);

        let report = process_workflow(&input, &backend, &languages("auto", "fr"), &console)
            .await
            .unwrap();

        assert_eq!(
            report.output_path,
            dir.path().join("flow_translated_google_auto_to_fr.json")
        );
    }
}
