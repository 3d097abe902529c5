//! Loading and saving ComfyUI workflow documents.
//!
//! A workflow is kept as a `serde_json::Value` tree with key order
//! preserved, so everything the translator does not touch is written back
//! as it was read.

use crate::error::DocumentError;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Attribute holding the node collection.
const NODES_KEY: &str = "nodes";

/// Suffix used when source and target language are the same.
pub const NO_TRANSLATION_SUFFIX: &str = "_processed_no_translation";

/// A loaded workflow document.
#[derive(Debug, Clone)]
pub struct Workflow {
    /// Where the document was read from.
    source_path: PathBuf,
    /// The full JSON tree.
    root: Value,
}

impl Workflow {
    /// Reads and validates a workflow file.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content, path)
    }

    /// Parses a workflow from JSON text; `path` is only used in errors.
    pub fn from_json(content: &str, path: &Path) -> Result<Self, DocumentError> {
        let root: Value =
            serde_json::from_str(content).map_err(|source| DocumentError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        match root.get(NODES_KEY) {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(DocumentError::SchemaViolation(format!(
                    "'{}' is not a list",
                    NODES_KEY
                )));
            }
            None => {
                return Err(DocumentError::SchemaViolation(format!(
                    "missing '{}' attribute",
                    NODES_KEY
                )));
            }
        }

        Ok(Self {
            source_path: path.to_path_buf(),
            root,
        })
    }

    /// The nodes of the graph, in document order.
    pub fn nodes(&self) -> &[Value] {
        self.root
            .get(NODES_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Mutable access to the nodes, in document order.
    pub fn nodes_mut(&mut self) -> &mut [Value] {
        match self.root.get_mut(NODES_KEY).and_then(Value::as_array_mut) {
            Some(nodes) => nodes.as_mut_slice(),
            None => &mut [],
        }
    }

    /// Serializes the workflow with two-space indentation.
    ///
    /// Non-ASCII text is written as-is rather than escaped.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    /// Writes the workflow to `path`, which must differ from the input.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        if path == self.source_path.as_path() {
            return Err(DocumentError::WriteFailure {
                path: path.to_path_buf(),
                message: "refusing to overwrite the input file".to_string(),
            });
        }

        let content = self
            .to_json_pretty()
            .map_err(|e| DocumentError::WriteFailure {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        std::fs::write(path, content).map_err(|e| DocumentError::WriteFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Copies the original input bytes to `path` without re-serializing.
    pub fn copy_unchanged(&self, path: &Path) -> Result<(), DocumentError> {
        if path == self.source_path.as_path() {
            return Err(DocumentError::WriteFailure {
                path: path.to_path_buf(),
                message: "refusing to overwrite the input file".to_string(),
            });
        }

        std::fs::copy(&self.source_path, path)
            .map(|_| ())
            .map_err(|e| DocumentError::WriteFailure {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// Builds the filename suffix for a translation run.
pub fn translated_suffix(backend_tag: &str, source: &str, target: &str) -> String {
    format!(
        "_translated_{}_{}_to_{}",
        backend_tag,
        source.trim().to_lowercase(),
        target.trim().to_lowercase()
    )
}

/// Inserts `suffix` between the file stem and its extension.
///
/// `workflow.json` with `_x` becomes `workflow_x.json`; a path without an
/// extension just gets the suffix appended.
pub fn output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(OsStr::to_string_lossy)
        .unwrap_or_default();

    let file_name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    input.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"{
  "last_node_id": 2,
  "nodes": [
    {"id": 1, "type": "Note", "widgets_values": ["Tip: use more steps."]},
    {"id": 2, "type": "CheckpointLoader", "widgets_values": ["model.safetensors"]}
  ],
  "links": []
}"#;

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = Workflow::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = Workflow::from_json("{ not json", Path::new("x.json")).unwrap_err();
        assert!(matches!(err, DocumentError::Malformed { .. }));
    }

    #[test]
    fn test_missing_nodes_is_schema_violation() {
        let err = Workflow::from_json(r#"{"links": []}"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, DocumentError::SchemaViolation(_)));

        let err = Workflow::from_json(r#"{"nodes": {}}"#, Path::new("x.json")).unwrap_err();
        assert!(matches!(err, DocumentError::SchemaViolation(_)));
    }

    #[test]
    fn test_nodes_in_order() {
        let workflow = Workflow::from_json(SAMPLE, Path::new("x.json")).unwrap();
        let types: Vec<&str> = workflow
            .nodes()
            .iter()
            .filter_map(|n| n.get("type").and_then(Value::as_str))
            .collect();
        assert_eq!(types, vec!["Note", "CheckpointLoader"]);
    }

    #[test]
    fn test_save_keeps_key_order_and_unicode() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let mut workflow = Workflow::load(&input).unwrap();
        workflow.nodes_mut()[0]["widgets_values"][0] = Value::from("Consejo: usa más pasos.");

        let output = dir.path().join("flow_out.json");
        workflow.save(&output).unwrap();

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.contains("más"));
        let last_node = written.find("last_node_id").unwrap();
        let nodes = written.find("\"nodes\"").unwrap();
        let links = written.find("\"links\"").unwrap();
        assert!(last_node < nodes && nodes < links);
        assert!(written.contains("\n  \"nodes\""));

        // The input stays untouched.
        assert_eq!(std::fs::read_to_string(&input).unwrap(), SAMPLE);
    }

    #[test]
    fn test_save_refuses_input_path() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let workflow = Workflow::load(&input).unwrap();
        let err = workflow.save(&input).unwrap_err();
        assert!(matches!(err, DocumentError::WriteFailure { .. }));
    }

    #[test]
    fn test_copy_unchanged_is_byte_identical() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("flow.json");
        std::fs::write(&input, SAMPLE).unwrap();

        let workflow = Workflow::load(&input).unwrap();
        let output = output_path(&input, NO_TRANSLATION_SUFFIX);
        workflow.copy_unchanged(&output).unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&input).unwrap());
    }

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("dir/flow.json"), "_translated_ai_en_to_es");
        assert_eq!(path, PathBuf::from("dir/flow_translated_ai_en_to_es.json"));

        let path = output_path(Path::new("flow"), NO_TRANSLATION_SUFFIX);
        assert_eq!(path, PathBuf::from("flow_processed_no_translation"));

        let path = output_path(Path::new("my.flow.v2.json"), "_x");
        assert_eq!(path, PathBuf::from("my.flow.v2_x.json"));
    }

    #[test]
    fn test_translated_suffix() {
        assert_eq!(
            translated_suffix("google", "auto", "ES"),
            "_translated_google_auto_to_es"
        );
    }
}
