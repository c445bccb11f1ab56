//! Built-in tools.

use crate::model::ToolSpec;
use crate::tools::{Tool, ToolError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;

/// Adds two integers.
pub struct Add;

#[derive(Deserialize)]
struct AddArgs {
    a: i64,
    b: i64,
}

#[async_trait]
impl Tool for Add {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "add".into(),
            description: "Add two integers and return the sum.".into(),
            schema: json!({
                "type": "object",
                "properties": {
                    "a": { "type": "integer" },
                    "b": { "type": "integer" }
                },
                "required": ["a", "b"]
            }),
        }
    }

    async fn invoke(&self, input: Value) -> Result<Value, ToolError> {
        let args: AddArgs =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        Ok(json!(args.a + args.b))
    }
}

/// Lists file names in a directory.
pub struct ListFiles {
    root: PathBuf,
}

impl ListFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ListFiles {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl Tool for ListFiles {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "list_files".into(),
            description: "List the names of the files in the current directory.".into(),
            schema: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    async fn invoke(&self, _input: Value) -> Result<Value, ToolError> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(json!(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_sums_integers() {
        let output = Add.invoke(json!({"a": 2, "b": 3})).await.unwrap();
        assert_eq!(output, json!(5));
    }

    #[tokio::test]
    async fn add_rejects_bad_arguments() {
        let err = Add.invoke(json!({"a": "two"})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn list_files_reports_directory_contents() {
        let dir = std::env::temp_dir().join(format!("tiller-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("a.txt"), b"").await.unwrap();
        tokio::fs::write(dir.join("b.txt"), b"").await.unwrap();

        let output = ListFiles::new(&dir).invoke(Value::Null).await.unwrap();
        assert_eq!(output, json!(["a.txt", "b.txt"]));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn list_files_surfaces_io_errors() {
        let err = ListFiles::new("/nonexistent/tiller")
            .invoke(Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }
}
