//! Capabilities the model may call while answering.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::documents::load_documents;
use crate::llm_interaction::{FunctionDefinition, ToolDefinition};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),
}

/// A function the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in its tool calls.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<Value, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            kind: "function",
            function: FunctionDefinition {
                name: self.name().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(),
            },
        }
    }
}

/// `read_file`: loads every text file under a folder and returns a
/// path-to-content object.
#[derive(Debug, Clone)]
pub struct ReadFolderTool {
    default_folder: PathBuf,
}

impl ReadFolderTool {
    pub const NAME: &'static str = "read_file";

    pub fn new(default_folder: impl Into<PathBuf>) -> Self {
        Self {
            default_folder: default_folder.into(),
        }
    }
}

#[async_trait]
impl Tool for ReadFolderTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Read all text-based files inside a folder and return their content."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "folder_path": {
                    "type": "string",
                    "description": "Folder to read, relative to the assistant's working directory.",
                    "default": self.default_folder.to_string_lossy(),
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let folder = args
            .get("folder_path")
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_folder.clone());

        info!(folder = %folder.display(), "model requested knowledge folder");
        let documents = tokio::task::spawn_blocking(move || load_documents(folder))
            .await
            .map_err(|e| ToolError::Failed(format!("folder read task failed: {e}")))?;

        Ok(serde_json::to_value(documents)?)
    }
}

/// The tools exposed to the model, looked up by name.
#[derive(Clone, Default)]
pub struct Toolset {
    tools: Vec<Arc<dyn Tool>>,
}

impl Toolset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Run the named tool with the model's raw JSON arguments.
    pub async fn call(&self, name: &str, raw_args: &str) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let args = if raw_args.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(raw_args)?
        };

        tool.execute(args).await
    }

    /// Like [`Toolset::call`], but always produces the text handed back to
    /// the model. Failures become a message the model can react to.
    pub async fn call_for_model(&self, name: &str, raw_args: &str) -> String {
        match self.call(name, raw_args).await {
            Ok(Value::String(text)) => text,
            Ok(value) => value.to_string(),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                format!("An error occurred while running the tool. Please try again. Error: {e}")
            }
        }
    }
}
