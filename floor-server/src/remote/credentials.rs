//! 凭据文件加载
//!
//! Only a structural check: the file must exist and hold a JSON object.
//! Whether the key is actually accepted is decided by the store on connect.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::utils::{AppError, AppResult};

/// Service account credentials read from disk
#[derive(Clone)]
pub struct Credentials {
    path: PathBuf,
    fields: Arc<Map<String, Value>>,
}

impl Credentials {
    pub fn from_fields(path: impl Into<PathBuf>, fields: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            fields: Arc::new(fields),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `project_id` declared inside the key file, if any
    pub fn project_id(&self) -> Option<&str> {
        self.fields.get("project_id").and_then(Value::as_str)
    }

    pub fn client_email(&self) -> Option<&str> {
        self.fields.get("client_email").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

// Key material stays out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("path", &self.path)
            .field("client_email", &self.client_email())
            .field("fields", &format_args!("<{} redacted>", self.fields.len()))
            .finish()
    }
}

/// Read and structurally check a credentials file
pub async fn load_credentials(path: impl AsRef<Path>) -> AppResult<Credentials> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(AppError::config("credentials path is empty"));
    }

    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::config(format!(
            "cannot read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    if content.trim().is_empty() {
        return Err(AppError::config(format!(
            "credentials file {} is empty",
            path.display()
        )));
    }

    let value: Value = serde_json::from_str(&content).map_err(|e| {
        AppError::config(format!(
            "credentials file {} is not valid JSON: {}",
            path.display(),
            e
        ))
    })?;
    let Value::Object(fields) = value else {
        return Err(AppError::config(format!(
            "credentials file {} must contain a JSON object",
            path.display()
        )));
    };

    tracing::debug!(path = %path.display(), keys = fields.len(), "Credentials loaded");
    Ok(Credentials::from_fields(path, fields))
}
