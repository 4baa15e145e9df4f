use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// One line of `docker push` progress output.
///
/// Docker emits JSON messages when talking to the engine API and plain text
/// from the CLI; plain lines are kept as the status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

impl PushMessage {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(message) = serde_json::from_str::<PushMessage>(trimmed) {
                return message;
            }
        }
        PushMessage {
            status: Some(trimmed.to_string()),
            ..Default::default()
        }
    }

    /// The registry's error, if this message carries one.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| {
                self.error_detail
                    .as_ref()
                    .and_then(|detail| detail.message.as_deref())
            })
            .filter(|message| !message.trim().is_empty())
    }

    /// Human readable form, `None` for empty lines.
    pub fn summary(&self) -> Option<String> {
        let status = self.status.as_deref().unwrap_or_default().trim();
        if status.is_empty() {
            return None;
        }
        let mut summary = match &self.id {
            Some(id) => format!("{}: {}", id, status),
            None => status.to_string(),
        };
        if let Some(progress) = self.progress.as_deref().filter(|p| !p.is_empty()) {
            summary.push(' ');
            summary.push_str(progress);
        }
        Some(summary)
    }
}
