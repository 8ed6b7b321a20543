use serde::{Deserialize, Serialize};

/// The body the backend sends alongside a non-2xx status. Different handlers
/// use different field names for the human-readable part.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        let detail = self.detail.map(|value| match value {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        });
        detail.or(self.error).or(self.message)
    }
}

// Query strings of the parameterized GET endpoints.

#[derive(Debug, Serialize)]
pub(crate) struct LimitQuery {
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct DaysQuery {
    pub days: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TailQuery<'a> {
    pub engine: &'a str,
    pub lines: u32,
}
