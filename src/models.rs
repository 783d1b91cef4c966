use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

// Row of the `tools` table. Every column but `id` may come back null, and
// `id` keeps whatever JSON type the backend uses. Columns this gateway does
// not know about are relayed untouched through `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub downloads: Option<i64>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Insert payload sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTool {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub user_id: String,
}

// POST /tools body, as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateToolRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub user_id: Option<String>,
}

impl CreateToolRequest {
    pub const MISSING_FIELDS: &'static str = "Missing required fields: title, description, user_id";

    /// Checks the required fields, returning the backend payload.
    pub fn validate(self) -> Result<NewTool, &'static str> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());

        match (present(self.title), present(self.description), present(self.user_id)) {
            (Some(title), Some(description), Some(user_id)) => Ok(NewTool {
                title,
                description,
                category: self.category,
                url: self.url,
                thumbnail: self.thumbnail,
                user_id,
            }),
            _ => Err(Self::MISSING_FIELDS),
        }
    }
}

// GET /tools query. Kept as raw strings so junk values fall back to defaults
// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    #[serde(rename = "pageSize")]
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub offset: u64,
    pub limit: u32,
}

impl PageQuery {
    pub fn range(&self) -> PageRange {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(0)
            .max(0) as u64;
        let limit = self
            .page_size
            .as_deref()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE as i64)
            .clamp(1, MAX_PAGE_SIZE as i64) as u32;

        PageRange {
            offset: page.saturating_mul(limit as u64),
            limit,
        }
    }
}

// POST /tool-created body: either a database webhook `{ record: {...} }` or
// the row itself
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolCreatedEvent {
    pub record: Option<Value>,
    pub id: Option<Value>,
}

impl ToolCreatedEvent {
    pub fn tool_id(&self) -> Option<String> {
        let id = match &self.record {
            Some(record) => record.get("id"),
            None => self.id.as_ref(),
        }?;
        match id {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Uniform response wrapper: `{ ok: true, data }` or `{ ok: false, error }`.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl Envelope<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(message.into()) }
    }
}
