// Client for the backend's PostgREST surface (`/rest/v1`)

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::config::SupabaseConfig;
use crate::models::{NewTool, PageRange, Tool};

const TOOLS_TABLE: &str = "tools";
const INCREMENT_DOWNLOADS_RPC: &str = "rpc/increment_tool_downloads";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Missing SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY")]
    MissingServiceCredential,
}

// PostgREST error body: { code, message, details, hint }
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

impl BackendError {
    fn from_body(status: StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed
            .message
            .or(parsed.msg)
            .or(parsed.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    format!("backend responded with {status}")
                } else {
                    text
                }
            });

        BackendError::Api {
            status: status.as_u16(),
            code: parsed.code,
            message,
        }
    }
}

/// Whose authority a backend query runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    /// The caller's bearer token, or anonymous access when absent.
    Caller(Option<&'a str>),
    /// The service role key; bypasses row-level security.
    Service,
}

impl<'a> Credential<'a> {
    pub fn from_headers(headers: &'a HeaderMap) -> Self {
        Credential::Caller(bearer_token(headers))
    }
}

/// `Authorization: Bearer <token>`, scheme case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split(' ');
    let scheme = parts.next()?;
    let token = parts.next()?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    rest: Url,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, config: &SupabaseConfig) -> Result<Self, BackendError> {
        let rest = Url::parse(&format!("{}/rest/v1/", config.url.trim_end_matches('/')))?;

        Ok(Self {
            http,
            rest,
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
        })
    }

    pub async fn list_tools(
        &self,
        credential: Credential<'_>,
        range: PageRange,
    ) -> Result<Vec<Tool>, BackendError> {
        let mut url = self.rest.join(TOOLS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "created_at.desc")
            .append_pair("offset", &range.offset.to_string())
            .append_pair("limit", &range.limit.to_string());

        tracing::debug!(offset = range.offset, limit = range.limit, "Listing tools");
        let req = self.request(Method::GET, url, credential)?;
        decode(req).await
    }

    pub async fn insert_tool(
        &self,
        credential: Credential<'_>,
        tool: &NewTool,
    ) -> Result<Tool, BackendError> {
        let mut url = self.rest.join(TOOLS_TABLE)?;
        url.query_pairs_mut().append_pair("select", "*");

        tracing::debug!(title = %tool.title, "Inserting tool");
        let req = self
            .request(Method::POST, url, credential)?
            .header("prefer", "return=representation")
            .header("accept", SINGLE_OBJECT)
            .json(tool);
        decode(req).await
    }

    pub async fn fetch_tool(&self, credential: Credential<'_>, id: &str) -> Result<Tool, BackendError> {
        let mut url = self.rest.join(TOOLS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("id", &format!("eq.{id}"));

        let req = self
            .request(Method::GET, url, credential)?
            .header("accept", SINGLE_OBJECT);
        decode(req).await
    }

    /// One atomic `downloads = downloads + 1` on the backend, run with the
    /// service credential.
    pub async fn increment_downloads(&self, id: &str) -> Result<(), BackendError> {
        let url = self.rest.join(INCREMENT_DOWNLOADS_RPC)?;

        tracing::debug!(tool_id = id, "Incrementing download counter");
        let res = self
            .request(Method::POST, url, Credential::Service)?
            .json(&json!({ "tool_id": id }))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.bytes().await?;
            return Err(BackendError::from_body(status, &body));
        }
        Ok(())
    }

    fn request(
        &self,
        method: Method,
        url: Url,
        credential: Credential<'_>,
    ) -> Result<RequestBuilder, BackendError> {
        let (apikey, bearer) = match credential {
            Credential::Caller(token) => (self.anon_key.as_str(), token.unwrap_or(self.anon_key.as_str())),
            Credential::Service => {
                let key = self
                    .service_role_key
                    .as_deref()
                    .ok_or(BackendError::MissingServiceCredential)?;
                (key, key)
            }
        };

        Ok(self
            .http
            .request(method, url)
            .header("apikey", apikey)
            .bearer_auth(bearer))
    }
}

async fn decode<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, BackendError> {
    let res = req.send().await?;
    let status = res.status();
    let body = res.bytes().await?;

    if !status.is_success() {
        return Err(BackendError::from_body(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}
