use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};

use crate::error::ApiError;
use crate::models::{CreateToolRequest, Envelope, PageQuery, Tool};
use crate::state::AppState;
use crate::supabase::Credential;

// GET /tools?page=&pageSize=
pub async fn list_tools(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Tool>>>, ApiError> {
    let range = query.map(|Query(q)| q).unwrap_or_default().range();

    let tools = state
        .supabase
        .list_tools(Credential::from_headers(&headers), range)
        .await?;

    Ok(Json(Envelope::success(tools)))
}

// POST /tools
pub async fn create_tool(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreateToolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Tool>>), ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Unreadable create body, treating as empty: {rejection}");
            CreateToolRequest::default()
        }
    };
    let new_tool = request
        .validate()
        .map_err(|msg| ApiError::BadRequest(msg.to_string()))?;

    let tool = state
        .supabase
        .insert_tool(Credential::from_headers(&headers), &new_tool)
        .await?;

    tracing::info!(tool_id = %tool.id, "Tool created");
    Ok((StatusCode::CREATED, Json(Envelope::success(tool))))
}

// GET /tools/{id}
pub async fn get_tool(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Tool>>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing id".to_string()));
    }

    let tool = state
        .supabase
        .fetch_tool(Credential::from_headers(&headers), &id)
        .await?;

    Ok(Json(Envelope::success(tool)))
}

#[cfg(test)]
mod tests {
    use crate::handlers::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use httpmock::prelude::*;
    use serde_json::json;

    fn tool_row(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "Sketchpad",
            "description": "Draw with a model",
            "category": "art",
            "downloads": 12,
            "created_at": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn list_returns_array_in_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/tools")
                    .query_param("select", "*")
                    .query_param("order", "created_at.desc")
                    .query_param("offset", "10")
                    .query_param("limit", "10");
                then.status(200).json_body(json!([tool_row("a")]));
            })
            .await;

        let (status, _, body) =
            call(app(&server.base_url()), request("GET", "/tools?page=1&pageSize=10")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["data"][0]["id"], json!("a"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_relays_null_columns_and_numeric_ids() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/tools");
                then.status(200).json_body(json!([
                    { "id": "a", "title": "T", "description": null, "downloads": null },
                    { "id": 1, "title": null, "description": "D", "downloads": 4 }
                ]));
            })
            .await;

        let (status, _, body) = call(app(&server.base_url()), request("GET", "/tools")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], json!("a"));
        assert_eq!(body["data"][0]["description"], json!(null));
        assert_eq!(body["data"][0]["downloads"], json!(null));
        assert_eq!(body["data"][1]["id"], json!(1));
        assert_eq!(body["data"][1]["downloads"], json!(4));
    }

    #[tokio::test]
    async fn list_clamps_page_size_to_one_hundred() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/tools")
                    .query_param("offset", "0")
                    .query_param("limit", "100");
                then.status(200).json_body(json!([]));
            })
            .await;

        let (status, _, body) =
            call(app(&server.base_url()), request("GET", "/tools?pageSize=500")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "data": [] }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_forwards_caller_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/tools")
                    .header("apikey", "anon-key")
                    .header("authorization", "Bearer user-jwt");
                then.status(200).json_body(json!([]));
            })
            .await;

        let req = Request::builder()
            .uri("/tools")
            .header("authorization", "Bearer user-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = call(app(&server.base_url()), req).await;

        assert_eq!(status, StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_with_missing_title_never_reaches_backend() {
        let server = MockServer::start_async().await;
        let insert = server
            .mock_async(|when, then| {
                when.method(POST).path("/rest/v1/tools");
                then.status(201).json_body(tool_row("new"));
            })
            .await;

        let body = json!({ "description": "No title here", "user_id": "u1" });
        let (status, _, body) =
            call(app(&server.base_url()), json_request("POST", "/tools", &body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "ok": false, "error": "Missing required fields: title, description, user_id" })
        );
        insert.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn create_with_unparsable_body_is_a_client_error() {
        let server = MockServer::start_async().await;
        let req = Request::builder()
            .method("POST")
            .uri("/tools")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, _, body) = call(app(&server.base_url()), req).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], json!(false));
    }

    #[tokio::test]
    async fn create_inserts_and_returns_201() {
        let server = MockServer::start_async().await;
        let insert = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/rest/v1/tools")
                    .header("prefer", "return=representation")
                    .header("authorization", "Bearer user-jwt")
                    .json_body(json!({
                        "title": "Sketchpad",
                        "description": "Draw with a model",
                        "category": "art",
                        "url": "https://sketch.example",
                        "thumbnail": null,
                        "user_id": "u1"
                    }));
                then.status(201).json_body(tool_row("new"));
            })
            .await;

        let payload = json!({
            "title": "Sketchpad",
            "description": "Draw with a model",
            "category": "art",
            "url": "https://sketch.example",
            "user_id": "u1"
        });
        let req = Request::builder()
            .method("POST")
            .uri("/tools")
            .header("content-type", "application/json")
            .header("authorization", "Bearer user-jwt")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let (status, _, body) = call(app(&server.base_url()), req).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["id"], json!("new"));
        insert.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_by_id_returns_single_record() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/rest/v1/tools")
                    .query_param("id", "eq.t-42")
                    .header("accept", "application/vnd.pgrst.object+json");
                then.status(200).json_body(tool_row("t-42"));
            })
            .await;

        let (status, _, body) = call(app(&server.base_url()), request("GET", "/tools/t-42")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["downloads"], json!(12));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blank_id_is_rejected_before_backend() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.path("/rest/v1/tools");
                then.status(200).json_body(tool_row("x"));
            })
            .await;

        let (status, _, body) = call(app(&server.base_url()), request("GET", "/tools/%20")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "ok": false, "error": "Missing id" }));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn backend_failure_becomes_500_with_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rest/v1/tools");
                then.status(406).json_body(json!({
                    "code": "PGRST116",
                    "message": "Cannot coerce the result to a single JSON object"
                }));
            })
            .await;

        let (status, _, body) = call(app(&server.base_url()), request("GET", "/tools/gone")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "ok": false, "error": "Cannot coerce the result to a single JSON object" })
        );
    }
}
