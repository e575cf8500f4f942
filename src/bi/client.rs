//! Power BI REST client.
//!
//! Authenticates with the client-credentials flow, caches the bearer token
//! for the life of the client and runs DAX queries through the
//! `executeQueries` endpoint.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{BiConfig, BiCredentials};
use crate::error::{PipelineError, PipelineResult};
use crate::models::RawRow;

const MAX_ERROR_BODY: usize = 500;

/// Something that can evaluate a DAX query against the semantic model.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs `query` and returns the rows of the first result table.
    ///
    /// A response without tables yields an empty vector.
    async fn execute(&self, query: &str) -> PipelineResult<Vec<RawRow>>;

    /// Confirms the semantic model is reachable with the current credentials.
    async fn check_connection(&self) -> PipelineResult<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct ExecuteQueriesRequest<'a> {
    queries: [DaxQuery<'a>; 1],
    #[serde(rename = "serializerSettings")]
    serializer_settings: SerializerSettings,
}

#[derive(Debug, Serialize)]
struct DaxQuery<'a> {
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct SerializerSettings {
    #[serde(rename = "includeNulls")]
    include_nulls: bool,
}

#[derive(Debug, Deserialize)]
struct ExecuteQueriesResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    tables: Vec<ResultTable>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultTable {
    #[serde(default)]
    rows: Vec<RawRow>,
}

/// [`QueryExecutor`] backed by the Power BI REST API.
pub struct PowerBiClient {
    http: reqwest::Client,
    config: BiConfig,
    credentials: BiCredentials,
    token: Mutex<Option<String>>,
}

impl PowerBiClient {
    /// Creates a client. No request is made until the first query.
    pub fn new(config: &BiConfig, credentials: &BiCredentials) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PipelineError::Network {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            config: config.clone(),
            credentials: credentials.clone(),
            token: Mutex::new(None),
        })
    }

    fn dataset_url(&self) -> String {
        format!(
            "{}/groups/{}/datasets/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.credentials.workspace_id,
            self.credentials.semantic_model_id
        )
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url.trim_end_matches('/'),
            self.credentials.tenant_id
        )
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    fn store_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    async fn access_token(&self) -> PipelineResult<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        debug!(tenant = %self.credentials.tenant_id, "Requesting access token");
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Authentication {
                message: format!("status {}: {}", status.as_u16(), truncate(&body)),
            });
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::Authentication {
                    message: format!("malformed token response: {}", e),
                })?;

        info!("Access token acquired");
        self.store_token(Some(token.access_token.clone()));
        Ok(token.access_token)
    }
}

#[async_trait]
impl QueryExecutor for PowerBiClient {
    async fn execute(&self, query: &str) -> PipelineResult<Vec<RawRow>> {
        let token = self.access_token().await?;
        let body = ExecuteQueriesRequest {
            queries: [DaxQuery { query }],
            serializer_settings: SerializerSettings {
                include_nulls: true,
            },
        };

        let response = self
            .http
            .post(format!("{}/executeQueries", self.dataset_url()))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(network_error)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Access token rejected; it will be refreshed on the next attempt");
            self.store_token(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let parsed: ExecuteQueriesResponse =
            response
                .json()
                .await
                .map_err(|e| PipelineError::QueryResponse {
                    message: e.to_string(),
                })?;

        let rows = rows_from_response(parsed)?;
        debug!(rows = rows.len(), "Query executed");
        Ok(rows)
    }

    async fn check_connection(&self) -> PipelineResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(self.dataset_url())
            .bearer_auth(&token)
            .send()
            .await
            .map_err(network_error)?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.store_token(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        info!(semantic_model = %self.credentials.semantic_model_id, "Semantic model reachable");
        Ok(())
    }
}

fn rows_from_response(response: ExecuteQueriesResponse) -> PipelineResult<Vec<RawRow>> {
    let result = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::QueryResponse {
            message: "response contained no results".to_string(),
        })?;

    if let Some(error) = result.error {
        return Err(PipelineError::QueryResponse {
            message: truncate(&error.to_string()),
        });
    }

    Ok(result
        .tables
        .into_iter()
        .next()
        .map(|table| table.rows)
        .unwrap_or_default())
}

fn network_error(error: reqwest::Error) -> PipelineError {
    PipelineError::Network {
        message: error.to_string(),
    }
}

async fn status_error(response: reqwest::Response) -> PipelineError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    PipelineError::ApiStatus {
        status,
        message: truncate(&body),
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> ExecuteQueriesResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_rows_from_first_table() {
        let response = parse(json!({
            "results": [{
                "tables": [{
                    "rows": [
                        {"dEmpresas[Empresa]": 1, "[Ingressado]": 10.5},
                        {"dEmpresas[Empresa]": 10, "[Ingressado]": null}
                    ]
                }]
            }]
        }));

        let rows = rows_from_response(response).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["[Ingressado]"], Value::Null);
    }

    #[test]
    fn test_missing_tables_yield_no_rows() {
        let response = parse(json!({"results": [{"tables": []}]}));
        assert!(rows_from_response(response).unwrap().is_empty());

        let response = parse(json!({"results": [{}]}));
        assert!(rows_from_response(response).unwrap().is_empty());
    }

    #[test]
    fn test_missing_results_is_an_error() {
        let response = parse(json!({"results": []}));
        let result = rows_from_response(response);
        assert!(matches!(result, Err(PipelineError::QueryResponse { .. })));
    }

    #[test]
    fn test_query_error_is_reported() {
        let response = parse(json!({
            "results": [{"error": {"code": "DAXQueryFailure"}}]
        }));
        match rows_from_response(response) {
            Err(PipelineError::QueryResponse { message }) => {
                assert!(message.contains("DAXQueryFailure"));
            }
            other => panic!("expected QueryResponse error, got {:?}", other),
        }
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(MAX_ERROR_BODY + 20);
        let truncated = truncate(&long);
        assert_eq!(truncated.len(), MAX_ERROR_BODY + 3);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncate("short"), "short");
    }
}
