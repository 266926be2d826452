//! Drive v3 `files.list` over reqwest

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::{DriveApi, DriveError, FileMetadata, FileQuery, Result};

/// Public Drive API origin
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";

/// Fields requested per file; keeps responses to metadata only
const FILE_FIELDS: &str = "files(id,name,mimeType,modifiedTime,webViewLink)";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileMetadata>,
}

/// Drive client bound to one API origin and a per-call timeout.
#[derive(Clone)]
pub struct GoogleDriveClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GoogleDriveClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn files_url(&self, query: &FileQuery) -> Result<Url> {
        let endpoint = format!("{}/drive/v3/files", self.base_url.trim_end_matches('/'));
        let page_size = query.limit.to_string();
        let mut params = vec![("pageSize", page_size.as_str()), ("fields", FILE_FIELDS)];
        if let Some(q) = query.query.as_deref() {
            params.push(("q", q));
        }
        Url::parse_with_params(&endpoint, &params)
            .map_err(|e| DriveError::Http(format!("invalid Drive API url {endpoint}: {e}")))
    }

    #[instrument(skip_all, fields(limit = query.limit, filtered = query.query.is_some()))]
    async fn fetch(&self, access_token: &str, query: &FileQuery) -> Result<Vec<FileMetadata>> {
        let url = self.files_url(query)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DriveError::Timeout(self.timeout)
                } else {
                    DriveError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DriveError::Unauthorized(body));
            }
            return Err(DriveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let list = response
            .json::<FileList>()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;
        debug!(files = list.files.len(), "Drive listing received");
        Ok(list.files)
    }
}

impl DriveApi for GoogleDriveClient {
    fn list_files<'a>(
        &'a self,
        access_token: &'a str,
        query: &'a FileQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<FileMetadata>>> + Send + 'a>> {
        Box::pin(self.fetch(access_token, query))
    }
}

/// Drive search expression matching file names containing `term`,
/// excluding trashed files.
///
/// Backslashes and single quotes are escaped per the Drive query grammar.
pub fn name_contains_query(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name contains '{escaped}' and trashed = false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Seen {
        params: Arc<Mutex<Option<HashMap<String, String>>>>,
        authorization: Arc<Mutex<Option<String>>>,
    }

    /// Start a Drive stand-in answering `/drive/v3/files` with the given status/body.
    async fn start_drive_stub(status: StatusCode, body: &'static str) -> (String, Seen) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Seen::default();

        let app = axum::Router::new()
            .route(
                "/drive/v3/files",
                get(
                    move |State(seen): State<Seen>,
                          headers: HeaderMap,
                          Query(params): Query<HashMap<String, String>>| async move {
                        *seen.params.lock().unwrap() = Some(params);
                        *seen.authorization.lock().unwrap() = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        (
                            status,
                            [(axum::http::header::CONTENT_TYPE, "application/json")],
                            body,
                        )
                            .into_response()
                    },
                ),
            )
            .with_state(seen.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn client(base: &str) -> GoogleDriveClient {
        GoogleDriveClient::new(reqwest::Client::new(), base, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn lists_files_with_bearer_token_and_page_size() {
        let (base, seen) = start_drive_stub(
            StatusCode::OK,
            r#"{"files":[{"id":"1","name":"a.txt"},{"id":"2","name":"Plan","mimeType":"application/vnd.google-apps.document"}]}"#,
        )
        .await;

        let query = FileQuery {
            query: None,
            limit: 20,
        };
        let files = client(&base).list_files("t1", &query).await.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[1].name, "Plan");
        assert_eq!(seen.authorization.lock().unwrap().as_deref(), Some("Bearer t1"));
        let params = seen.params.lock().unwrap().clone().unwrap();
        assert_eq!(params["pageSize"], "20");
        assert_eq!(params["fields"], FILE_FIELDS);
        assert!(!params.contains_key("q"));
    }

    #[tokio::test]
    async fn search_query_is_forwarded() {
        let (base, seen) = start_drive_stub(StatusCode::OK, r#"{"files":[]}"#).await;

        let query = FileQuery {
            query: Some(name_contains_query("budget")),
            limit: 10,
        };
        let files = client(&base).list_files("t1", &query).await.unwrap();

        assert!(files.is_empty());
        let params = seen.params.lock().unwrap().clone().unwrap();
        assert_eq!(params["q"], "name contains 'budget' and trashed = false");
        assert_eq!(params["pageSize"], "10");
    }

    #[tokio::test]
    async fn missing_files_key_is_empty_listing() {
        let (base, _seen) = start_drive_stub(StatusCode::OK, "{}").await;
        let query = FileQuery {
            query: None,
            limit: 5,
        };
        assert!(client(&base).list_files("t", &query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_token_is_unauthorized() {
        let (base, _seen) = start_drive_stub(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#,
        )
        .await;
        let query = FileQuery {
            query: None,
            limit: 5,
        };

        let err = client(&base).list_files("expired", &query).await.unwrap_err();

        match err {
            DriveError::Unauthorized(body) => assert!(body.contains("Invalid Credentials")),
            other => panic!("expected Unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let (base, _seen) =
            start_drive_stub(StatusCode::SERVICE_UNAVAILABLE, r#"{"error":"backend"}"#).await;
        let query = FileQuery {
            query: None,
            limit: 5,
        };

        let err = client(&base).list_files("t", &query).await.unwrap_err();

        assert!(
            matches!(err, DriveError::Status { status: 503, ref body } if body.contains("backend")),
            "got: {err:?}"
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn slow_drive_times_out_as_retryable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = axum::Router::new().route(
            "/drive/v3/files",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                r#"{"files":[]}"#
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let timeout = Duration::from_millis(300);
        let client =
            GoogleDriveClient::new(reqwest::Client::new(), format!("http://{addr}"), timeout);
        let query = FileQuery {
            query: None,
            limit: 5,
        };

        let err = client.list_files("t", &query).await.unwrap_err();

        assert!(matches!(err, DriveError::Timeout(d) if d == timeout), "got: {err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let (base, _seen) = start_drive_stub(StatusCode::OK, "not json").await;
        let query = FileQuery {
            query: None,
            limit: 5,
        };
        let err = client(&base).list_files("t", &query).await.unwrap_err();
        assert!(matches!(err, DriveError::InvalidResponse(_)), "got: {err:?}");
    }

    #[test]
    fn query_escapes_quotes_and_backslashes() {
        assert_eq!(
            name_contains_query(r"Q1 'final' \draft"),
            r"name contains 'Q1 \'final\' \\draft' and trashed = false"
        );
    }
}
