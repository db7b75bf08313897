//! HTTP access to the NoteHub notes API.
//!
//! The service only translates calls into requests and responses into typed
//! results. Caching, retries and ordering are the caller's concern.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::{ListParams, NewNote, Note, NotePage};

mod error;

pub use error::{ServiceError, ServiceResult};

#[async_trait]
pub trait NoteApi: Send + Sync {
    async fn list(&self, params: &ListParams) -> ServiceResult<NotePage>;
    async fn create(&self, note: &NewNote) -> ServiceResult<Note>;
    async fn delete(&self, id: &str) -> ServiceResult<Note>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    List,
    Create,
    Delete,
}

#[derive(Debug, Clone)]
pub struct NoteService {
    client: Client,
    base: Url,
}

impl NoteService {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> ServiceResult<Self> {
        let base = Url::parse(base_url)
            .map_err(|err| ServiceError::InvalidConfig(format!("base url {base_url}: {err}")))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ServiceError::InvalidConfig(format!(
                "base url {base_url} must be an http(s) URL"
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ServiceError::InvalidConfig("token contains invalid characters".into()))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ServiceError::Network)?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidConfig(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: Operation,
        id: Option<&str>,
    ) -> ServiceResult<T> {
        let response = request.send().await.map_err(ServiceError::Network)?;
        let status = response.status();
        debug!(?operation, status = status.as_u16(), url = %response.url(), "notes api response");
        if status.is_success() {
            return response.json::<T>().await.map_err(ServiceError::from);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_failure(status, &body, operation, id))
    }
}

fn map_failure(status: StatusCode, body: &str, operation: Operation, id: Option<&str>) -> ServiceError {
    let message = error::extract_message(body);
    match (status, operation) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => ServiceError::Unauthorized {
            status: status.as_u16(),
        },
        (StatusCode::NOT_FOUND, Operation::Delete) => ServiceError::NotFound {
            id: id.unwrap_or_default().to_string(),
        },
        (StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY, Operation::Create) => {
            ServiceError::Validation {
                status: status.as_u16(),
                message,
            }
        }
        _ => ServiceError::Http {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl NoteApi for NoteService {
    async fn list(&self, params: &ListParams) -> ServiceResult<NotePage> {
        let url = self.endpoint(&["notes"])?;
        debug!(page = params.page, per_page = params.per_page, search = %params.search, "listing notes");
        let request = self.client.get(url).query(&[
            ("page", params.page.to_string()),
            ("perPage", params.per_page.to_string()),
            ("search", params.search.clone()),
        ]);
        self.send(request, Operation::List, None).await
    }

    async fn create(&self, note: &NewNote) -> ServiceResult<Note> {
        let url = self.endpoint(&["notes"])?;
        debug!(title = %note.title, tag = %note.tag, "creating note");
        let request = self.client.post(url).json(note);
        self.send(request, Operation::Create, None).await
    }

    async fn delete(&self, id: &str) -> ServiceResult<Note> {
        let url = self.endpoint(&["notes", id])?;
        debug!(id, "deleting note");
        let request = self.client.delete(url);
        self.send(request, Operation::Delete, Some(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NoteTag;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "test-token";

    fn service(server: &MockServer) -> NoteService {
        NoteService::new(&format!("{}/api", server.uri()), TOKEN, Duration::from_secs(5))
            .expect("service builds")
    }

    fn note_json(id: &str, title: &str, tag: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "content": "",
            "tag": tag,
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-01T10:00:00.000Z"
        })
    }

    #[tokio::test]
    async fn list_sends_bearer_and_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .and(query_param("page", "2"))
            .and(query_param("perPage", "12"))
            .and(query_param("search", "meeting notes"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notes": [note_json("n1", "Standup", "Meeting")],
                "totalPages": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = service(&server)
            .list(&ListParams::new(2, 12, "meeting notes"))
            .await
            .expect("list succeeds");
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.notes[0].tag, NoteTag::Meeting);
    }

    #[tokio::test]
    async fn create_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_json(json!({
                "title": "Quarterly plan",
                "content": "draft goals",
                "tag": "Work"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(note_json(
                "n9",
                "Quarterly plan",
                "Work",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let created = service(&server)
            .create(&NewNote {
                title: "Quarterly plan".into(),
                content: "draft goals".into(),
                tag: NoteTag::Work,
            })
            .await
            .expect("create succeeds");
        assert_eq!(created.id, "n9");
    }

    #[tokio::test]
    async fn create_rejection_maps_to_validation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({ "message": "title is too short" })),
            )
            .mount(&server)
            .await;

        let err = service(&server)
            .create(&NewNote {
                title: "ab".into(),
                content: String::new(),
                tag: NoteTag::Todo,
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Validation { status: 400, ref message } if message == "title is too short");
    }

    #[tokio::test]
    async fn create_unprocessable_maps_to_validation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({ "message": "tag is invalid" })),
            )
            .mount(&server)
            .await;

        let err = service(&server)
            .create(&NewNote {
                title: "Groceries".into(),
                content: String::new(),
                tag: NoteTag::Shopping,
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Validation { status: 422, ref message } if message == "tag is invalid");
    }

    #[tokio::test]
    async fn not_found_only_means_missing_note_on_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "message": "no such route" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/bad"))
            .respond_with(ResponseTemplate::new(400).set_body_string("malformed id"))
            .mount(&server)
            .await;

        let svc = service(&server);
        let err = svc.list(&ListParams::new(1, 12, "")).await.unwrap_err();
        assert_matches!(err, ServiceError::Http { status: 404, ref message } if message == "no such route");
        let err = svc.delete("bad").await.unwrap_err();
        assert_matches!(err, ServiceError::Http { status: 400, ref message } if message == "malformed id");
    }

    #[tokio::test]
    async fn delete_missing_note_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = service(&server).delete("gone").await.unwrap_err();
        assert_matches!(err, ServiceError::NotFound { ref id } if id == "gone");
    }

    #[tokio::test]
    async fn delete_returns_removed_note() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/n1"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(note_json(
                "n1", "Old", "Personal",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let removed = service(&server).delete("n1").await.expect("delete succeeds");
        assert_eq!(removed.title, "Old");
    }

    #[tokio::test]
    async fn server_error_and_bad_body_are_distinguished() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let svc = service(&server);
        let err = svc.list(&ListParams::new(1, 12, "")).await.unwrap_err();
        assert_matches!(err, ServiceError::Http { status: 500, ref message } if message == "boom");

        let err = svc.list(&ListParams::new(2, 12, "")).await.unwrap_err();
        assert_matches!(err, ServiceError::Decode(_));
    }

    #[tokio::test]
    async fn unauthorised_token_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = service(&server).list(&ListParams::default()).await.unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized { status: 401 });
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
            listener.local_addr().expect("free port addr").port()
        };
        let svc = NoteService::new(&format!("http://127.0.0.1:{port}"), TOKEN, Duration::from_secs(2))
            .expect("service builds");
        let err = svc.list(&ListParams::default()).await.unwrap_err();
        assert!(err.is_network(), "unexpected error: {err:?}");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = NoteService::new("mailto:notes@example.com", TOKEN, Duration::from_secs(1))
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidConfig(_));
    }
}
