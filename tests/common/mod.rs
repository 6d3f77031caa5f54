//! In-process test harness: the full router over a temp data directory,
//! driven with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use vialog::auth::{PasswordHasher, TokenService};
use vialog::media::VideoStorage;
use vialog::notify::{DEFAULT_SEND_TIMEOUT, MailError, Mailer, Notifier};
use vialog::server::{AppState, create_router};
use vialog::store::{SqliteStore, Store};
use vialog::types::{User, UserRole};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const PUBLIC_BASE_URL: &str = "https://annotate.example.org";

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(Vec<String>, String, String)>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub mailer: Arc<RecordingMailer>,
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response is not UTF-8")
    }
}

impl TestApp {
    /// An app whose notifications land in [`TestApp::mailer`].
    pub fn new() -> Self {
        Self::build(true)
    }

    /// An app with mail disabled; invitation tokens come back to the inviter.
    pub fn without_mail() -> Self {
        Self::build(false)
    }

    fn build(mail: bool) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("vialog.db")).expect("open store");
        store.initialize().expect("initialize store");

        let passwords = PasswordHasher::new();
        let now = Utc::now();
        store
            .create_user(&User {
                id: Uuid::new_v4().to_string(),
                email: ADMIN_EMAIL.to_string(),
                password_hash: Some(passwords.hash(ADMIN_PASSWORD).unwrap()),
                role: UserRole::Admin,
                display_name: Some("Admin".to_string()),
                invited: false,
                created_at: now,
                updated_at: now,
            })
            .expect("seed admin");

        let mailer = Arc::new(RecordingMailer::default());
        let state = Arc::new(AppState {
            store: Arc::new(store),
            storage: VideoStorage::new(temp_dir.path()),
            data_dir: temp_dir.path().to_path_buf(),
            public_base_url: PUBLIC_BASE_URL.to_string(),
            tokens: TokenService::new("test-session-secret", "test-invite-secret", Duration::hours(1))
                .unwrap(),
            passwords,
            notifier: if mail {
                Notifier::new(Some(mailer.clone()), DEFAULT_SEND_TIMEOUT)
            } else {
                Notifier::disabled()
            },
        });

        Self {
            temp_dir,
            router: create_router(state.clone()),
            state,
            mailer,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Logs in and returns the session token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .post(
                "/api/v1/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login failed: {}", resp.text());
        resp.json()["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn create_project(&self, token: &str, title: &str) -> Value {
        let resp = self
            .post(
                "/api/v1/projects",
                Some(token),
                serde_json::json!({ "title": title }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        resp.json()["data"].clone()
    }

    /// Waits for the detached sends to run and returns every recorded mail.
    pub async fn sent_mail(&self) -> Vec<(Vec<String>, String, String)> {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        self.mailer.sent.lock().unwrap().clone()
    }

    /// Pulls the token out of the latest invitation mailed to `email`.
    pub async fn invitation_token(&self, email: &str) -> String {
        let sent = self.sent_mail().await;
        let (_, _, body) = sent
            .iter()
            .rev()
            .find(|(to, subject, _)| to.iter().any(|r| r == email) && subject.starts_with("Invitation"))
            .unwrap_or_else(|| panic!("no invitation mailed to {email}"));

        let encoded = body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .expect("invitation link in mail body");
        urlencoding::decode(encoded).expect("url-encoded token").into_owned()
    }

    /// Invites `email`, accepts with `password`, and returns a session token.
    pub async fn onboard(&self, inviter: &str, project_id: &str, email: &str, role: &str, password: &str) -> String {
        let resp = self
            .post(
                &format!("/api/v1/projects/{project_id}/invitations"),
                Some(inviter),
                serde_json::json!({ "email": email, "role": role }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        let token = match resp.json()["data"]["token"].as_str() {
            Some(token) => token.to_string(),
            None => self.invitation_token(email).await,
        };

        let resp = self
            .post(
                "/api/v1/invitations/accept",
                None,
                serde_json::json!({ "token": token, "password": password }),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "{}", resp.text());

        self.login(email, password).await
    }

    pub async fn create_external_video(&self, token: &str, project_id: &str, title: &str) -> Value {
        let resp = self
            .send(multipart_request(
                "/api/v1/videos",
                token,
                &[
                    ("project_id", None, project_id.as_bytes()),
                    ("title", None, title.as_bytes()),
                    ("peertube_url", None, &b"https://peertube.example/w/abc"[..]),
                ],
            ))
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.text());
        resp.json()["data"].clone()
    }
}

const BOUNDARY: &str = "vialog-test-boundary";

/// Builds a multipart/form-data request. Parts with a filename are sent as
/// file fields.
pub fn multipart_request(uri: &str, token: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("build multipart request")
}
