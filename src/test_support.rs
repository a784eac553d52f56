// Shared fixtures for in-process router tests

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::llm::{ComplaintAnalyzer, LlmError, TextGenerator};
use crate::models::{Complaint, ComplaintUpdate, Priority, TimelineEntry, STATUS_SUBMITTED};
use crate::services::store::StoreResult;
use crate::services::{ComplaintService, ComplaintStore, InMemoryStore};
use crate::{build_app, AppState};

/// Generator that always returns the same reply, or fails when there is none
struct FixedReply(Option<&'static str>);

#[async_trait]
impl TextGenerator for FixedReply {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.0.map(str::to_string).ok_or(LlmError::MissingApiKey)
    }
}

/// Store whose backend can never be reached
pub struct UnreachableStore;

#[async_trait]
impl ComplaintStore for UnreachableStore {
    async fn insert(&self, _complaint: &Complaint) -> StoreResult<()> {
        Err("connection refused".into())
    }

    async fn list(&self) -> StoreResult<Vec<Complaint>> {
        Err("connection refused".into())
    }

    async fn find(&self, _complaint_id: &str) -> StoreResult<Option<Complaint>> {
        Err("connection refused".into())
    }

    async fn apply_update(&self, _complaint_id: &str, _update: &ComplaintUpdate) -> StoreResult<bool> {
        Err("connection refused".into())
    }

    async fn ping(&self) -> StoreResult<()> {
        Err("connection refused".into())
    }
}

/// Full router over an in-memory store
pub fn app(ai_reply: Option<&'static str>) -> Router {
    app_with_store(Arc::new(InMemoryStore::new()), ai_reply)
}

pub fn app_with_store(store: Arc<dyn ComplaintStore>, ai_reply: Option<&'static str>) -> Router {
    let analyzer = Arc::new(ComplaintAnalyzer::new(Arc::new(FixedReply(ai_reply))));
    let complaints = Arc::new(ComplaintService::new(store, analyzer));
    build_app(AppState { complaints })
}

pub fn request(method: &str, uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Freshly submitted complaint with a fixed creation time
pub fn complaint(complaint_id: &str, created_at: DateTime<Utc>) -> Complaint {
    Complaint {
        complaint_id: complaint_id.to_string(),
        citizen_text: format!("Complaint {}", complaint_id),
        ai_summary: "Summary".to_string(),
        priority: Priority::Medium,
        ai_priority_reason: "Reason".to_string(),
        department: None,
        location: None,
        status: STATUS_SUBMITTED.to_string(),
        created_at,
        updated_at: None,
        resolved_at: None,
        resolution_type: None,
        progress_timeline: vec![TimelineEntry {
            stage: STATUS_SUBMITTED.to_string(),
            message: "Complaint analyzed".to_string(),
            updated_by: "system".to_string(),
            timestamp: created_at,
        }],
    }
}

/// Raw HTTP/1.1 response with a JSON body
pub fn http_reply(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// Answer one HTTP request on a local port with `reply`.
/// With `stall` the connection stays open after the reply is written.
pub async fn serve_once(reply: String, stall: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_request(&mut stream).await;
        stream.write_all(reply.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        if stall {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });
    addr
}

/// Read headers and a Content-Length body
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let content_length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                return;
            }
        }
    }
}
