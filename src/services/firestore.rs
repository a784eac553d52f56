// Firestore service - complaint documents over the Firestore REST API
// Collection: complaints/{doc_id}, doc_id is internal and never exposed

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::store::{sort_newest_first, ComplaintStore, StoreResult};
use crate::models::{Complaint, ComplaintUpdate, Priority, TimelineEntry};

/// Service account credentials from JSON file
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    client_email: String,
    private_key: String,
    token_uri: Option<String>,
}

/// JWT claims for Google OAuth2
#[derive(Debug, Serialize)]
struct GoogleJwtClaims {
    iss: String,      // Service account email
    scope: String,    // OAuth scopes
    aud: String,      // Token endpoint
    iat: i64,         // Issued at
    exp: i64,         // Expiration
}

/// Cached access token with expiration
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Connection settings for FirestoreService
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub database_id: String,
    pub collection: String,
    /// host:port of a local emulator; requests go there unauthenticated
    pub emulator_host: Option<String>,
    pub credentials_path: Option<String>,
}

/// Firestore REST API client
pub struct FirestoreService {
    client: Client,
    settings: FirestoreSettings,
    credentials: Option<ServiceAccountCredentials>,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl FirestoreService {
    /// Create a new Firestore service
    pub async fn new(settings: FirestoreSettings) -> StoreResult<Self> {
        let client = Client::new();

        let credentials = if settings.emulator_host.is_some() {
            tracing::info!("Using Firestore emulator at {:?}", settings.emulator_host);
            None
        } else {
            Self::load_credentials(settings.credentials_path.as_deref())?
        };

        let service = Self {
            client,
            settings,
            credentials,
            cached_token: Arc::new(RwLock::new(None)),
        };

        // Pre-fetch an access token
        if service.settings.emulator_host.is_none() {
            if let Err(e) = service.get_access_token().await {
                tracing::warn!("Failed to get initial access token: {}", e);
            }
        }

        Ok(service)
    }

    /// Load service account credentials from JSON file
    fn load_credentials(path: Option<&str>) -> StoreResult<Option<ServiceAccountCredentials>> {
        let creds_path = match path {
            Some(path) => path.to_string(),
            None => {
                // Try default location in current directory
                if std::path::Path::new("google-credentials.json").exists() {
                    "google-credentials.json".to_string()
                } else {
                    tracing::warn!("No GOOGLE_APPLICATION_CREDENTIALS set and no google-credentials.json found");
                    return Ok(None);
                }
            }
        };

        tracing::info!("Loading service account credentials from: {}", creds_path);

        let creds_json = std::fs::read_to_string(&creds_path)
            .map_err(|e| format!("Failed to read credentials file {}: {}", creds_path, e))?;

        let credentials: ServiceAccountCredentials = serde_json::from_str(&creds_json)
            .map_err(|e| format!("Failed to parse credentials JSON: {}", e))?;

        tracing::info!("Loaded credentials for service account: {}", credentials.client_email);

        Ok(Some(credentials))
    }

    /// Get access token, using cache if valid or refreshing if needed
    async fn get_access_token(&self) -> StoreResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref() {
                // Use token if it has at least 60 seconds left
                if cached.expires_at > Utc::now().timestamp() + 60 {
                    return Ok(cached.token.clone());
                }
            }
        }

        let token = self.fetch_new_access_token().await?;

        // Tokens are valid for 1 hour, refresh after 55 minutes
        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at: Utc::now().timestamp() + 3300,
            });
        }

        Ok(token)
    }

    /// Fetch a new access token from Google OAuth
    async fn fetch_new_access_token(&self) -> StoreResult<String> {
        if let Some(creds) = &self.credentials {
            let token = self.get_token_from_service_account(creds).await?;
            tracing::info!("Got access token from service account");
            return Ok(token);
        }

        // Fall back to metadata server (Cloud Run / GKE without a credentials file)
        if let Ok(token) = self.try_metadata_server().await {
            tracing::info!("Got access token from GCP metadata server");
            return Ok(token);
        }

        Err("No valid authentication method available. Set GOOGLE_APPLICATION_CREDENTIALS or run on GCP.".into())
    }

    /// Try to get token from GCP metadata server
    async fn try_metadata_server(&self) -> StoreResult<String> {
        let metadata_url =
            "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

        let response = self.client
            .get(metadata_url)
            .header("Metadata-Flavor", "Google")
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await?;

        if response.status().is_success() {
            let token: TokenResponse = response.json().await?;
            return Ok(token.access_token);
        }

        Err("Metadata server not available".into())
    }

    /// Get access token using service account credentials (OAuth2 JWT flow)
    async fn get_token_from_service_account(
        &self,
        creds: &ServiceAccountCredentials,
    ) -> StoreResult<String> {
        let now = Utc::now().timestamp();
        let token_uri = creds.token_uri.as_deref().unwrap_or("https://oauth2.googleapis.com/token");

        let claims = GoogleJwtClaims {
            iss: creds.client_email.clone(),
            scope: "https://www.googleapis.com/auth/datastore".to_string(),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(creds.private_key.as_bytes())
            .map_err(|e| format!("Failed to parse private key: {}", e))?;

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| format!("Failed to encode JWT: {}", e))?;

        let response = self.client
            .post(token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await
            .map_err(|e| format!("Token request failed: {}", e))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Token exchange failed: {}", error_text).into());
        }

        let token_response: TokenResponse = response.json().await
            .map_err(|e| format!("Failed to parse token response: {}", e))?;

        Ok(token_response.access_token)
    }

    /// Build Firestore REST API base URL (the documents root)
    fn base_url(&self) -> String {
        let host = match &self.settings.emulator_host {
            Some(host) => format!("http://{}", host),
            None => "https://firestore.googleapis.com".to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            host, self.settings.project_id, self.settings.database_id
        )
    }

    /// Build request with auth header
    async fn build_request(&self, method: reqwest::Method, url: &str) -> StoreResult<reqwest::RequestBuilder> {
        let req = self.client.request(method, url);
        if self.settings.emulator_host.is_some() {
            // The emulator accepts this fixed token and skips security rules
            return Ok(req.bearer_auth("owner"));
        }
        let token = self.get_access_token().await?;
        Ok(req.bearer_auth(token))
    }

    /// Run a structured query against the complaints collection
    async fn run_query(&self, structured_query: Value) -> StoreResult<Vec<Value>> {
        let query = json!({ "structuredQuery": structured_query });

        tracing::debug!("Firestore query: {}", query);

        let response = self
            .build_request(reqwest::Method::POST, &format!("{}:runQuery", self.base_url()))
            .await?
            .json(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            tracing::error!("Firestore query error: {}", error_text);
            return Err(format!("Firestore query failed: {}", error_text).into());
        }

        let results: Vec<Value> = response.json().await?;
        Ok(results
            .into_iter()
            .filter_map(|r| r.get("document").cloned())
            .collect())
    }

    /// Look up the raw document holding a complaint ID
    async fn find_document(&self, complaint_id: &str) -> StoreResult<Option<Value>> {
        let documents = self
            .run_query(json!({
                "from": [{"collectionId": &self.settings.collection}],
                "where": {
                    "fieldFilter": {
                        "field": {"fieldPath": "complaintId"},
                        "op": "EQUAL",
                        "value": {"stringValue": complaint_id}
                    }
                },
                "limit": 1
            }))
            .await?;

        Ok(documents.into_iter().next())
    }

    // =========================================================================
    // DOCUMENT CONVERSION
    // =========================================================================

    fn timeline_entry_value(entry: &TimelineEntry) -> Value {
        json!({
            "mapValue": {
                "fields": {
                    "stage": {"stringValue": &entry.stage},
                    "message": {"stringValue": &entry.message},
                    "updatedBy": {"stringValue": &entry.updated_by},
                    "timestamp": {"timestampValue": entry.timestamp.to_rfc3339()}
                }
            }
        })
    }

    fn complaint_to_fields(complaint: &Complaint) -> Value {
        let mut fields = json!({
            "complaintId": {"stringValue": &complaint.complaint_id},
            "citizenText": {"stringValue": &complaint.citizen_text},
            "aiSummary": {"stringValue": &complaint.ai_summary},
            "priority": {"stringValue": complaint.priority.as_str()},
            "aiPriorityReason": {"stringValue": &complaint.ai_priority_reason},
            "department": optional_string_value(complaint.department.as_deref()),
            "location": optional_string_value(complaint.location.as_deref()),
            "status": {"stringValue": &complaint.status},
            "createdAt": {"timestampValue": complaint.created_at.to_rfc3339()},
            "progressTimeline": {
                "arrayValue": {
                    "values": complaint
                        .progress_timeline
                        .iter()
                        .map(Self::timeline_entry_value)
                        .collect::<Vec<_>>()
                }
            }
        });

        if let Some(ts) = complaint.updated_at {
            fields["updatedAt"] = json!({"timestampValue": ts.to_rfc3339()});
        }
        if let Some(ts) = complaint.resolved_at {
            fields["resolvedAt"] = json!({"timestampValue": ts.to_rfc3339()});
        }
        if let Some(rt) = &complaint.resolution_type {
            fields["resolutionType"] = json!({"stringValue": rt});
        }

        fields
    }

    /// Build the commit request for one atomic set + append
    fn update_commit_body(document_name: &str, update: &ComplaintUpdate) -> Value {
        let mut field_paths = vec!["status"];
        let mut fields = json!({
            "status": {"stringValue": &update.status}
        });

        if let Some(ts) = update.updated_at {
            field_paths.push("updatedAt");
            fields["updatedAt"] = json!({"timestampValue": ts.to_rfc3339()});
        }
        if let Some(ts) = update.resolved_at {
            field_paths.push("resolvedAt");
            fields["resolvedAt"] = json!({"timestampValue": ts.to_rfc3339()});
        }
        if let Some(rt) = &update.resolution_type {
            field_paths.push("resolutionType");
            fields["resolutionType"] = json!({"stringValue": rt});
        }

        json!({
            "writes": [{
                "update": {"name": document_name, "fields": fields},
                "updateMask": {"fieldPaths": field_paths},
                "updateTransforms": [{
                    "fieldPath": "progressTimeline",
                    "appendMissingElements": {
                        "values": [Self::timeline_entry_value(&update.entry)]
                    }
                }],
                "currentDocument": {"exists": true}
            }]
        })
    }

    /// Parse Firestore document to Complaint
    fn parse_complaint(&self, doc: &Value) -> StoreResult<Complaint> {
        let fields = doc.get("fields").ok_or("Missing fields")?;

        Ok(Complaint {
            complaint_id: self
                .parse_string(fields, "complaintId")
                .ok_or("Missing complaintId")?,
            citizen_text: self.parse_string(fields, "citizenText").unwrap_or_default(),
            ai_summary: self.parse_string(fields, "aiSummary").unwrap_or_default(),
            priority: Priority::normalize(&self.parse_string(fields, "priority").unwrap_or_default()),
            ai_priority_reason: self.parse_string(fields, "aiPriorityReason").unwrap_or_default(),
            department: self.parse_string(fields, "department"),
            location: self.parse_string(fields, "location"),
            status: self.parse_string(fields, "status").unwrap_or_default(),
            created_at: self.parse_timestamp(fields, "createdAt")?,
            updated_at: self.parse_timestamp_optional(fields, "updatedAt"),
            resolved_at: self.parse_timestamp_optional(fields, "resolvedAt"),
            resolution_type: self.parse_string(fields, "resolutionType"),
            progress_timeline: self.parse_timeline(fields),
        })
    }

    fn parse_timeline(&self, fields: &Value) -> Vec<TimelineEntry> {
        fields
            .get("progressTimeline")
            .and_then(|v| v.get("arrayValue"))
            .and_then(|v| v.get("values"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| {
                        let map = v.get("mapValue")?.get("fields")?;
                        Some(TimelineEntry {
                            stage: self.parse_string(map, "stage").unwrap_or_default(),
                            message: self.parse_string(map, "message").unwrap_or_default(),
                            updated_by: self.parse_string(map, "updatedBy").unwrap_or_default(),
                            timestamp: self.parse_timestamp_optional(map, "timestamp")?,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    // Field parsing helpers
    fn parse_string(&self, fields: &Value, key: &str) -> Option<String> {
        fields.get(key)?.get("stringValue")?.as_str().map(|s| s.to_string())
    }

    fn parse_timestamp(&self, fields: &Value, key: &str) -> StoreResult<DateTime<Utc>> {
        let ts = fields
            .get(key)
            .and_then(|v| v.get("timestampValue"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("Missing timestamp field: {}", key))?;

        DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("Invalid timestamp {}: {}", key, e).into())
    }

    fn parse_timestamp_optional(&self, fields: &Value, key: &str) -> Option<DateTime<Utc>> {
        fields
            .get(key)
            .and_then(|v| v.get("timestampValue"))
            .and_then(|v| v.as_str())
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

fn optional_string_value(value: Option<&str>) -> Value {
    match value {
        Some(s) => json!({"stringValue": s}),
        None => json!({"nullValue": null}),
    }
}

#[async_trait]
impl ComplaintStore for FirestoreService {
    async fn insert(&self, complaint: &Complaint) -> StoreResult<()> {
        let doc_id = uuid::Uuid::new_v4().to_string();
        let url = format!(
            "{}/{}/{}?currentDocument.exists=false",
            self.base_url(),
            self.settings.collection,
            doc_id
        );

        let doc = json!({"fields": Self::complaint_to_fields(complaint)});

        let response = self
            .build_request(reqwest::Method::PATCH, &url)
            .await?
            .json(&doc)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Firestore create error: {}", error_text).into());
        }

        tracing::info!("Stored complaint {} as document {}", complaint.complaint_id, doc_id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<Complaint>> {
        let documents = self
            .run_query(json!({
                "from": [{"collectionId": &self.settings.collection}],
                "orderBy": [{"field": {"fieldPath": "createdAt"}, "direction": "DESCENDING"}]
            }))
            .await?;

        let mut complaints: Vec<Complaint> = documents
            .iter()
            .filter_map(|d| match self.parse_complaint(d) {
                Ok(complaint) => Some(complaint),
                Err(e) => {
                    tracing::warn!("Failed to parse complaint: {}", e);
                    None
                }
            })
            .collect();

        // Firestore leaves equal timestamps in unspecified order
        sort_newest_first(&mut complaints);

        tracing::info!("Retrieved {} complaints", complaints.len());
        Ok(complaints)
    }

    async fn find(&self, complaint_id: &str) -> StoreResult<Option<Complaint>> {
        match self.find_document(complaint_id).await? {
            Some(doc) => Ok(Some(self.parse_complaint(&doc)?)),
            None => Ok(None),
        }
    }

    async fn apply_update(&self, complaint_id: &str, update: &ComplaintUpdate) -> StoreResult<bool> {
        let Some(doc) = self.find_document(complaint_id).await? else {
            return Ok(false);
        };
        let name = doc
            .get("name")
            .and_then(|n| n.as_str())
            .ok_or("Missing document name")?;

        let body = Self::update_commit_body(name, update);

        let response = self
            .build_request(reqwest::Method::POST, &format!("{}:commit", self.base_url()))
            .await?
            .json(&body)
            .send()
            .await?;

        // exists=true precondition failed: the document went away after the lookup
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Firestore update error: {}", error_text).into());
        }

        tracing::info!("Updated complaint {} to status {}", complaint_id, update.status);
        Ok(true)
    }

    async fn ping(&self) -> StoreResult<()> {
        let url = format!("{}/{}?pageSize=1", self.base_url(), self.settings.collection);

        let response = self
            .build_request(reqwest::Method::GET, &url)
            .await?
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Firestore ping failed: {}", error_text).into());
        }

        Ok(())
    }
}
