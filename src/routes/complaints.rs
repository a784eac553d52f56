// Complaints routes
// Endpoints: POST/GET /api/complaints, GET /api/complaints/:id,
// PATCH /api/complaints/:id/progress, PATCH /api/complaints/:id/resolve

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};

use crate::error::ApiError;
use crate::models::{
    Complaint, ComplaintStatusResponse, CreateComplaintRequest, ResolveComplaintRequest,
    UpdateProgressRequest,
};
use crate::AppState;

/// Treat a missing or blank string field as absent
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/complaints - Analyze and store a complaint
async fn create_complaint(
    State(state): State<AppState>,
    payload: Result<Json<CreateComplaintRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Complaint>), ApiError> {
    let citizen_text_required = || ApiError::BadRequest("citizenText required".to_string());

    let Json(request) = payload.map_err(|e| {
        tracing::warn!("Rejected complaint body: {}", e);
        citizen_text_required()
    })?;
    let citizen_text = required(request.citizen_text).ok_or_else(citizen_text_required)?;

    tracing::info!(
        "Creating complaint ({} chars) department={:?}, location={:?}",
        citizen_text.chars().count(),
        request.department,
        request.location
    );

    let complaint = state
        .complaints
        .create(&citizen_text, request.department, request.location)
        .await?;

    Ok((StatusCode::CREATED, Json(complaint)))
}

/// GET /api/complaints - All complaints, newest first
async fn list_complaints(State(state): State<AppState>) -> Result<Json<Vec<Complaint>>, ApiError> {
    tracing::info!("Listing complaints");
    Ok(Json(state.complaints.list().await?))
}

/// GET /api/complaints/:id
async fn get_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
) -> Result<Json<Complaint>, ApiError> {
    tracing::info!("Getting complaint {}", complaint_id);

    match state.complaints.get(&complaint_id).await? {
        Some(complaint) => Ok(Json(complaint)),
        None => Err(ApiError::NotFound),
    }
}

/// PATCH /api/complaints/:id/progress - Move to a new stage
async fn update_progress(
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
    payload: Result<Json<UpdateProgressRequest>, JsonRejection>,
) -> Result<Json<ComplaintStatusResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    let status = required(request.status)
        .ok_or_else(|| ApiError::BadRequest("status required".to_string()))?;
    let note = request
        .note
        .ok_or_else(|| ApiError::BadRequest("note required".to_string()))?;

    tracing::info!("Updating complaint {} to status {}", complaint_id, status);

    let matched = state
        .complaints
        .update_progress(&complaint_id, &status, &note, request.updated_by.as_deref())
        .await?;

    // Missing IDs still answer success
    if !matched {
        tracing::warn!("Progress update for unknown complaint {}", complaint_id);
    }

    Ok(Json(ComplaintStatusResponse { success: true }))
}

/// PATCH /api/complaints/:id/resolve - Close a complaint
async fn resolve_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<String>,
    body: Bytes,
) -> Result<Json<ComplaintStatusResponse>, ApiError> {
    // An empty body means all defaults; anything else must be a valid request
    let request: ResolveComplaintRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ResolveComplaintRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };
    let resolution_type = required(request.resolution_type);

    tracing::info!(
        "Resolving complaint {} with resolution type {:?}",
        complaint_id,
        resolution_type
    );

    let matched = state
        .complaints
        .resolve(&complaint_id, resolution_type.as_deref())
        .await?;

    if !matched {
        tracing::warn!("Resolve for unknown complaint {}", complaint_id);
    }

    Ok(Json(ComplaintStatusResponse { success: true }))
}

pub fn complaints_routes() -> Router<AppState> {
    Router::new()
        .route("/api/complaints", get(list_complaints).post(create_complaint))
        .route("/api/complaints/:id", get(get_complaint))
        .route("/api/complaints/:id/progress", patch(update_progress))
        .route("/api/complaints/:id/resolve", patch(resolve_complaint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app, body_json, request};
    use axum::body::Body;
    use tower::ServiceExt;

    const AI_REPLY: &str =
        "```json\n{\"summary\":\"Fallen tree\",\"priority\":\"urgent - high\",\"reason\":\"Road blocked\"}\n```";

    #[tokio::test]
    async fn test_create_requires_citizen_text() {
        let app = app(Some(AI_REPLY));

        for body in [r#"{"department":"Parks"}"#, r#"{"citizenText":"   "}"#, "not json"] {
            let response = app
                .clone()
                .oneshot(request("POST", "/api/complaints", Body::from(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "citizenText required");
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let app = app(Some(AI_REPLY));

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/complaints",
                Body::from(r#"{"citizenText":"A tree fell on Oak Rd","location":"Oak Rd"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["priority"], "High");
        assert_eq!(created["aiSummary"], "Fallen tree");
        assert_eq!(created["status"], "Submitted");
        assert_eq!(created["location"], "Oak Rd");
        assert_eq!(created["progressTimeline"][0]["stage"], "Submitted");

        let id = created["complaintId"].as_str().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(request("GET", &format!("/api/complaints/{}", id), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["complaintId"], id.as_str());
    }

    #[tokio::test]
    async fn test_unknown_complaint_is_404() {
        let response = app(None)
            .oneshot(request("GET", "/api/complaints/CPA-1", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Not found");
    }

    #[tokio::test]
    async fn test_progress_then_resolve() {
        let app = app(None);

        let created = body_json(
            app.clone()
                .oneshot(request(
                    "POST",
                    "/api/complaints",
                    Body::from(r#"{"citizenText":"Streetlight not working"}"#),
                ))
                .await
                .unwrap(),
        )
        .await;
        // No model configured: keyword fallback
        assert_eq!(created["priority"], "Medium");
        assert_eq!(created["aiPriorityReason"], "Standard repair request (AI fallback)");
        let id = created["complaintId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                &format!("/api/complaints/{}/progress", id),
                Body::from(r#"{"status":"In Progress","note":"Crew assigned","updatedBy":"Public Works"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);

        let response = app
            .clone()
            .oneshot(request("PATCH", &format!("/api/complaints/{}/resolve", id), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let complaint = body_json(
            app.clone()
                .oneshot(request("GET", &format!("/api/complaints/{}", id), Body::empty()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(complaint["status"], "Resolved");
        assert_eq!(complaint["resolutionType"], "Permanent");
        let timeline = complaint["progressTimeline"].as_array().unwrap();
        let stages: Vec<&str> = timeline.iter().map(|e| e["stage"].as_str().unwrap()).collect();
        assert_eq!(stages, ["Submitted", "In Progress", "Resolved"]);
        assert_eq!(timeline[1]["updatedBy"], "Public Works");
    }

    #[tokio::test]
    async fn test_resolve_rejects_invalid_body() {
        let app = app(None);
        let created = body_json(
            app.clone()
                .oneshot(request(
                    "POST",
                    "/api/complaints",
                    Body::from(r#"{"citizenText":"Bench is wobbly"}"#),
                ))
                .await
                .unwrap(),
        )
        .await;
        let id = created["complaintId"].as_str().unwrap().to_string();
        let uri = format!("/api/complaints/{}/resolve", id);

        for body in [r#"{"resolutionType": 7}"#, "not json"] {
            let response = app
                .clone()
                .oneshot(request("PATCH", &uri, Body::from(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(response).await["error"].is_string());
        }

        let complaint = body_json(
            app.clone()
                .oneshot(request("GET", &format!("/api/complaints/{}", id), Body::empty()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(complaint["status"], "Submitted");
        assert!(complaint.get("resolutionType").is_none());
        assert_eq!(complaint["progressTimeline"].as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(request("PATCH", &uri, Body::from(r#"{"resolutionType":"Temporary"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_progress_validation_and_missing_id() {
        let app = app(None);

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                "/api/complaints/CPA-1/progress",
                Body::from(r#"{"note":"no status"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(request(
                "PATCH",
                "/api/complaints/CPA-1/progress",
                Body::from(r#"{"status":"In Progress","note":"n"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let app = app(None);
        for text in ["one", "two"] {
            app.clone()
                .oneshot(request(
                    "POST",
                    "/api/complaints",
                    Body::from(format!(r#"{{"citizenText":"{}"}}"#, text)),
                ))
                .await
                .unwrap();
        }

        let list = body_json(
            app.oneshot(request("GET", "/api/complaints", Body::empty()))
                .await
                .unwrap(),
        )
        .await;
        let texts: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["citizenText"].as_str().unwrap())
            .collect();
        assert_eq!(texts, ["two", "one"]);
    }
}
