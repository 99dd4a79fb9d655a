/// Integration tests for the campusd REST API.
/// Builds the real router over tempdir-backed storage and a stub
/// generation transport, then drives it request by request.
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use campusd::ai::transport::{GenerationTransport, InterviewPrompt, ResumePrompt};
use campusd::ai::DraftGateway;
use campusd::config::ServiceConfig;
use campusd::error::AppError;
use campusd::rest::build_router;
use campusd::storage::Storage;
use campusd::AppContext;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct StubTransport {
    configured: bool,
}

#[async_trait]
impl GenerationTransport for StubTransport {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_resume(&self, _prompt: &ResumePrompt<'_>) -> Result<String, AppError> {
        Ok("가 나 다".to_string())
    }

    async fn generate_interview(&self, _prompt: &InterviewPrompt<'_>) -> Result<Value, AppError> {
        Ok(json!([
            { "question": "q1", "intent": "i1", "tip": "t1" },
            { "question": "q2", "intent": "i2", "tip": "t2" },
        ]))
    }
}

async fn test_router(ai_configured: bool) -> (Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::new(
        Some(0),
        Some(dir.path().to_path_buf()),
        Some("warn".to_string()),
        None,
    );
    let storage = Storage::new(dir.path()).await.unwrap();
    let gateway = DraftGateway::new(Arc::new(StubTransport {
        configured: ai_configured,
    }));
    let ctx = Arc::new(AppContext::new(config, storage, gateway));
    (build_router(ctx), dir)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_user(router: &Router, name: &str) -> String {
    let (status, body) = send(
        router,
        "POST",
        "/api/v1/users",
        Some(json!({ "name": name, "major": "CS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_record(router: &Router, user_id: &str, title: &str, payload: Value) -> Value {
    let mut body = json!({ "userId": user_id, "title": title, "category": "PROJECT" });
    for (k, v) in payload.as_object().unwrap() {
        body[k] = v.clone();
    }
    let (status, response) = send(router, "POST", "/api/v1/records", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{response}");
    response["data"].clone()
}

#[tokio::test]
async fn health_reports_database_and_ai_state() {
    let (router, _dir) = test_router(true).await;
    let (status, body) = send(&router, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["database"], json!("ok"));
    assert_eq!(body["data"]["ai_configured"], json!(true));
}

#[tokio::test]
async fn user_lifecycle_and_partial_update() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "Jihoon").await;

    let (status, body) = send(&router, "GET", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["level"], json!(1));
    assert_eq!(body["data"]["exp"], json!(0));
    assert_eq!(body["data"]["max_exp"], json!(1000));

    // Partial update keeps untouched fields
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/v1/users/{id}"),
        Some(json!({ "major": "EE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Jihoon"));
    assert_eq!(body["data"]["major"], json!("EE"));

    // Empty body is a validation error
    let (status, _) = send(
        &router,
        "PUT",
        &format!("/api/v1/users/{id}"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "GET", "/api/v1/users/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn record_creation_awards_exp_atomically() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "Mina").await;

    // Push the user to the threshold edge, then let the record bonus tip it over
    let (status, body) = send(
        &router,
        "POST",
        &format!("/api/v1/users/{id}/exp"),
        Some(json!({ "amount": 990 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["exp"], json!(990));
    assert_eq!(body["data"]["leveled_up"], json!(false));

    let data = create_record(&router, &id, "Capstone", json!({})).await;
    assert_eq!(data["exp"]["leveled_up"], json!(true));
    assert_eq!(data["exp"]["level"], json!(2));
    assert_eq!(data["exp"]["exp"], json!(5));
    assert_eq!(data["exp"]["max_exp"], json!(1200));

    let (_, body) = send(&router, "GET", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(body["data"]["level"], json!(2));
    assert_eq!(body["data"]["exp"], json!(5));
}

#[tokio::test]
async fn exp_award_rejects_non_positive_and_unknown_user() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "A").await;

    let (status, _) = send(
        &router,
        "POST",
        &format!("/api/v1/users/{id}/exp"),
        Some(json!({ "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/users/ghost/exp",
        Some(json!({ "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn record_listing_filters_facets_and_paginates() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "B").await;

    create_record(&router, &id, "One", json!({ "date": "2025-04-01" })).await;
    create_record(
        &router,
        &id,
        "Two",
        json!({ "date": "2026-02-01", "category": "CLASS" }),
    )
    .await;
    create_record(
        &router,
        &id,
        "Three",
        json!({ "date": "2026-05-01", "status": "done" }),
    )
    .await;

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/v1/records?userId={id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(3));

    let (_, body) = send(
        &router,
        "GET",
        &format!("/api/v1/records?userId={id}&year=2026"),
        None,
    )
    .await;
    assert_eq!(body["data"]["total"], json!(2));

    let (_, body) = send(
        &router,
        "GET",
        &format!("/api/v1/records?userId={id}&year=2026&category=PROJECT&status=done"),
        None,
    )
    .await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["records"][0]["title"], json!("Three"));

    let (_, body) = send(
        &router,
        "GET",
        &format!("/api/v1/records?userId={id}&limit=2&offset=2"),
        None,
    )
    .await;
    assert_eq!(body["data"]["total"], json!(3));
    assert_eq!(body["data"]["records"].as_array().unwrap().len(), 1);

    // userId is required
    let (status, _) = send(&router, "GET", "/api/v1/records", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn record_validation_and_year_derivation() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "C").await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/records",
        Some(json!({ "userId": id, "title": "X", "category": "HOBBY" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let data = create_record(&router, &id, "Dated", json!({ "date": "2024-11-02" })).await;
    let record_id = data["record"]["id"].as_str().unwrap().to_string();
    assert_eq!(data["record"]["year"], json!("2024"));
    assert_eq!(data["record"]["status"], json!("in progress"));

    // Changing the date re-derives year
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/v1/records/{record_id}"),
        Some(json!({ "date": "2025-01-10" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["year"], json!("2025"));
    assert_eq!(body["data"]["title"], json!("Dated"));

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/v1/records/{record_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/v1/records/{record_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn community_directory_filters_by_role() {
    let (router, _dir) = test_router(true).await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/community",
        Some(json!({ "name": "Sunbae", "role": "mentor" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (name, role, level) in [("Sunbae", "senior", 12), ("Chingu", "friend", 3)] {
        let (status, _) = send(
            &router,
            "POST",
            "/api/v1/community",
            Some(json!({ "name": name, "role": role, "level": level, "tags": ["rust"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&router, "GET", "/api/v1/community", None).await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    // Highest level first
    assert_eq!(list[0]["name"], json!("Sunbae"));

    let (_, body) = send(&router, "GET", "/api/v1/community?role=friend", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&router, "GET", "/api/v1/community?tag=rust", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn resume_base_upserts_per_category() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "D").await;

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/v1/resume-base/{id}"),
        Some(json!({ "category": "strengths", "title": "v1", "content": "first" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let first_id = body["data"]["id"].as_str().unwrap().to_string();

    // Same category overwrites in place
    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/v1/resume-base/{id}"),
        Some(json!({ "category": "strengths", "title": "v2", "content": "second" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"].as_str().unwrap(), first_id);
    assert_eq!(body["data"]["title"], json!("v2"));

    let (_, body) = send(&router, "GET", &format!("/api/v1/resume-base/{id}"), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &router,
        "GET",
        &format!("/api/v1/resume-base/{id}?category=other"),
        None,
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn company_crud_and_search() {
    let (router, _dir) = test_router(true).await;

    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/companies",
        Some(json!({ "name": "Acme", "half": "Q1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/companies",
        Some(json!({
            "name": "Acme Robotics",
            "year": "2026",
            "half": "H1",
            "metadata": { "stack": ["rust", "embedded"] },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let company_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&router, "GET", "/api/v1/companies?q=embedded", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&router, "GET", "/api/v1/companies?year=2025", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(
        &router,
        "PUT",
        &format!("/api/v1/companies/{company_id}"),
        Some(json!({ "half": "H2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["half"], json!("H2"));
    assert_eq!(body["data"]["name"], json!("Acme Robotics"));

    let (status, _) = send(
        &router,
        "DELETE",
        &format!("/api/v1/companies/{company_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn analytics_stats_and_dashboard() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "E").await;

    create_record(&router, &id, "P1", json!({ "date": "2026-03-01" })).await;
    create_record(
        &router,
        &id,
        "T1",
        json!({ "date": "2026-04-01", "category": "TEAMWORK" }),
    )
    .await;
    create_record(&router, &id, "Old", json!({ "date": "2025-05-01" })).await;

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/v1/analytics/stats/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_records"], json!(3));
    assert_eq!(body["data"]["category_counts"]["PROJECT"], json!(2));
    assert_eq!(body["data"]["last_record_date"], json!("2026-04-01"));
    assert_eq!(body["data"]["level_info"]["level"], json!(1));

    let (status, body) = send(
        &router,
        "GET",
        &format!("/api/v1/analytics/dashboard/{id}?year=2026"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Signals cover the whole history; the 2025 record still counts
    assert_eq!(body["data"]["dashboard"]["total_projects"], json!(2));
    assert_eq!(body["data"]["dashboard"]["competency_index"], json!(23.1));
    assert_eq!(body["data"]["dashboard"]["collaboration_level"], json!(1));
    // The recent list is year-scoped, most recent activity first
    let recent = body["data"]["dashboard"]["recent_records"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["title"], json!("T1"));

    let (status, _) = send(&router, "GET", "/api/v1/analytics/stats/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ai_resume_draft_counts_and_echoes_records() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "F").await;
    create_record(&router, &id, "Project X", json!({ "date": "2026-01-01" })).await;

    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/ai/resume",
        Some(json!({
            "userId": id,
            "companyInfo": "Acme",
            "jobType": "backend",
            "question": "Why do you want this role?",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["draft"], json!("가 나 다"));
    assert_eq!(body["data"]["word_count"], json!(3));
    assert_eq!(body["data"]["used_records"][0]["title"], json!("Project X"));
}

#[tokio::test]
async fn ai_endpoints_validate_and_gate_on_configuration() {
    let (router, _dir) = test_router(true).await;
    let id = create_user(&router, "G").await;

    // Required field missing
    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/ai/resume",
        Some(json!({ "userId": id, "jobType": "backend", "question": "Q" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown user
    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/ai/interview",
        Some(json!({ "userId": "ghost", "companyInfo": "Acme" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Interview happy path
    let (status, body) = send(
        &router,
        "POST",
        "/api/v1/ai/interview",
        Some(json!({ "userId": id, "companyInfo": "Acme", "jobType": "backend" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_questions"], json!(2));
    assert_eq!(body["data"]["questions"][0]["question"], json!("q1"));

    // Unconfigured transport short-circuits with 503
    let (router, _dir2) = test_router(false).await;
    let id = create_user(&router, "H").await;
    let (status, _) = send(
        &router,
        "POST",
        "/api/v1/ai/resume",
        Some(json!({
            "userId": id,
            "companyInfo": "Acme",
            "jobType": "backend",
            "question": "Q",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
