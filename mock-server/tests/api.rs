use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn post(uri: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn ids(jobs: &Value) -> Vec<u64> {
    jobs.as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_u64().unwrap())
        .collect()
}

// --- jobs ---

#[tokio::test]
async fn get_job_wraps_in_envelope() {
    let resp = app().oneshot(get("/jobs/1001")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["job"]["id"], 1001);
    assert_eq!(body["job"]["state"], "passed");
}

#[tokio::test]
async fn get_job_not_found() {
    let resp = app().oneshot(get("/jobs/9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["file"], "not found");
}

#[tokio::test]
async fn get_job_bad_id_returns_400() {
    let resp = app().oneshot(get("/jobs/not-a-number")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn find_jobs_by_state() {
    let resp = app().oneshot(get("/jobs?state=passed")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(ids(&body["jobs"]), vec![1005, 1001]);
}

#[tokio::test]
async fn find_jobs_by_ids_keeps_requested_order() {
    let resp = app().oneshot(get("/jobs?ids=1004&ids=1001&ids=77")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ids(&body_json(resp).await["jobs"]), vec![1004, 1001]);
}

#[tokio::test]
async fn find_jobs_by_queue_with_pagination() {
    let resp = app()
        .oneshot(get("/jobs?queue=builds.linux&after_number=51"))
        .await
        .unwrap();
    assert_eq!(ids(&body_json(resp).await["jobs"]), vec![1002, 1001]);
}

#[tokio::test]
async fn after_number_compares_build_numbers_not_ids() {
    // Jobs of build 50 are older than build 51; build 7 lives in another repo.
    let resp = app().oneshot(get("/jobs?after_number=50")).await.unwrap();
    assert_eq!(ids(&body_json(resp).await["jobs"]), vec![1005]);

    let resp = app().oneshot(get("/jobs?after_number=1000")).await.unwrap();
    assert_eq!(ids(&body_json(resp).await["jobs"]).len(), 5);
}

#[tokio::test]
async fn find_jobs_rejects_non_numeric_ids() {
    let resp = app().oneshot(get("/jobs?ids=abc")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_running_job_returns_202() {
    let resp = app().oneshot(post("/jobs/1003/cancel")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn cancel_finished_job_returns_409() {
    let resp = app().oneshot(post("/jobs/1001/cancel")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn restart_running_job_returns_409() {
    let resp = app().oneshot(post("/jobs/1003/restart")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// --- builds ---

#[tokio::test]
async fn get_build_embeds_commit_and_jobs() {
    let resp = app().oneshot(get("/builds/100")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["build"]["job_ids"], serde_json::json!([1001, 1002]));
    assert_eq!(body["commit"]["branch"], "master");
    assert_eq!(ids(&body["jobs"]), vec![1001, 1002]);
}

#[tokio::test]
async fn cancel_finished_build_returns_409() {
    let resp = app().oneshot(post("/builds/100/cancel")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// --- requests ---

#[tokio::test]
async fn create_request_for_unknown_repo_returns_404() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/repos/octo%2Fmissing/requests",
            r#"{"request":{"branch":"master"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_request_with_empty_branch_returns_400() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/repos/1/requests",
            r#"{"request":{"branch":" "}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_request_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/repos/1/requests", r#"{"branch":"master"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn request_of_another_repo_is_not_found() {
    let resp = app().oneshot(get("/repos/2/requests/300")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- stateful flows ---

#[tokio::test]
async fn request_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create by slug
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/repos/octo%2Fwidgets/requests",
            r#"{"request":{"message":"test","branch":"master"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = body_json(resp).await;
    let id = body["request"]["id"].as_u64().unwrap();
    assert_eq!(id, 301);
    assert_eq!(body["request"]["message"], "test");
    assert_eq!(body["remaining_requests"], 49);

    // find by repository id
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/repos/1/requests/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["request"]["id"], id);
    assert_eq!(body["request"]["branch"], "master");

    // list: newest first, limited
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/repos/octo%2Fwidgets/requests?limit=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(ids(&body["requests"]), vec![id]);

    // list older than the new one
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/repos/1/requests?older_than={id}")))
        .await
        .unwrap();
    assert_eq!(ids(&body_json(resp).await["requests"]), vec![300]);
}

#[tokio::test]
async fn cancel_then_restart_build() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(post("/builds/101/cancel"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/builds/101"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["build"]["state"], "canceled");
    assert_eq!(body["jobs"][0]["state"], "canceled");
    assert_eq!(body["jobs"][1]["state"], "canceled");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(post("/builds/101/restart"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/jobs/1003"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["job"]["state"], "created");
}
