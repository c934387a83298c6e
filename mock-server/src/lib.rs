//! In-memory stand-in for the subset of the Travis CI API the client uses.
//!
//! The store is seeded with two repositories, three builds and their jobs
//! so read endpoints work without setup. Wire shapes follow the Travis
//! envelopes: `{"job": {...}}`, `{"jobs": [...]}`, `{"request": {...}}`.
//! Unknown resources answer 404 `{"file":"not found"}`; actions that do not
//! apply to the current state answer 409.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

/// Jobs filtered by state or queue are capped at this many.
pub const FILTERED_JOBS_LIMIT: usize = 250;

const DEFAULT_REQUEST_LIMIT: usize = 25;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: u64,
    pub build_id: u64,
    pub repository_id: u64,
    pub number: String,
    pub state: String,
    pub queue: String,
    pub allow_failure: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Build {
    pub id: u64,
    pub repository_id: u64,
    pub commit_id: u64,
    pub number: String,
    pub state: String,
    pub job_ids: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Commit {
    pub id: u64,
    pub sha: String,
    pub branch: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: u64,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: u64,
    pub repository_id: u64,
    pub message: Option<String>,
    pub branch: String,
    pub event_type: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub request: CreateRequestInput,
}

#[derive(Deserialize)]
pub struct CreateRequestInput {
    #[serde(default)]
    pub message: Option<String>,
    pub branch: String,
    #[serde(default)]
    pub config: Option<Value>,
}

#[derive(Deserialize)]
pub struct RequestListQuery {
    pub limit: Option<usize>,
    pub older_than: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub repos: Vec<Repository>,
    pub builds: BTreeMap<u64, Build>,
    pub commits: BTreeMap<u64, Commit>,
    pub jobs: BTreeMap<u64, Job>,
    pub requests: BTreeMap<u64, Request>,
    pub next_request_id: u64,
    /// Build requests the API still accepts before answering 429.
    pub remaining_requests: u32,
}

impl Store {
    pub fn seeded() -> Self {
        let mut store = Store {
            repos: vec![
                Repository {
                    id: 1,
                    slug: "octo/widgets".to_string(),
                },
                Repository {
                    id: 2,
                    slug: "octo/gadgets".to_string(),
                },
            ],
            next_request_id: 301,
            remaining_requests: 50,
            ..Store::default()
        };

        store.add_build(1, 100, 500, "50", "failed", "master");
        store.add_job(100, 1001, "50.1", "passed", "builds.linux");
        store.add_job(100, 1002, "50.2", "failed", "builds.linux");

        store.add_build(1, 101, 501, "51", "started", "feature");
        store.add_job(101, 1003, "51.1", "started", "builds.linux");
        store.add_job(101, 1004, "51.2", "queued", "builds.mac");

        store.add_build(2, 102, 502, "7", "passed", "master");
        store.add_job(102, 1005, "7.1", "passed", "builds.mac");

        store.requests.insert(
            300,
            Request {
                id: 300,
                repository_id: 1,
                message: Some("seed".to_string()),
                branch: "master".to_string(),
                event_type: "api".to_string(),
                result: "approved".to_string(),
                config: None,
            },
        );
        store
    }

    fn add_build(
        &mut self,
        repo: u64,
        id: u64,
        commit: u64,
        number: &str,
        state: &str,
        branch: &str,
    ) {
        self.commits.insert(
            commit,
            Commit {
                id: commit,
                sha: format!("{commit:040x}"),
                branch: branch.to_string(),
                message: format!("build {number}"),
            },
        );
        self.builds.insert(
            id,
            Build {
                id,
                repository_id: repo,
                commit_id: commit,
                number: number.to_string(),
                state: state.to_string(),
                job_ids: Vec::new(),
            },
        );
    }

    fn add_job(&mut self, build_id: u64, id: u64, number: &str, state: &str, queue: &str) {
        let Some(build) = self.builds.get_mut(&build_id) else {
            return;
        };
        build.job_ids.push(id);
        self.jobs.insert(
            id,
            Job {
                id,
                build_id,
                repository_id: build.repository_id,
                number: number.to_string(),
                state: state.to_string(),
                queue: queue.to_string(),
                allow_failure: false,
            },
        );
    }

    /// Resolves a `{repo}` path parameter: a numeric id or an `owner/name`
    /// slug (already percent-decoded by the router).
    fn repo(&self, key: &str) -> Option<&Repository> {
        match key.parse::<u64>() {
            Ok(id) => self.repos.iter().find(|r| r.id == id),
            Err(_) => self.repos.iter().find(|r| r.slug == key),
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/jobs", get(find_jobs))
        .route("/jobs/{id}", get(get_job))
        .route("/jobs/{id}/cancel", post(cancel_job))
        .route("/jobs/{id}/restart", post(restart_job))
        .route("/builds/{id}", get(get_build))
        .route("/builds/{id}/cancel", post(cancel_build))
        .route("/builds/{id}/restart", post(restart_build))
        .route("/repos/{repo}/requests", get(list_requests).post(create_request))
        .route("/repos/{repo}/requests/{id}", get(get_request))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Build number a job number like `51.2` belongs to.
fn build_number(job_number: &str) -> Option<u64> {
    job_number.split('.').next()?.parse().ok()
}

fn is_finished(state: &str) -> bool {
    matches!(state, "passed" | "failed" | "errored" | "canceled")
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"file": "not found"}))).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

async fn get_job(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    match store.jobs.get(&id) {
        Some(job) => Json(json!({ "job": job })).into_response(),
        None => not_found(),
    }
}

async fn find_jobs(State(db): State<Db>, Query(params): Query<Vec<(String, String)>>) -> Response {
    let mut ids = Vec::new();
    let mut state = None;
    let mut queue = None;
    let mut after_number = None;
    for (key, value) in params {
        match key.as_str() {
            "ids" => match value.parse::<u64>() {
                Ok(id) => ids.push(id),
                Err(_) => return error(StatusCode::BAD_REQUEST, "ids must be numeric"),
            },
            "state" => state = Some(value),
            "queue" => queue = Some(value),
            "after_number" => match value.parse::<u64>() {
                Ok(n) => after_number = Some(n),
                Err(_) => return error(StatusCode::BAD_REQUEST, "after_number must be numeric"),
            },
            _ => {}
        }
    }

    let store = db.read().await;
    let mut jobs: Vec<Job> = if ids.is_empty() {
        store.jobs.values().rev().cloned().collect()
    } else {
        ids.iter().filter_map(|id| store.jobs.get(id).cloned()).collect()
    };
    if let Some(state) = &state {
        jobs.retain(|j| &j.state == state);
    }
    if let Some(queue) = &queue {
        jobs.retain(|j| &j.queue == queue);
    }
    if let Some(after) = after_number {
        jobs.retain(|j| build_number(&j.number).is_some_and(|n| n < after));
    }
    if state.is_some() || queue.is_some() {
        jobs.truncate(FILTERED_JOBS_LIMIT);
    }
    Json(json!({ "jobs": jobs })).into_response()
}

async fn cancel_job(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let mut store = db.write().await;
    let Some(job) = store.jobs.get_mut(&id) else {
        return not_found();
    };
    if is_finished(&job.state) {
        return error(StatusCode::CONFLICT, "job is not cancelable");
    }
    job.state = "canceled".to_string();
    info!(job_id = id, "job canceled");
    StatusCode::ACCEPTED.into_response()
}

async fn restart_job(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let mut store = db.write().await;
    let Some(job) = store.jobs.get_mut(&id) else {
        return not_found();
    };
    if !is_finished(&job.state) {
        return error(StatusCode::CONFLICT, "job is not restartable");
    }
    job.state = "created".to_string();
    info!(job_id = id, "job restarted");
    StatusCode::ACCEPTED.into_response()
}

async fn get_build(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let store = db.read().await;
    let Some(build) = store.builds.get(&id) else {
        return not_found();
    };
    let jobs: Vec<&Job> = build.job_ids.iter().filter_map(|j| store.jobs.get(j)).collect();
    let commit = store.commits.get(&build.commit_id);
    Json(json!({ "build": build, "commit": commit, "jobs": jobs })).into_response()
}

async fn cancel_build(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let mut store = db.write().await;
    let Some(build) = store.builds.get_mut(&id) else {
        return not_found();
    };
    if is_finished(&build.state) {
        return error(StatusCode::CONFLICT, "build is not cancelable");
    }
    build.state = "canceled".to_string();
    let job_ids = build.job_ids.clone();
    for job_id in job_ids {
        if let Some(job) = store.jobs.get_mut(&job_id) {
            if !is_finished(&job.state) {
                job.state = "canceled".to_string();
            }
        }
    }
    info!(build_id = id, "build canceled");
    StatusCode::ACCEPTED.into_response()
}

async fn restart_build(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    let mut store = db.write().await;
    let Some(build) = store.builds.get_mut(&id) else {
        return not_found();
    };
    if !is_finished(&build.state) {
        return error(StatusCode::CONFLICT, "build is not restartable");
    }
    build.state = "created".to_string();
    let job_ids = build.job_ids.clone();
    for job_id in job_ids {
        if let Some(job) = store.jobs.get_mut(&job_id) {
            job.state = "created".to_string();
        }
    }
    info!(build_id = id, "build restarted");
    StatusCode::ACCEPTED.into_response()
}

async fn create_request(
    State(db): State<Db>,
    Path(repo): Path<String>,
    Json(input): Json<CreateRequest>,
) -> Response {
    let mut store = db.write().await;
    let Some(repository_id) = store.repo(&repo).map(|r| r.id) else {
        return not_found();
    };
    if input.request.branch.trim().is_empty() {
        return error(StatusCode::BAD_REQUEST, "branch must not be empty");
    }
    if store.remaining_requests == 0 {
        return error(StatusCode::TOO_MANY_REQUESTS, "request limit reached");
    }

    let id = store.next_request_id;
    store.next_request_id += 1;
    store.remaining_requests -= 1;
    let request = Request {
        id,
        repository_id,
        message: input.request.message,
        branch: input.request.branch,
        event_type: "api".to_string(),
        result: "pending".to_string(),
        config: input.request.config,
    };
    store.requests.insert(id, request.clone());
    info!(request_id = id, repository_id, "build request created");

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "request": request,
            "remaining_requests": store.remaining_requests,
        })),
    )
        .into_response()
}

async fn get_request(
    State(db): State<Db>,
    Path((repo, id)): Path<(String, u64)>,
) -> Response {
    let store = db.read().await;
    let Some(repository_id) = store.repo(&repo).map(|r| r.id) else {
        return not_found();
    };
    match store.requests.get(&id) {
        Some(request) if request.repository_id == repository_id => {
            Json(json!({ "request": request })).into_response()
        }
        _ => not_found(),
    }
}

async fn list_requests(
    State(db): State<Db>,
    Path(repo): Path<String>,
    Query(query): Query<RequestListQuery>,
) -> Response {
    let store = db.read().await;
    let Some(repository_id) = store.repo(&repo).map(|r| r.id) else {
        return not_found();
    };
    let requests: Vec<&Request> = store
        .requests
        .values()
        .rev()
        .filter(|r| r.repository_id == repository_id)
        .filter(|r| query.older_than.map_or(true, |older| r.id < older))
        .take(query.limit.unwrap_or(DEFAULT_REQUEST_LIMIT))
        .collect();
    Json(json!({ "requests": requests })).into_response()
}
