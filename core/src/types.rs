//! Travis CI records and the JSON envelopes that wrap them on the wire.
//!
//! # Design
//! Records are defined by the remote API, so every field the API may omit
//! is optional and unknown fields are ignored. Envelope types exist only to
//! unwrap one level of nesting (`{"job": {...}}`, `{"jobs": [...]}`) and are
//! not exposed.

use serde::{Deserialize, Serialize};

use crate::query::encode_segment;

/// A build job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub build_id: Option<u64>,
    #[serde(default)]
    pub repository_id: Option<u64>,
    #[serde(default)]
    pub commit_id: Option<u64>,
    #[serde(default)]
    pub log_id: Option<u64>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub allow_failure: bool,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    /// The job's `.travis.yml` configuration as sent by the API.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

/// A build, as embedded in `GET /builds/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Build {
    pub id: u64,
    #[serde(default)]
    pub repository_id: Option<u64>,
    #[serde(default)]
    pub commit_id: Option<u64>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pull_request: bool,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub job_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub id: u64,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub committed_at: Option<String>,
    #[serde(default)]
    pub compare_url: Option<String>,
}

/// Full payload of `GET /builds/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildDetails {
    pub build: Build,
    #[serde(default)]
    pub commit: Option<Commit>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// A build request: the record Travis keeps for every push, pull request or
/// API call that may trigger a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: u64,
    #[serde(default)]
    pub repository_id: Option<u64>,
    #[serde(default)]
    pub commit_id: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    /// `approved`, `rejected` or `pending` once processed.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Payload of `POST /repos/{repo}/requests`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateRequestOption {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub message: String,
    pub branch: String,
    /// Configuration merged into the repository's `.travis.yml`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub config: Option<serde_json::Value>,
}

/// A repository addressed by numeric id or by `owner/name` slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRef {
    Id(u64),
    Slug(String),
}

impl RepoRef {
    /// The repository as a single encoded path segment.
    pub fn path_segment(&self) -> String {
        match self {
            RepoRef::Id(id) => id.to_string(),
            RepoRef::Slug(slug) => encode_segment(slug),
        }
    }
}

impl From<u64> for RepoRef {
    fn from(id: u64) -> Self {
        RepoRef::Id(id)
    }
}

impl From<&str> for RepoRef {
    fn from(slug: &str) -> Self {
        RepoRef::Slug(slug.to_string())
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct GetJobResponse {
    pub job: Job,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindJobsResponse {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetRequestResponse {
    pub request: Request,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListRequestsResponse {
    pub requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRequestBody<'a> {
    pub request: &'a CreateRequestOption,
}
