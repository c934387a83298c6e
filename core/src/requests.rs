//! Build-request endpoints: triggering builds through the API and looking
//! up the requests a repository received.
//!
//! Travis CI API docs: <https://docs.travis-ci.com/user/triggering-builds/>

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::client::{ApiResponse, TravisClient};
use crate::context::Context;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::options::RequestListOptions;
use crate::query::{url_with_options, QueryParams};
use crate::types::{
    CreateRequestBody, CreateRequestOption, GetRequestResponse, ListRequestsResponse, RepoRef,
    Request,
};

#[derive(Debug, Deserialize)]
struct CreateRequestResponse {
    request: Request,
    #[serde(default)]
    remaining_requests: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestsService<'a> {
    client: &'a TravisClient,
}

impl<'a> RequestsService<'a> {
    pub(crate) fn new(client: &'a TravisClient) -> Self {
        Self { client }
    }

    /// Asks Travis to build `option.branch` of `repo`.
    ///
    /// The server answers 202 once the request is queued; the status is not
    /// checked here.
    #[instrument(level = "debug", skip(self, ctx, option), fields(branch = %option.branch))]
    pub fn create(
        &self,
        ctx: &Context,
        repo: &RepoRef,
        option: &CreateRequestOption,
    ) -> Result<ApiResponse<Request>, ApiError> {
        if option.branch.trim().is_empty() {
            return Err(ApiError::Validation("branch must not be empty".to_string()));
        }
        let path = url_with_options(&repo_path(repo, None)?, None)?;
        let request = self.client.new_json_request(
            HttpMethod::Post,
            &path,
            &CreateRequestBody { request: option },
        )?;
        let resp = self.client.execute::<CreateRequestResponse>(ctx, &request)?;
        if let Some(remaining) = resp.value.as_ref().and_then(|r| r.remaining_requests) {
            debug!(remaining_requests = remaining, "build request accepted");
        }
        Ok(resp.map(|r| r.request))
    }

    /// Fetches one request of `repo`.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn find(
        &self,
        ctx: &Context,
        repo: &RepoRef,
        id: u64,
    ) -> Result<ApiResponse<Request>, ApiError> {
        if id == 0 {
            return Err(ApiError::Validation("request id must be positive".to_string()));
        }
        let path = url_with_options(&repo_path(repo, Some(id))?, None)?;
        let resp = self.client.get_json::<GetRequestResponse>(ctx, &path)?;
        Ok(resp.map(|r| r.request))
    }

    /// Lists the most recent requests of `repo`.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn list(
        &self,
        ctx: &Context,
        repo: &RepoRef,
        options: Option<&RequestListOptions>,
    ) -> Result<ApiResponse<Vec<Request>>, ApiError> {
        let path = url_with_options(
            &repo_path(repo, None)?,
            options.map(|o| o as &dyn QueryParams),
        )?;
        let resp = self.client.get_json::<ListRequestsResponse>(ctx, &path)?;
        Ok(resp.map(|r| r.requests))
    }
}

/// `/repos/<repo>/requests[/<id>]`.
fn repo_path(repo: &RepoRef, id: Option<u64>) -> Result<String, ApiError> {
    match repo {
        RepoRef::Id(0) => {
            return Err(ApiError::Validation("repository id must be positive".to_string()))
        }
        RepoRef::Slug(slug) if !is_slug(slug) => {
            return Err(ApiError::Validation(format!(
                "repository slug must look like owner/name: {slug:?}"
            )))
        }
        _ => {}
    }
    let base = format!("/repos/{}/requests", repo.path_segment());
    Ok(match id {
        Some(id) => format!("{base}/{id}"),
        None => base,
    })
}

fn is_slug(slug: &str) -> bool {
    match slug.split_once('/') {
        Some((owner, name)) => !owner.is_empty() && !name.is_empty() && !name.contains('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_paths_by_id_and_slug() {
        assert_eq!(repo_path(&RepoRef::Id(7), None).unwrap(), "/repos/7/requests");
        assert_eq!(
            repo_path(&RepoRef::from("octo/widgets"), Some(3)).unwrap(),
            "/repos/octo%2Fwidgets/requests/3"
        );
    }

    #[test]
    fn malformed_repositories_are_rejected() {
        for repo in [
            RepoRef::Id(0),
            RepoRef::from("widgets"),
            RepoRef::from("/widgets"),
            RepoRef::from("octo/"),
            RepoRef::from("a/b/c"),
        ] {
            assert!(
                matches!(repo_path(&repo, None), Err(ApiError::Validation(_))),
                "{repo:?}"
            );
        }
    }
}
