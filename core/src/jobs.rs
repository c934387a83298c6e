//! Jobs endpoints.
//!
//! Travis CI API docs: <http://docs.travis-ci.com/api/#jobs>

use tracing::{debug, instrument};

use crate::client::{ApiResponse, TravisClient};
use crate::context::Context;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::options::{JobFilter, JobFindOptions, ListOptions, FILTERED_JOBS_LIMIT};
use crate::query::{resource_path, url_with_options, QueryParams};
use crate::types::{BuildDetails, FindJobsResponse, GetJobResponse, Job};

#[derive(Debug, Clone, Copy)]
pub struct JobsService<'a> {
    client: &'a TravisClient,
}

impl<'a> JobsService<'a> {
    pub(crate) fn new(client: &'a TravisClient) -> Self {
        Self { client }
    }

    /// Fetches the job with the provided id.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn get(&self, ctx: &Context, id: u64) -> Result<ApiResponse<Job>, ApiError> {
        let path = url_with_options(&resource_path("jobs", id, None)?, None)?;
        let resp = self.client.get_json::<GetJobResponse>(ctx, &path)?;
        Ok(resp.map(|r| r.job))
    }

    /// Lists the jobs of a build, in the order the build reports them.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn list_from_build(
        &self,
        ctx: &Context,
        build_id: u64,
    ) -> Result<ApiResponse<Vec<Job>>, ApiError> {
        let path = url_with_options(&resource_path("builds", build_id, None)?, None)?;
        let resp = self.client.get_json::<BuildDetails>(ctx, &path)?;
        Ok(resp.map(|details| details.jobs))
    }

    /// Finds jobs matching `options`. At most one of its filters may be
    /// set; otherwise the call fails before any request is sent.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn find(
        &self,
        ctx: &Context,
        options: Option<&JobFindOptions>,
    ) -> Result<ApiResponse<Vec<Job>>, ApiError> {
        if let Some(options) = options {
            if let Some(filter) = options.validate()? {
                if filter.limits_results() {
                    debug!(limit = FILTERED_JOBS_LIMIT, "server caps state/queue filtered results");
                }
            }
        }

        let path = url_with_options("/jobs", options.map(|o| o as &dyn QueryParams))?;
        let resp = self.client.get_json::<FindJobsResponse>(ctx, &path)?;
        Ok(resp.map(|r| r.jobs))
    }

    /// Typed form of `find`: exactly one filter plus pagination.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn find_by(
        &self,
        ctx: &Context,
        filter: JobFilter,
        list: ListOptions,
    ) -> Result<ApiResponse<Vec<Job>>, ApiError> {
        let options = JobFindOptions::from(filter).with_list(list);
        self.find(ctx, Some(&options))
    }

    /// Cancels the job. Acceptance is signalled only by the returned status.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn cancel(&self, ctx: &Context, id: u64) -> Result<HttpResponse, ApiError> {
        let path = url_with_options(&resource_path("jobs", id, Some("cancel"))?, None)?;
        self.client.post_action(ctx, &path)
    }

    /// Restarts the job. Acceptance is signalled only by the returned status.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn restart(&self, ctx: &Context, id: u64) -> Result<HttpResponse, ApiError> {
        let path = url_with_options(&resource_path("jobs", id, Some("restart"))?, None)?;
        self.client.post_action(ctx, &path)
    }
}
