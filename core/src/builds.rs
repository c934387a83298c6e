//! Builds endpoints.
//!
//! Travis CI API docs: <http://docs.travis-ci.com/api/#builds>

use tracing::instrument;

use crate::client::{ApiResponse, TravisClient};
use crate::context::Context;
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::query::{resource_path, url_with_options};
use crate::types::BuildDetails;

#[derive(Debug, Clone, Copy)]
pub struct BuildsService<'a> {
    client: &'a TravisClient,
}

impl<'a> BuildsService<'a> {
    pub(crate) fn new(client: &'a TravisClient) -> Self {
        Self { client }
    }

    /// Fetches a build together with its commit and jobs.
    #[instrument(level = "debug", skip(self, ctx))]
    pub fn get(&self, ctx: &Context, id: u64) -> Result<ApiResponse<BuildDetails>, ApiError> {
        let path = url_with_options(&resource_path("builds", id, None)?, None)?;
        self.client.get_json(ctx, &path)
    }

    #[instrument(level = "debug", skip(self, ctx))]
    pub fn cancel(&self, ctx: &Context, id: u64) -> Result<HttpResponse, ApiError> {
        let path = url_with_options(&resource_path("builds", id, Some("cancel"))?, None)?;
        self.client.post_action(ctx, &path)
    }

    #[instrument(level = "debug", skip(self, ctx))]
    pub fn restart(&self, ctx: &Context, id: u64) -> Result<HttpResponse, ApiError> {
        let path = url_with_options(&resource_path("builds", id, Some("restart"))?, None)?;
        self.client.post_action(ctx, &path)
    }
}
