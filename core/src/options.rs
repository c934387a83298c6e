//! Option records accepted by the list and find endpoints.
//!
//! # Design
//! `GET /jobs` accepts three filters that the API treats as mutually
//! exclusive. `JobFilter` expresses "exactly one filter" as an enum so typed
//! callers cannot build an invalid combination. `JobFindOptions` is the
//! record form: callers may set any field, and `validate` rejects a record
//! with more than one filter before a request is built. Pagination lives in
//! `ListOptions` and never counts as a filter.

use crate::error::ApiError;
use crate::query::{QueryParam, QueryParams};

/// Filtering by state or queue caps the server-side result at this many
/// jobs. The client does not enforce it.
pub const FILTERED_JOBS_LIMIT: usize = 250;

/// Pagination shared by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only return records numbered below this value.
    pub after_number: Option<u64>,
}

impl QueryParams for ListOptions {
    fn query_pairs(&self) -> Vec<QueryParam> {
        let mut pairs = Vec::new();
        if let Some(after) = self.after_number {
            pairs.push(("after_number", after.to_string()));
        }
        pairs
    }
}

/// The single active filter of a `GET /jobs` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFilter {
    Ids(Vec<u64>),
    State(String),
    Queue(String),
}

impl JobFilter {
    /// Whether the server truncates the result at `FILTERED_JOBS_LIMIT`.
    pub fn limits_results(&self) -> bool {
        matches!(self, JobFilter::State(_) | JobFilter::Queue(_))
    }
}

/// Parameters of `JobsService::find`. At most one of `ids`, `state` and
/// `queue` may be set; if `state` or `queue` is set, a maximum of 250 jobs
/// is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFindOptions {
    pub list: ListOptions,
    pub ids: Vec<u64>,
    pub state: Option<String>,
    pub queue: Option<String>,
}

impl JobFindOptions {
    /// Number of filter fields holding a non-default value. Empty strings
    /// and empty id lists count as unset.
    pub fn filter_count(&self) -> usize {
        [
            !self.ids.is_empty(),
            is_set(&self.state),
            is_set(&self.queue),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }

    pub fn is_valid(&self) -> bool {
        self.filter_count() <= 1
    }

    /// Returns the active filter, `None` when no filter is set.
    pub fn validate(&self) -> Result<Option<JobFilter>, ApiError> {
        if !self.is_valid() {
            return Err(ApiError::Validation(format!(
                "{} mutually exclusive job filters set; provide at most one of ids, state, queue",
                self.filter_count()
            )));
        }
        let filter = if !self.ids.is_empty() {
            Some(JobFilter::Ids(self.ids.clone()))
        } else if let Some(state) = self.state.as_ref().filter(|s| !s.is_empty()) {
            Some(JobFilter::State(state.clone()))
        } else {
            self.queue
                .as_ref()
                .filter(|q| !q.is_empty())
                .map(|q| JobFilter::Queue(q.clone()))
        };
        Ok(filter)
    }

    pub fn with_list(mut self, list: ListOptions) -> Self {
        self.list = list;
        self
    }
}

impl From<JobFilter> for JobFindOptions {
    fn from(filter: JobFilter) -> Self {
        let mut options = JobFindOptions::default();
        match filter {
            JobFilter::Ids(ids) => options.ids = ids,
            JobFilter::State(state) => options.state = Some(state),
            JobFilter::Queue(queue) => options.queue = Some(queue),
        }
        options
    }
}

impl QueryParams for JobFindOptions {
    fn query_pairs(&self) -> Vec<QueryParam> {
        let mut pairs: Vec<QueryParam> =
            self.ids.iter().map(|id| ("ids", id.to_string())).collect();
        if let Some(state) = self.state.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("state", state.clone()));
        }
        if let Some(queue) = self.queue.as_ref().filter(|q| !q.is_empty()) {
            pairs.push(("queue", queue.clone()));
        }
        pairs.extend(self.list.query_pairs());
        pairs
    }
}

/// Parameters of `RequestsService::list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestListOptions {
    /// Maximum number of requests to return.
    pub limit: Option<u32>,
    /// Only return requests with an id lower than this one.
    pub older_than: Option<u64>,
}

impl QueryParams for RequestListOptions {
    fn query_pairs(&self) -> Vec<QueryParam> {
        let mut pairs = Vec::new();
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(older_than) = self.older_than {
            pairs.push(("older_than", older_than.to_string()));
        }
        pairs
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::url_with_options;

    fn state(s: &str) -> JobFindOptions {
        JobFindOptions {
            state: Some(s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_options_are_valid() {
        let options = JobFindOptions::default();
        assert_eq!(options.filter_count(), 0);
        assert!(options.is_valid());
        assert_eq!(options.validate().unwrap(), None);
    }

    #[test]
    fn single_filter_is_valid() {
        let by_ids = JobFindOptions {
            ids: vec![1, 2],
            ..Default::default()
        };
        let by_queue = JobFindOptions {
            queue: Some("builds.linux".to_string()),
            ..Default::default()
        };
        assert_eq!(by_ids.validate().unwrap(), Some(JobFilter::Ids(vec![1, 2])));
        assert_eq!(
            state("passed").validate().unwrap(),
            Some(JobFilter::State("passed".to_string()))
        );
        assert_eq!(
            by_queue.validate().unwrap(),
            Some(JobFilter::Queue("builds.linux".to_string()))
        );
    }

    #[test]
    fn two_or_more_filters_are_invalid() {
        let two = JobFindOptions {
            ids: vec![7],
            state: Some("passed".to_string()),
            ..Default::default()
        };
        let three = JobFindOptions {
            queue: Some("builds.linux".to_string()),
            ..two.clone()
        };
        assert!(!two.is_valid());
        assert!(!three.is_valid());
        assert_eq!(three.filter_count(), 3);
        assert!(matches!(two.validate(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn empty_values_do_not_count_as_filters() {
        let options = JobFindOptions {
            ids: Vec::new(),
            state: Some(String::new()),
            queue: Some("builds.linux".to_string()),
            ..Default::default()
        };
        assert_eq!(options.filter_count(), 1);
        assert!(options.is_valid());
    }

    #[test]
    fn pagination_is_not_a_filter() {
        let options = state("passed").with_list(ListOptions {
            after_number: Some(10),
        });
        assert!(options.is_valid());
        assert_eq!(
            url_with_options("/jobs", Some(&options)).unwrap(),
            "/jobs?state=passed&after_number=10"
        );
    }

    #[test]
    fn state_only_produces_exactly_one_pair() {
        let pairs = state("passed").query_pairs();
        assert_eq!(pairs, vec![("state", "passed".to_string())]);
    }

    #[test]
    fn every_filter_converts_to_a_valid_record() {
        for filter in [
            JobFilter::Ids(vec![3, 4]),
            JobFilter::State("failed".to_string()),
            JobFilter::Queue("builds.mac".to_string()),
        ] {
            let options = JobFindOptions::from(filter.clone());
            assert_eq!(options.validate().unwrap(), Some(filter));
        }
    }

    #[test]
    fn only_state_and_queue_limit_results() {
        assert!(JobFilter::State("passed".to_string()).limits_results());
        assert!(JobFilter::Queue("q".to_string()).limits_results());
        assert!(!JobFilter::Ids(vec![1]).limits_results());
    }

    #[test]
    fn request_list_options_skip_unset_fields() {
        let options = RequestListOptions {
            limit: Some(25),
            older_than: None,
        };
        assert_eq!(options.query_pairs(), vec![("limit", "25".to_string())]);
        assert!(RequestListOptions::default().query_pairs().is_empty());
    }
}
