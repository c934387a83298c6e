//! Blocking client for the Travis CI REST API.
//!
//! # Overview
//! Typed operations over jobs, builds and build requests. Each operation
//! validates its input, builds one `HttpRequest`, runs it through a
//! `Transport` under a caller-supplied `Context`, and unwraps the JSON
//! envelope of the response.
//!
//! # Design
//! - `TravisClient` is stateless apart from its configuration and is cheap
//!   to clone; resource services borrow it (`client.jobs()`,
//!   `client.builds()`, `client.requests()`).
//! - The status code is data. Operations return `ApiResponse<T>` carrying
//!   the decoded value (2xx only) and the raw response; `ApiError` is
//!   reserved for validation, transport, cancellation and decode failures.
//! - I/O sits behind the `Transport` trait. `UreqTransport` is the default;
//!   tests substitute recording transports.
//!
//! ```no_run
//! use travis_core::{ClientConfig, Context, JobFilter, ListOptions, TravisClient};
//!
//! let client = TravisClient::new(ClientConfig::from_env())?;
//! let ctx = Context::with_timeout(std::time::Duration::from_secs(10));
//! let passed = client
//!     .jobs()
//!     .find_by(&ctx, JobFilter::State("passed".into()), ListOptions::default())?;
//! if passed.status() == 200 {
//!     println!("{} passed jobs", passed.value.unwrap_or_default().len());
//! }
//! # Ok::<(), travis_core::ApiError>(())
//! ```

pub mod builds;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod jobs;
pub mod options;
pub mod query;
pub mod requests;
pub mod transport;
pub mod types;

pub use builds::BuildsService;
pub use client::{ApiResponse, TravisClient};
pub use config::ClientConfig;
pub use context::Context;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use jobs::JobsService;
pub use options::{JobFilter, JobFindOptions, ListOptions, RequestListOptions};
pub use requests::RequestsService;
pub use transport::{Transport, UreqTransport};
pub use types::{Build, BuildDetails, Commit, CreateRequestOption, Job, RepoRef, Request};
