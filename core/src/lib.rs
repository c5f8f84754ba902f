//! Typed client binding for the Crisp "people" REST API surface.
//!
//! # Overview
//! Covers the people (end-user/contact profile) resources of one website:
//! aggregate statistics, segments, profile search with filters, profile
//! CRUD and existence checks, linked conversations, and bulk export.
//!
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `PeopleClient` is stateless — it holds only `base_url`.
//! - Each endpoint is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - DTOs mirror the vendor JSON schema with optional fields omitted (not
//!   null-written) when unset; they are defined independently from the
//!   mock-server crate, and integration tests catch schema drift.
//! - No retries, no caching, no local state: a transport or status failure
//!   is reported once and immediately.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::PeopleClient;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{
    Activity, Company, CompanyMetrics, Coordinates, Employment, Geolocation, PeopleFilter,
    PeopleProfile, PeopleProfileCard, PeopleProfileUpdateCard, PeopleSegment, PeopleStatistics,
    Person, SocialProfile,
};
