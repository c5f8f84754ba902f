//! Stateless HTTP request builder and response parser for the Crisp "people"
//! API surface.
//!
//! # Design
//! `PeopleClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! caller executes the actual HTTP round-trip, keeping the core deterministic
//! and free of I/O dependencies.
//!
//! Website and people identifiers are opaque strings substituted verbatim
//! into the path. Responses wrap the payload in a `{"data": ...}` envelope;
//! single-resource parses return `Option<T>` (absent `data` maps to `None`),
//! collection parses return a `Vec` (absent `data` maps to empty).

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    PeopleFilter, PeopleProfile, PeopleProfileUpdateCard, PeopleSegment, PeopleStatistics,
};

/// Response envelope used by every endpoint: `{"data": ...}` with the payload
/// omitted when the server has nothing to return.
#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: Option<T>,
}

/// Synchronous, stateless client for the people endpoints of one Crisp
/// website.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network. The caller is responsible for executing the HTTP
/// round-trip between `build_*` and `parse_*`.
#[derive(Debug, Clone)]
pub struct PeopleClient {
    base_url: String,
}

impl PeopleClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, path: String) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path,
            headers: Vec::new(),
            body: None,
        }
    }

    fn with_card(
        &self,
        method: HttpMethod,
        path: String,
        card: &PeopleProfileUpdateCard,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(card)
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method,
            path,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
        })
    }

    /// `GET website/{website_id}/people/stats`
    pub fn build_get_statistics(&self, website_id: &str) -> HttpRequest {
        self.get(format!("{}/website/{website_id}/people/stats", self.base_url))
    }

    pub fn parse_get_statistics(
        &self,
        response: HttpResponse,
    ) -> Result<Option<PeopleStatistics>, ApiError> {
        parse_data(response)
    }

    /// `GET website/{website_id}/people/segments/{page}` — 1-based page.
    pub fn build_list_segments(&self, website_id: &str, page: u32) -> HttpRequest {
        self.get(format!(
            "{}/website/{website_id}/people/segments/{page}",
            self.base_url
        ))
    }

    pub fn parse_list_segments(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<PeopleSegment>, ApiError> {
        parse_list(response)
    }

    /// `GET website/{website_id}/people/profiles/{page}?sort_field=&sort_order=&search_filter=`
    ///
    /// A non-empty filter slice is JSON-encoded as an array and placed,
    /// percent-encoded, in `search_filter`; an empty slice yields an empty
    /// value. A filter that fails to serialize aborts the build with
    /// `ApiError::SerializationError` instead of degrading to an unfiltered
    /// listing.
    pub fn build_list_profiles(
        &self,
        website_id: &str,
        page: u32,
        sort_field: &str,
        sort_order: &str,
        filters: &[PeopleFilter],
    ) -> Result<HttpRequest, ApiError> {
        let filter_json = if filters.is_empty() {
            String::new()
        } else {
            serde_json::to_string(filters)
                .map_err(|e| ApiError::SerializationError(e.to_string()))?
        };

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("sort_field", sort_field)
            .append_pair("sort_order", sort_order)
            .append_pair("search_filter", &filter_json)
            .finish();

        Ok(self.get(format!(
            "{}/website/{website_id}/people/profiles/{page}?{query}",
            self.base_url
        )))
    }

    pub fn parse_list_profiles(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<PeopleProfile>, ApiError> {
        parse_list(response)
    }

    /// `POST website/{website_id}/people/profile`
    pub fn build_add_profile(
        &self,
        website_id: &str,
        card: &PeopleProfileUpdateCard,
    ) -> Result<HttpRequest, ApiError> {
        self.with_card(
            HttpMethod::Post,
            format!("{}/website/{website_id}/people/profile", self.base_url),
            card,
        )
    }

    pub fn parse_add_profile(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    /// `HEAD website/{website_id}/people/profile/{people_id}` — existence is
    /// signaled via HTTP status, no body.
    pub fn build_check_profile_exists(&self, website_id: &str, people_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Head,
            path: format!(
                "{}/website/{website_id}/people/profile/{people_id}",
                self.base_url
            ),
            headers: Vec::new(),
            body: None,
        }
    }

    /// 2xx maps to `true`, 404 to `false`, anything else passes through as
    /// `ApiError::HttpError`.
    pub fn parse_check_profile_exists(&self, response: HttpResponse) -> Result<bool, ApiError> {
        match response.status {
            200..=299 => Ok(true),
            404 => Ok(false),
            status => Err(ApiError::HttpError {
                status,
                body: response.body,
            }),
        }
    }

    /// `GET website/{website_id}/people/profile/{people_id}`
    pub fn build_get_profile(&self, website_id: &str, people_id: &str) -> HttpRequest {
        self.get(format!(
            "{}/website/{website_id}/people/profile/{people_id}",
            self.base_url
        ))
    }

    pub fn parse_get_profile(
        &self,
        response: HttpResponse,
    ) -> Result<Option<PeopleProfile>, ApiError> {
        parse_data(response)
    }

    /// `PUT website/{website_id}/people/profile/{people_id}` — full overwrite:
    /// the card replaces all previous fields.
    pub fn build_save_profile(
        &self,
        website_id: &str,
        people_id: &str,
        card: &PeopleProfileUpdateCard,
    ) -> Result<HttpRequest, ApiError> {
        self.with_card(
            HttpMethod::Put,
            format!(
                "{}/website/{website_id}/people/profile/{people_id}",
                self.base_url
            ),
            card,
        )
    }

    pub fn parse_save_profile(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    /// `PATCH website/{website_id}/people/profile/{people_id}` — partial
    /// update: only fields populated in the card change.
    pub fn build_update_profile(
        &self,
        website_id: &str,
        people_id: &str,
        card: &PeopleProfileUpdateCard,
    ) -> Result<HttpRequest, ApiError> {
        self.with_card(
            HttpMethod::Patch,
            format!(
                "{}/website/{website_id}/people/profile/{people_id}",
                self.base_url
            ),
            card,
        )
    }

    pub fn parse_update_profile(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    /// `DELETE website/{website_id}/people/profile/{people_id}`
    pub fn build_remove_profile(&self, website_id: &str, people_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: format!(
                "{}/website/{website_id}/people/profile/{people_id}",
                self.base_url
            ),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_remove_profile(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }

    /// `GET website/{website_id}/people/conversations/{people_id}/list/{page}`
    pub fn build_list_conversations(
        &self,
        website_id: &str,
        people_id: &str,
        page: u32,
    ) -> HttpRequest {
        self.get(format!(
            "{}/website/{website_id}/people/conversations/{people_id}/list/{page}",
            self.base_url
        ))
    }

    pub fn parse_list_conversations(
        &self,
        response: HttpResponse,
    ) -> Result<Vec<String>, ApiError> {
        parse_list(response)
    }

    /// `POST website/{website_id}/people/export/profiles` — enqueues an
    /// asynchronous export job server-side; the response carries status only.
    pub fn build_export_profiles(&self, website_id: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Post,
            path: format!(
                "{}/website/{website_id}/people/export/profiles",
                self.base_url
            ),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_export_profiles(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_success(&response)
    }
}

/// Unwrap the `{"data": ...}` envelope around a single resource.
fn parse_data<T: DeserializeOwned>(response: HttpResponse) -> Result<Option<T>, ApiError> {
    check_success(&response)?;
    let envelope: DataEnvelope<T> = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    Ok(envelope.data)
}

/// Unwrap the `{"data": [...]}` envelope around a collection.
fn parse_list<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    parse_data(response).map(Option::unwrap_or_default)
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        200..=299 => Ok(()),
        404 => Err(ApiError::NotFound),
        status => Err(ApiError::HttpError {
            status,
            body: response.body.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PeopleClient {
        PeopleClient::new("https://api.crisp.chat/v1")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_get_statistics_produces_correct_request() {
        let req = client().build_get_statistics("site_1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/stats"
        );
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_list_segments_produces_correct_request() {
        let req = client().build_list_segments("site_1", 1);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/segments/1"
        );
    }

    #[test]
    fn build_list_profiles_with_empty_filters() {
        let req = client()
            .build_list_profiles("site_1", 2, "email", "asc", &[])
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/profiles/2?sort_field=email&sort_order=asc&search_filter="
        );
    }

    #[test]
    fn build_list_profiles_encodes_filters_as_json() {
        let filters = vec![PeopleFilter {
            criterion: "email".to_string(),
            operator: "equal".to_string(),
            query: vec!["a@b.com".to_string()],
        }];
        let req = client()
            .build_list_profiles("site_1", 1, "email", "asc", &filters)
            .unwrap();

        let (path, query) = req.path.split_once('?').unwrap();
        assert_eq!(
            path,
            "https://api.crisp.chat/v1/website/site_1/people/profiles/1"
        );

        let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(pairs[0], ("sort_field".to_string(), "email".to_string()));
        assert_eq!(pairs[1], ("sort_order".to_string(), "asc".to_string()));
        assert_eq!(pairs[2].0, "search_filter");
        assert_eq!(
            pairs[2].1,
            r#"[{"criterion":"email","operator":"equal","query":["a@b.com"]}]"#
        );
    }

    #[test]
    fn build_list_profiles_percent_encodes_sort_params() {
        let req = client()
            .build_list_profiles("site_1", 1, "person.geolocation", "a&b", &[])
            .unwrap();
        assert!(req.path.ends_with(
            "people/profiles/1?sort_field=person.geolocation&sort_order=a%26b&search_filter="
        ));
    }

    #[test]
    fn build_add_profile_body_has_only_populated_keys() {
        let card = PeopleProfileUpdateCard {
            email: Some("a@b.com".to_string()),
            ..Default::default()
        };
        let req = client().build_add_profile("site_1", &card).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/profile"
        );
        assert_eq!(req.body.as_deref(), Some(r#"{"email":"a@b.com"}"#));
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn build_check_profile_exists_uses_head() {
        let req = client().build_check_profile_exists("site_1", "p_1");
        assert_eq!(req.method, HttpMethod::Head);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/profile/p_1"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn profile_paths_substitute_ids_verbatim() {
        let c = client();
        let get = c.build_get_profile("site_1", "a@b.com");
        assert_eq!(
            get.path,
            "https://api.crisp.chat/v1/website/site_1/people/profile/a@b.com"
        );

        let save = c
            .build_save_profile("site_1", "p_1", &PeopleProfileUpdateCard::default())
            .unwrap();
        assert_eq!(save.method, HttpMethod::Put);
        assert_eq!(
            save.path,
            "https://api.crisp.chat/v1/website/site_1/people/profile/p_1"
        );

        let update = c
            .build_update_profile("site_1", "p_1", &PeopleProfileUpdateCard::default())
            .unwrap();
        assert_eq!(update.method, HttpMethod::Patch);
        assert_eq!(update.path, save.path);

        let remove = c.build_remove_profile("site_1", "p_1");
        assert_eq!(remove.method, HttpMethod::Delete);
        assert_eq!(remove.path, save.path);
    }

    #[test]
    fn build_list_conversations_produces_correct_request() {
        let req = client().build_list_conversations("site_1", "p_1", 3);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/conversations/p_1/list/3"
        );
    }

    #[test]
    fn build_export_profiles_is_a_bodyless_post() {
        let req = client().build_export_profiles("site_1");
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/export/profiles"
        );
        assert!(req.body.is_none());
    }

    #[test]
    fn parse_get_statistics_unwraps_envelope() {
        let stats = client()
            .parse_get_statistics(response(200, r#"{"data":{"total":42}}"#))
            .unwrap();
        assert_eq!(stats.unwrap().total, Some(42));
    }

    #[test]
    fn parse_get_statistics_absent_data_is_none() {
        let stats = client()
            .parse_get_statistics(response(200, r#"{}"#))
            .unwrap();
        assert!(stats.is_none());
    }

    #[test]
    fn parse_list_segments_scenario() {
        let segments = client()
            .parse_list_segments(response(200, r#"{"data":[{"segment":"vip","count":12}]}"#))
            .unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].segment.as_deref(), Some("vip"));
        assert_eq!(segments[0].count, Some(12));
    }

    #[test]
    fn parse_list_profiles_absent_data_is_empty() {
        let profiles = client()
            .parse_list_profiles(response(200, r#"{}"#))
            .unwrap();
        assert!(profiles.is_empty());
    }

    #[test]
    fn parse_get_profile_not_found() {
        let err = client()
            .parse_get_profile(response(404, ""))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_get_profile_bad_json() {
        let err = client()
            .parse_get_profile(response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[test]
    fn parse_check_profile_exists_status_mapping() {
        let c = client();
        assert!(c.parse_check_profile_exists(response(200, "")).unwrap());
        assert!(c.parse_check_profile_exists(response(204, "")).unwrap());
        assert!(!c.parse_check_profile_exists(response(404, "")).unwrap());
        let err = c
            .parse_check_profile_exists(response(500, "boom"))
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 500, .. }));
    }

    #[test]
    fn parse_add_profile_accepts_any_2xx() {
        let c = client();
        assert!(c.parse_add_profile(response(201, "")).is_ok());
        assert!(c.parse_add_profile(response(200, "")).is_ok());
        let err = c.parse_add_profile(response(409, "exists")).unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 409, .. }));
    }

    #[test]
    fn parse_remove_profile_not_found() {
        let err = client()
            .parse_remove_profile(response(404, ""))
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_list_conversations_success() {
        let sessions = client()
            .parse_list_conversations(response(
                200,
                r#"{"data":["session_a","session_b"]}"#,
            ))
            .unwrap();
        assert_eq!(sessions, vec!["session_a", "session_b"]);
    }

    #[test]
    fn parse_export_profiles_accepts_202() {
        assert!(client().parse_export_profiles(response(202, "")).is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let c = PeopleClient::new("https://api.crisp.chat/v1/");
        let req = c.build_get_statistics("site_1");
        assert_eq!(
            req.path,
            "https://api.crisp.chat/v1/website/site_1/people/stats"
        );
    }
}
