//! Data-transfer types mirroring the Crisp "people" JSON schema.
//!
//! # Design
//! Every server-supplied field is optional: presence means the server sent a
//! value, absence survives an encode→decode round trip unchanged (fields are
//! omitted, never written as `null`). The shared `Geolocation` shape is one
//! reusable type referenced by both `Person` and `Company`.
//!
//! These types are defined independently from the mock-server crate;
//! integration tests catch schema drift.

use serde::{Deserialize, Serialize};

/// Aggregate count of profiles known to a website.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleStatistics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// A named segment with its member count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleSegment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
}

/// A full server-returned profile: the card fields plus the server-assigned
/// people identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people_id: Option<String>,
    #[serde(flatten)]
    pub card: PeopleProfileCard,
}

/// The card portion of a profile: everything except the people identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleProfileCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<Activity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

/// Human attributes of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// UTC offset, in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<SocialProfile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment: Option<Employment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locales: Option<Vec<String>>,
}

/// A social network handle attached to a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialProfile {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}

/// Employment attributes of a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Employment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
}

/// Organization attributes of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// UTC offset, in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CompanyMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Business metrics of a company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raised: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arr: Option<i16>,
}

/// Physical location, shared by `Person` and `Company`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Latitude/longitude pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f32>,
}

/// Activity status of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub now: Option<bool>,
    /// Unix timestamp of the last activity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<u64>,
}

/// The subset of profile fields a caller submits on create/replace/patch.
///
/// On PATCH only the populated fields are intended to change; on PUT the card
/// replaces all previous fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleProfileUpdateCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<Person>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
}

/// One search predicate for profile listing. Serializes with field order
/// `criterion`, `operator`, `query`, matching the wire contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeopleFilter {
    pub criterion: String,
    pub operator: String,
    pub query: Vec<String>,
}
