//! Request and response bodies of the WalkingCity backend (`/walk/...`).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub nickname: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub password: String,
    pub nickname: String,
    pub age: u32,
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub nickname: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    /// Some deployments echo the session id in the body when the cookie
    /// cannot be read cross-origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGenerationRequest {
    pub duration: String,
    pub purpose: String,
    pub address_jibun: String,
    pub with_pet: bool,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteGenerationResponse {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub distance_in_km: f64,
    pub duration: String,
    pub purpose: String,
    pub address_jibun: String,
    pub with_pet: bool,
    pub route_start_x: f64,
    pub route_start_y: f64,
    pub cross: i64,
    pub points: Vec<RoutePoint>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub point_x: f64,
    pub point_y: f64,
}

/// `{"data": ...}` wrapper used by the saved-route endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyRoute {
    pub my_route_id: i64,
    pub route_id: i64,
    pub route_title: String,
    pub walk_count: u32,
    pub rating: f64,
    pub distance_in_km: f64,
    pub is_favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub base_date_time: String,
    pub fcst_date_time: String,
    pub temperature: f64,
    pub humidity: f64,
    pub precipitation_mm: f64,
    pub precipitation_type_code: i32,
    pub precipitation_type: String,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(alias = "fullAddress")]
    pub address_jibun: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    #[default]
    Latest,
    Popular,
    Rating,
}

impl ReviewSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSort::Latest => "latest",
            ReviewSort::Popular => "popular",
            ReviewSort::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReviewQuery {
    pub sort: Option<ReviewSort>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub like_count: i64,
    pub hate_count: i64,
    pub created_at: NaiveDateTime,
    pub user_nickname: String,
    #[serde(default)]
    pub ai_summary: String,
    #[serde(default)]
    pub ai_title: String,
}

/// One page of the review feed (Spring `Page` layout, pageable omitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPage {
    pub content: Vec<Review>,
    pub last: bool,
    pub first: bool,
    pub empty: bool,
    pub number: u32,
    pub size: u32,
    pub total_pages: u32,
    pub total_elements: u64,
    pub number_of_elements: u32,
}

impl ReviewPage {
    pub fn next_page(&self) -> Option<u32> {
        if self.last { None } else { Some(self.number + 1) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub title: String,
    pub content: String,
    pub route_id: i64,
    /// 1 to 5 stars.
    pub rating: u8,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedReview {
    #[serde(flatten)]
    pub review: Review,
    pub rating: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}
