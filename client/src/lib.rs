//! Typed client for the WalkingCity backend.

pub mod config;
pub mod error;
pub mod session;

use std::sync::Arc;

use reqwest::{
    header::{COOKIE, SET_COOKIE},
    Method, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize};
use shared::{
    api::{
        Address, DataEnvelope, LoginRequest, MyRoute, NewReview, PostedReview, ReviewPage,
        ReviewQuery, RouteGenerationRequest, RouteGenerationResponse, SignUpRequest, User,
        Weather,
    },
    Coordinate, RoutePlan,
};

pub use crate::config::ClientConfig;
pub use crate::error::ApiError;
pub use crate::session::{MemorySession, SessionContext};

use crate::session::session_from_set_cookie;

pub struct WalkApi {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionContext>,
}

impl WalkApi {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionContext>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<dyn SessionContext> {
        &self.session
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.token().is_some()
    }

    /// Logs in and stores the session id from the `JSESSIONID` cookie, or
    /// from the `sessionId` body field when the cookie is missing.
    pub async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        self.session.clear();

        let response = self
            .request(Method::POST, "/walk/users/login")
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let response = check(response).await.map_err(|err| {
            err.or_message(400, "로그인 정보가 올바르지 않습니다.")
                .or_message(401, "닉네임 또는 비밀번호가 일치하지 않습니다.")
                .or_message(404, "존재하지 않는 사용자입니다.")
        })?;

        let cookie_session = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_from_set_cookie)
            .map(str::to_string);

        let user: User = decode(response).await?;
        match cookie_session.or_else(|| user.session_id.clone()) {
            Some(id) => {
                tracing::info!("logged in as {} (status {status})", user.nickname);
                self.session.set_token(id);
            }
            None => tracing::warn!("login succeeded but no session id was returned"),
        }
        Ok(user)
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn sign_up(&self, request: &SignUpRequest) -> Result<User, ApiError> {
        let builder = self
            .request(Method::POST, "/walk/users/signup")
            .json(request);
        self.send(builder)
            .await
            .map_err(|err| err.or_message(400, "닉네임이 이미 사용 중입니다."))
    }

    pub async fn request_route(
        &self,
        request: &RouteGenerationRequest,
    ) -> Result<RouteGenerationResponse, ApiError> {
        self.send(self.request(Method::POST, "/walk/ai/request").json(request))
            .await
    }

    /// [`Self::request_route`] converted into a navigable plan.
    pub async fn request_route_plan(
        &self,
        request: &RouteGenerationRequest,
    ) -> Result<RoutePlan, ApiError> {
        let response = self.request_route(request).await?;
        Ok(RoutePlan::try_from(response)?)
    }

    pub async fn my_routes(&self) -> Result<Vec<MyRoute>, ApiError> {
        let envelope: DataEnvelope<Vec<MyRoute>> =
            self.send(self.request(Method::GET, "/walk/my-routes")).await?;
        Ok(envelope.data)
    }

    pub async fn favorite_routes(&self) -> Result<Vec<MyRoute>, ApiError> {
        let builder = self
            .request(Method::GET, "/walk/my-routes")
            .query(&[("isFavorite", "true")]);
        let envelope: DataEnvelope<Vec<MyRoute>> = self.send(builder).await?;
        Ok(envelope.data)
    }

    pub async fn my_route(&self, my_route_id: i64) -> Result<MyRoute, ApiError> {
        let path = format!("/walk/my-routes/{my_route_id}");
        let envelope: DataEnvelope<MyRoute> = self.send(self.request(Method::GET, &path)).await?;
        Ok(envelope.data)
    }

    pub async fn toggle_favorite(&self, my_route_id: i64) -> Result<MyRoute, ApiError> {
        let path = format!("/walk/my-routes/{my_route_id}/favorite");
        let envelope: DataEnvelope<MyRoute> =
            self.send(self.request(Method::PATCH, &path)).await?;
        Ok(envelope.data)
    }

    /// Forecast entries; a single object is returned as a one-element list.
    pub async fn weather(&self) -> Result<Vec<Weather>, ApiError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Weather>),
            One(Weather),
        }

        let body: OneOrMany = self.send(self.request(Method::GET, "/walk")).await?;
        Ok(match body {
            OneOrMany::Many(list) => list,
            OneOrMany::One(weather) => vec![weather],
        })
    }

    /// Reverse geocodes `at`, or the backend's idea of the caller's location
    /// when `None` (or a zero coordinate) is given.
    pub async fn address(&self, at: Option<Coordinate>) -> Result<Address, ApiError> {
        let mut builder = self.request(Method::GET, "/walk/location/now");
        if let Some(coord) = at.filter(|c| c.lat != 0.0 && c.lon != 0.0) {
            builder = builder.query(&[("lat", coord.lat), ("lon", coord.lon)]);
        }
        self.send(builder).await
    }

    pub async fn reviews(&self, query: &ReviewQuery) -> Result<ReviewPage, ApiError> {
        let builder = self
            .request(Method::GET, "/walk/reviews")
            .query(&review_params(query));
        self.send(builder).await
    }

    pub async fn like_review(&self, review_id: i64) -> Result<(), ApiError> {
        self.react(review_id, "like").await
    }

    pub async fn hate_review(&self, review_id: i64) -> Result<(), ApiError> {
        self.react(review_id, "hate").await
    }

    async fn react(&self, review_id: i64, reaction: &str) -> Result<(), ApiError> {
        let path = format!("/walk/reviews/{review_id}/{reaction}");
        let response = self.request(Method::POST, &path).send().await?;
        check(response).await?;
        Ok(())
    }

    pub async fn post_review(&self, review: &NewReview) -> Result<PostedReview, ApiError> {
        self.send(self.request(Method::POST, "/walk/reviews").json(review))
            .await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!("{method} {url}");

        let builder = self.http.request(method, url);
        match self.session.token() {
            Some(token) => builder
                .header(COOKIE, format!("JSESSIONID={token}"))
                .header("JSESSIONID", &token)
                .header("X-Session-ID", &token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.send().await?;
        decode(check(response).await?).await
    }
}

/// Query pairs for the review feed. Zero coordinates mean "unknown" and are
/// left out.
pub fn review_params(query: &ReviewQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(sort) = query.sort {
        params.push(("sort", sort.as_str().to_string()));
    }
    if let Some(lat) = query.lat.filter(|v| *v != 0.0) {
        params.push(("lat", lat.to_string()));
    }
    if let Some(lng) = query.lng.filter(|v| *v != 0.0) {
        params.push(("lng", lng.to_string()));
    }
    if let Some(page) = query.page {
        params.push(("page", page.to_string()));
    }
    if let Some(size) = query.size {
        params.push(("size", size.to_string()));
    }
    params
}

async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!("backend answered {status}: {body}");
    Err(ApiError::from_status(status.as_u16(), body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
