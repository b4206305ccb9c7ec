use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    AddTracksRequest, ApiTrack, Artist, AudioFeatures, CreatePlaylistRequest, Playlist,
    RecommendationOptions, SnapshotResponse, UserProfile,
};
use crate::services::auth::AuthService;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

pub const DEFAULT_SEARCH_LIMIT: u32 = 10;
pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 20;
pub const DEFAULT_PLAYLIST_LIMIT: u32 = 20;

/// Method, query, extra headers and JSON body of one API call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            body: Some(serde_json::to_value(body)?),
            ..Self::default()
        })
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Paging<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct TracksResponse {
    tracks: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    artists: Vec<Artist>,
}

fn logged(context: &'static str) -> impl Fn(AppError) -> AppError {
    move |e| {
        tracing::error!("Failed to {}: {}", context, e);
        e
    }
}

/// Bearer-authenticated Web API client.
pub struct SpotifyClient {
    base_url: String,
    market: String,
    auth: Arc<AuthService>,
    client: Client,
}

impl SpotifyClient {
    pub fn new(config: &Config, auth: Arc<AuthService>) -> Self {
        Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            market: config.market.clone(),
            auth,
            client: Client::new(),
        }
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    /// Performs one API call. A 401 triggers one refresh and one retry; anything else
    /// unsuccessful fails with `RequestFailed`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<T> {
        let token = self
            .auth
            .get_access_token()
            .await
            .ok_or(AppError::NoTokenAvailable)?;

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("{} {}", options.method, url);

        let response = self.send(&url, options, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("{} returned 401; refreshing token and retrying once", endpoint);
            self.auth.refresh_access_token().await;

            let token = self
                .auth
                .get_access_token()
                .await
                .ok_or(AppError::RequestFailed {
                    status: StatusCode::UNAUTHORIZED.as_u16(),
                })?;

            let retry = self.send(&url, options, &token).await?;
            return Self::read_json(endpoint, retry).await;
        }

        Self::read_json(endpoint, response).await
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        token: &str,
    ) -> Result<reqwest::Response> {
        let mut builder = self
            .client
            .request(options.method.clone(), url)
            .bearer_auth(token)
            .headers(Self::merged_headers(options)?);

        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        Ok(builder.send().await?)
    }

    /// JSON content type, overridden by any caller header of the same name.
    fn merged_headers(options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        for (name, value) in &options.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AppError::Validation(format!("Invalid header name: {}", name)))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| AppError::Validation(format!("Invalid value for header {}", name)))?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("API request {} failed: {} - {}", endpoint, status, body);
            return Err(AppError::RequestFailed {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        Ok(serde_json::from_str(body)?)
    }

    pub async fn get_current_user(&self) -> Result<UserProfile> {
        self.request("/me", &RequestOptions::get())
            .await
            .map_err(logged("get current user"))
    }

    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<ApiTrack>> {
        let options = RequestOptions::get()
            .query("q", query)
            .query("type", "track")
            .query("limit", limit)
            .query("market", &self.market);

        let response: SearchResponse = self
            .request("/search", &options)
            .await
            .map_err(logged("search tracks"))?;

        tracing::debug!("Search for {:?} returned {} tracks", query, response.tracks.items.len());
        Ok(response.tracks.items)
    }

    pub async fn get_audio_features(&self, track_id: &str) -> Result<AudioFeatures> {
        self.request(&format!("/audio-features/{}", track_id), &RequestOptions::get())
            .await
            .map_err(logged("get audio features"))
    }

    pub async fn get_track(&self, track_id: &str) -> Result<ApiTrack> {
        self.request(&format!("/tracks/{}", track_id), &RequestOptions::get())
            .await
            .map_err(logged("get track"))
    }

    /// Seeds are joined with commas; only tuning parameters set in `options` are sent.
    pub async fn get_recommendations(
        &self,
        seed_tracks: &[&str],
        options: &RecommendationOptions,
    ) -> Result<Vec<ApiTrack>> {
        let mut request = RequestOptions::get()
            .query("seed_tracks", seed_tracks.join(","))
            .query("limit", options.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT))
            .query("market", &self.market);
        request.query.extend(options.query_pairs());

        let response: TracksResponse = self
            .request("/recommendations", &request)
            .await
            .map_err(logged("get recommendations"))?;

        Ok(response.tracks)
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<Playlist> {
        let body = CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public,
        };
        body.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.request(
            &format!("/users/{}/playlists", user_id),
            &RequestOptions::post_json(&body)?,
        )
        .await
        .map_err(logged("create playlist"))
    }

    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        track_uris: Vec<String>,
    ) -> Result<SnapshotResponse> {
        let body = AddTracksRequest { uris: track_uris };

        self.request(
            &format!("/playlists/{}/tracks", playlist_id),
            &RequestOptions::post_json(&body)?,
        )
        .await
        .map_err(logged("add tracks to playlist"))
    }

    pub async fn get_user_playlists(&self, limit: u32) -> Result<Vec<Playlist>> {
        let response: Paging<Playlist> = self
            .request("/me/playlists", &RequestOptions::get().query("limit", limit))
            .await
            .map_err(logged("get user playlists"))?;

        Ok(response.items)
    }

    pub async fn get_artists(&self, artist_ids: &[&str]) -> Result<Vec<Artist>> {
        let response: ArtistsResponse = self
            .request("/artists", &RequestOptions::get().query("ids", artist_ids.join(",")))
            .await
            .map_err(logged("get artists"))?;

        Ok(response.artists)
    }

    /// Market defaults to the configured one.
    pub async fn get_artist_top_tracks(
        &self,
        artist_id: &str,
        market: Option<&str>,
    ) -> Result<Vec<ApiTrack>> {
        let market = market.unwrap_or(&self.market);
        let response: TracksResponse = self
            .request(
                &format!("/artists/{}/top-tracks", artist_id),
                &RequestOptions::get().query("market", market),
            )
            .await
            .map_err(logged("get artist top tracks"))?;

        Ok(response.tracks)
    }

    pub async fn get_related_artists(&self, artist_id: &str) -> Result<Vec<Artist>> {
        let response: ArtistsResponse = self
            .request(
                &format!("/artists/{}/related-artists", artist_id),
                &RequestOptions::get(),
            )
            .await
            .map_err(logged("get related artists"))?;

        Ok(response.artists)
    }
}
