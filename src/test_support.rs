//! In-process stand-in for the accounts service and Web API, served by axum on an ephemeral port.

use crate::config::Config;
use crate::services::auth::AuthService;
use crate::services::spotify::SpotifyClient;
use crate::services::storage::{
    KeyValueStore, MemoryStore, ACCESS_TOKEN_KEY, EXPIRES_AT_KEY, REFRESH_TOKEN_KEY,
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub struct MockBehavior {
    pub token_status: u16,
    pub refresh_status: u16,
    pub rotate_refresh_token: bool,
    pub expires_in: i64,
    /// Number of API calls answered with 401 before normal service resumes.
    pub unauthorized_responses: usize,
    pub audio_features_status: u16,
    pub audio_features: Value,
    pub seed_popularity: u32,
    pub search_results: usize,
    pub recommendations_status: u16,
    pub create_playlist_status: u16,
    pub add_tracks_status: u16,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            token_status: 200,
            refresh_status: 200,
            rotate_refresh_token: false,
            expires_in: 3600,
            unauthorized_responses: 0,
            audio_features_status: 200,
            audio_features: json!({
                "id": "seed",
                "danceability": 0.95,
                "energy": 0.05,
                "valence": 0.5,
                "tempo": 128.0,
                "acousticness": 0.2,
                "instrumentalness": 0.0,
                "liveness": 0.1,
                "loudness": -5.5,
                "speechiness": 0.04
            }),
            seed_popularity: 65,
            search_results: 3,
            recommendations_status: 200,
            create_playlist_status: 201,
            add_tracks_status: 201,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedCall {
    pub fn content_types(&self) -> Vec<&str> {
        self.headers
            .get_all(header::CONTENT_TYPE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}

#[derive(Default)]
struct MockState {
    behavior: Mutex<MockBehavior>,
    token_forms: Mutex<Vec<HashMap<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

pub struct MockSpotify {
    pub base_url: String,
    state: Arc<MockState>,
    storage: tempfile::TempDir,
}

impl MockSpotify {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api/token", post(token))
            .fallback(api)
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            storage: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config(&self) -> Config {
        Config {
            client_id: "test-client".to_string(),
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            scopes: crate::config::DEFAULT_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            api_base_url: format!("{}/v1", self.base_url),
            accounts_url: self.base_url.clone(),
            market: "US".to_string(),
            storage_dir: PathBuf::from(self.storage.path()),
            search_limit: 10,
            recommendation_limit: 20,
        }
    }

    pub fn behavior(&self, f: impl FnOnce(&mut MockBehavior)) {
        f(&mut self.state.behavior.lock().unwrap());
    }

    /// Auth service with in-memory stores. `expires_in_ms` seeds a stored session
    /// (`seed-access` / `seed-refresh`) expiring that far from now.
    pub fn auth_with_stores(
        &self,
        expires_in_ms: Option<i64>,
    ) -> (Arc<AuthService>, Arc<MemoryStore>, Arc<MemoryStore>) {
        let durable = Arc::new(MemoryStore::new());
        let transient = Arc::new(MemoryStore::new());

        if let Some(expires_in_ms) = expires_in_ms {
            let expires_at = chrono::Utc::now().timestamp_millis() + expires_in_ms;
            durable.set(ACCESS_TOKEN_KEY, "seed-access").unwrap();
            durable.set(REFRESH_TOKEN_KEY, "seed-refresh").unwrap();
            durable.set(EXPIRES_AT_KEY, &expires_at.to_string()).unwrap();
        }

        let auth = Arc::new(AuthService::new(
            &self.config(),
            durable.clone(),
            transient.clone(),
        ));
        (auth, durable, transient)
    }

    pub fn auth(&self, expires_in_ms: Option<i64>) -> Arc<AuthService> {
        self.auth_with_stores(expires_in_ms).0
    }

    /// Logged-in client with an hour left on its token.
    pub fn client(&self) -> (SpotifyClient, Arc<AuthService>) {
        let auth = self.auth(Some(3_600_000));
        (SpotifyClient::new(&self.config(), auth.clone()), auth)
    }

    pub fn token_forms(&self) -> Vec<HashMap<String, String>> {
        self.state.token_forms.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.token_forms()
            .iter()
            .filter(|f| f.get("grant_type").map(String::as_str) == Some("refresh_token"))
            .count()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }
}

pub fn track_json(id: &str, name: &str, artist: &str, popularity: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "artists": [{ "id": format!("artist-{}", artist), "name": artist }],
        "album": {
            "name": format!("{} (Album)", name),
            "images": [{ "url": format!("https://img.test/{}.jpg", id), "height": 640, "width": 640 }]
        },
        "duration_ms": 185_000,
        "uri": format!("spotify:track:{}", id),
        "popularity": popularity,
        "explicit": false,
        "preview_url": null,
        "external_urls": { "spotify": format!("https://open.spotify.com/track/{}", id) }
    })
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn token(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = {
        let mut forms = state.token_forms.lock().unwrap();
        forms.push(form.clone());
        forms.len()
    };

    let behavior = state.behavior.lock().unwrap();
    let grant_type = form.get("grant_type").map(String::as_str).unwrap_or("");

    match grant_type {
        "authorization_code" => {
            if behavior.token_status != 200 {
                return (status(behavior.token_status), Json(json!({"error": "invalid_grant"})))
                    .into_response();
            }
            Json(json!({
                "access_token": format!("access-{}", n),
                "token_type": "Bearer",
                "refresh_token": format!("refresh-{}", n),
                "expires_in": behavior.expires_in,
            }))
            .into_response()
        }
        "refresh_token" => {
            if behavior.refresh_status != 200 {
                return (status(behavior.refresh_status), Json(json!({"error": "invalid_grant"})))
                    .into_response();
            }
            let mut body = json!({
                "access_token": format!("access-{}", n),
                "token_type": "Bearer",
                "expires_in": behavior.expires_in,
            });
            if behavior.rotate_refresh_token {
                body["refresh_token"] = json!(format!("refresh-{}", n));
            }
            Json(body).into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn api(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches("/v1").to_string();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.calls.lock().unwrap().push(RecordedCall {
        method: method.clone(),
        path: path.clone(),
        query: query.clone(),
        authorization: authorization.clone(),
        headers: headers.clone(),
        body: serde_json::from_slice(&body).ok(),
    });

    if !authorization
        .as_deref()
        .map_or(false, |a| a.starts_with("Bearer "))
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let mut behavior = state.behavior.lock().unwrap();
    if behavior.unauthorized_responses > 0 {
        behavior.unauthorized_responses -= 1;
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"status": 401, "message": "The access token expired"}})),
        )
            .into_response();
    }

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let limit = |default: usize| {
        query
            .get("limit")
            .and_then(|l| l.parse().ok())
            .unwrap_or(default)
    };

    match (method, segments.as_slice()) {
        (Method::GET, ["me"]) => Json(json!({
            "id": "user-1",
            "display_name": "Test User",
            "email": "test@example.com",
            "images": []
        }))
        .into_response(),
        (Method::GET, ["me", "playlists"]) => {
            let items: Vec<Value> = (0..limit(20).min(2))
                .map(|i| json!({"id": format!("pl-{}", i), "name": format!("Playlist {}", i)}))
                .collect();
            Json(json!({ "items": items })).into_response()
        }
        (Method::GET, ["search"]) => {
            let q = query.get("q").cloned().unwrap_or_default();
            let items: Vec<Value> = (0..behavior.search_results.min(limit(10)))
                .map(|i| track_json(&format!("search-{}", i), &format!("{} {}", q, i), "Searcher", 50))
                .collect();
            Json(json!({ "tracks": { "items": items } })).into_response()
        }
        (Method::GET, ["audio-features", _id]) => {
            if behavior.audio_features_status != 200 {
                return status(behavior.audio_features_status).into_response();
            }
            Json(behavior.audio_features.clone()).into_response()
        }
        (Method::GET, ["tracks", id]) => {
            Json(track_json(id, "Seed Song", "Seed Artist", behavior.seed_popularity))
                .into_response()
        }
        (Method::GET, ["recommendations"]) => {
            if behavior.recommendations_status != 200 {
                return status(behavior.recommendations_status).into_response();
            }
            let tracks: Vec<Value> = (0..limit(20))
                .map(|i| track_json(&format!("rec-{}", i), &format!("Rec {}", i), "Rec Artist", 40))
                .collect();
            Json(json!({ "tracks": tracks, "seeds": [] })).into_response()
        }
        (Method::POST, ["users", user_id, "playlists"]) => {
            if behavior.create_playlist_status >= 300 {
                return status(behavior.create_playlist_status).into_response();
            }
            let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
            (
                status(behavior.create_playlist_status),
                Json(json!({
                    "id": "new-playlist",
                    "name": request["name"],
                    "description": request["description"],
                    "public": request["public"],
                    "owner": { "id": user_id },
                    "external_urls": { "spotify": "https://open.spotify.com/playlist/new-playlist" },
                    "tracks": { "total": 0 }
                })),
            )
                .into_response()
        }
        (Method::POST, ["playlists", _id, "tracks"]) => {
            if behavior.add_tracks_status >= 300 {
                return status(behavior.add_tracks_status).into_response();
            }
            (
                status(behavior.add_tracks_status),
                Json(json!({ "snapshot_id": "snap-1" })),
            )
                .into_response()
        }
        (Method::GET, ["artists"]) => {
            let artists: Vec<Value> = query
                .get("ids")
                .map(|ids| ids.split(',').map(|id| json!({"id": id, "name": format!("Artist {}", id)})).collect())
                .unwrap_or_default();
            Json(json!({ "artists": artists })).into_response()
        }
        (Method::GET, ["artists", id, "top-tracks"]) => {
            let tracks = vec![track_json(&format!("{}-top", id), "Top Song", id, 90)];
            Json(json!({ "tracks": tracks })).into_response()
        }
        (Method::GET, ["artists", id, "related-artists"]) => Json(json!({
            "artists": [{ "id": format!("{}-related", id), "name": "Related", "genres": ["pop"] }]
        }))
        .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
