use crate::services::spotify::{DEFAULT_RECOMMENDATION_LIMIT, DEFAULT_SEARCH_LIMIT};
use reqwest::Url;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "playlist-modify-public",
    "playlist-modify-private",
    "user-library-read",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    /// Must point at a loopback address; the callback listener binds to its host and port.
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub api_base_url: String,
    pub accounts_url: String,
    pub market: String,
    /// Directory holding `session.json` and `pending_auth.json`.
    pub storage_dir: PathBuf,
    pub search_limit: u32,
    pub recommendation_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let client_id = env::var("SPOTIFY_CLIENT_ID").map_err(|_| {
            anyhow::anyhow!(
                "SPOTIFY_CLIENT_ID environment variable must be set. \
                Register an application in the Spotify developer dashboard to obtain one"
            )
        })?;

        let scopes = env::var("SPOTIFY_SCOPES")
            .map(|s| {
                s.split(|c: char| c == ' ' || c == ',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect());

        let config = Config {
            client_id,
            redirect_uri: env::var("SPOTIFY_REDIRECT_URI")
                .unwrap_or_else(|_| "http://127.0.0.1:8888/callback".to_string()),
            scopes,
            api_base_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| "https://api.spotify.com/v1".to_string()),
            accounts_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| "https://accounts.spotify.com".to_string()),
            market: env::var("SPOTIFY_MARKET").unwrap_or_else(|_| "US".to_string()),
            storage_dir: env::var("PLAYGEN_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".playgen")),
            search_limit: env::var("PLAYGEN_SEARCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SEARCH_LIMIT),
            recommendation_limit: env::var("PLAYGEN_RECOMMENDATION_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT),
        };

        // Fail early rather than after the user has gone through the consent screen
        config.callback_address()?;

        Ok(config)
    }

    /// Bind address (`host:port`) and route path for the loopback callback listener.
    pub fn callback_address(&self) -> Result<(String, String), anyhow::Error> {
        let url = Url::parse(&self.redirect_uri)
            .map_err(|e| anyhow::anyhow!("Invalid SPOTIFY_REDIRECT_URI: {}", e))?;

        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_REDIRECT_URI has no host"))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("SPOTIFY_REDIRECT_URI has no port"))?;

        let path = match url.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };

        Ok((format!("{}:{}", host, port), path))
    }
}
