pub mod terminal;

use crate::models::{
    ApiTrack, AuthEvent, Playlist, SmartPlaylist, SmartPlaylistOptions, Track, UserProfile,
};
use crate::services::spotify::DEFAULT_PLAYLIST_LIMIT;
use crate::services::{AuthService, SpotifyClient};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub kind: NoticeKind,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    App,
}

/// Everything the front end renders.
#[derive(Debug, Default)]
pub struct ViewState {
    pub screen: Screen,
    pub current_user: Option<UserProfile>,
    pub authorize_url: Option<String>,
    pub search_results: Vec<ApiTrack>,
    pub show_results: bool,
    pub selected_track: Option<ApiTrack>,
    pub generated_tracks: Vec<Track>,
    pub show_playlist: bool,
    pub user_playlists: Vec<Playlist>,
    pub last_saved: Option<Playlist>,
    pub loading: bool,
}

/// Sequences user actions against the API client and keeps the view state.
///
/// Actions take `&mut self`, so a second action cannot start while one is in flight.
pub struct UiController {
    api: Arc<SpotifyClient>,
    auth: Arc<AuthService>,
    search_limit: u32,
    recommendation_limit: u32,
    view: ViewState,
    notices: Vec<Notice>,
}

impl UiController {
    pub fn new(
        api: Arc<SpotifyClient>,
        auth: Arc<AuthService>,
        search_limit: u32,
        recommendation_limit: u32,
    ) -> Self {
        Self {
            api,
            auth,
            search_limit,
            recommendation_limit,
            view: ViewState::default(),
            notices: Vec::new(),
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub async fn handle_auth_event(&mut self, event: AuthEvent) {
        if event.failed {
            self.view.authorize_url = None;
            self.show_error("Authentication failed. Please try again.");
        } else {
            self.handle_auth_state_change(event.authenticated).await;
        }
    }

    pub async fn handle_auth_state_change(&mut self, authenticated: bool) {
        if authenticated {
            self.view.screen = Screen::App;
            self.view.authorize_url = None;
            self.load_user_profile().await;
        } else {
            self.view.screen = Screen::Login;
            self.reset();
        }
    }

    pub async fn handle_login(&mut self) -> Option<String> {
        match self.auth.login().await {
            Ok(url) => {
                let url = url.to_string();
                self.view.authorize_url = Some(url.clone());
                Some(url)
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                self.show_error("Login failed. Please try again.");
                None
            }
        }
    }

    pub async fn handle_logout(&mut self) {
        self.auth.logout().await;
        self.reset();
    }

    pub async fn load_user_profile(&mut self) {
        match self.api.get_current_user().await {
            Ok(user) => self.view.current_user = Some(user),
            Err(e) => {
                tracing::error!("Failed to load user profile: {}", e);
                self.show_error("Failed to load user profile");
            }
        }
    }

    pub async fn handle_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.show_error("Please enter a song name");
            return;
        }

        self.set_loading(true);
        self.hide_all_sections();
        self.view.selected_track = None;
        self.view.generated_tracks.clear();

        match self.api.search_tracks(query, self.search_limit).await {
            Ok(tracks) => {
                self.view.search_results = tracks;
                self.view.show_results = true;
            }
            Err(e) => {
                tracing::error!("Search failed: {}", e);
                self.show_error("Search failed. Please try again.");
            }
        }

        self.set_loading(false);
    }

    /// Selects a search result (1-based) and generates a playlist from it.
    pub async fn select_track(&mut self, number: usize) {
        let Some(track) = number
            .checked_sub(1)
            .and_then(|i| self.view.search_results.get(i))
            .cloned()
        else {
            self.show_error("No such song. Pick a number from the search results.");
            return;
        };

        self.set_loading(true);
        self.hide_all_sections();
        self.view.generated_tracks.clear();

        match self
            .api
            .get_smart_recommendations(&track.id, self.recommendation_limit)
            .await
        {
            Ok(recommendations) => {
                self.view.generated_tracks = recommendations.iter().map(Track::from).collect();
                self.view.show_playlist = true;
            }
            Err(e) => {
                tracing::error!("Failed to generate playlist: {}", e);
                self.show_error("Failed to generate playlist. Please try again.");
            }
        }
        self.view.selected_track = Some(track);

        self.set_loading(false);
    }

    /// Saves the generated playlist. Without a name, `<seed> - Play Gen Mix` is used.
    pub async fn handle_save_playlist(&mut self, name: Option<&str>) -> Option<SmartPlaylist> {
        let seed = match &self.view.selected_track {
            Some(seed) if !self.view.generated_tracks.is_empty() => seed.clone(),
            _ => {
                self.show_error("No playlist to save");
                return None;
            }
        };

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} - Play Gen Mix", seed.name));

        self.set_loading(true);

        let options = SmartPlaylistOptions {
            limit: Some(self.view.generated_tracks.len() as u32),
            public: None,
        };

        let saved = match self.api.create_smart_playlist(&seed, &name, options).await {
            Ok(result) => {
                let mut message = format!("Playlist \"{}\" saved to your Spotify!", name);
                if let Some(url) = &result.playlist.external_urls.spotify {
                    message.push_str(&format!(" Open it at {}", url));
                }
                self.show_success(&message);
                self.view.last_saved = Some(result.playlist.clone());
                Some(result)
            }
            Err(e) => {
                tracing::error!("Failed to save playlist: {}", e);
                self.show_error("Failed to save playlist. Please try again.");
                None
            }
        };

        self.set_loading(false);
        saved
    }

    pub fn handle_generate_new(&mut self) {
        self.view.selected_track = None;
        self.view.generated_tracks.clear();
        self.hide_all_sections();
    }

    pub async fn load_playlists(&mut self) {
        self.set_loading(true);
        match self.api.get_user_playlists(DEFAULT_PLAYLIST_LIMIT).await {
            Ok(playlists) => self.view.user_playlists = playlists,
            Err(e) => {
                tracing::error!("Failed to load playlists: {}", e);
                self.show_error("Failed to load your playlists");
            }
        }
        self.set_loading(false);
    }

    pub fn show_success(&mut self, text: &str) {
        self.push_notice(text, NoticeKind::Success);
    }

    pub fn show_error(&mut self, text: &str) {
        self.push_notice(text, NoticeKind::Error);
    }

    fn push_notice(&mut self, text: &str, kind: NoticeKind) {
        self.notices.push(Notice {
            text: text.to_string(),
            kind,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    /// Live notices; expired ones are dropped.
    pub fn notices(&mut self) -> &[Notice] {
        self.prune_notices(Instant::now())
    }

    /// View state plus live notices, for rendering.
    pub fn snapshot(&mut self) -> (&ViewState, &[Notice]) {
        self.notices.retain(|n| n.expires_at > Instant::now());
        (&self.view, &self.notices)
    }

    pub fn prune_notices(&mut self, now: Instant) -> &[Notice] {
        self.notices.retain(|n| n.expires_at > now);
        &self.notices
    }

    fn set_loading(&mut self, loading: bool) {
        self.view.loading = loading;
    }

    fn hide_all_sections(&mut self) {
        self.view.show_results = false;
        self.view.show_playlist = false;
    }

    fn reset(&mut self) {
        self.view.current_user = None;
        self.view.selected_track = None;
        self.view.generated_tracks.clear();
        self.view.user_playlists.clear();
        self.view.last_saved = None;
        self.hide_all_sections();
    }
}
