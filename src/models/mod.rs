pub mod audio;
pub mod playlist;
pub mod session;
pub mod track;

pub use audio::{AudioFeatures, RecommendationOptions, TuningParam};
pub use playlist::{
    AddTracksRequest, Artist, CreatePlaylistRequest, Playlist, SmartPlaylist,
    SmartPlaylistOptions, SnapshotResponse, UserProfile,
};
pub use session::{
    AuthEvent, AuthState, CallbackOutcome, CallbackParams, PendingAuthorization, Session,
    TokenResponse,
};
pub use track::{format_duration, format_track, ApiTrack, Track};
