pub mod auth;
pub mod curation;
pub mod pkce;
pub mod spotify;
pub mod storage;

pub use auth::AuthService;
pub use spotify::{RequestOptions, SpotifyClient};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
