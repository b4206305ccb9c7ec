use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub url: String,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRef {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Track object as returned by the Web API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    pub album: AlbumRef,
    pub duration_ms: u64,
    pub uri: String,
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl ApiTrack {
    pub fn primary_artist(&self) -> &str {
        self.artists.first().map(|a| a.name.as_str()).unwrap_or("Unknown Artist")
    }
}

/// Display shape of a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist_names: Vec<String>,
    pub album_name: String,
    pub duration_ms: u64,
    #[serde(rename = "image")]
    pub image_url: String,
    pub uri: String,
    pub popularity: u32,
    pub explicit: bool,
    pub preview_url: Option<String>,
    pub external_url: Option<String>,
}

impl Track {
    pub fn artist(&self) -> String {
        self.artist_names.join(", ")
    }

    pub fn duration(&self) -> String {
        format_duration(self.duration_ms)
    }
}

impl From<&ApiTrack> for Track {
    fn from(track: &ApiTrack) -> Self {
        Track {
            id: track.id.clone(),
            name: track.name.clone(),
            artist_names: track.artists.iter().map(|a| a.name.clone()).collect(),
            album_name: track.album.name.clone(),
            duration_ms: track.duration_ms,
            image_url: track
                .album
                .images
                .first()
                .map(|i| i.url.clone())
                .unwrap_or_default(),
            uri: track.uri.clone(),
            popularity: track.popularity,
            explicit: track.explicit,
            preview_url: track.preview_url.clone(),
            external_url: track.external_urls.spotify.clone(),
        }
    }
}

pub fn format_track(track: &ApiTrack) -> Track {
    Track::from(track)
}

/// Renders milliseconds as `m:ss`.
pub fn format_duration(milliseconds: u64) -> String {
    let minutes = milliseconds / 60_000;
    let seconds = (milliseconds % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}
