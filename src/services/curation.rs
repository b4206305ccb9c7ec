use crate::error::Result;
use crate::models::{
    ApiTrack, AudioFeatures, RecommendationOptions, SmartPlaylist, SmartPlaylistOptions, Track,
    TuningParam,
};
use crate::services::spotify::{SpotifyClient, DEFAULT_RECOMMENDATION_LIMIT};
use chrono::{Local, NaiveDate};

/// Half-width of the band kept around danceability, energy and valence.
pub const DIVERSITY_BAND: f64 = 0.1;

/// Symmetric band around `value`, clamped to `[0, 1]`.
fn band(value: f64) -> (f64, f64) {
    (
        (value - DIVERSITY_BAND).max(0.0),
        (value + DIVERSITY_BAND).min(1.0),
    )
}

/// Recommendation query centred on a seed track's audio profile.
///
/// Danceability, energy and valence get a target plus a band so results spread around the
/// seed instead of cloning it; tempo, acousticness, instrumentalness and popularity only get
/// a target.
pub fn smart_query(features: &AudioFeatures, popularity: u32, limit: u32) -> RecommendationOptions {
    let mut options = RecommendationOptions::with_limit(limit);

    options
        .set(TuningParam::TargetDanceability, features.danceability)
        .set(TuningParam::TargetEnergy, features.energy)
        .set(TuningParam::TargetValence, features.valence)
        .set(TuningParam::TargetTempo, features.tempo)
        .set(TuningParam::TargetAcousticness, features.acousticness)
        .set(TuningParam::TargetInstrumentalness, features.instrumentalness)
        .set(TuningParam::TargetPopularity, f64::from(popularity));

    let banded = [
        (features.danceability, TuningParam::MinDanceability, TuningParam::MaxDanceability),
        (features.energy, TuningParam::MinEnergy, TuningParam::MaxEnergy),
        (features.valence, TuningParam::MinValence, TuningParam::MaxValence),
    ];
    for (value, min, max) in banded {
        let (low, high) = band(value);
        options.set(min, low).set(max, high);
    }

    options
}

pub fn playlist_description(seed_track: &ApiTrack, date: NaiveDate) -> String {
    format!(
        "Generated by Play Gen based on \"{}\" by {}. Created on {}.",
        seed_track.name,
        seed_track.primary_artist(),
        date.format("%-m/%-d/%Y")
    )
}

impl SpotifyClient {
    /// Recommendations tuned to the seed's audio profile. Any failure on the tuned path falls
    /// back to a plain seed-only request.
    pub async fn get_smart_recommendations(
        &self,
        seed_track_id: &str,
        limit: u32,
    ) -> Result<Vec<ApiTrack>> {
        match self.tuned_recommendations(seed_track_id, limit).await {
            Ok(tracks) => Ok(tracks),
            Err(e) => {
                tracing::warn!(
                    "Smart recommendations for {} failed ({}); falling back to seed-only recommendations",
                    seed_track_id,
                    e
                );
                self.get_recommendations(&[seed_track_id], &RecommendationOptions::with_limit(limit))
                    .await
            }
        }
    }

    async fn tuned_recommendations(&self, seed_track_id: &str, limit: u32) -> Result<Vec<ApiTrack>> {
        let features = self.get_audio_features(seed_track_id).await?;
        let seed_track = self.get_track(seed_track_id).await?;

        let options = smart_query(&features, seed_track.popularity, limit);
        tracing::debug!("Smart query for {}: {:?}", seed_track_id, options.query_pairs());

        self.get_recommendations(&[seed_track_id], &options).await
    }

    /// Fetches the user, generates recommendations, creates the playlist, then adds the tracks.
    /// A failure after creation leaves the empty playlist in place.
    pub async fn create_smart_playlist(
        &self,
        seed_track: &ApiTrack,
        playlist_name: &str,
        options: SmartPlaylistOptions,
    ) -> Result<SmartPlaylist> {
        self.build_smart_playlist(seed_track, playlist_name, options)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create smart playlist: {}", e);
                e
            })
    }

    async fn build_smart_playlist(
        &self,
        seed_track: &ApiTrack,
        playlist_name: &str,
        options: SmartPlaylistOptions,
    ) -> Result<SmartPlaylist> {
        let limit = options.limit.unwrap_or(DEFAULT_RECOMMENDATION_LIMIT);

        let user = self.get_current_user().await?;
        let recommendations = self.get_smart_recommendations(&seed_track.id, limit).await?;

        let description = playlist_description(seed_track, Local::now().date_naive());
        let playlist = self
            .create_playlist(
                &user.id,
                playlist_name,
                &description,
                options.public.unwrap_or(true),
            )
            .await?;

        let track_uris = recommendations.iter().map(|t| t.uri.clone()).collect();
        self.add_tracks_to_playlist(&playlist.id, track_uris).await?;

        tracing::info!(
            "Created playlist {} ({}) with {} tracks",
            playlist.name,
            playlist.id,
            recommendations.len()
        );

        Ok(SmartPlaylist {
            playlist,
            tracks: recommendations.iter().map(Track::from).collect(),
            seed_track: Track::from(seed_track),
        })
    }
}
