use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-track audio descriptors. Most are in `[0, 1]`; tempo is BPM and loudness is dB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioFeatures {
    #[serde(default)]
    pub id: Option<String>,
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub tempo: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    #[serde(default)]
    pub liveness: f64,
    #[serde(default)]
    pub loudness: f64,
    #[serde(default)]
    pub speechiness: f64,
}

/// Tunable recommendation parameters accepted by the recommendations endpoint.
///
/// Declaration order is the order in which parameters are encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TuningParam {
    TargetAcousticness,
    TargetDanceability,
    TargetEnergy,
    TargetInstrumentalness,
    TargetLiveness,
    TargetLoudness,
    TargetSpeechiness,
    TargetTempo,
    TargetValence,
    MinAcousticness,
    MaxAcousticness,
    MinDanceability,
    MaxDanceability,
    MinEnergy,
    MaxEnergy,
    MinInstrumentalness,
    MaxInstrumentalness,
    MinLiveness,
    MaxLiveness,
    MinLoudness,
    MaxLoudness,
    MinSpeechiness,
    MaxSpeechiness,
    MinTempo,
    MaxTempo,
    MinValence,
    MaxValence,
    TargetPopularity,
    MinPopularity,
    MaxPopularity,
}

impl TuningParam {
    pub const ALL: [TuningParam; 30] = [
        TuningParam::TargetAcousticness,
        TuningParam::TargetDanceability,
        TuningParam::TargetEnergy,
        TuningParam::TargetInstrumentalness,
        TuningParam::TargetLiveness,
        TuningParam::TargetLoudness,
        TuningParam::TargetSpeechiness,
        TuningParam::TargetTempo,
        TuningParam::TargetValence,
        TuningParam::MinAcousticness,
        TuningParam::MaxAcousticness,
        TuningParam::MinDanceability,
        TuningParam::MaxDanceability,
        TuningParam::MinEnergy,
        TuningParam::MaxEnergy,
        TuningParam::MinInstrumentalness,
        TuningParam::MaxInstrumentalness,
        TuningParam::MinLiveness,
        TuningParam::MaxLiveness,
        TuningParam::MinLoudness,
        TuningParam::MaxLoudness,
        TuningParam::MinSpeechiness,
        TuningParam::MaxSpeechiness,
        TuningParam::MinTempo,
        TuningParam::MaxTempo,
        TuningParam::MinValence,
        TuningParam::MaxValence,
        TuningParam::TargetPopularity,
        TuningParam::MinPopularity,
        TuningParam::MaxPopularity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TuningParam::TargetAcousticness => "target_acousticness",
            TuningParam::TargetDanceability => "target_danceability",
            TuningParam::TargetEnergy => "target_energy",
            TuningParam::TargetInstrumentalness => "target_instrumentalness",
            TuningParam::TargetLiveness => "target_liveness",
            TuningParam::TargetLoudness => "target_loudness",
            TuningParam::TargetSpeechiness => "target_speechiness",
            TuningParam::TargetTempo => "target_tempo",
            TuningParam::TargetValence => "target_valence",
            TuningParam::MinAcousticness => "min_acousticness",
            TuningParam::MaxAcousticness => "max_acousticness",
            TuningParam::MinDanceability => "min_danceability",
            TuningParam::MaxDanceability => "max_danceability",
            TuningParam::MinEnergy => "min_energy",
            TuningParam::MaxEnergy => "max_energy",
            TuningParam::MinInstrumentalness => "min_instrumentalness",
            TuningParam::MaxInstrumentalness => "max_instrumentalness",
            TuningParam::MinLiveness => "min_liveness",
            TuningParam::MaxLiveness => "max_liveness",
            TuningParam::MinLoudness => "min_loudness",
            TuningParam::MaxLoudness => "max_loudness",
            TuningParam::MinSpeechiness => "min_speechiness",
            TuningParam::MaxSpeechiness => "max_speechiness",
            TuningParam::MinTempo => "min_tempo",
            TuningParam::MaxTempo => "max_tempo",
            TuningParam::MinValence => "min_valence",
            TuningParam::MaxValence => "max_valence",
            TuningParam::TargetPopularity => "target_popularity",
            TuningParam::MinPopularity => "min_popularity",
            TuningParam::MaxPopularity => "max_popularity",
        }
    }
}

/// Options for a recommendations request. Only parameters that were set are encoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecommendationOptions {
    pub limit: Option<u32>,
    params: BTreeMap<TuningParam, f64>,
}

impl RecommendationOptions {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            params: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, param: TuningParam, value: f64) -> &mut Self {
        self.params.insert(param, value);
        self
    }

    pub fn get(&self, param: TuningParam) -> Option<f64> {
        self.params.get(&param).copied()
    }

    /// Query pairs in allow-list order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(param, value)| (param.as_str().to_string(), value.to_string()))
            .collect()
    }
}
