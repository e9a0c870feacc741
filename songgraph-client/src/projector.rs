//! Derived View Projector
//!
//! Pure projection of a track list into display rows and scatter points.
//! The sentiment mode only changes how resolved scores are displayed, so
//! switching it never needs the network.

use serde::Serialize;
use songgraph_common::{Resolution, Track};
use std::fmt;
use std::str::FromStr;

/// How a raw sentiment score is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentMode {
    /// Robust-normalized against the playlist
    #[default]
    Relative,
    /// Raw model valence
    Absolute,
}

impl SentimentMode {
    pub fn toggle(self) -> Self {
        match self {
            SentimentMode::Relative => SentimentMode::Absolute,
            SentimentMode::Absolute => SentimentMode::Relative,
        }
    }
}

impl fmt::Display for SentimentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentMode::Relative => write!(f, "relative"),
            SentimentMode::Absolute => write!(f, "absolute"),
        }
    }
}

impl FromStr for SentimentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relative" => Ok(SentimentMode::Relative),
            "absolute" => Ok(SentimentMode::Absolute),
            other => Err(format!("unknown sentiment mode: {}", other)),
        }
    }
}

/// One display row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedTrack {
    pub track_id: String,
    pub title: String,
    pub artists: String,
    pub tempo: Option<f64>,
    /// Sentiment after the mode is applied
    pub sentiment: Option<f64>,
    pub raw_sentiment: Option<f64>,
    pub tempo_pending: bool,
    pub sentiment_pending: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment_warning: Option<String>,
}

/// Point of the tempo × sentiment scatter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub track_id: String,
    pub label: String,
    pub tempo: f64,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub mode: SentimentMode,
    pub rows: Vec<ProjectedTrack>,
    pub points: Vec<ScatterPoint>,
    pub features_loaded: bool,
}

/// Project `tracks` for display in `mode`
pub fn project(tracks: &[Track], mode: SentimentMode) -> Projection {
    let scores: Vec<f64> = tracks.iter().filter_map(|t| t.sentiment.value()).collect();
    let normalizer = Normalizer::new(&scores);

    let rows: Vec<ProjectedTrack> = tracks
        .iter()
        .map(|track| {
            let raw = track.sentiment.value();
            let sentiment = raw.map(|s| match mode {
                SentimentMode::Absolute => s,
                SentimentMode::Relative => normalizer.apply(s),
            });
            ProjectedTrack {
                track_id: track.track_id.clone(),
                title: track.title.clone(),
                artists: track.artists.join(", "),
                tempo: track.tempo.value(),
                sentiment,
                raw_sentiment: raw,
                tempo_pending: !track.tempo.is_settled(),
                sentiment_pending: !track.sentiment.is_settled(),
                tempo_warning: warning(&track.tempo),
                sentiment_warning: warning(&track.sentiment),
            }
        })
        .collect();

    let points = rows
        .iter()
        .filter_map(|row| {
            Some(ScatterPoint {
                track_id: row.track_id.clone(),
                label: row.title.clone(),
                tempo: row.tempo?,
                sentiment: row.sentiment?,
            })
        })
        .collect();

    Projection {
        mode,
        rows,
        points,
        features_loaded: crate::reconciler::all_features_loaded(tracks),
    }
}

fn warning(resolution: &Resolution<f64>) -> Option<String> {
    resolution.error().map(str::to_string)
}

/// Median/IQR sigmoid normalization fitted to one set of scores
#[derive(Debug, Clone, Copy, PartialEq)]
enum Normalizer {
    Identity,
    Flat,
    Sigmoid { median: f64, iqr: f64 },
}

impl Normalizer {
    fn new(scores: &[f64]) -> Self {
        if scores.len() < 2 {
            return Normalizer::Identity;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);
        let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
        if iqr < 1e-6 {
            return Normalizer::Flat;
        }
        Normalizer::Sigmoid {
            median: percentile(&sorted, 0.5),
            iqr,
        }
    }

    fn apply(self, score: f64) -> f64 {
        match self {
            Normalizer::Identity => score,
            Normalizer::Flat => 0.5,
            Normalizer::Sigmoid { median, iqr } => {
                let z = (score - median) / iqr;
                1.0 / (1.0 + (-z).exp())
            }
        }
    }
}

/// Linear-interpolated percentile of a sorted, non-empty slice
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, tempo: Option<f64>, sentiment: Resolution<f64>) -> Track {
        let mut track = Track::new(id, id.to_uppercase());
        track.tempo = match tempo {
            Some(bpm) => Resolution::Resolved(Some(bpm)),
            None => Resolution::Unresolved,
        };
        track.sentiment = sentiment;
        track
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [0.1, 0.5, 0.9];
        assert!((percentile(&sorted, 0.25) - 0.3).abs() < 1e-12);
        assert!((percentile(&sorted, 0.5) - 0.5).abs() < 1e-12);
        assert!((percentile(&sorted, 0.75) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_relative_mode_is_monotonic_and_centered() {
        let tracks = vec![
            scored("a", Some(120.0), Resolution::Resolved(Some(0.9))),
            scored("b", Some(95.5), Resolution::Resolved(Some(0.5))),
            scored("c", Some(140.0), Resolution::Resolved(Some(0.1))),
        ];
        let projection = project(&tracks, SentimentMode::Relative);
        let shown: Vec<f64> = projection.rows.iter().filter_map(|r| r.sentiment).collect();

        assert!((shown[1] - 0.5).abs() < 1e-12);
        assert!(shown[0] > shown[1] && shown[1] > shown[2]);
        // z = 0.4 / 0.4 = 1
        assert!((shown[0] - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);
        assert_eq!(projection.points.len(), 3);
        assert!(projection.features_loaded);
    }

    #[test]
    fn test_single_score_is_shown_raw() {
        let tracks = vec![scored("a", None, Resolution::Resolved(Some(0.8)))];
        let projection = project(&tracks, SentimentMode::Relative);
        assert_eq!(projection.rows[0].sentiment, Some(0.8));
        assert!(projection.points.is_empty());
        assert!(!projection.features_loaded);
    }

    #[test]
    fn test_identical_scores_display_half() {
        let tracks = vec![
            scored("a", Some(100.0), Resolution::Resolved(Some(0.7))),
            scored("b", Some(110.0), Resolution::Resolved(Some(0.7))),
        ];
        let projection = project(&tracks, SentimentMode::Relative);
        assert!(projection.rows.iter().all(|r| r.sentiment == Some(0.5)));
    }

    #[test]
    fn test_absolute_mode_and_warnings() {
        let tracks = vec![
            scored("a", Some(100.0), Resolution::Resolved(Some(0.2))),
            scored("b", Some(110.0), Resolution::Failed("lyrics not found".into())),
        ];
        let projection = project(&tracks, SentimentMode::Absolute);
        assert_eq!(projection.rows[0].sentiment, Some(0.2));
        assert_eq!(projection.rows[1].sentiment, None);
        assert_eq!(
            projection.rows[1].sentiment_warning.as_deref(),
            Some("lyrics not found")
        );
        assert_eq!(projection.points.len(), 1);
        assert!(projection.features_loaded);
    }

    #[test]
    fn test_mode_parse_and_toggle() {
        assert_eq!("Absolute".parse::<SentimentMode>(), Ok(SentimentMode::Absolute));
        assert!("loud".parse::<SentimentMode>().is_err());
        assert_eq!(SentimentMode::Relative.toggle(), SentimentMode::Absolute);
        assert_eq!(SentimentMode::Absolute.to_string(), "absolute");
    }
}
