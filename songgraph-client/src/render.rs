//! Plain-text rendering of a playlist view

use crate::projector::{ProjectedTrack, Projection, ScatterPoint};
use crate::reconciler::{PlaylistView, SessionState};
use songgraph_common::Stage;
use std::fmt::Write;

const TITLE_WIDTH: usize = 32;
const ARTIST_WIDTH: usize = 24;
const SCATTER_WIDTH: usize = 60;
const SCATTER_HEIGHT: usize = 16;

/// Full screen: header, progress, table and (once loaded) the scatter
pub fn render(view: &PlaylistView, projection: &Projection) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} tracks, sentiment: {})",
        view.playlist_name,
        view.tracks.len(),
        projection.mode
    );
    let _ = writeln!(out, "{}", progress_line(view));
    out.push('\n');
    out.push_str(&table(&projection.rows));
    if projection.features_loaded {
        out.push('\n');
        out.push_str(&scatter(&projection.points));
    }
    out
}

/// One-line status: state plus per-stage counters
pub fn progress_line(view: &PlaylistView) -> String {
    let state = match &view.state {
        SessionState::Empty => "empty".to_string(),
        SessionState::Loading => "loading".to_string(),
        SessionState::Ready => "ready".to_string(),
        SessionState::Failed(message) => format!("failed: {}", message),
    };
    let mut line = format!("[{}]", state);
    for (stage, label) in [
        (Stage::AudioFeatures, "bpm"),
        (Stage::Lyrics, "lyrics"),
        (Stage::Sentiment, "sentiment"),
    ] {
        if let Some(counter) = view.stage(stage) {
            let _ = write!(line, " {} {}/{}", label, counter.current, counter.total);
        }
    }
    if let (SessionState::Loading, Some(message)) = (&view.state, &view.message) {
        let _ = write!(line, " - {}", message);
    }
    line
}

/// Track table; failed cells show `!` with their reason listed below
pub fn table(rows: &[ProjectedTrack]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<3} {:<tw$} {:<aw$} {:>7} {:>9}",
        "#",
        "Title",
        "Artists",
        "BPM",
        "Sentiment",
        tw = TITLE_WIDTH,
        aw = ARTIST_WIDTH
    );
    let mut warnings = Vec::new();

    for (index, row) in rows.iter().enumerate() {
        let tempo = cell(row.tempo, row.tempo_pending, row.tempo_warning.is_some(), 1);
        let sentiment = cell(
            row.sentiment,
            row.sentiment_pending,
            row.sentiment_warning.is_some(),
            2,
        );
        let _ = writeln!(
            out,
            "{:<3} {:<tw$} {:<aw$} {:>7} {:>9}",
            index + 1,
            truncate(&row.title, TITLE_WIDTH),
            truncate(&row.artists, ARTIST_WIDTH),
            tempo,
            sentiment,
            tw = TITLE_WIDTH,
            aw = ARTIST_WIDTH
        );
        if let Some(warning) = &row.tempo_warning {
            warnings.push(format!("{:<3} bpm: {}", index + 1, warning));
        }
        if let Some(warning) = &row.sentiment_warning {
            warnings.push(format!("{:<3} sentiment: {}", index + 1, warning));
        }
    }

    if !warnings.is_empty() {
        out.push('\n');
        for warning in warnings {
            let _ = writeln!(out, "! {}", warning);
        }
    }
    out
}

fn cell(value: Option<f64>, pending: bool, failed: bool, precision: usize) -> String {
    match (value, pending, failed) {
        (_, _, true) => "!".to_string(),
        (_, true, _) => "...".to_string(),
        (Some(value), _, _) => format!("{:.*}", precision, value),
        (None, _, _) => "-".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}

/// ASCII scatter of tempo (x) against displayed sentiment (y, 0..1)
pub fn scatter(points: &[ScatterPoint]) -> String {
    if points.is_empty() {
        return "(no tracks with both tempo and sentiment)\n".to_string();
    }
    let min_tempo = points.iter().map(|p| p.tempo).fold(f64::INFINITY, f64::min);
    let max_tempo = points.iter().map(|p| p.tempo).fold(f64::NEG_INFINITY, f64::max);
    let span = (max_tempo - min_tempo).max(1.0);

    let mut grid = vec![vec![' '; SCATTER_WIDTH]; SCATTER_HEIGHT];
    for point in points {
        let x = (((point.tempo - min_tempo) / span) * (SCATTER_WIDTH - 1) as f64).round() as usize;
        let y = ((1.0 - point.sentiment.clamp(0.0, 1.0)) * (SCATTER_HEIGHT - 1) as f64).round() as usize;
        let slot = &mut grid[y.min(SCATTER_HEIGHT - 1)][x.min(SCATTER_WIDTH - 1)];
        *slot = if *slot == ' ' { '*' } else { '#' };
    }

    let mut out = String::new();
    for (row, cells) in grid.iter().enumerate() {
        let label = match row {
            0 => "1.0",
            r if r == SCATTER_HEIGHT / 2 => "0.5",
            r if r == SCATTER_HEIGHT - 1 => "0.0",
            _ => "",
        };
        let line: String = cells.iter().collect();
        let _ = writeln!(out, "{:>4} |{}", label, line.trim_end());
    }
    let _ = writeln!(out, "     +{}", "-".repeat(SCATTER_WIDTH));
    let _ = writeln!(
        out,
        "      {:<w$}{:>6}",
        format!("{:.0} bpm", min_tempo),
        format!("{:.0} bpm", max_tempo),
        w = SCATTER_WIDTH - 6
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::{project, SentimentMode};
    use songgraph_common::{Resolution, Track};
    use std::sync::Arc;

    fn view(tracks: Vec<Track>) -> PlaylistView {
        PlaylistView {
            playlist_name: "Mix".to_string(),
            tracks: Arc::new(tracks),
            state: SessionState::Loading,
            ..Default::default()
        }
    }

    #[test]
    fn test_table_marks_failed_and_pending_cells() {
        let mut failed = Track::new("t1", "Song");
        failed.tempo = Resolution::Failed("No preview URL available".into());
        let pending = Track::new("t2", "Other");
        let projection = project(&[failed, pending], SentimentMode::Absolute);

        let text = table(&projection.rows);
        assert!(text.contains('!'));
        assert!(text.contains("..."));
        assert!(text.contains("bpm: No preview URL available"));
    }

    #[test]
    fn test_scatter_only_when_loaded() {
        let mut track = Track::new("t1", "Song");
        track.tempo = Resolution::Resolved(Some(120.0));
        let unloaded = view(vec![track.clone()]);
        let text = render(&unloaded, &project(&unloaded.tracks, SentimentMode::Absolute));
        assert!(!text.contains("bpm\n"));

        track.sentiment = Resolution::Resolved(Some(0.8));
        let loaded = view(vec![track]);
        let text = render(&loaded, &project(&loaded.tracks, SentimentMode::Absolute));
        assert!(text.contains('*'));
        assert!(text.contains("120 bpm"));
    }

    #[test]
    fn test_truncate_long_titles() {
        assert_eq!(truncate("abcdef", 4), "abc~");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
