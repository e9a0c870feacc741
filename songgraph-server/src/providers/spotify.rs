//! Spotify Web API playlist source
//!
//! Client-credentials flow: the app token is fetched on first use and
//! cached until shortly before it expires. The same token serves the
//! track search used to find preview clips missing from playlist listings.

use super::{error_for_status, http_client, PlaylistSource, PreviewFinder, ProviderError};
use crate::config::SpotifySettings;
use async_trait::async_trait;
use serde::Deserialize;
use songgraph_common::{PlaylistMetadata, Track};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Refresh the token this long before Spotify says it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(30);
const PAGE_LIMIT: u32 = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize)]
struct SpotifyImage {
    url: String,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifyOwner {
    display_name: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifyFollowers {
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifyTrackCount {
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylist {
    #[serde(default)]
    name: String,
    description: Option<String>,
    #[serde(default)]
    images: Option<Vec<SpotifyImage>>,
    #[serde(default)]
    owner: Option<SpotifyOwner>,
    #[serde(default)]
    tracks: Option<SpotifyTrackCount>,
    #[serde(default)]
    public: Option<bool>,
    #[serde(default)]
    followers: Option<SpotifyFollowers>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    release_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifyExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    album: Option<SpotifyAlbum>,
    #[serde(default)]
    duration_ms: u64,
    popularity: Option<u32>,
    #[serde(default)]
    external_urls: Option<SpotifyExternalUrls>,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPlaylistItem {
    track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyPage {
    #[serde(default)]
    items: Vec<SpotifyPlaylistItem>,
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SpotifySearchTracks {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifySearch {
    #[serde(default)]
    tracks: Option<SpotifySearchTracks>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    settings: SpotifySettings,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(settings: SpotifySettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http_client: http_client(30)?,
            settings,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let (client_id, client_secret) = match (
            self.settings.client_id.as_deref(),
            self.settings.client_secret.as_deref(),
        ) {
            (Some(id), Some(secret)) => (id, secret),
            _ => {
                return Err(ProviderError::Unavailable(
                    "Spotify credentials not configured (SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET)"
                        .to_string(),
                ))
            }
        };

        debug!("Requesting Spotify access token");
        let response = self
            .http_client
            .post(format!("{}/api/token", self.settings.accounts_base))
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_REFRESH_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        playlist_id: &str,
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self.http_client.get(url).bearer_auth(token).send().await?;

        match response.status().as_u16() {
            200..=299 => Ok(response.json().await?),
            404 => Err(ProviderError::NotFound(format!(
                "Playlist not found: {}",
                playlist_id
            ))),
            400 => Err(ProviderError::InvalidInput(format!(
                "Invalid playlist id: {}",
                playlist_id
            ))),
            _ => Err(error_for_status(response).await),
        }
    }

    async fn playlist(&self, playlist_id: &str) -> Result<SpotifyPlaylist, ProviderError> {
        let url = format!("{}/playlists/{}", self.settings.api_base, playlist_id);
        self.get_json(&url, playlist_id).await
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn metadata(&self, playlist_url: &str) -> Result<PlaylistMetadata, ProviderError> {
        let playlist_id = extract_playlist_id(playlist_url)?;
        let playlist = self.playlist(&playlist_id).await?;
        Ok(metadata_from(playlist_id, playlist))
    }

    async fn tracks(&self, playlist_url: &str) -> Result<(Vec<Track>, String), ProviderError> {
        let playlist_id = extract_playlist_id(playlist_url)?;
        let playlist = self.playlist(&playlist_id).await?;

        let mut tracks = Vec::new();
        let mut next = Some(format!(
            "{}/playlists/{}/tracks?limit={}",
            self.settings.api_base, playlist_id, PAGE_LIMIT
        ));
        while let Some(url) = next {
            let page: SpotifyPage = self.get_json(&url, &playlist_id).await?;
            tracks.extend(page.items.into_iter().filter_map(track_from));
            next = page.next;
        }

        debug!(playlist_id = %playlist_id, tracks = tracks.len(), "Fetched playlist tracks");
        Ok((tracks, playlist.name))
    }
}

#[async_trait]
impl PreviewFinder for SpotifyClient {
    async fn find_preview(&self, track: &Track) -> Result<Option<String>, ProviderError> {
        let query = search_query(track);
        let token = self.access_token().await?;
        let response = self
            .http_client
            .get(format!("{}/search", self.settings.api_base))
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let results: SpotifySearch = response.json().await?;
        let preview = preview_from_search(results);
        debug!(track_id = %track.track_id, query = %query, found = preview.is_some(), "Preview search");
        Ok(preview)
    }
}

/// "title artist" search text for a track
fn search_query(track: &Track) -> String {
    match track.primary_artist() {
        Some(artist) => format!("{} {}", track.title, artist),
        None => track.title.clone(),
    }
}

fn preview_from_search(results: SpotifySearch) -> Option<String> {
    results
        .tracks?
        .items
        .into_iter()
        .next()?
        .preview_url
        .filter(|url| !url.is_empty())
}

/// Playlist id from a share URL, a `spotify:playlist:` URI or a bare id
pub fn extract_playlist_id(playlist_url: &str) -> Result<String, ProviderError> {
    let trimmed = playlist_url.trim();
    let id = if trimmed.contains("spotify.com") {
        trimmed
            .rsplit("playlist/")
            .next()
            .unwrap_or_default()
            .split(['?', '#', '/'])
            .next()
            .unwrap_or_default()
    } else if let Some(rest) = trimmed.strip_prefix("spotify:playlist:") {
        rest
    } else {
        trimmed
    };

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ProviderError::InvalidInput(format!(
            "Not a Spotify playlist: {}",
            playlist_url
        )));
    }
    Ok(id.to_string())
}

/// Album art: 300 px if present, else the first larger image, else the first image
fn album_art_url(images: &[SpotifyImage]) -> Option<String> {
    images
        .iter()
        .find(|img| img.height == Some(300))
        .or_else(|| images.iter().find(|img| img.height.is_some_and(|h| h > 300)))
        .or_else(|| images.first())
        .map(|img| img.url.clone())
}

fn metadata_from(playlist_id: String, playlist: SpotifyPlaylist) -> PlaylistMetadata {
    let owner = playlist.owner.unwrap_or_default();
    PlaylistMetadata {
        playlist_id,
        name: playlist.name,
        description: playlist.description,
        thumbnail_url: playlist
            .images
            .unwrap_or_default()
            .first()
            .map(|img| img.url.clone()),
        owner: owner.display_name.filter(|n| !n.is_empty()).or(owner.id),
        total_tracks: playlist.tracks.unwrap_or_default().total,
        public: playlist.public.unwrap_or(false),
        followers: playlist.followers.unwrap_or_default().total,
    }
}

fn track_from(item: SpotifyPlaylistItem) -> Option<Track> {
    let track = item.track?;
    let track_id = track.id.filter(|id| !id.is_empty())?;
    let (album, album_art_url, album_release_date) = match track.album {
        Some(album) => (album.name, album_art_url(&album.images), album.release_date),
        None => (String::new(), None, None),
    };

    let mut result = Track::new(track_id, track.name);
    result.artists = track.artists.into_iter().map(|a| a.name).collect();
    result.album = album;
    result.album_art_url = album_art_url;
    result.album_release_date = album_release_date;
    result.duration_ms = track.duration_ms;
    result.popularity = track.popularity;
    result.track_url = track.external_urls.and_then(|urls| urls.spotify);
    result.preview_url = track.preview_url;
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_playlist_id_forms() {
        assert_eq!(
            extract_playlist_id("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc")
                .unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(
            extract_playlist_id("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M").unwrap(),
            "37i9dQZF1DXcBWIGoYBM5M"
        );
        assert_eq!(extract_playlist_id(" abc123 ").unwrap(), "abc123");
        assert!(matches!(
            extract_playlist_id("https://example.com/not a playlist"),
            Err(ProviderError::InvalidInput(_))
        ));
        assert!(extract_playlist_id("").is_err());
    }

    #[test]
    fn test_album_art_preference() {
        let images = |heights: &[Option<u32>]| -> Vec<SpotifyImage> {
            heights
                .iter()
                .enumerate()
                .map(|(i, h)| SpotifyImage {
                    url: format!("img{}", i),
                    height: *h,
                })
                .collect()
        };
        assert_eq!(
            album_art_url(&images(&[Some(640), Some(300), Some(64)])).as_deref(),
            Some("img1")
        );
        assert_eq!(
            album_art_url(&images(&[Some(64), Some(640)])).as_deref(),
            Some("img1")
        );
        assert_eq!(album_art_url(&images(&[Some(64), None])).as_deref(), Some("img0"));
        assert_eq!(album_art_url(&[]), None);
    }

    #[test]
    fn test_track_from_skips_missing_ids() {
        let page: SpotifyPage = serde_json::from_value(json!({
            "items": [
                {"track": null},
                {"track": {"id": null, "name": "Local file"}},
                {"track": {
                    "id": "abc",
                    "name": "Song",
                    "artists": [{"name": "A"}, {"name": "B"}],
                    "album": {"name": "LP", "images": [{"url": "u", "height": 300}], "release_date": "2020-01-01"},
                    "duration_ms": 215000,
                    "popularity": 50,
                    "external_urls": {"spotify": "https://open.spotify.com/track/abc"},
                    "preview_url": null
                }}
            ],
            "next": null
        }))
        .unwrap();

        let tracks: Vec<Track> = page.items.into_iter().filter_map(track_from).collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, "abc");
        assert_eq!(tracks[0].artists, vec!["A", "B"]);
        assert_eq!(tracks[0].album_art_url.as_deref(), Some("u"));
        assert!(!tracks[0].tempo.is_settled());
    }

    #[test]
    fn test_preview_from_search_takes_top_hit() {
        let found: SpotifySearch = serde_json::from_value(json!({
            "tracks": {"items": [
                {"id": "x1", "name": "Song", "preview_url": "https://p.scdn.co/mp3-preview/x1"},
                {"id": "x2", "name": "Song (Live)", "preview_url": "https://p.scdn.co/mp3-preview/x2"}
            ]}
        }))
        .unwrap();
        assert_eq!(
            preview_from_search(found).as_deref(),
            Some("https://p.scdn.co/mp3-preview/x1")
        );

        let no_preview: SpotifySearch = serde_json::from_value(json!({
            "tracks": {"items": [{"id": "x1", "name": "Song", "preview_url": null}]}
        }))
        .unwrap();
        assert_eq!(preview_from_search(no_preview), None);

        let empty: SpotifySearch = serde_json::from_value(json!({})).unwrap();
        assert_eq!(preview_from_search(empty), None);
    }

    #[test]
    fn test_search_query_uses_title_and_primary_artist() {
        let mut track = Track::new("t", "Blue Monday");
        assert_eq!(search_query(&track), "Blue Monday");
        track.artists = vec!["New Order".to_string(), "Guest".to_string()];
        assert_eq!(search_query(&track), "Blue Monday New Order");
    }

    #[test]
    fn test_metadata_owner_falls_back_to_id() {
        let playlist: SpotifyPlaylist = serde_json::from_value(json!({
            "name": "Road Trip",
            "owner": {"display_name": null, "id": "user42"},
            "tracks": {"total": 12},
            "followers": {"total": 7}
        }))
        .unwrap();
        let metadata = metadata_from("pl".to_string(), playlist);
        assert_eq!(metadata.owner.as_deref(), Some("user42"));
        assert_eq!(metadata.total_tracks, 12);
        assert_eq!(metadata.followers, 7);
        assert!(!metadata.public);
    }
}
