use std::time::Duration;

use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{AUTHORIZATION, CONTENT_LENGTH},
    StatusCode,
};
use serde::Deserialize;
use thiserror::Error;

use crate::{config::SpotifyConfig, metadata::TrackInfo};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("playback service answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("access token rejected")]
    Unauthorized,
    #[error("no access token configured")]
    MissingToken,
    #[error("nothing is playing")]
    NotPlaying,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Remote music player. Every call may block on the network and must only
/// be made from a worker thread.
pub trait PlaybackService: Send + Sync {
    fn fetch_now_playing(&self) -> Result<TrackInfo, PlaybackError>;
    fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, PlaybackError>;
    fn resume(&self) -> Result<(), PlaybackError>;
    fn pause(&self) -> Result<(), PlaybackError>;
    fn next_track(&self) -> Result<(), PlaybackError>;
    fn previous_track(&self) -> Result<(), PlaybackError>;
}

/// Spotify Web API client authenticated with an externally obtained bearer token.
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl SpotifyClient {
    pub fn new(config: &SpotifyConfig, timeout: Duration) -> Result<Self, PlaybackError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("record_spinner/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            token: config.access_token.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, PlaybackError> {
        let token = self.token.as_deref().ok_or(PlaybackError::MissingToken)?;
        Ok(request.header(AUTHORIZATION, format!("Bearer {token}")))
    }

    fn command(&self, request: RequestBuilder) -> Result<(), PlaybackError> {
        let response = self.authorized(request.header(CONTENT_LENGTH, 0))?.send()?;
        check_status(response).map(|_| ())
    }
}

impl PlaybackService for SpotifyClient {
    fn fetch_now_playing(&self) -> Result<TrackInfo, PlaybackError> {
        let request = self.http.get(self.endpoint("me/player/currently-playing"));
        let response = check_status(self.authorized(request)?.send()?)?;
        if response.status() == StatusCode::NO_CONTENT {
            return Err(PlaybackError::NotPlaying);
        }
        let body = response.text()?;
        parse_currently_playing(&body)
    }

    fn fetch_cover(&self, url: &str) -> Result<Vec<u8>, PlaybackError> {
        let response = check_status(self.http.get(url).send()?)?;
        Ok(response.bytes()?.to_vec())
    }

    fn resume(&self) -> Result<(), PlaybackError> {
        self.command(self.http.put(self.endpoint("me/player/play")))
    }

    fn pause(&self) -> Result<(), PlaybackError> {
        self.command(self.http.put(self.endpoint("me/player/pause")))
    }

    fn next_track(&self) -> Result<(), PlaybackError> {
        self.command(self.http.post(self.endpoint("me/player/next")))
    }

    fn previous_track(&self) -> Result<(), PlaybackError> {
        self.command(self.http.post(self.endpoint("me/player/previous")))
    }
}

fn check_status(response: Response) -> Result<Response, PlaybackError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(PlaybackError::Unauthorized);
    }
    let body = response.text().unwrap_or_default();
    Err(PlaybackError::Status { status, body })
}

#[derive(Debug, Deserialize)]
struct CurrentlyPlaying {
    item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
struct PlayingItem {
    name: String,
    #[serde(default)]
    artists: Vec<NamedEntity>,
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<AlbumImage>,
}

#[derive(Debug, Deserialize)]
struct AlbumImage {
    url: String,
}

fn parse_currently_playing(body: &str) -> Result<TrackInfo, PlaybackError> {
    if body.trim().is_empty() {
        return Err(PlaybackError::NotPlaying);
    }
    let doc: CurrentlyPlaying =
        serde_json::from_str(body).map_err(|e| PlaybackError::Malformed(e.to_string()))?;
    let item = doc.item.ok_or(PlaybackError::NotPlaying)?;

    let artist = item
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    // Spotify lists cover sizes largest first
    let album_cover_url = item
        .album
        .and_then(|album| album.images.into_iter().next())
        .map(|image| image.url)
        .unwrap_or_default();

    Ok(TrackInfo {
        title: item.name,
        artist,
        album_cover_url,
    })
}
