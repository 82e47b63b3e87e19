//! Authenticated access to the YouTube Data API and the playlist operations built on it.

use crate::credentials::{Credential, CredentialStore};
use crate::oauth::OAuthManager;
use crate::youtube_api::playlists::{
    Playlist, PlaylistInsertRequest, PlaylistItemInsertRequest, PlaylistListResponse,
    PlaylistResource, PlaylistSnippet, PlaylistStatus,
};
use crate::youtube_api::search::{SearchListResponse, VideoResult};
use crate::youtube_api::types::PagedStream;
use eyre::Context;
use http::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

/// Largest page size `playlists.list` accepts.
const PLAYLIST_PAGE_SIZE: u32 = 50;

/// A non-success HTTP response from the YouTube API.
///
/// Travels inside an [`eyre::Report`]; use [`ApiError::find`] to get at it.
#[derive(Debug, Error)]
#[error("YouTube API {method} request to {url} failed with status {status}: {body}")]
pub struct ApiError {
    pub method: Method,
    pub url: String,
    pub status: reqwest::StatusCode,
    pub body: String,
}

impl ApiError {
    /// Finds the API error anywhere in the report's chain.
    pub fn find(report: &eyre::Report) -> Option<&ApiError> {
        report.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
    }

    /// A one-line, user-facing account of why an operation failed.
    pub fn describe(report: &eyre::Report) -> String {
        match Self::find(report) {
            Some(api) => format!(
                "An HTTP error {} occurred: {}",
                api.status.as_u16(),
                api.body
            ),
            None => format!("{report:#}"),
        }
    }
}

/// An authenticated session with the YouTube Data API.
///
/// The session is bound to one [`Credential`]. Should the access token expire while the session
/// is in use, it is refreshed before the next request and the new credential persisted.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    credential: Arc<Mutex<Credential>>,
    oauth_manager: Arc<OAuthManager>,
    store: Arc<CredentialStore>,
    client: reqwest::Client,
    api_base: String,
}

impl YouTubeClient {
    /// Wraps a validated credential into a session.
    ///
    /// `api_base` is the URL prefix of the Data API, normally
    /// `https://www.googleapis.com/youtube/v3`.
    pub fn new(
        credential: Credential,
        oauth_manager: Arc<OAuthManager>,
        store: Arc<CredentialStore>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> eyre::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build YouTube API HTTP client")?;
        Ok(Self {
            credential: Arc::new(Mutex::new(credential)),
            oauth_manager,
            store,
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns a copy of the credential currently backing the session.
    pub async fn credential(&self) -> Credential {
        self.credential.lock().await.clone()
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/{}", self.api_base, resource)
    }

    /// Gets an access token that is not about to expire, refreshing it if needed.
    #[instrument(skip(self))]
    async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut credential = self.credential.lock().await;
        if !credential.is_valid() {
            tracing::debug!("access token expired, attempting refresh");
            let Some(refreshed) = self
                .oauth_manager
                .refresh_token(&credential)
                .await
                .context("refresh expired access token")?
            else {
                tracing::error!("access token refresh failed, session is unusable");
                eyre::bail!("Unable to refresh expired access token");
            };
            *credential = refreshed;
            if let Err(e) = self.store.save(&credential).await {
                tracing::warn!("could not persist refreshed credential: {e:#}");
            }
        }
        Ok(credential.access_token.clone())
    }

    /// Makes an authenticated request, turning non-2xx responses into an [`ApiError`].
    #[instrument(skip(self, json_body), level = "trace")]
    async fn make_authenticated_request(
        &self,
        method: Method,
        resource: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let access_token = self.fresh_access_token().await?;
        let url = self.url(resource);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(access_token)
            .query(query_params);
        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("send {method} request to YouTube API: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ApiError {
                method,
                url,
                status,
                body,
            }
            .into());
        }

        Ok(response)
    }

    /// Returns a paginated stream of the authenticated user's playlists, in the order the API
    /// returns them.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/list>
    pub fn list_my_playlists(&self) -> impl Stream<Item = eyre::Result<Playlist>> + use<'_> {
        PagedStream::new(|page_token| async {
            let response = self
                .list_playlists_internal(PLAYLIST_PAGE_SIZE, page_token)
                .await?;
            let playlists = response.items.into_iter().map(Playlist::from).collect();
            Ok((playlists, response.next_page_token))
        })
    }

    /// Fetches every playlist of the authenticated user.
    ///
    /// A failure on any page fails the whole listing, a truncated list is never returned.
    #[instrument(skip(self))]
    pub async fn list_playlists(&self) -> eyre::Result<Vec<Playlist>> {
        let playlists: Vec<Playlist> = self
            .list_my_playlists()
            .collect::<eyre::Result<_>>()
            .await
            .context("list playlists")?;
        tracing::debug!(count = playlists.len(), "listed playlists");
        Ok(playlists)
    }

    /// Creates a playlist and returns its id.
    ///
    /// `privacy` is sent as given. Values other than `public`, `private` and `unlisted` are
    /// rejected by the API, not here.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/insert>
    #[instrument(skip(self, description), ret)]
    pub async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: &str,
    ) -> eyre::Result<String> {
        let body = PlaylistInsertRequest {
            snippet: PlaylistSnippet {
                title: title.to_string(),
                description: description.to_string(),
            },
            status: PlaylistStatus {
                privacy_status: privacy.to_string(),
            },
        };

        let response = self
            .make_authenticated_request(
                Method::POST,
                "playlists",
                &[("part", "snippet,status")],
                Some(&body),
            )
            .await?;

        let playlist: PlaylistResource = response
            .json()
            .await
            .context("parse YouTube playlists.insert response as JSON")?;

        tracing::info!(
            playlist_id = playlist.id,
            title = playlist.snippet.title,
            "created playlist"
        );
        Ok(playlist.id)
    }

    /// Deletes a playlist.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlists/delete>
    #[instrument(skip(self))]
    pub async fn delete_playlist(&self, playlist_id: &str) -> eyre::Result<()> {
        self.make_authenticated_request(
            Method::DELETE,
            "playlists",
            &[("id", playlist_id)],
            None::<&()>,
        )
        .await?;

        tracing::info!(playlist_id, "deleted playlist");
        Ok(())
    }

    /// Searches for long videos matching `query`, returning a single page of results.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/search/list>
    #[instrument(skip(self))]
    pub async fn try_search_videos(
        &self,
        query: &str,
        max_results: u32,
    ) -> eyre::Result<Vec<VideoResult>> {
        let max_results = max_results.to_string();
        let query_params = [
            ("part", "snippet"),
            ("q", query),
            ("type", "video"),
            ("videoDuration", "long"),
            ("maxResults", max_results.as_str()),
        ];

        let response = self
            .make_authenticated_request(Method::GET, "search", &query_params, None::<&()>)
            .await?;

        let results: SearchListResponse = response
            .json()
            .await
            .context("parse YouTube search API response as JSON")?;

        tracing::debug!(
            total_results = results.page_info.total_results,
            returned_items = results.items.len(),
            "searched videos"
        );

        Ok(results
            .items
            .into_iter()
            .filter_map(|item| item.into_video())
            .collect())
    }

    /// Like [`Self::try_search_videos`], but a failed search just yields no candidates.
    pub async fn search_videos(&self, query: &str, max_results: u32) -> Vec<VideoResult> {
        match self.try_search_videos(query, max_results).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::warn!(query, "video search failed: {e:#}");
                Vec::new()
            }
        }
    }

    /// Adds a video at the top of a playlist.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
    #[instrument(skip(self))]
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> eyre::Result<()> {
        let body = PlaylistItemInsertRequest::video_at_head(playlist_id, video_id);
        self.make_authenticated_request(
            Method::POST,
            "playlistItems",
            &[("part", "snippet")],
            Some(&body),
        )
        .await?;

        tracing::debug!(playlist_id, video_id, "added video to playlist");
        Ok(())
    }

    async fn list_playlists_internal(
        &self,
        max_results: u32,
        page_token: Option<String>,
    ) -> eyre::Result<PlaylistListResponse> {
        let max_results_string = max_results.to_string();
        let mut query_params = vec![
            ("part", "snippet,contentDetails"),
            ("mine", "true"),
            ("maxResults", max_results_string.as_str()),
        ];
        if let Some(ref token) = page_token {
            query_params.push(("pageToken", token.as_str()));
        }

        let response = self
            .make_authenticated_request(Method::GET, "playlists", &query_params, None::<&()>)
            .await?;

        let playlists: PlaylistListResponse = response
            .json()
            .await
            .context("parse YouTube playlists API response as JSON")?;

        tracing::debug!(
            total_results = playlists.page_info.total_results,
            returned_items = playlists.items.len(),
            "fetched playlists page"
        );

        Ok(playlists)
    }
}
