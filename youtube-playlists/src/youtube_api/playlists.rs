//! YouTube Playlists and PlaylistItems API types.

use crate::youtube_api::types::PageInfo;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Response structure for the `playlists.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistListResponse {
    /// A list of playlists that match the request criteria.
    #[serde(default)]
    pub items: VecDeque<PlaylistResource>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    /// Token for the next page in the result set.
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A `playlist` resource as returned by the API.
///
/// Which of the optional parts are present depends on the `part` parameter of the request.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistResource {
    pub id: String,
    pub snippet: PlaylistSnippet,
    #[serde(rename = "contentDetails", default)]
    pub content_details: Option<PlaylistContentDetails>,
    #[serde(default)]
    pub status: Option<PlaylistStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistContentDetails {
    /// The number of videos in the playlist.
    #[serde(rename = "itemCount")]
    pub item_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistStatus {
    /// One of `public`, `private` or `unlisted`.
    ///
    /// Kept as a string: values are sent exactly as the caller gave them.
    #[serde(rename = "privacyStatus")]
    pub privacy_status: String,
}

/// Body of a `playlists.insert` request.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlists/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistInsertRequest {
    pub snippet: PlaylistSnippet,
    pub status: PlaylistStatus,
}

/// A playlist as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub description: String,
    pub item_count: u32,
}

impl From<PlaylistResource> for Playlist {
    fn from(resource: PlaylistResource) -> Self {
        Self {
            id: resource.id,
            title: resource.snippet.title,
            description: resource.snippet.description,
            item_count: resource
                .content_details
                .map(|details| details.item_count)
                .unwrap_or(0),
        }
    }
}

/// Body of a `playlistItems.insert` request.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems/insert>
#[derive(Debug, Serialize)]
pub struct PlaylistItemInsertRequest {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Serialize)]
pub struct PlaylistItemSnippet {
    #[serde(rename = "playlistId")]
    pub playlist_id: String,
    /// Zero-based position in the playlist, `0` puts the video at the top.
    pub position: u32,
    #[serde(rename = "resourceId")]
    pub resource_id: ResourceId,
}

#[derive(Debug, Serialize)]
pub struct ResourceId {
    /// Always `youtube#video` for playlist items added here.
    pub kind: String,
    #[serde(rename = "videoId")]
    pub video_id: String,
}

impl PlaylistItemInsertRequest {
    /// A request that puts `video_id` at the head of `playlist_id`.
    pub fn video_at_head(playlist_id: &str, video_id: &str) -> Self {
        Self {
            snippet: PlaylistItemSnippet {
                playlist_id: playlist_id.to_string(),
                position: 0,
                resource_id: ResourceId {
                    kind: "youtube#video".to_string(),
                    video_id: video_id.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_projection() {
        let resource: PlaylistResource = serde_json::from_value(serde_json::json!({
            "kind": "youtube#playlist",
            "etag": "x",
            "id": "PL123",
            "snippet": {
                "title": "Ambient",
                "description": "calm",
                "publishedAt": "2020-01-01T00:00:00Z"
            },
            "contentDetails": {"itemCount": 7}
        }))
        .unwrap();

        assert_eq!(
            Playlist::from(resource),
            Playlist {
                id: "PL123".to_string(),
                title: "Ambient".to_string(),
                description: "calm".to_string(),
                item_count: 7,
            }
        );
    }

    #[test]
    fn test_insert_response_without_content_details() {
        let resource: PlaylistResource = serde_json::from_value(serde_json::json!({
            "id": "PLnew",
            "snippet": {"title": "New"},
            "status": {"privacyStatus": "private"}
        }))
        .unwrap();

        let playlist = Playlist::from(resource);
        assert_eq!(playlist.item_count, 0);
        assert_eq!(playlist.description, "");
    }

    #[test]
    fn test_playlist_item_body_shape() {
        let body = serde_json::to_value(PlaylistItemInsertRequest::video_at_head("PL1", "vid1"))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "snippet": {
                    "playlistId": "PL1",
                    "position": 0,
                    "resourceId": {"kind": "youtube#video", "videoId": "vid1"}
                }
            })
        );
    }
}
