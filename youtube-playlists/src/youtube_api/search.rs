//! YouTube Search API types.

use crate::youtube_api::types::PageInfo;
use serde::{Deserialize, Serialize};

/// Response structure for the `search.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/search/list>
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
    #[serde(rename = "pageInfo", default)]
    pub page_info: PageInfo,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A single search hit. Depending on its kind it points at a video, channel or playlist.
///
/// See: <https://developers.google.com/youtube/v3/docs/search#resource>
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: SearchResultId,
    pub snippet: SearchResultSnippet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultId {
    /// The type of the matched resource, e.g. `youtube#video`.
    pub kind: String,
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResultSnippet {
    pub title: String,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: String,
}

/// A video candidate offered to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
}

impl SearchResult {
    /// Projects the hit onto a [`VideoResult`], or `None` if it is not a video.
    pub fn into_video(self) -> Option<VideoResult> {
        Some(VideoResult {
            video_id: self.id.video_id?,
            title: self.snippet.title,
            channel_title: self.snippet.channel_title,
        })
    }
}
