//! YouTube Data API v3 client, limited to the resources needed to manage playlists.
//!
//! All requests go through [`YouTubeClient`], which keeps the access token fresh and turns
//! non-success responses into [`ApiError`]s.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tokio_stream::StreamExt;
//! use youtube_playlists::youtube_api::YouTubeClient;
//!
//! # async fn example(client: YouTubeClient) -> eyre::Result<()> {
//! let mut playlists = std::pin::pin!(client.list_my_playlists());
//! while let Some(playlist) = playlists.next().await {
//!     let playlist = playlist?;
//!     println!("{} ({} videos)", playlist.title, playlist.item_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod playlists;
pub mod search;
pub mod types;

pub use client::{ApiError, YouTubeClient};
pub use playlists::Playlist;
pub use search::VideoResult;
pub use types::{PageInfo, PagedStream, PrivacyStatus};
