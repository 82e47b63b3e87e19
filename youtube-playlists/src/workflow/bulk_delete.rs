//! Deleting every playlist of the account in one go.

use crate::console::{Console, confirm};
use crate::youtube_api::{ApiError, YouTubeClient};

/// What the user has to type, verbatim, before anything is deleted.
pub const CONFIRMATION_PHRASE: &str = "DELETE ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkDeleteOutcome {
    /// The playlists could not be listed, nothing was deleted.
    ListingFailed,
    NothingToDelete,
    /// The user did not confirm, nothing was deleted.
    Cancelled,
    /// Every playlist was attempted.
    Completed { succeeded: usize, failed: usize },
}

/// Lists all playlists, asks for confirmation, and deletes them one after the other.
///
/// A failed deletion is reported and counted, and the remaining playlists are still attempted.
/// Deletions that already happened are not undone.
pub async fn delete_all_playlists(
    client: &YouTubeClient,
    console: &mut impl Console,
) -> eyre::Result<BulkDeleteOutcome> {
    let playlists = match client.list_playlists().await {
        Ok(playlists) => playlists,
        Err(e) => {
            console.say(&ApiError::describe(&e));
            return Ok(BulkDeleteOutcome::ListingFailed);
        }
    };

    if playlists.is_empty() {
        console.say("No playlists found to delete.");
        return Ok(BulkDeleteOutcome::NothingToDelete);
    }

    console.say(&format!(
        "\nWARNING: This will delete all {} playlists:",
        playlists.len()
    ));
    for playlist in &playlists {
        console.say(&format!("- {} (ID: {})", playlist.title, playlist.id));
    }

    let confirmed = confirm(
        console,
        &format!(
            "\nAre you sure you want to delete ALL playlists? \
             Type '{CONFIRMATION_PHRASE}' to confirm: "
        ),
        CONFIRMATION_PHRASE,
    )?;
    if !confirmed {
        console.say("Operation cancelled.");
        return Ok(BulkDeleteOutcome::Cancelled);
    }

    let mut succeeded = 0;
    let mut failed = 0;
    for playlist in &playlists {
        match client.delete_playlist(&playlist.id).await {
            Ok(()) => {
                succeeded += 1;
                console.say(&format!("Deleted playlist: {}", playlist.title));
            }
            Err(e) => {
                failed += 1;
                tracing::warn!(playlist_id = playlist.id, "bulk delete failed: {e:#}");
                let reason = match ApiError::find(&e) {
                    Some(api) => api.status.as_u16().to_string(),
                    None => format!("{e:#}"),
                };
                console.say(&format!(
                    "Failed to delete playlist {}: {reason}",
                    playlist.title
                ));
            }
        }
    }

    console.say(&format!(
        "\nOperation completed: {succeeded} playlists deleted, {failed} failed"
    ));
    Ok(BulkDeleteOutcome::Completed { succeeded, failed })
}
