//! The interactive top-level menu.

use crate::console::{Console, Selection, confirm};
use crate::workflow::{GuidedPlan, delete_all_playlists, run_guided_builder};
use crate::youtube_api::{ApiError, PrivacyStatus, YouTubeClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ListPlaylists,
    CreatePlaylist,
    DeletePlaylist,
    DeleteAllPlaylists,
    BuildGuidedPlaylist,
    Exit,
}

impl MenuChoice {
    /// In menu order.
    pub const ALL: [MenuChoice; 6] = [
        Self::ListPlaylists,
        Self::CreatePlaylist,
        Self::DeletePlaylist,
        Self::DeleteAllPlaylists,
        Self::BuildGuidedPlaylist,
        Self::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ListPlaylists => "List all playlists",
            Self::CreatePlaylist => "Create new playlist",
            Self::DeletePlaylist => "Delete playlist",
            Self::DeleteAllPlaylists => "Delete ALL playlists",
            Self::BuildGuidedPlaylist => "Build guided playlist",
            Self::Exit => "Exit",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match Selection::parse(input, Self::ALL.len()) {
            Selection::Pick(i) => Some(Self::ALL[i]),
            Selection::Skip | Selection::Invalid(_) => None,
        }
    }
}

/// Shows the menu and dispatches choices until the user exits or input runs out.
///
/// Failed operations are reported and the menu is shown again.
pub async fn run(
    client: &YouTubeClient,
    console: &mut impl Console,
    guided_plan: &GuidedPlan,
) -> eyre::Result<()> {
    loop {
        console.say("\nYouTube Playlist Manager");
        for (i, choice) in MenuChoice::ALL.iter().enumerate() {
            console.say(&format!("{}. {}", i + 1, choice.label()));
        }

        let prompt = format!("Enter your choice (1-{}): ", MenuChoice::ALL.len());
        let Some(input) = console.prompt(&prompt)? else {
            console.say("Goodbye!");
            return Ok(());
        };

        let Some(choice) = MenuChoice::parse(&input) else {
            console.say("Invalid choice. Please try again.");
            continue;
        };
        tracing::debug!(?choice, "menu selection");

        match choice {
            MenuChoice::ListPlaylists => list(client, console).await,
            MenuChoice::CreatePlaylist => create(client, console).await?,
            MenuChoice::DeletePlaylist => delete(client, console).await?,
            MenuChoice::DeleteAllPlaylists => {
                let outcome = delete_all_playlists(client, console).await?;
                tracing::debug!(?outcome, "bulk delete finished");
            }
            MenuChoice::BuildGuidedPlaylist => {
                run_guided_builder(client, console, guided_plan.clone()).await?;
            }
            MenuChoice::Exit => {
                console.say("Goodbye!");
                return Ok(());
            }
        }
    }
}

async fn list(client: &YouTubeClient, console: &mut impl Console) {
    match client.list_playlists().await {
        Ok(playlists) => {
            console.say(&format!("\nFound {} playlists:", playlists.len()));
            for playlist in playlists {
                console.say(&format!("\nTitle: {}", playlist.title));
                console.say(&format!("ID: {}", playlist.id));
                console.say(&format!("Number of videos: {}", playlist.item_count));
                console.say(&format!("Description: {}", playlist.description));
            }
        }
        Err(e) => console.say(&ApiError::describe(&e)),
    }
}

/// Reads a privacy status, falling back to private for empty or unknown input.
///
/// `None` once input has run out.
fn read_privacy(console: &mut impl Console) -> eyre::Result<Option<PrivacyStatus>> {
    let Some(answer) =
        console.prompt("Enter privacy status (public/private/unlisted) [default: private]: ")?
    else {
        return Ok(None);
    };
    let answer = answer.trim().to_lowercase();
    if answer.is_empty() {
        return Ok(Some(PrivacyStatus::default()));
    }
    Ok(Some(answer.parse().unwrap_or_else(|_| {
        console.say("Invalid privacy status. Using 'private'");
        PrivacyStatus::Private
    })))
}

async fn create(client: &YouTubeClient, console: &mut impl Console) -> eyre::Result<()> {
    let Some(title) = console.prompt("Enter playlist title: ")? else {
        return Ok(());
    };
    let Some(description) = console.prompt("Enter playlist description (optional): ")? else {
        return Ok(());
    };
    let Some(privacy) = read_privacy(console)? else {
        return Ok(());
    };

    match client
        .create_playlist(&title, &description, privacy.as_str())
        .await
    {
        Ok(id) => {
            console.say(&format!("Created playlist: {title}"));
            console.say(&format!("Playlist created successfully! ID: {id}"));
        }
        Err(e) => console.say(&ApiError::describe(&e)),
    }
    Ok(())
}

async fn delete(client: &YouTubeClient, console: &mut impl Console) -> eyre::Result<()> {
    let Some(playlist_id) = console.prompt("Enter playlist ID to delete: ")? else {
        return Ok(());
    };
    let prompt = format!("Are you sure you want to delete playlist {playlist_id}? (yes/no): ");
    if !confirm(console, &prompt, "yes")? {
        console.say("Deletion cancelled.");
        return Ok(());
    }

    match client.delete_playlist(&playlist_id).await {
        Ok(()) => console.say("Playlist deleted successfully!"),
        Err(e) => console.say(&ApiError::describe(&e)),
    }
    Ok(())
}
