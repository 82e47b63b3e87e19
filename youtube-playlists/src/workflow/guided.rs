//! Assembling a themed playlist from a list of search terms.
//!
//! [`GuidedBuilder`] decides what happens next and never performs I/O itself. It names the next
//! step through [`GuidedBuilder::action`] and is fed the result through
//! [`GuidedBuilder::advance`]. [`run_guided_builder`] carries out those steps against the API and
//! the console.

use crate::console::{Console, Selection};
use crate::youtube_api::{ApiError, VideoResult, YouTubeClient};
use serde::Deserialize;

/// What to build: the playlist to create and the items to look for, in playlist order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GuidedPlan {
    pub title: String,
    pub description: String,
    /// Sent verbatim when the playlist is created.
    pub privacy: String,
    /// Prepended to every item when searching.
    pub search_prefix: String,
    /// Appended to every item when searching.
    pub search_suffix: String,
    /// Upper bound on the candidates offered per item.
    pub max_results: u32,
    pub items: Vec<String>,
}

impl Default for GuidedPlan {
    /// The Boards of Canada releases, oldest first.
    fn default() -> Self {
        Self {
            title: "Boards of Canada - Full Albums (Chronological)".to_string(),
            description: "Complete Boards of Canada studio albums in chronological order."
                .to_string(),
            privacy: "private".to_string(),
            search_prefix: "Boards of Canada".to_string(),
            search_suffix: "full album".to_string(),
            max_results: 5,
            items: [
                "Twoism (1995)",
                "Hi Scores EP (1996)",
                "Music Has the Right to Children (1998)",
                "In A Beautiful Place Out In The Country EP (2000)",
                "Geogaddi (2002)",
                "The Campfire Headphase (2005)",
                "Trans Canada Highway EP (2006)",
                "Tomorrow's Harvest (2013)",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl GuidedPlan {
    /// The search query used for `item`.
    pub fn query_for(&self, item: &str) -> String {
        [self.search_prefix.as_str(), item, self.search_suffix.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Which items ended up in the playlist, and which did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub playlist_id: String,
    pub added: Vec<String>,
    pub skipped: Vec<String>,
    /// Items whose chosen video could not be added.
    pub failed: Vec<String>,
}

/// The next side effect of a [`GuidedBuilder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedAction {
    CreatePlaylist {
        title: String,
        description: String,
        privacy: String,
    },
    Search {
        item: String,
        query: String,
        max_results: u32,
    },
    /// Show the candidates and ask which one matches `item`.
    Choose {
        item: String,
        candidates: Vec<VideoResult>,
    },
    AddVideo {
        playlist_id: String,
        video: VideoResult,
    },
    /// Creating the playlist failed, nothing else will happen.
    Abort,
    Finish(BuildReport),
}

/// The outcome of the last [`GuidedAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedEvent {
    /// `None` if the playlist could not be created.
    PlaylistCreated(Option<String>),
    SearchCompleted(Vec<VideoResult>),
    Chose(Selection),
    /// The user can no longer answer, so no further item is searched.
    InputClosed,
    VideoAdded(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Creating,
    Searching,
    Choosing(Vec<VideoResult>),
    Adding(VideoResult),
    Aborted,
    Done,
}

/// The guided build as a state machine over the items of a [`GuidedPlan`].
#[derive(Debug, Clone)]
pub struct GuidedBuilder {
    plan: GuidedPlan,
    step: Step,
    next_item: usize,
    report: BuildReport,
}

impl GuidedBuilder {
    pub fn new(plan: GuidedPlan) -> Self {
        Self {
            plan,
            step: Step::Creating,
            next_item: 0,
            report: BuildReport::default(),
        }
    }

    pub fn plan(&self) -> &GuidedPlan {
        &self.plan
    }

    fn current_item(&self) -> String {
        self.plan
            .items
            .get(self.next_item)
            .cloned()
            .unwrap_or_default()
    }

    pub fn action(&self) -> GuidedAction {
        match &self.step {
            Step::Creating => GuidedAction::CreatePlaylist {
                title: self.plan.title.clone(),
                description: self.plan.description.clone(),
                privacy: self.plan.privacy.clone(),
            },
            Step::Searching => {
                let item = self.current_item();
                GuidedAction::Search {
                    query: self.plan.query_for(&item),
                    item,
                    max_results: self.plan.max_results,
                }
            }
            Step::Choosing(candidates) => GuidedAction::Choose {
                item: self.current_item(),
                candidates: candidates.clone(),
            },
            Step::Adding(video) => GuidedAction::AddVideo {
                playlist_id: self.report.playlist_id.clone(),
                video: video.clone(),
            },
            Step::Aborted => GuidedAction::Abort,
            Step::Done => GuidedAction::Finish(self.report.clone()),
        }
    }

    /// Moves past the current item, recording what happened to it.
    fn conclude_item(&mut self, bucket: fn(&mut BuildReport) -> &mut Vec<String>) {
        let item = self.current_item();
        bucket(&mut self.report).push(item);
        self.next_item += 1;
        self.step = self.search_or_done();
    }

    fn search_or_done(&self) -> Step {
        if self.next_item < self.plan.items.len() {
            Step::Searching
        } else {
            Step::Done
        }
    }

    /// Applies the outcome of the last action.
    pub fn advance(&mut self, event: GuidedEvent) -> eyre::Result<()> {
        let step = std::mem::replace(&mut self.step, Step::Done);
        match (step, event) {
            (Step::Creating, GuidedEvent::PlaylistCreated(Some(playlist_id))) => {
                self.report.playlist_id = playlist_id;
                self.step = self.search_or_done();
            }
            (Step::Creating, GuidedEvent::PlaylistCreated(None)) => self.step = Step::Aborted,
            (Step::Searching, GuidedEvent::SearchCompleted(candidates)) => {
                if candidates.is_empty() {
                    self.conclude_item(|r| &mut r.skipped);
                } else {
                    self.step = Step::Choosing(candidates);
                }
            }
            (Step::Choosing(mut candidates), GuidedEvent::Chose(selection)) => match selection {
                Selection::Pick(i) if i < candidates.len() => {
                    self.step = Step::Adding(candidates.swap_remove(i));
                }
                Selection::Pick(_) | Selection::Skip | Selection::Invalid(_) => {
                    self.conclude_item(|r| &mut r.skipped);
                }
            },
            (Step::Choosing(_), GuidedEvent::InputClosed) => {
                let remaining = self.plan.items.get(self.next_item..).unwrap_or_default();
                self.report.skipped.extend_from_slice(remaining);
                self.next_item = self.plan.items.len();
                self.step = Step::Done;
            }
            (Step::Adding(_), GuidedEvent::VideoAdded(true)) => {
                self.conclude_item(|r| &mut r.added);
            }
            (Step::Adding(_), GuidedEvent::VideoAdded(false)) => {
                self.conclude_item(|r| &mut r.failed);
            }
            (step, event) => {
                let err =
                    eyre::eyre!("unexpected guided builder event {event:?} in step {step:?}");
                self.step = step;
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Runs the guided build interactively.
///
/// Returns `None` if the playlist could not be created. Items are never retried: a search
/// without results, a skip, and an invalid answer all move on to the next item. Once input
/// runs out, the remaining items are skipped without searching for them.
pub async fn run_guided_builder(
    client: &YouTubeClient,
    console: &mut impl Console,
    plan: GuidedPlan,
) -> eyre::Result<Option<BuildReport>> {
    let mut builder = GuidedBuilder::new(plan);
    let mut searching_announced = false;
    loop {
        let event = match builder.action() {
            GuidedAction::CreatePlaylist {
                title,
                description,
                privacy,
            } => match client.create_playlist(&title, &description, &privacy).await {
                Ok(id) => {
                    console.say(&format!("Created playlist: {title}"));
                    GuidedEvent::PlaylistCreated(Some(id))
                }
                Err(e) => {
                    console.say(&ApiError::describe(&e));
                    GuidedEvent::PlaylistCreated(None)
                }
            },
            GuidedAction::Search {
                item,
                query,
                max_results,
            } => {
                if !searching_announced {
                    console.say("\nSearching for albums...");
                    searching_announced = true;
                }
                console.say(&format!("\nSearching for: {item}"));
                let candidates = client.search_videos(&query, max_results).await;
                if candidates.is_empty() {
                    console.say(&format!("No results found for {item}"));
                }
                GuidedEvent::SearchCompleted(candidates)
            }
            GuidedAction::Choose { candidates, .. } => {
                console.say("\nFound potential matches:");
                for (i, video) in candidates.iter().enumerate() {
                    console.say(&format!("{}. {}", i + 1, video.title));
                }
                match console
                    .prompt("\nEnter the number of the correct video (or 's' to skip): ")?
                {
                    Some(answer) => {
                        let selection = Selection::parse(&answer, candidates.len());
                        if let Selection::Invalid(reason) = selection {
                            console.say(&reason.to_string());
                        }
                        GuidedEvent::Chose(selection)
                    }
                    None => {
                        tracing::debug!("input closed, skipping remaining items");
                        GuidedEvent::InputClosed
                    }
                }
            }
            GuidedAction::AddVideo { playlist_id, video } => {
                match client.add_video_to_playlist(&playlist_id, &video.video_id).await {
                    Ok(()) => {
                        console.say(&format!("Added {} to playlist", video.title));
                        GuidedEvent::VideoAdded(true)
                    }
                    Err(e) => {
                        console.say(&ApiError::describe(&e));
                        console.say("Failed to add video to playlist");
                        GuidedEvent::VideoAdded(false)
                    }
                }
            }
            GuidedAction::Abort => {
                console.say("Failed to create playlist");
                return Ok(None);
            }
            GuidedAction::Finish(report) => {
                console.say("\nPlaylist creation completed!");
                tracing::info!(
                    playlist_id = report.playlist_id,
                    added = report.added.len(),
                    skipped = report.skipped.len(),
                    failed = report.failed.len(),
                    "guided build finished"
                );
                return Ok(Some(report));
            }
        };
        builder.advance(event)?;
    }
}
