//! Multi-step playlist workflows that combine API calls with user prompts.

pub mod bulk_delete;
pub mod guided;

pub use bulk_delete::{BulkDeleteOutcome, delete_all_playlists};
pub use guided::{BuildReport, GuidedBuilder, GuidedPlan, run_guided_builder};
