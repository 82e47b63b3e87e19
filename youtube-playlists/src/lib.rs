//! Interactive management of a user's YouTube playlists.
//!
//! Startup is: [`config::Config`] is loaded, [`connect`] turns it into an authenticated
//! [`YouTubeClient`] (reusing, refreshing, or newly requesting a credential), and
//! [`menu::run`] takes it from there.

use crate::credentials::CredentialStore;
use crate::oauth::OAuthManager;
use crate::youtube_api::YouTubeClient;
use eyre::Context;
use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod console;
pub mod credentials;
pub mod menu;
pub mod oauth;
pub mod workflow;
pub mod youtube_api;

/// Opens an authenticated session for the account the stored or newly granted credential
/// belongs to.
///
/// The user is sent through the browser consent screen only if no usable credential exists.
pub async fn connect(config: &config::Config) -> eyre::Result<YouTubeClient> {
    let store = Arc::new(CredentialStore::new(config.token_file.clone()));
    let oauth_manager = Arc::new(
        OAuthManager::new(
            config.client_secrets_file.clone(),
            config.scopes.clone(),
            config.request_timeout(),
        )
        .context("set up OAuth")?,
    );

    let credential = auth::authenticate(&store, oauth_manager.as_ref()).await?;
    tracing::debug!(?credential, "authenticated");

    YouTubeClient::new(
        credential,
        oauth_manager,
        store,
        config.api_base_url.clone(),
        config.request_timeout(),
    )
}
