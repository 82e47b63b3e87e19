//! Acquisition of a usable credential.
//!
//! The decision logic is a pure state machine ([`AuthState`]): every transition takes the
//! outcome of the previous side effect and names the next one ([`AuthAction`]). The actual
//! effects (reading the token file, talking to Google, opening a browser) are carried out by
//! [`authenticate`] through the [`CredentialStore`] and an [`Authorizer`].
//!
//! ```text
//! Loading --valid--> Valid
//! Loading --expired + refresh token--> Refreshing --ok--> Valid
//!                                      Refreshing --failed--> Consenting
//! Loading --absent/unrefreshable--> Consenting --granted--> Valid
//! ```

use crate::credentials::{Credential, CredentialStore};
use eyre::Context;
use jiff::Timestamp;

/// The remote half of the credential lifecycle.
#[allow(async_fn_in_trait)]
pub trait Authorizer {
    /// Exchanges the credential's refresh token.
    ///
    /// `Ok(None)` means the grant is no longer usable.
    async fn refresh(&self, credential: &Credential) -> eyre::Result<Option<Credential>>;

    /// Runs the interactive consent flow.
    async fn consent(&self) -> eyre::Result<Credential>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing is known yet; the store has to be consulted.
    Loading,
    /// The stored credential expired but carries a refresh token.
    Refreshing(Credential),
    /// No usable credential, the user has to grant access.
    Consenting,
    /// Done. `persist` is set when the credential did not come straight from the store.
    Valid { credential: Credential, persist: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    Loaded(Option<Credential>),
    /// `None` when the refresh failed for whatever reason.
    Refreshed(Option<Credential>),
    Consented(Credential),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    LoadStored,
    Refresh(Credential),
    Consent,
    Finish { credential: Credential, persist: bool },
}

impl AuthState {
    /// The side effect the driver has to perform next.
    pub fn action(&self) -> AuthAction {
        match self {
            Self::Loading => AuthAction::LoadStored,
            Self::Refreshing(credential) => AuthAction::Refresh(credential.clone()),
            Self::Consenting => AuthAction::Consent,
            Self::Valid {
                credential,
                persist,
            } => AuthAction::Finish {
                credential: credential.clone(),
                persist: *persist,
            },
        }
    }

    /// Applies the outcome of the last action.
    pub fn on(self, event: AuthEvent, now: Timestamp) -> eyre::Result<Self> {
        Ok(match (self, event) {
            (Self::Loading, AuthEvent::Loaded(Some(credential))) => {
                if credential.is_valid_at(now) {
                    Self::Valid {
                        credential,
                        persist: false,
                    }
                } else if credential.can_refresh() {
                    Self::Refreshing(credential)
                } else {
                    Self::Consenting
                }
            }
            (Self::Loading, AuthEvent::Loaded(None)) => Self::Consenting,
            (Self::Refreshing(_), AuthEvent::Refreshed(Some(credential))) => Self::Valid {
                credential,
                persist: true,
            },
            (Self::Refreshing(_), AuthEvent::Refreshed(None)) => Self::Consenting,
            (Self::Consenting, AuthEvent::Consented(credential)) => Self::Valid {
                credential,
                persist: true,
            },
            (state, event) => {
                eyre::bail!("unexpected authentication event {event:?} in state {state:?}")
            }
        })
    }
}

/// Produces a valid credential, refreshing or asking for consent as needed.
///
/// Failures to load or refresh are logged and recovered from by falling back to consent.
/// A failed consent flow is returned as an error, it is never retried.
pub async fn authenticate<A: Authorizer>(
    store: &CredentialStore,
    authorizer: &A,
) -> eyre::Result<Credential> {
    let mut state = AuthState::Loading;
    loop {
        let event = match state.action() {
            AuthAction::LoadStored => AuthEvent::Loaded(store.load().await),
            AuthAction::Refresh(credential) => {
                tracing::info!("stored credential expired, refreshing");
                match authorizer.refresh(&credential).await {
                    Ok(refreshed) => AuthEvent::Refreshed(refreshed),
                    Err(e) => {
                        tracing::warn!("error refreshing credentials: {e:#}");
                        AuthEvent::Refreshed(None)
                    }
                }
            }
            AuthAction::Consent => {
                tracing::info!("no usable credential, starting consent flow");
                let credential = authorizer
                    .consent()
                    .await
                    .context("authorize user to YouTube")?;
                AuthEvent::Consented(credential)
            }
            AuthAction::Finish {
                credential,
                persist,
            } => {
                if persist {
                    store.save(&credential).await.context("save credential")?;
                }
                return Ok(credential);
            }
        };
        state = state.on(event, Timestamp::now())?;
    }
}
