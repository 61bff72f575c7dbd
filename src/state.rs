// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config, ledger::LedgerLocks, mailer::Mailer, oauth::GoogleOAuth, store::RecordStore,
};

pub type SharedStore = Arc<dyn RecordStore>;
pub type SharedMailer = Arc<dyn Mailer>;

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Config,
    pub mailer: SharedMailer,
    /// `None` when Google sign-in is not configured.
    pub google: Option<Arc<GoogleOAuth>>,
    pub ledger_locks: LedgerLocks,
}

impl AppState {
    pub fn new(
        store: SharedStore,
        config: Config,
        mailer: SharedMailer,
        google: Option<GoogleOAuth>,
    ) -> Self {
        Self {
            store,
            config,
            mailer,
            google: google.map(Arc::new),
            ledger_locks: LedgerLocks::new(),
        }
    }
}

impl FromRef<AppState> for SharedStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for SharedMailer {
    fn from_ref(state: &AppState) -> Self {
        state.mailer.clone()
    }
}
