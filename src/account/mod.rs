//! Account API access
//!
//! The account API is the authoritative source of a user's proxies. It is only
//! consumed through [`AccountClient::fetch_proxies`].

mod client;

pub use client::HttpAccountClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProxyRecord;

/// Fetches a fresh snapshot of the account's proxies
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// Fails with [`crate::RotaError::AuthenticationInvalid`] when the
    /// credential is rejected; that condition is never retried.
    async fn fetch_proxies(&self, credential: &str) -> Result<Vec<ProxyRecord>>;
}

#[cfg(test)]
pub(crate) use fake::ScriptedAccount;

#[cfg(test)]
mod fake {
    use super::*;
    use crate::error::RotaError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Account client replaying canned listings; the last one repeats
    #[derive(Default)]
    pub(crate) struct ScriptedAccount {
        listings: Mutex<VecDeque<std::result::Result<Vec<ProxyRecord>, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedAccount {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_listing(proxies: Vec<ProxyRecord>) -> Self {
            let account = Self::new();
            account.push(proxies);
            account
        }

        pub(crate) fn push(&self, proxies: Vec<ProxyRecord>) {
            self.listings.lock().push_back(Ok(proxies));
        }

        pub(crate) fn push_auth_failure(&self, message: &str) {
            self.listings.lock().push_back(Err(message.to_string()));
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccountClient for ScriptedAccount {
        async fn fetch_proxies(&self, _credential: &str) -> Result<Vec<ProxyRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut listings = self.listings.lock();
            let next = if listings.len() > 1 {
                listings.pop_front()
            } else {
                listings.front().cloned()
            };
            match next {
                Some(Ok(proxies)) => Ok(proxies),
                Some(Err(message)) => Err(RotaError::AuthenticationInvalid(message)),
                None => Ok(Vec::new()),
            }
        }
    }
}
