//! Kerberos credential lifecycle.
//!
//! # Design
//! `CredentialManager` guarantees that a usable ticket for the configured
//! principal exists immediately before each authenticated request. The check
//! runs on every flush, but acquisition only happens when the cache has no
//! ticket — tickets are valid for hours, so the common case is a single cheap
//! cache listing.
//!
//! The actual cache operations sit behind [`CredentialCache`] so tests plug
//! an in-memory fake. The production implementation, [`KinitCache`], shells
//! out to the platform tooling: `klist` to list tickets, `kinit -kt` to
//! obtain one from a keytab. The cache itself is a host-wide resource shared
//! with unrelated processes; concurrent acquisition for the same principal is
//! idempotent at the OS level and is not coordinated here.

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::diag::{Diagnostics, TracingDiagnostics};
use crate::error::AuthError;

/// Observations and mutations of the host's Kerberos credential cache.
pub trait CredentialCache {
    /// True iff the cache currently holds a ticket naming `principal`.
    /// A well-formed empty cache is `Ok(false)`, never an error.
    fn ticket_present(&self, principal: &str) -> Result<bool, AuthError>;

    /// Obtain a fresh ticket for `principal` from `keytab`.
    fn acquire(&mut self, principal: &str, keytab: &Path) -> Result<(), AuthError>;
}

/// Production cache backed by the platform's `klist` / `kinit` tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct KinitCache;

/// True iff a cache listing names `principal`. The exit status of the
/// listing tool is deliberately ignored — an empty cache commonly exits
/// non-zero, and that is the routine "no tickets" answer.
fn listing_names_principal(listing: &str, principal: &str) -> bool {
    !listing.is_empty() && listing.contains(principal)
}

impl CredentialCache for KinitCache {
    fn ticket_present(&self, principal: &str) -> Result<bool, AuthError> {
        let output = Command::new("klist")
            .output()
            .map_err(|e| AuthError::CacheQuery(e.to_string()))?;
        let listing = String::from_utf8_lossy(&output.stdout);
        Ok(listing_names_principal(&listing, principal))
    }

    fn acquire(&mut self, principal: &str, keytab: &Path) -> Result<(), AuthError> {
        let output = Command::new("kinit")
            .arg("-kt")
            .arg(keytab)
            .arg(principal)
            .output()
            .map_err(|e| AuthError::Acquisition(e.to_string()))?;
        // Success is judged by an empty error stream, not the exit status;
        // any diagnostics are surfaced verbatim.
        if !output.stderr.is_empty() {
            return Err(AuthError::Acquisition(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}

/// Owns the check-then-acquire policy over a [`CredentialCache`].
pub struct CredentialManager {
    cache: Box<dyn CredentialCache>,
    diag: Arc<dyn Diagnostics>,
}

impl CredentialManager {
    pub fn new(cache: Box<dyn CredentialCache>, diag: Arc<dyn Diagnostics>) -> Self {
        Self { cache, diag }
    }

    /// Manager over the platform `klist`/`kinit` tooling with `tracing`
    /// diagnostics.
    pub fn platform() -> Self {
        Self::new(Box::new(KinitCache), Arc::new(TracingDiagnostics))
    }

    /// Ensure a ticket for `principal` exists, acquiring one from `keytab`
    /// when the cache has none. No-op when a ticket is already present.
    pub fn ensure_valid(&mut self, principal: &str, keytab: &Path) -> Result<(), AuthError> {
        if self.cache.ticket_present(principal)? {
            return Ok(());
        }
        self.diag
            .debug("ticket not present in credential cache, acquiring from keytab");
        if let Err(err) = self.cache.acquire(principal, keytab) {
            self.diag.error(&format!("ticket acquisition failed: {err}"));
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeState {
        present: bool,
        fail_acquire: Option<String>,
        acquisitions: usize,
    }

    struct FakeCache(Arc<Mutex<FakeState>>);

    impl CredentialCache for FakeCache {
        fn ticket_present(&self, _principal: &str) -> Result<bool, AuthError> {
            Ok(self.0.lock().unwrap().present)
        }

        fn acquire(&mut self, _principal: &str, _keytab: &Path) -> Result<(), AuthError> {
            let mut state = self.0.lock().unwrap();
            state.acquisitions += 1;
            match &state.fail_acquire {
                Some(stderr) => Err(AuthError::Acquisition(stderr.clone())),
                None => {
                    state.present = true;
                    Ok(())
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingDiagnostics {
        events: Mutex<Vec<(String, String)>>,
    }

    impl Diagnostics for RecordingDiagnostics {
        fn debug(&self, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(("debug".to_string(), message.to_string()));
        }

        fn error(&self, message: &str) {
            self.events
                .lock()
                .unwrap()
                .push(("error".to_string(), message.to_string()));
        }
    }

    fn manager(
        state: Arc<Mutex<FakeState>>,
        diag: Arc<RecordingDiagnostics>,
    ) -> CredentialManager {
        CredentialManager::new(Box::new(FakeCache(state)), diag)
    }

    #[test]
    fn present_ticket_skips_acquisition() {
        let state = Arc::new(Mutex::new(FakeState {
            present: true,
            ..FakeState::default()
        }));
        let diag = Arc::new(RecordingDiagnostics::default());
        let mut manager = manager(state.clone(), diag.clone());

        manager
            .ensure_valid("client@EXAMPLE.TEST", Path::new("/etc/client.keytab"))
            .unwrap();

        assert_eq!(state.lock().unwrap().acquisitions, 0);
        assert!(diag.events.lock().unwrap().is_empty());
    }

    #[test]
    fn absent_ticket_acquires_once() {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let diag = Arc::new(RecordingDiagnostics::default());
        let mut manager = manager(state.clone(), diag.clone());

        manager
            .ensure_valid("client@EXAMPLE.TEST", Path::new("/etc/client.keytab"))
            .unwrap();

        assert_eq!(state.lock().unwrap().acquisitions, 1);
        let events = diag.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "debug");
        assert!(events[0].1.contains("acquiring from keytab"));
    }

    #[test]
    fn acquisition_failure_surfaces_stderr() {
        let state = Arc::new(Mutex::new(FakeState {
            fail_acquire: Some("kinit: Keytab contains no suitable keys".to_string()),
            ..FakeState::default()
        }));
        let diag = Arc::new(RecordingDiagnostics::default());
        let mut manager = manager(state, diag.clone());

        let err = manager
            .ensure_valid("client@EXAMPLE.TEST", Path::new("/etc/client.keytab"))
            .unwrap_err();

        match err {
            AuthError::Acquisition(stderr) => {
                assert!(stderr.contains("no suitable keys"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let events = diag.events.lock().unwrap();
        assert!(events.iter().any(|(level, _)| level == "error"));
    }

    #[test]
    fn cache_query_failure_propagates() {
        struct BrokenCache;
        impl CredentialCache for BrokenCache {
            fn ticket_present(&self, _principal: &str) -> Result<bool, AuthError> {
                Err(AuthError::CacheQuery("klist: command not found".to_string()))
            }
            fn acquire(&mut self, _principal: &str, _keytab: &Path) -> Result<(), AuthError> {
                unreachable!("query failure must short-circuit");
            }
        }

        let mut manager = CredentialManager::new(
            Box::new(BrokenCache),
            Arc::new(RecordingDiagnostics::default()),
        );
        let err = manager
            .ensure_valid("client@EXAMPLE.TEST", Path::new("/etc/client.keytab"))
            .unwrap_err();
        assert!(matches!(err, AuthError::CacheQuery(_)));
    }

    #[test]
    fn empty_listing_is_not_an_error() {
        assert!(!listing_names_principal("", "client@EXAMPLE.TEST"));
    }

    #[test]
    fn listing_matches_by_substring() {
        let listing = "Ticket cache: FILE:/tmp/krb5cc_1000\n\
                       Default principal: client@EXAMPLE.TEST\n\
                       Valid starting     Expires            Service principal\n\
                       01/01/70 00:00:00  01/01/70 10:00:00  krbtgt/EXAMPLE.TEST@EXAMPLE.TEST\n";
        assert!(listing_names_principal(listing, "client@EXAMPLE.TEST"));
        assert!(!listing_names_principal(listing, "other@EXAMPLE.TEST"));
    }
}
