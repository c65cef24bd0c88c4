//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeSet;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, MutexGuard};

use crate::lookup::{DbNetworkDetails, LookupError, LookupFuture, NetworkLookup};

/// Scripted network lookup returning pre-seeded results.
///
/// Used to drive deterministic synthesis outcomes without AWS calls. Clones
/// share the recorded query log.
#[derive(Clone, Debug)]
pub struct FakeLookup {
    database_result: Result<DbNetworkDetails, LookupError>,
    subnet_result: Result<String, LookupError>,
    database_queries: Arc<StdMutex<Vec<String>>>,
    subnet_queries: Arc<StdMutex<Vec<String>>>,
}

impl FakeLookup {
    /// Creates a lookup that answers with the given results.
    #[must_use]
    pub fn new(
        database_result: Result<DbNetworkDetails, LookupError>,
        subnet_result: Result<String, LookupError>,
    ) -> Self {
        Self {
            database_result,
            subnet_result,
            database_queries: Arc::new(StdMutex::new(Vec::new())),
            subnet_queries: Arc::new(StdMutex::new(Vec::new())),
        }
    }

    /// Returns the database identifiers queried so far.
    #[must_use]
    pub fn database_queries(&self) -> Vec<String> {
        self.database_queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    /// Returns the VPC ids queried for public subnets so far.
    #[must_use]
    pub fn subnet_queries(&self) -> Vec<String> {
        self.subnet_queries
            .lock()
            .map(|queries| queries.clone())
            .unwrap_or_default()
    }

    fn record(log: &Arc<StdMutex<Vec<String>>>, value: &str) {
        if let Ok(mut queries) = log.lock() {
            queries.push(value.to_owned());
        }
    }
}

impl NetworkLookup for FakeLookup {
    fn database<'a>(&'a self, identifier: &'a str) -> LookupFuture<'a, DbNetworkDetails> {
        Box::pin(async move {
            Self::record(&self.database_queries, identifier);
            self.database_result.clone()
        })
    }

    fn public_subnet<'a>(&'a self, vpc_id: &'a str) -> LookupFuture<'a, String> {
        Box::pin(async move {
            Self::record(&self.subnet_queries, vpc_id);
            self.subnet_result.clone()
        })
    }
}

/// Global mutex used to serialise environment mutation in tests.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Guard that holds the env mutex and cleans up variables on drop.
pub struct EnvGuard {
    previous: Vec<(String, Option<OsString>)>,
    _guard: MutexGuard<'static, ()>,
}

impl EnvGuard {
    /// Sets multiple environment variables while holding a global mutex.
    pub async fn set_vars(pairs: &[(&str, &str)]) -> Self {
        debug_assert!(
            {
                let mut seen = BTreeSet::new();
                pairs.iter().all(|(key, _)| seen.insert(*key))
            },
            "duplicate environment variable keys passed to EnvGuard::set_vars"
        );

        let guard = ENV_LOCK.lock().await;
        let mut previous = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let old = env::var_os(key);
            // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
            unsafe { env::set_var(key, value) };
            previous.push(((*key).to_owned(), old));
        }

        Self {
            previous,
            _guard: guard,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old) in &self.previous {
            // SAFETY: Environment mutation is serialised by holding `_guard`.
            unsafe {
                match old {
                    Some(val) => env::set_var(key, val),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
