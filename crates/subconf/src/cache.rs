//! Build-once source cache
//!
//! The substitution layer builds everything registered before it into a
//! private chain, while the outer chain builds the same sources again.
//! Wrapping those sources in a [`CachedSource`] makes both chains share one
//! provider instance per source.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::chain::ConfigurationBuilder;
use crate::error::Result;
use crate::provider::{Provider, Source, SourceTag};

enum BuildState {
    Unbuilt,
    Building,
    Built(Arc<dyn Provider>),
}

/// A source that builds its underlying source at most once
///
/// The first caller claims the build and runs it outside the lock; callers
/// arriving while it runs wait for the result instead of building again.
/// A failed build releases the claim so a later caller can retry.
pub struct CachedSource {
    inner: Arc<dyn Source>,
    state: Mutex<BuildState>,
    ready: Condvar,
}

impl CachedSource {
    /// Wrap a source
    pub fn new(inner: Arc<dyn Source>) -> Self {
        Self {
            inner,
            state: Mutex::new(BuildState::Unbuilt),
            ready: Condvar::new(),
        }
    }

    /// Wrap a source unless it is already cached
    pub fn wrap(source: Arc<dyn Source>) -> Arc<dyn Source> {
        if source.tag() == SourceTag::Cached {
            return source;
        }
        Arc::new(Self::new(source))
    }

    /// Whether the underlying source has been built
    pub fn is_built(&self) -> bool {
        matches!(*self.lock(), BuildState::Built(_))
    }

    fn lock(&self) -> MutexGuard<'_, BuildState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the provider is built or the build is ours to run
    fn claim(&self) -> Option<Arc<dyn Provider>> {
        let mut state = self.lock();
        loop {
            if let BuildState::Built(provider) = &*state {
                return Some(Arc::clone(provider));
            }
            if matches!(*state, BuildState::Unbuilt) {
                *state = BuildState::Building;
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn settle(&self, built: Option<Arc<dyn Provider>>) {
        *self.lock() = match built {
            Some(provider) => BuildState::Built(provider),
            None => BuildState::Unbuilt,
        };
        self.ready.notify_all();
    }
}

/// Releases a build claim if the build unwinds before settling
struct ClaimGuard<'a> {
    cache: &'a CachedSource,
    settled: bool,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.settle(None);
        }
    }
}

impl Source for CachedSource {
    fn build(&self, builder: &ConfigurationBuilder) -> Result<Arc<dyn Provider>> {
        if let Some(provider) = self.claim() {
            return Ok(provider);
        }

        let mut guard = ClaimGuard {
            cache: self,
            settled: false,
        };
        log::debug!("Building cached source {}", self.inner.describe());
        let result = self.inner.build(builder);
        guard.settled = true;

        match result {
            Ok(provider) => {
                self.settle(Some(Arc::clone(&provider)));
                Ok(provider)
            }
            Err(e) => {
                log::debug!("Build of {} failed: {}", self.inner.describe(), e);
                self.settle(None);
                Err(e)
            }
        }
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Cached
    }

    fn describe(&self) -> String {
        format!("cached({})", self.inner.describe())
    }
}
