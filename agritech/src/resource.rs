//! Fetch-state holders for one remote resource each.
//!
//! A [`Resource`] binds a fetcher to positional parameters (coordinates, a
//! polygon) and keeps `{data, loading, error}` consistent with the latest
//! request. Every fetch takes a generation number; only the response of the
//! newest generation may commit, so rapid parameter changes cannot let an
//! older, slower response overwrite a newer one.

use crate::Error;
use async_trait::async_trait;
use parking_lot::Mutex;

/// What a resource shows after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Keep the error and substitute a simulated record.
    FallbackToSimulated,
    /// Keep the error and clear `data`.
    ClearOnError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Idle,
    Loading,
    Success,
    Failure,
}

/// Snapshot of a resource's state.
#[derive(Debug, Clone)]
pub struct FetchState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<Error>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

impl<T> FetchState<T> {
    #[must_use]
    pub const fn status(&self) -> ResourceStatus {
        if self.loading {
            ResourceStatus::Loading
        } else if self.error.is_some() {
            ResourceStatus::Failure
        } else if self.data.is_some() {
            ResourceStatus::Success
        } else {
            ResourceStatus::Idle
        }
    }

    /// Message of the last failure, as shown inline by widgets.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Loads one kind of remote data for a set of parameters.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Params: Clone + PartialEq + Send + Sync + 'static;
    type Output: Clone + Send + 'static;

    /// Short label used in log lines.
    fn name(&self) -> &'static str;

    async fn fetch(&self, params: &Self::Params) -> Result<Self::Output, Error>;

    /// Stand-in record for [`FallbackPolicy::FallbackToSimulated`].
    fn simulate(&self, _params: &Self::Params) -> Option<Self::Output> {
        None
    }
}

struct Inner<P, T> {
    params: Option<P>,
    generation: u64,
    state: FetchState<T>,
}

pub struct Resource<F: Fetcher> {
    fetcher: F,
    policy: FallbackPolicy,
    inner: Mutex<Inner<F::Params, F::Output>>,
}

impl<F: Fetcher> Resource<F> {
    /// Creates an idle resource; nothing is fetched until [`Resource::bind`].
    #[must_use]
    pub fn new(fetcher: F, policy: FallbackPolicy) -> Self {
        Self {
            fetcher,
            policy,
            inner: Mutex::new(Inner {
                params: None,
                generation: 0,
                state: FetchState::default(),
            }),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    #[must_use]
    pub fn state(&self) -> FetchState<F::Output> {
        self.inner.lock().state.clone()
    }

    #[must_use]
    pub fn params(&self) -> Option<F::Params> {
        self.inner.lock().params.clone()
    }

    /// Binds the resource to `params` and fetches when they differ by value
    /// from the bound ones. Binding the same parameters again returns the
    /// current state without a request.
    pub async fn bind(&self, params: F::Params) -> FetchState<F::Output> {
        let unchanged = {
            let inner = self.inner.lock();
            inner.params.as_ref() == Some(&params)
                && inner.state.status() != ResourceStatus::Idle
        };
        if unchanged {
            return self.state();
        }
        self.run(params).await
    }

    /// Fetches again for the bound parameters. An unbound resource stays idle.
    pub async fn refetch(&self) -> FetchState<F::Output> {
        let params = self.inner.lock().params.clone();
        match params {
            Some(params) => self.run(params).await,
            None => self.state(),
        }
    }

    /// Discards any in-flight response, e.g. when the owning view goes away.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.state.loading = false;
    }

    async fn run(&self, params: F::Params) -> FetchState<F::Output> {
        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.params = Some(params.clone());
            inner.state.loading = true;
            inner.state.error = None;
            inner.generation
        };

        let name = self.fetcher.name();
        tracing::debug!(resource = name, generation, "fetch started");
        let result = self.fetcher.fetch(&params).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!(
                resource = name,
                generation,
                latest = inner.generation,
                "discarding stale response"
            );
            return inner.state.clone();
        }

        match result {
            Ok(data) => {
                inner.state.data = Some(data);
                inner.state.error = None;
            }
            Err(err) => {
                tracing::error!(resource = name, error = %err, "fetch failed");
                inner.state.data = match self.policy {
                    FallbackPolicy::FallbackToSimulated => self.fetcher.simulate(&params),
                    FallbackPolicy::ClearOnError => None,
                };
                inner.state.error = Some(err);
            }
        }
        inner.state.loading = false;
        inner.state.clone()
    }
}
