//! Swap quote engine.
//!
//! Tracks one active [`QuoteRequest`] at a time. Valid inputs start a poll
//! loop that fetches a route, refetches it on an interval, and retries
//! transient failures with backoff. Every result is tagged with the
//! generation it was issued under; results from a previous key are dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

use crate::config::Config;
use crate::error::QuoteError;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::quote::{QuoteInputs, QuoteRequest, RoutePayload, SwapQuote};

/// External route aggregator.
#[async_trait]
pub trait RouteAggregator: Send + Sync {
    async fn fetch_route(&self, payload: &RoutePayload) -> Result<SwapQuote, QuoteError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteState {
    /// Inputs incomplete or invalid. No fetch is made.
    Idle,
    /// First fetch for this request is in flight.
    Fetching { request: QuoteRequest },
    Ready {
        request: QuoteRequest,
        quote: SwapQuote,
        fetched_at: Instant,
    },
    /// Terminal for this request until the inputs change.
    Errored {
        request: QuoteRequest,
        error: QuoteError,
    },
}

impl QuoteState {
    pub fn request(&self) -> Option<&QuoteRequest> {
        match self {
            QuoteState::Idle => None,
            QuoteState::Fetching { request }
            | QuoteState::Ready { request, .. }
            | QuoteState::Errored { request, .. } => Some(request),
        }
    }

    pub fn quote(&self) -> Option<&SwapQuote> {
        match self {
            QuoteState::Ready { quote, .. } => Some(quote),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QuoteError> {
        match self {
            QuoteState::Errored { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QuoteState::Fetching { .. })
    }
}

pub struct QuoteEngine {
    inner: Arc<Inner>,
}

struct Inner {
    aggregator: Arc<dyn RouteAggregator>,
    refetch_interval: Duration,
    stale_time: Duration,
    retry: RetryPolicy,
    /// Bumped on every key change. Only written while holding the state lock.
    generation: AtomicU64,
    state: watch::Sender<QuoteState>,
    focused: watch::Sender<bool>,
    wake: Notify,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Write `next` only if `generation` is still the active one.
    fn apply(&self, generation: u64, next: QuoteState) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current(generation) {
                return false;
            }
            *state = next;
            true
        })
    }
}

impl QuoteEngine {
    pub fn new(aggregator: Arc<dyn RouteAggregator>, config: &Config) -> Self {
        let (state, _) = watch::channel(QuoteState::Idle);
        let (focused, _) = watch::channel(true);
        Self {
            inner: Arc::new(Inner {
                aggregator,
                refetch_interval: config.quote_refetch_interval(),
                stale_time: config.quote_stale_time(),
                retry: config.retry_policy(),
                generation: AtomicU64::new(0),
                state,
                focused,
                wake: Notify::new(),
            }),
        }
    }

    /// Update the inputs. A changed key drops the current quote immediately
    /// and, if the inputs are valid, starts fetching. Must be called from
    /// within a tokio runtime.
    pub fn set_inputs(&self, inputs: &QuoteInputs) {
        let request = inputs.to_request();
        let inner = &self.inner;
        let mut start = None;

        inner.state.send_if_modified(|state| {
            if state.request() == request.as_ref() {
                return false;
            }
            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = match &request {
                None => QuoteState::Idle,
                Some(request) => {
                    start = Some((generation, request.clone()));
                    QuoteState::Fetching {
                        request: request.clone(),
                    }
                }
            };
            true
        });

        if let Some((generation, request)) = start {
            tracing::debug!(
                "quote key changed: {} -> {} {} (gen {})",
                request.source_chain_id,
                request.destination_chain_id,
                request.amount,
                generation
            );
            tokio::spawn(poll_loop(inner.clone(), generation, request));
        }
    }

    pub fn state(&self) -> QuoteState {
        self.inner.state.borrow().clone()
    }

    pub fn quote(&self) -> Option<SwapQuote> {
        self.inner.state.borrow().quote().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.inner.state.subscribe()
    }

    /// Suspend (`false`) or resume (`true`) background refetching.
    pub fn set_focused(&self, focused: bool) {
        self.inner.focused.send_replace(focused);
    }

    /// Skip the rest of the refetch interval.
    pub fn refresh_now(&self) {
        self.inner.wake.notify_waiters();
    }

    /// Current quote, refetched first if it is older than the stale time.
    ///
    /// Terminal errors are returned as `Err`. While unfocused a stale quote
    /// is served as is instead of being refetched.
    pub async fn read(&self) -> Result<Option<SwapQuote>, QuoteError> {
        let mut rx = self.subscribe();
        let initial = rx.borrow_and_update().clone();
        let focused = *self.inner.focused.borrow();

        let served_at = match &initial {
            QuoteState::Idle => return Ok(None),
            QuoteState::Errored { error, .. } => return Err(error.clone()),
            QuoteState::Ready {
                quote, fetched_at, ..
            } => {
                if fetched_at.elapsed() < self.inner.stale_time || !focused {
                    return Ok(Some(quote.clone()));
                }
                self.refresh_now();
                Some(*fetched_at)
            }
            QuoteState::Fetching { .. } => None,
        };

        loop {
            if rx.changed().await.is_err() {
                return Ok(None);
            }
            let state = rx.borrow_and_update().clone();
            if state.request() != initial.request() {
                return Ok(state.quote().cloned());
            }
            match state {
                QuoteState::Ready {
                    quote, fetched_at, ..
                } if Some(fetched_at) != served_at => return Ok(Some(quote)),
                QuoteState::Errored { error, .. } => return Err(error),
                _ => continue,
            }
        }
    }

    /// Stop polling and return to `Idle`.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        inner.state.send_modify(|state| {
            inner.generation.fetch_add(1, Ordering::SeqCst);
            *state = QuoteState::Idle;
        });
        inner.wake.notify_waiters();
    }
}

impl Drop for QuoteEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Fetch for `request` until the generation moves on.
///
/// The first fetch of a generation is issued regardless of focus; only the
/// refetches after it wait for the engine to be focused.
async fn poll_loop(inner: Arc<Inner>, generation: u64, request: QuoteRequest) {
    let mut focused = inner.focused.subscribe();

    loop {
        let result = with_retry(
            &inner.retry,
            "fetch_route",
            || inner.is_current(generation),
            || fetch_once(&inner, &request),
        )
        .await;

        let next = match result {
            Ok(quote) => QuoteState::Ready {
                request: request.clone(),
                quote,
                fetched_at: Instant::now(),
            },
            Err(error) => QuoteState::Errored {
                request: request.clone(),
                error,
            },
        };
        let terminal = matches!(next, QuoteState::Errored { .. });

        // Registered before the state is published so a `refresh_now` from a
        // reader that sees this state is never lost.
        let wake = inner.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();

        if !inner.apply(generation, next) {
            tracing::debug!("discarding quote response for stale gen {}", generation);
            return;
        }
        if terminal {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(inner.refetch_interval) => {}
            _ = wake.as_mut() => {}
        }

        if !wait_focused(&inner, generation, &mut focused).await {
            return;
        }
    }
}

/// Park until the engine is focused. Returns `false` once `generation` is no
/// longer current; shutdown wakes this wait through `wake`.
async fn wait_focused(
    inner: &Inner,
    generation: u64,
    focused: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        let wake = inner.wake.notified();
        tokio::pin!(wake);
        wake.as_mut().enable();

        if !inner.is_current(generation) {
            return false;
        }
        if *focused.borrow_and_update() {
            return true;
        }
        tokio::select! {
            changed = focused.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
            _ = wake.as_mut() => {}
        }
    }
}

async fn fetch_once(inner: &Inner, request: &QuoteRequest) -> Result<SwapQuote, QuoteError> {
    let payload = request.to_payload()?;
    tracing::debug!(
        "fetching route {}:{} -> {}:{} amount {}",
        payload.from_chain,
        payload.from_token,
        payload.to_chain,
        payload.to_token,
        payload.from_amount
    );
    inner.aggregator.fetch_route(&payload).await
}
