//! Fallback Orchestrator - resolve a key set across prioritized sources
//!
//! Sources are tried strictly in order. Each source only sees the keys that are
//! still unresolved when it is called, split into chunks no larger than its
//! batch limit; the chunks of one source run concurrently and are all awaited
//! before the next source starts. Results merge first-writer-wins, so the value
//! kept for a key is always the one from the highest-priority source that
//! produced a usable value for it.
//!
//! A failing source never aborts the run: its error is logged and it counts as
//! having resolved nothing. Keys nobody resolves are simply absent from the
//! result; the caller decides whether that is fatal.

use async_trait::async_trait;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::errors::{AppResult, ErrorCode};
use crate::models::types::Resolvable;

/// A data source the orchestrator can query.
#[async_trait]
pub trait Source<K, V>: Send + Sync {
    /// Short name used in logs and API responses
    fn name(&self) -> &str;

    /// Maximum keys per call, `None` for unlimited
    fn batch_limit(&self) -> Option<usize> {
        None
    }

    /// `Err(SourceUnavailable)` when the source is not configured. Unavailable
    /// sources are skipped, not counted as failures.
    fn check_available(&self) -> AppResult<()> {
        Ok(())
    }

    /// Resolve as many of `keys` as possible. Keys without a result are left
    /// out of the map. Return `InvalidInput` to refuse the request before
    /// doing any I/O.
    async fn fetch(&self, keys: &[K]) -> AppResult<HashMap<K, V>>;
}

/// What one source contributed to an aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Resolved `count` new keys; some batches may still have failed
    Resolved { count: usize, failed_batches: usize },
    /// Answered without error but had nothing usable
    NoMatch,
    /// Not configured; skipped
    Unavailable { reason: String },
    /// Refused the request as invalid input
    Rejected { reason: String },
    /// Every batch failed
    Failed { reason: String },
    /// Deadline passed while this source was in flight
    TimedOut { count: usize },
}

/// Per-source record of one aggregation run
#[derive(Debug, Clone, Serialize)]
pub struct SourceAttempt {
    pub source: String,
    /// Keys the source was asked for
    pub requested: usize,
    #[serde(flatten)]
    pub outcome: SourceOutcome,
    pub latency_ms: u64,
}

/// Final Partial Result Set plus the per-source trail
#[derive(Debug)]
pub struct Aggregation<K, V> {
    pub resolved: HashMap<K, V>,
    pub attempts: Vec<SourceAttempt>,
}

impl<K: Eq + Hash, V> Aggregation<K, V> {
    /// First rejection reason, if any source refused the input
    pub fn rejection(&self) -> Option<&str> {
        self.attempts.iter().find_map(|a| match &a.outcome {
            SourceOutcome::Rejected { reason } => Some(reason.as_str()),
            _ => None,
        })
    }

    /// True if at least one source answered without error
    pub fn any_answered(&self) -> bool {
        self.attempts.iter().any(|a| {
            matches!(
                a.outcome,
                SourceOutcome::Resolved { .. } | SourceOutcome::NoMatch
            )
        })
    }
}

/// Priority-ordered fallback across sources
pub struct FallbackOrchestrator<K, V> {
    sources: Vec<Arc<dyn Source<K, V>>>,
    timeout: Option<Duration>,
}

impl<K, V> Clone for FallbackOrchestrator<K, V> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            timeout: self.timeout,
        }
    }
}

impl<K, V> FallbackOrchestrator<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync,
    V: Resolvable + Send,
{
    /// Sources in priority order (index 0 = preferred)
    pub fn new(sources: Vec<Arc<dyn Source<K, V>>>) -> Self {
        Self {
            sources,
            timeout: None,
        }
    }

    /// Deadline for a whole `resolve` call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Resolve `keys` (duplicates collapsed) across all sources.
    pub async fn resolve<I>(&self, keys: I) -> Aggregation<K, V>
    where
        I: IntoIterator<Item = K>,
    {
        let mut seen = HashSet::new();
        let requested: Vec<K> = keys.into_iter().filter(|k| seen.insert(k.clone())).collect();
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);

        let mut resolved: HashMap<K, V> = HashMap::with_capacity(requested.len());
        let mut attempts = Vec::new();

        for source in &self.sources {
            let remaining: Vec<K> = requested
                .iter()
                .filter(|k| !resolved.contains_key(*k))
                .cloned()
                .collect();

            if remaining.is_empty() {
                debug!("All {} keys resolved, skipping remaining sources", requested.len());
                break;
            }

            if let Err(e) = source.check_available() {
                debug!("⏭️ {} skipped: {}", source.name(), e.message);
                attempts.push(SourceAttempt {
                    source: source.name().to_string(),
                    requested: 0,
                    outcome: SourceOutcome::Unavailable { reason: e.message },
                    latency_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let (outcome, timed_out) =
                Self::run_source(source.as_ref(), &remaining, &mut resolved, deadline).await;

            attempts.push(SourceAttempt {
                source: source.name().to_string(),
                requested: remaining.len(),
                outcome,
                latency_ms: started.elapsed().as_millis() as u64,
            });

            if timed_out {
                warn!(
                    "⏱️ Aggregation deadline reached at {}; returning {} of {} keys",
                    source.name(),
                    resolved.len(),
                    requested.len()
                );
                break;
            }
        }

        info!(
            "📊 Aggregation: {}/{} keys resolved via {} source attempt(s)",
            resolved.len(),
            requested.len(),
            attempts.len()
        );

        Aggregation { resolved, attempts }
    }

    /// Query one source for `remaining`, merging into `resolved`.
    /// Returns the outcome and whether the deadline cut the source short.
    async fn run_source(
        source: &dyn Source<K, V>,
        remaining: &[K],
        resolved: &mut HashMap<K, V>,
        deadline: Option<tokio::time::Instant>,
    ) -> (SourceOutcome, bool) {
        let chunks: Vec<&[K]> = match source.batch_limit() {
            Some(limit) if limit > 0 => remaining.chunks(limit).collect(),
            _ => vec![remaining],
        };

        debug!(
            "🔎 {}: {} key(s) in {} batch(es)",
            source.name(),
            remaining.len(),
            chunks.len()
        );

        let mut in_flight: FuturesUnordered<_> = chunks
            .iter()
            .map(|chunk| async move { (*chunk, source.fetch(chunk).await) })
            .collect();

        let mut count = 0usize;
        let mut answered = 0usize;
        let mut failed = 0usize;
        let mut rejection: Option<String> = None;
        let mut last_error: Option<String> = None;

        loop {
            let next = match deadline {
                Some(at) => match tokio::time::timeout_at(at, in_flight.next()).await {
                    Ok(next) => next,
                    Err(_) => return (SourceOutcome::TimedOut { count }, true),
                },
                None => in_flight.next().await,
            };

            let Some((chunk, result)) = next else { break };

            match result {
                Ok(values) => {
                    answered += 1;
                    let asked: HashSet<&K> = chunk.iter().collect();
                    for (key, value) in values {
                        if !asked.contains(&key) {
                            debug!("{} returned unrequested key {:?}, dropped", source.name(), key);
                            continue;
                        }
                        if !value.is_usable() {
                            continue;
                        }
                        if let Entry::Vacant(slot) = resolved.entry(key) {
                            slot.insert(value);
                            count += 1;
                        }
                    }
                }
                Err(e) if e.code == ErrorCode::InvalidInput => {
                    debug!("🚫 {} rejected input: {}", source.name(), e.message);
                    rejection.get_or_insert(e.message);
                }
                Err(e) => {
                    failed += 1;
                    warn!("⚠️ {} batch failed: {}", source.name(), e);
                    last_error = Some(e.to_string());
                }
            }
        }

        let outcome = if count > 0 {
            SourceOutcome::Resolved {
                count,
                failed_batches: failed,
            }
        } else if let Some(reason) = rejection {
            SourceOutcome::Rejected { reason }
        } else if answered > 0 {
            SourceOutcome::NoMatch
        } else {
            SourceOutcome::Failed {
                reason: last_error.unwrap_or_else(|| "no response".to_string()),
            }
        };

        (outcome, false)
    }
}
