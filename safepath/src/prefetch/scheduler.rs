//! Scheduler that warms complementary travel-mode caches.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::{RouteQueryCache, RouteQueryKey};
use crate::route::{Place, RouteOptions, TravelMode};
use crate::telemetry::{TelemetryKind, TelemetryRecorder};

/// Identity of a confirmed selection. A new batch of prefetches is only
/// launched when this tuple changes.
type Trigger = (String, String, TravelMode, bool, bool, bool);

/// Tunables for the background prefetcher.
#[derive(Debug, Clone, Copy)]
pub struct PrefetchConfig {
    /// When false the scheduler drains its channel but fetches nothing.
    pub enabled: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// A route the user has settled on, as reported by the query layer.
///
/// Either endpoint may be absent while the user is still filling in the
/// form; such selections are ignored by the scheduler.
#[derive(Debug, Clone)]
pub struct RouteSelection {
    pub origin: Option<Place>,
    pub destination: Option<Place>,
    pub options: RouteOptions,
}

impl RouteSelection {
    pub fn new(origin: Option<Place>, destination: Option<Place>, options: RouteOptions) -> Self {
        Self {
            origin,
            destination,
            options,
        }
    }

    /// Returns the dedupe tuple, or `None` when an endpoint is missing.
    fn trigger(&self) -> Option<Trigger> {
        let origin = self.origin.as_ref()?;
        let destination = self.destination.as_ref()?;
        Some((
            origin.id.clone(),
            destination.id.clone(),
            self.options.travel_mode,
            self.options.avoid_highways,
            self.options.avoid_tolls,
            self.options.accessibility_mode,
        ))
    }
}

/// Fetches the travel modes the user has *not* asked for yet.
///
/// After a route is confirmed for one mode, the remaining modes are
/// likely follow-up queries ("how long would that take on foot?"). The
/// scheduler issues those fetches concurrently through the shared cache,
/// so results land in the same entries the interactive path reads.
///
/// Failures are absorbed: a prefetch that errors leaves an Error-state
/// entry behind, which interactive queries revalidate on demand. Later
/// prefetch passes see the entry as present and do not retry it.
pub struct PrefetchScheduler {
    cache: Arc<RouteQueryCache>,
    recorder: Arc<TelemetryRecorder>,
    config: PrefetchConfig,
}

impl PrefetchScheduler {
    pub fn new(
        cache: Arc<RouteQueryCache>,
        recorder: Arc<TelemetryRecorder>,
        config: PrefetchConfig,
    ) -> Self {
        Self {
            cache,
            recorder,
            config,
        }
    }

    /// Warms the cache for every travel mode except `exclude_mode`.
    ///
    /// Modes whose key is already present (in any state, including a
    /// fetch still in flight) are skipped. The remaining modes are
    /// fetched concurrently and the call returns once all of them have
    /// settled.
    pub async fn prefetch_variants(
        &self,
        origin: &Place,
        destination: &Place,
        exclude_mode: TravelMode,
        base_options: &RouteOptions,
    ) {
        if !self.config.enabled {
            debug!("Prefetching disabled, skipping variant warm-up");
            return;
        }

        let mut pending = Vec::new();
        for mode in TravelMode::ALL {
            if mode == exclude_mode {
                continue;
            }
            let options = base_options.for_mode(mode);
            let key = RouteQueryKey::new(origin, destination, mode, &options);
            if self.cache.contains(&key) {
                debug!(key = %key, "Prefetch skipped, key already cached");
                continue;
            }
            pending.push(self.prefetch_one(origin, destination, mode, options));
        }

        if pending.is_empty() {
            return;
        }

        debug!(
            origin = %origin,
            destination = %destination,
            modes = pending.len(),
            "Prefetching travel-mode variants"
        );
        futures::future::join_all(pending).await;
    }

    async fn prefetch_one(
        &self,
        origin: &Place,
        destination: &Place,
        mode: TravelMode,
        options: RouteOptions,
    ) {
        self.recorder
            .record(TelemetryKind::RoutePrefetchStart { mode });
        let started = Instant::now();

        let entry = self
            .cache
            .fetch_routes(origin, destination, mode, &options)
            .await;
        if entry.state.is_error() {
            debug!(
                mode = %mode,
                error = entry.error.as_deref().unwrap_or("unknown"),
                "Prefetch fetch failed"
            );
        }

        self.recorder.record(TelemetryKind::RoutePrefetchComplete {
            mode,
            duration_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Consumes selection updates until the channel closes or the token
    /// is cancelled.
    ///
    /// Selections without both endpoints are ignored, and a selection
    /// whose identity tuple matches the previous one triggers no new
    /// work. Each accepted selection is processed to completion before
    /// the next one is read.
    pub async fn run(
        self,
        mut selection_rx: mpsc::Receiver<RouteSelection>,
        cancellation_token: CancellationToken,
    ) {
        info!(enabled = self.config.enabled, "Prefetch scheduler started");
        let mut last_trigger: Option<Trigger> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancellation_token.cancelled() => {
                    debug!("Prefetch scheduler received shutdown signal");
                    break;
                }
                selection_opt = selection_rx.recv() => {
                    let Some(selection) = selection_opt else {
                        debug!("Selection channel closed");
                        break;
                    };
                    let Some(trigger) = selection.trigger() else {
                        debug!("Ignoring selection without both endpoints");
                        continue;
                    };
                    if last_trigger.as_ref() == Some(&trigger) {
                        continue;
                    }
                    last_trigger = Some(trigger);

                    if let (Some(origin), Some(destination)) =
                        (&selection.origin, &selection.destination)
                    {
                        self.prefetch_variants(
                            origin,
                            destination,
                            selection.options.travel_mode,
                            &selection.options,
                        )
                        .await;
                    }
                }
            }
        }

        info!("Prefetch scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cache::StalenessPolicy;
    use crate::fetch::{MockRouteSource, RouteFetcher};
    use crate::net::NetworkMonitor;
    use crate::telemetry::{MemorySink, TelemetryEvent};

    fn place(id: &str, name: &str) -> Place {
        Place::new(id, name, 52.52, 13.405)
    }

    struct Harness {
        scheduler: PrefetchScheduler,
        cache: Arc<RouteQueryCache>,
        source: Arc<MockRouteSource>,
        sink: Arc<MemorySink>,
    }

    fn harness(config: PrefetchConfig) -> Harness {
        let source = Arc::new(MockRouteSource::with_routes(vec![
            MockRouteSource::base_route("rt_pf", 600),
        ]));
        let fetcher = Arc::new(RouteFetcher::new(source.clone()));
        let sink = Arc::new(MemorySink::new());
        let recorder = Arc::new(TelemetryRecorder::new(sink.clone()));
        let monitor = NetworkMonitor::new(true);
        let cache = Arc::new(RouteQueryCache::new(
            fetcher,
            recorder.clone(),
            StalenessPolicy::default(),
            monitor.subscribe(),
        ));
        let scheduler = PrefetchScheduler::new(cache.clone(), recorder, config);
        Harness {
            scheduler,
            cache,
            source,
            sink,
        }
    }

    fn prefetched_modes(sink: &MemorySink) -> Vec<TravelMode> {
        sink.events()
            .iter()
            .filter_map(|event| match event.kind {
                TelemetryKind::RoutePrefetchStart { mode } => Some(mode),
                _ => None,
            })
            .collect()
    }

    fn count_kind(sink: &MemorySink, name: &str) -> usize {
        sink.events()
            .iter()
            .filter(|event: &&TelemetryEvent| event.name() == name)
            .count()
    }

    #[tokio::test]
    async fn test_prefetch_fetches_all_modes_except_active() {
        let h = harness(PrefetchConfig::default());
        let origin = place("home", "Home");
        let destination = place("school", "School");
        let options = RouteOptions::default().with_travel_mode(TravelMode::Driving);

        h.scheduler
            .prefetch_variants(&origin, &destination, TravelMode::Driving, &options)
            .await;

        assert_eq!(h.source.calls(), 3);
        assert_eq!(h.cache.len(), 3);

        let mut modes = prefetched_modes(&h.sink);
        modes.sort_by_key(|mode| mode.as_str());
        assert_eq!(
            modes,
            vec![TravelMode::Biking, TravelMode::Transit, TravelMode::Walking]
        );
        for mode in [TravelMode::Transit, TravelMode::Walking, TravelMode::Biking] {
            let key = RouteQueryKey::new(&origin, &destination, mode, &options.for_mode(mode));
            assert!(h.cache.contains(&key));
        }
        let driving_key = RouteQueryKey::new(
            &origin,
            &destination,
            TravelMode::Driving,
            &options.for_mode(TravelMode::Driving),
        );
        assert!(!h.cache.contains(&driving_key));
    }

    #[tokio::test]
    async fn test_prefetch_skips_already_cached_modes() {
        let h = harness(PrefetchConfig::default());
        let origin = place("home", "Home");
        let destination = place("school", "School");
        let options = RouteOptions::default().with_travel_mode(TravelMode::Driving);

        let walking = options.for_mode(TravelMode::Walking);
        h.cache
            .fetch_routes(&origin, &destination, TravelMode::Walking, &walking)
            .await;
        assert_eq!(h.source.calls(), 1);

        h.scheduler
            .prefetch_variants(&origin, &destination, TravelMode::Driving, &options)
            .await;

        assert_eq!(h.source.calls(), 3);
        let modes = prefetched_modes(&h.sink);
        assert_eq!(modes.len(), 2);
        assert!(!modes.contains(&TravelMode::Walking));
        assert!(!modes.contains(&TravelMode::Driving));
    }

    #[tokio::test]
    async fn test_prefetch_records_start_and_complete_pairs() {
        let h = harness(PrefetchConfig::default());
        let origin = place("home", "Home");
        let destination = place("pool", "Swimming Pool");

        h.scheduler
            .prefetch_variants(
                &origin,
                &destination,
                TravelMode::Transit,
                &RouteOptions::default(),
            )
            .await;

        assert_eq!(count_kind(&h.sink, "route_prefetch_start"), 3);
        assert_eq!(count_kind(&h.sink, "route_prefetch_complete"), 3);
        assert_eq!(count_kind(&h.sink, "route_fetch"), 0);
    }

    #[tokio::test]
    async fn test_prefetch_failure_is_absorbed_and_recorded() {
        let h = harness(PrefetchConfig::default());
        h.source.set_result(Err(crate::fetch::FetchError::network(
            "upstream unavailable",
        )));
        let origin = place("home", "Home");
        let destination = place("school", "School");
        let options = RouteOptions::default();

        h.scheduler
            .prefetch_variants(&origin, &destination, TravelMode::Transit, &options)
            .await;

        assert_eq!(count_kind(&h.sink, "route_prefetch_complete"), 3);
        let key = RouteQueryKey::new(
            &origin,
            &destination,
            TravelMode::Walking,
            &options.for_mode(TravelMode::Walking),
        );
        let entry = h.cache.peek(&key).unwrap();
        assert!(entry.state.is_error());

        // Keys now exist in error state, so a second pass fetches nothing.
        h.scheduler
            .prefetch_variants(&origin, &destination, TravelMode::Transit, &options)
            .await;
        assert_eq!(h.source.calls(), 3);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_fetches_nothing() {
        let h = harness(PrefetchConfig { enabled: false });
        let origin = place("home", "Home");
        let destination = place("school", "School");

        h.scheduler
            .prefetch_variants(
                &origin,
                &destination,
                TravelMode::Transit,
                &RouteOptions::default(),
            )
            .await;

        assert_eq!(h.source.calls(), 0);
        assert!(h.sink.is_empty());
        assert!(h.cache.is_empty());
    }

    #[tokio::test]
    async fn test_run_prefetches_on_new_selection_and_dedupes_repeats() {
        let h = harness(PrefetchConfig::default());
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(h.scheduler.run(rx, token.clone()));

        let origin = place("home", "Home");
        let destination = place("school", "School");
        let selection = RouteSelection::new(
            Some(origin.clone()),
            Some(destination.clone()),
            RouteOptions::default(),
        );

        tx.send(selection.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.source.calls(), 3);

        // Same selection again: trigger tuple unchanged, nothing fetched.
        tx.send(selection.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.source.calls(), 3);

        // Different destination: full new batch.
        let moved = RouteSelection::new(
            Some(origin),
            Some(place("library", "Library")),
            RouteOptions::default(),
        );
        tx.send(moved).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.source.calls(), 6);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_ignores_selection_with_missing_endpoint() {
        let h = harness(PrefetchConfig::default());
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();
        let handle = tokio::spawn(h.scheduler.run(rx, token.clone()));

        tx.send(RouteSelection::new(
            None,
            Some(place("school", "School")),
            RouteOptions::default(),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(h.source.calls(), 0);
        assert!(h.cache.is_empty());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_channel_closes() {
        let h = harness(PrefetchConfig::default());
        let (tx, rx) = mpsc::channel::<RouteSelection>(1);
        let token = CancellationToken::new();
        let handle = tokio::spawn(h.scheduler.run(rx, token));

        drop(tx);
        handle.await.unwrap();
    }

    #[test]
    fn test_trigger_ignores_place_names_but_not_options() {
        let base = RouteSelection::new(
            Some(place("home", "Home")),
            Some(place("school", "School")),
            RouteOptions::default(),
        );
        let renamed = RouteSelection::new(
            Some(place("home", "Casa")),
            Some(place("school", "Escuela")),
            RouteOptions::default(),
        );
        assert_eq!(base.trigger(), renamed.trigger());

        let tolls = RouteSelection::new(
            base.origin.clone(),
            base.destination.clone(),
            RouteOptions::default().with_avoid_tolls(true),
        );
        assert_ne!(base.trigger(), tolls.trigger());

        let incomplete = RouteSelection::new(base.origin.clone(), None, RouteOptions::default());
        assert_eq!(incomplete.trigger(), None);
    }
}
