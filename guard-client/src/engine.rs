//! Background synchronization of exchange offers.
//!
//! A timer-driven loop polls the offer endpoint, diffs each fetched offer
//! against the snapshot and publishes one [`ChangeEvent`] per observed
//! transition to subscribed observers, synchronously and in subscription
//! order. A failed or partially-parsed fetch leaves the snapshot untouched
//! and the timer alive; rate limiting and network failures delay the next
//! poll with backoff. Shutdown races the in-flight fetch, dropping it
//! mid-request.

use crate::clock::ClockSource;
use crate::session::SessionManager;
use crate::transport::{decode_json, HttpRequest, Transport};
use guard_core::{calculate_backoff, OfferSnapshot};
use guard_types::wire::OffersEnvelope;
use guard_types::{ChangeEvent, GuardError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Receiver of offer change events.
///
/// Called synchronously from the engine's polling task; implementations
/// should hand work off rather than block the poll.
pub trait OfferObserver: Send + Sync {
    /// One observed offer transition.
    fn on_change(&self, event: &ChangeEvent);
}

/// Returned when the same observer is subscribed twice.
#[derive(Debug, Error)]
#[error("observer is already subscribed")]
pub struct AlreadySubscribed;

type ObserverList = Arc<Mutex<Vec<Arc<dyn OfferObserver>>>>;

/// Consecutive rejected polls tolerated before the loop gives up.
const UNAUTHORIZED_POLL_LIMIT: u32 = 3;

/// Unsubscribe handle returned by [`OfferSyncEngine::subscribe`].
///
/// Unsubscribing is idempotent and safe while a delivery is in flight; the
/// observer stops receiving events from the next poll on.
pub struct Subscription {
    observers: ObserverList,
    observer: Arc<dyn OfferObserver>,
}

impl Subscription {
    /// Remove the observer from the engine.
    pub fn unsubscribe(&self) {
        let mut observers = self.observers.lock().expect("observer lock poisoned");
        observers.retain(|existing| !Arc::ptr_eq(existing, &self.observer));
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

/// Poller keeping a local snapshot of offers in step with the service.
pub struct OfferSyncEngine {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    base_url: String,
    poll_interval: Duration,
    /// Offers whose last update predates engine construction are not
    /// interesting; the fetch cuts history off here.
    start_timestamp: i64,
    snapshot: tokio::sync::Mutex<OfferSnapshot>,
    observers: ObserverList,
    stop: Notify,
}

impl OfferSyncEngine {
    /// Create an engine; captures the construction timestamp from `clock`.
    pub async fn new(
        transport: Arc<dyn Transport>,
        session: Arc<SessionManager>,
        clock: &ClockSource,
        base_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, GuardError> {
        let start_timestamp = clock.now_synchronized().await?;
        Ok(Self {
            transport,
            session,
            base_url: base_url.into(),
            poll_interval,
            start_timestamp,
            snapshot: tokio::sync::Mutex::new(OfferSnapshot::new()),
            observers: Arc::new(Mutex::new(Vec::new())),
            stop: Notify::new(),
        })
    }

    /// Register an observer for subsequent change events.
    ///
    /// The same observer (by `Arc` identity) cannot be subscribed twice.
    pub fn subscribe(
        &self,
        observer: Arc<dyn OfferObserver>,
    ) -> Result<Subscription, AlreadySubscribed> {
        let mut observers = self.observers.lock().expect("observer lock poisoned");
        if observers.iter().any(|existing| Arc::ptr_eq(existing, &observer)) {
            return Err(AlreadySubscribed);
        }
        observers.push(Arc::clone(&observer));
        Ok(Subscription {
            observers: Arc::clone(&self.observers),
            observer,
        })
    }

    /// Fetch once, apply the diff, publish events. Returns the event count.
    ///
    /// The response is parsed in full before the snapshot is touched, so a
    /// malformed body cannot leave a half-applied fetch behind.
    pub async fn poll_once(&self) -> Result<usize, GuardError> {
        let session = self.session.ensure_fresh().await?;
        let request = HttpRequest::get(format!(
            "{}/trade-offers?key={}&get_sent_offers=1&get_received_offers=1\
             &active_only=1&time_historical_cutoff={}",
            self.base_url, session.access_token, self.start_timestamp
        ));

        let response = self.transport.execute(request).await?;
        let envelope: OffersEnvelope = decode_json(&response)?;
        let offers = envelope.into_offers();

        let events: Vec<ChangeEvent> = {
            let mut snapshot = self.snapshot.lock().await;
            offers
                .into_iter()
                .filter_map(|offer| snapshot.set_offer(offer))
                .collect()
        };

        let observers = self.observers.lock().expect("observer lock poisoned").clone();
        for event in &events {
            for observer in &observers {
                observer.on_change(event);
            }
        }

        debug!(events = events.len(), "poll applied");
        Ok(events.len())
    }

    /// Drive the polling loop until [`shutdown`](Self::shutdown).
    ///
    /// Every fetch is raced against the stop signal, so shutting down
    /// mid-poll drops the in-flight request. Rate limiting and transient
    /// network failures delay the next poll with backoff; other
    /// recoverable errors keep the fixed cadence. A fatal crypto failure
    /// ends the loop with an error, as does a session rejected three polls
    /// in a row: the engine holds no credentials, so re-login is the
    /// embedding application's call.
    pub async fn run(&self) -> Result<(), GuardError> {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failed_attempts: u32 = 0;
        let mut unauthorized_polls: u32 = 0;

        loop {
            tokio::select! {
                _ = self.stop.notified() => {
                    debug!("offer sync engine stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }
            if failed_attempts > 0 {
                tokio::select! {
                    _ = self.stop.notified() => return Ok(()),
                    _ = tokio::time::sleep(calculate_backoff(failed_attempts)) => {}
                }
            }

            let outcome = tokio::select! {
                _ = self.stop.notified() => {
                    debug!("offer sync engine stopped mid-poll");
                    return Ok(());
                }
                outcome = self.poll_once() => outcome,
            };
            match outcome {
                Ok(_) => {
                    failed_attempts = 0;
                    unauthorized_polls = 0;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(GuardError::Canceled) => return Ok(()),
                Err(GuardError::Unauthorized) => {
                    unauthorized_polls = unauthorized_polls.saturating_add(1);
                    if unauthorized_polls >= UNAUTHORIZED_POLL_LIMIT {
                        warn!(polls = unauthorized_polls, "session rejected repeatedly, stopping");
                        return Err(GuardError::Unauthorized);
                    }
                    warn!("session rejected, retrying next poll");
                }
                Err(err) => {
                    if err.is_retryable() {
                        failed_attempts = failed_attempts.saturating_add(1);
                    }
                    warn!(error = %err, "poll failed, snapshot unchanged");
                }
            }
        }
    }

    /// Stop the polling loop; a poll in flight is aborted.
    pub fn shutdown(&self) {
        self.stop.notify_one();
    }

    /// Number of offers currently tracked.
    pub async fn tracked_offers(&self) -> usize {
        self.snapshot.lock().await.len()
    }
}

impl std::fmt::Debug for OfferSyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfferSyncEngine")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("start_timestamp", &self.start_timestamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::second_factor::HeadlessSecondFactor;
    use crate::transport::{HttpResponse, MockTransport, TransportError};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use guard_types::{AccountId, AuthenticatorSecret, DeviceId, OfferState, Session};

    fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#).as_bytes());
        format!("{header}.{payload}.sig")
    }

    async fn engine_with(transport: Arc<dyn Transport>) -> OfferSyncEngine {
        let clock = Arc::new(ClockSource::new(Arc::clone(&transport), "https://svc"));
        let secret = AuthenticatorSecret::new(
            "zvIJbyNW15bOxPcHuYOKWxbQTWA=",
            "Ks0wwT2eMLRz9qO6ZKRQFTMURNw=",
            DeviceId::new("android:01"),
        );
        let factor = Arc::new(HeadlessSecondFactor::new(secret, Arc::clone(&clock)));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            Arc::clone(&clock),
            factor,
            "https://svc",
        ));
        session.install_session(Session {
            session_id: "sess".into(),
            access_token: jwt_with_exp(1_800_000_000),
            refresh_token: "r".into(),
            account_id: AccountId::new(1),
        });
        OfferSyncEngine::new(
            transport,
            session,
            &clock,
            "https://svc",
            Duration::from_secs(60),
        )
        .await
        .unwrap()
    }

    async fn engine(mock: &MockTransport) -> OfferSyncEngine {
        // First queued reply feeds the construction-time clock sync.
        mock.queue_response(HttpResponse::ok(
            r#"{"response":{"server_time":1700000000}}"#,
        ));
        engine_with(Arc::new(mock.clone())).await
    }

    /// Answers the first request, then never completes another one.
    struct StallingTransport {
        first: Mutex<Option<HttpResponse>>,
    }

    #[async_trait::async_trait]
    impl Transport for StallingTransport {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let first = self.first.lock().unwrap().take();
            match first {
                Some(response) => Ok(response),
                None => std::future::pending().await,
            }
        }
    }

    fn offers_body(entries: &[(u64, u64)]) -> String {
        let offers: Vec<String> = entries
            .iter()
            .map(|(id, state)| {
                format!(
                    r#"{{"tradeofferid":"{id}","accountid_other":7,
                        "trade_offer_state":{state},"time_created":1,"time_updated":2}}"#
                )
            })
            .collect();
        format!(
            r#"{{"response":{{"trade_offers_sent":[{}],"trade_offers_received":[]}}}}"#,
            offers.join(",")
        )
    }

    #[derive(Default)]
    struct CountingObserver {
        events: Mutex<Vec<ChangeEvent>>,
    }

    impl CountingObserver {
        fn events(&self) -> Vec<ChangeEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl OfferObserver for CountingObserver {
        fn on_change(&self, event: &ChangeEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    // === Diff and delivery ===

    #[tokio::test]
    async fn first_sight_of_an_offer_is_announced() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer = Arc::new(CountingObserver::default());
        engine.subscribe(observer.clone()).unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));
        let emitted = engine.poll_once().await.unwrap();

        assert_eq!(emitted, 1);
        let events = observer.events();
        assert!(events[0].is_new());
        assert_eq!(events[0].current.state, OfferState::Active);
    }

    #[tokio::test]
    async fn unchanged_ticks_emit_zero_events() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer = Arc::new(CountingObserver::default());
        engine.subscribe(observer.clone()).unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2), (2, 9)])));
        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2), (2, 9)])));
        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2), (2, 9)])));

        assert_eq!(engine.poll_once().await.unwrap(), 2);
        assert_eq!(engine.poll_once().await.unwrap(), 0);
        assert_eq!(engine.poll_once().await.unwrap(), 0);
        assert_eq!(observer.events().len(), 2);
    }

    #[tokio::test]
    async fn state_transition_carries_both_sides() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer = Arc::new(CountingObserver::default());
        engine.subscribe(observer.clone()).unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));
        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 3)])));
        engine.poll_once().await.unwrap();
        engine.poll_once().await.unwrap();

        let events = observer.events();
        assert_eq!(events.len(), 2);
        let transition = &events[1];
        assert_eq!(
            transition.previous.as_ref().unwrap().state,
            OfferState::Active
        );
        assert_eq!(transition.current.state, OfferState::Accepted);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_snapshot_untouched() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer = Arc::new(CountingObserver::default());
        engine.subscribe(observer.clone()).unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));
        mock.queue_response(HttpResponse::with_status(500, "oops"));
        mock.queue_response(HttpResponse::ok("{not json"));
        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));

        assert_eq!(engine.poll_once().await.unwrap(), 1);
        assert!(engine.poll_once().await.is_err());
        assert!(engine.poll_once().await.is_err());
        // The offer is still known: no re-announcement.
        assert_eq!(engine.poll_once().await.unwrap(), 0);
        assert_eq!(engine.tracked_offers().await, 1);
    }

    #[tokio::test]
    async fn fetch_carries_cutoff_and_key() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;

        mock.queue_response(HttpResponse::ok(offers_body(&[])));
        engine.poll_once().await.unwrap();

        let url = mock.last_request().unwrap().url;
        assert!(url.contains("/trade-offers?key="));
        assert!(url.contains("get_sent_offers=1"));
        assert!(url.contains("get_received_offers=1"));
        assert!(url.contains("active_only=1"));
        assert!(url.contains("time_historical_cutoff="));
    }

    // === Subscriptions ===

    #[tokio::test]
    async fn duplicate_subscription_is_rejected() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer: Arc<dyn OfferObserver> = Arc::new(CountingObserver::default());

        engine.subscribe(Arc::clone(&observer)).unwrap();
        assert!(engine.subscribe(observer).is_err());

        // A distinct observer is fine.
        engine
            .subscribe(Arc::new(CountingObserver::default()))
            .unwrap();
    }

    #[tokio::test]
    async fn unsubscribed_observer_stops_receiving() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        let observer = Arc::new(CountingObserver::default());
        let subscription = engine.subscribe(observer.clone()).unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));
        engine.poll_once().await.unwrap();

        subscription.unsubscribe();
        // Idempotent.
        subscription.unsubscribe();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 3)])));
        engine.poll_once().await.unwrap();

        assert_eq!(observer.events().len(), 1);
    }

    #[tokio::test]
    async fn delivery_follows_subscription_order() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;

        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        struct Named {
            name: &'static str,
            order: Arc<Mutex<Vec<&'static str>>>,
        }
        impl OfferObserver for Named {
            fn on_change(&self, _event: &ChangeEvent) {
                self.order.lock().unwrap().push(self.name);
            }
        }

        engine
            .subscribe(Arc::new(Named {
                name: "first",
                order: Arc::clone(&order),
            }))
            .unwrap();
        engine
            .subscribe(Arc::new(Named {
                name: "second",
                order: Arc::clone(&order),
            }))
            .unwrap();

        mock.queue_response(HttpResponse::ok(offers_body(&[(1, 2)])));
        engine.poll_once().await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    // === Lifecycle ===

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let mock = MockTransport::new();
        let engine = Arc::new(engine(&mock).await);
        // First tick fires immediately; give it an empty fetch.
        mock.queue_response(HttpResponse::ok(offers_body(&[])));

        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run().await })
        };
        // Let the loop reach its select.
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("engine did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn shutdown_aborts_an_in_flight_poll() {
        // The clock sync succeeds; the first offer fetch hangs forever.
        let transport: Arc<dyn Transport> = Arc::new(StallingTransport {
            first: Mutex::new(Some(HttpResponse::ok(
                r#"{"response":{"server_time":1700000000}}"#,
            ))),
        });
        let engine = Arc::new(engine_with(transport).await);

        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run().await })
        };
        // Let the first tick enter the hanging fetch.
        tokio::time::sleep(Duration::from_millis(50)).await;
        engine.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("shutdown did not abort the in-flight poll")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn canceled_fetch_ends_the_loop_cleanly() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        mock.queue_error(TransportError::Canceled);

        assert!(engine.run().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_poll_backs_off_before_retrying() {
        let mock = MockTransport::new();
        let engine = Arc::new(engine(&mock).await);
        mock.queue_error(TransportError::RateLimited);
        mock.queue_response(HttpResponse::ok(offers_body(&[])));

        let start = tokio::time::Instant::now();
        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.run().await })
        };
        // Clock sync, the rejected poll, the delayed retry.
        while mock.request_count() < 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let elapsed = start.elapsed();
        engine.shutdown();
        task.await.unwrap().unwrap();

        // First poll fails at t=0, the next tick lands at 60s, and the
        // backoff adds 2s plus up to 5s of jitter on top of it.
        assert!(elapsed >= Duration::from_secs(62), "retry was not delayed: {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(68), "retry delayed too long: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_session_rejection_surfaces_unauthorized() {
        let mock = MockTransport::new();
        let engine = engine(&mock).await;
        mock.queue_response(HttpResponse::with_status(401, ""));
        mock.queue_response(HttpResponse::with_status(401, ""));
        mock.queue_response(HttpResponse::with_status(401, ""));

        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized));
        // Clock sync plus exactly three rejected polls.
        assert_eq!(mock.request_count(), 4);
    }
}
