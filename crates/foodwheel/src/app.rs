use crate::config::{self, Config};
use crate::events::{AppEvent, Reply};
use crate::session::{Landing, Phase, Session};
use crate::sys::location::Fix;
use crate::sys::runtime;
use crate::view;
use crate::wheel::Wheel;
use async_channel::{Receiver, Sender};
use nearby::overpass::NearbyQuery;
use nearby::{GeodataSource, Ranker};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Owns the session and turns client commands into spins and searches.
///
/// Only one spin or search runs at a time. Work happens in spawned tasks that
/// report back through the event channel, so the loop never blocks on the network.
pub struct App<S> {
    session: Session,
    wheel: Wheel,
    config: Config,
    ranker: Arc<Ranker<S>>,
    tx: Sender<AppEvent>,
    rng: StdRng,
}

impl<S> App<S>
where
    S: GeodataSource + Send + Sync + 'static,
{
    pub fn new(
        config: Config,
        ranker: Ranker<S>,
        tx: Sender<AppEvent>,
        rng: StdRng,
    ) -> Result<Self, config::ConfigError> {
        let wheel = config.wheel()?;
        let session = Session::new(
            Fix::fallback(config.location.fallback),
            config.location.fallback_name.clone(),
        );
        Ok(Self {
            session,
            wheel,
            config,
            ranker: Arc::new(ranker),
            tx,
            rng,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn run(mut self, rx: Receiver<AppEvent>) {
        while let Ok(event) = rx.recv().await {
            self.handle(event).await;
        }
        log::info!("Event channel closed, stopping");
    }

    pub async fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::Spin(reply) => self.spin(reply).await,
            AppEvent::Retry(reply) => match self.session.last_category.clone() {
                Some(category) => {
                    let query = NearbyQuery::keyword(
                        self.session.fix.coordinate,
                        self.config.search.radius_m,
                        category.keyword.clone(),
                    );
                    self.search(reply, query, category.name.to_string()).await;
                }
                None => {
                    let _ = reply.send(view::nothing_to_retry(self.session.phase())).await;
                }
            },
            AppEvent::SearchAll(reply) => {
                let query =
                    NearbyQuery::any(self.session.fix.coordinate, self.config.search.radius_m);
                self.search(reply, query, "restaurant".to_string()).await;
            }
            AppEvent::Status(reply) => {
                for line in view::status(&self.session, &self.wheel) {
                    let _ = reply.send(line).await;
                }
            }
            AppEvent::Located { generation, fix } => {
                if self.session.set_fix(generation, fix) {
                    log::info!(
                        "Origin set to ({}, {})",
                        fix.coordinate.latitude,
                        fix.coordinate.longitude
                    );
                } else {
                    log::debug!("Dropping location from superseded run {}", generation);
                }
            }
            AppEvent::PlaceNamed { generation, name } => {
                if !self.session.set_place(generation, name) {
                    log::debug!("Dropping place name from superseded run {}", generation);
                }
            }
            AppEvent::Landed(landing) => self.session.land(landing),
            AppEvent::SearchFinished => self.session.finish(),
            AppEvent::ConfigReload => self.reload(),
        }
    }

    async fn spin(&mut self, reply: Reply) {
        if let Err(busy) = self.session.begin(Phase::Spinning) {
            let _ = reply.send(view::busy(&busy)).await;
            return;
        }

        let spin = &self.config.spin;
        let rotation = Wheel::draw_rotation(&mut self.rng, spin.min_turns, spin.max_turns);
        let category = self.wheel.resolve(rotation).clone();
        let duration = spin.duration();
        log::debug!("Spinning {:.3} turns onto {}", rotation / crate::wheel::FULL_TURN, category.name);

        let query = NearbyQuery::keyword(
            self.session.fix.coordinate,
            self.config.search.radius_m,
            category.keyword.clone(),
        );
        let max_results = self.config.search.max_results;
        let place = self.session.place.clone();
        let ranker = self.ranker.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let _ = reply
                .send(view::spinning(rotation / crate::wheel::FULL_TURN))
                .await;
            tokio::time::sleep(duration).await;

            let _ = reply.send(view::category(&category)).await;
            let label = category.name.to_string();
            let _ = tx
                .send(AppEvent::Landed(Landing { rotation, category }))
                .await;

            let _ = reply.send(view::searching(&label, &place)).await;
            run_search(&ranker, &query, max_results, &label, &reply).await;
            let _ = tx.send(AppEvent::SearchFinished).await;
        });
    }

    async fn search(&mut self, reply: Reply, query: NearbyQuery, label: String) {
        if let Err(busy) = self.session.begin(Phase::Searching) {
            let _ = reply.send(view::busy(&busy)).await;
            return;
        }

        let max_results = self.config.search.max_results;
        let place = self.session.place.clone();
        let ranker = self.ranker.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let _ = reply.send(view::searching(&label, &place)).await;
            run_search(&ranker, &query, max_results, &label, &reply).await;
            let _ = tx.send(AppEvent::SearchFinished).await;
        });
    }

    fn reload(&mut self) {
        log::info!("Reloading config...");
        let new_config = match config::load_config() {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to reload config: {}", e);
                return;
            }
        };
        self.apply_config(new_config);
    }

    fn apply_config(&mut self, new_config: Config) {
        let wheel = match new_config.wheel() {
            Ok(w) => w,
            Err(e) => {
                log::error!("Failed to reload config: {}", e);
                return;
            }
        };

        if new_config.search.endpoint != self.config.search.endpoint
            || new_config.search.request_timeout_secs != self.config.search.request_timeout_secs
        {
            log::warn!("Search endpoint and timeout changes apply after a restart");
        }
        let relocate = new_config.location != self.config.location;

        self.wheel = wheel;
        self.config = new_config;
        if relocate {
            let generation = self.session.relocate();
            runtime::spawn_locate(self.tx.clone(), &self.config, generation);
        }
        log::info!("Config reloaded ({} categories)", self.wheel.len());
    }
}

async fn run_search<S: GeodataSource>(
    ranker: &Ranker<S>,
    query: &NearbyQuery,
    max_results: usize,
    label: &str,
    reply: &Reply,
) {
    let lines = match ranker.search(query, max_results).await {
        Ok(places) => {
            log::info!("{} search returned {} places", label, places.len());
            view::results(&places)
        }
        Err(e) => {
            log::error!("{} search failed: {}", label, e);
            view::failure(label, &e)
        }
    };
    for line in lines {
        let _ = reply.send(line).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearby::SearchError;
    use parking_lot::Mutex;
    use rand::SeedableRng;

    const ONE_PIZZA: &str = r#"{"elements": [
        {"lat": 3.140, "lon": 101.6880, "tags": {"name": "Slice", "cuisine": "pizza", "amenity": "restaurant"}}
    ]}"#;

    struct FakeSource {
        body: Result<&'static str, u16>,
        seen: Arc<Mutex<Vec<NearbyQuery>>>,
    }

    impl GeodataSource for FakeSource {
        async fn fetch(&self, query: &NearbyQuery) -> Result<String, SearchError> {
            self.seen.lock().push(query.clone());
            match self.body {
                Ok(body) => Ok(body.to_string()),
                Err(status) => Err(SearchError::status(status, "")),
            }
        }
    }

    fn app(body: Result<&'static str, u16>) -> (App<FakeSource>, Receiver<AppEvent>, Arc<Mutex<Vec<NearbyQuery>>>) {
        let mut config = Config::default();
        config.spin.duration_ms = 0;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let source = FakeSource {
            body,
            seen: seen.clone(),
        };
        let (tx, rx) = async_channel::unbounded();
        let app = App::new(config, Ranker::new(source), tx, StdRng::seed_from_u64(7)).unwrap();
        (app, rx, seen)
    }

    async fn drain(rx: Receiver<String>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_spin_lands_searches_and_returns_to_idle() {
        let (mut app, events, seen) = app(Ok(ONE_PIZZA));
        let (reply, replies) = async_channel::unbounded();
        app.handle(AppEvent::Spin(reply)).await;
        assert_eq!(app.session().phase(), Phase::Spinning);

        let landed = events.recv().await.unwrap();
        assert!(matches!(landed, AppEvent::Landed(_)));
        app.handle(landed).await;
        assert_eq!(app.session().phase(), Phase::Searching);

        let finished = events.recv().await.unwrap();
        assert!(matches!(finished, AppEvent::SearchFinished));
        app.handle(finished).await;
        assert!(app.session().is_idle());

        let lines = drain(replies).await;
        let category = app.session().last_category.clone().unwrap();
        assert!(lines[0].starts_with("🎡 Spinning"));
        assert_eq!(lines[1], view::category(&category));
        assert!(lines[2].starts_with("🔍 Finding nearby"));
        assert_eq!(lines[3], "1. Slice (165m)");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].origin, nearby::Coordinate::KUALA_LUMPUR);
        assert!(seen[0].render().contains(category.keyword.as_str()));
    }

    #[tokio::test]
    async fn test_second_spin_is_rejected_while_busy() {
        let (mut app, events, seen) = app(Ok(ONE_PIZZA));
        let (first, _first_replies) = async_channel::unbounded();
        app.handle(AppEvent::Spin(first)).await;

        let (second, second_replies) = async_channel::unbounded();
        app.handle(AppEvent::Spin(second)).await;
        assert_eq!(
            drain(second_replies).await,
            vec!["⏳ Busy: the wheel is already spinning. Try again in a moment."]
        );

        let (third, third_replies) = async_channel::unbounded();
        app.handle(AppEvent::SearchAll(third)).await;
        assert_eq!(drain(third_replies).await.len(), 1);

        while let Ok(event) = events.recv().await {
            let done = matches!(event, AppEvent::SearchFinished);
            app.handle(event).await;
            if done {
                break;
            }
        }
        assert!(app.session().is_idle());
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_before_spin() {
        let (mut app, _events, seen) = app(Ok(ONE_PIZZA));
        let (reply, replies) = async_channel::unbounded();
        app.handle(AppEvent::Retry(reply)).await;
        let lines = drain(replies).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("nearby spin"));
        assert!(app.session().is_idle());
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_search_all_failure_is_rendered() {
        let (mut app, events, seen) = app(Err(429));
        let (reply, replies) = async_channel::unbounded();
        app.handle(AppEvent::SearchAll(reply)).await;
        assert_eq!(app.session().phase(), Phase::Searching);

        let finished = events.recv().await.unwrap();
        app.handle(finished).await;
        assert!(app.session().is_idle());

        let lines = drain(replies).await;
        assert!(lines[1].starts_with("⚠️ Sorry, couldn't find nearby restaurant places"));
        assert!(lines.iter().any(|l| l.contains("nearby retry")));
        assert_eq!(seen.lock()[0].filter, nearby::overpass::Filter::Any);
    }

    #[tokio::test]
    async fn test_located_and_named() {
        let (mut app, _events, _seen) = app(Ok(ONE_PIZZA));
        let here = nearby::Coordinate::new(1.3521, 103.8198);
        app.handle(AppEvent::Located {
            generation: 0,
            fix: Fix::located(here),
        })
        .await;
        app.handle(AppEvent::PlaceNamed {
            generation: 0,
            name: "Singapore".to_string(),
        })
        .await;

        let (reply, replies) = async_channel::unbounded();
        app.handle(AppEvent::Status(reply)).await;
        let lines = drain(replies).await;
        assert_eq!(lines[1], "location: Singapore (1.3521, 103.8198, located)");
    }

    #[tokio::test]
    async fn test_location_reload_ignores_the_earlier_run() {
        let (mut app, events, _seen) = app(Ok(ONE_PIZZA));
        let mut config = Config::default();
        config.location.fallback_name = "KL".to_string();
        app.apply_config(config);
        assert_eq!(app.session().locate_generation(), 1);

        // the reloaded run has no pinned position, so it reports the fallback
        for _ in 0..2 {
            let event = events.recv().await.unwrap();
            app.handle(event).await;
        }
        app.handle(AppEvent::PlaceNamed {
            generation: 0,
            name: "Singapore".to_string(),
        })
        .await;
        app.handle(AppEvent::Located {
            generation: 0,
            fix: Fix::located(nearby::Coordinate::new(1.3521, 103.8198)),
        })
        .await;

        let (reply, replies) = async_channel::unbounded();
        app.handle(AppEvent::Status(reply)).await;
        let lines = drain(replies).await;
        assert_eq!(lines[1], "location: KL (3.1390, 101.6869, fallback)");
    }

    #[test]
    fn test_apply_config_swaps_wheel() {
        let (mut app, _events, _seen) = app(Ok(ONE_PIZZA));
        let mut config = Config::default();
        config.categories.truncate(3);
        app.apply_config(config);
        assert_eq!(app.wheel.len(), 3);

        let mut broken = Config::default();
        broken.categories.clear();
        app.apply_config(broken);
        assert_eq!(app.wheel.len(), 3);
    }
}
