use crate::config::Config;
use crate::events::AppEvent;
use crate::sys::location::{self, ConfiguredLocation, LocationSource};
use async_channel::Sender;
use nearby::geocode::{ReverseGeocoder, UNKNOWN_PLACE};
use std::time::Duration;

pub fn start_background_services(tx: Sender<AppEvent>, config: &Config) {
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            crate::sys::server::run_server(tx).await;
        });
    }

    {
        let tx = tx.clone();
        tokio::spawn(async move {
            crate::config::run_async_watcher(tx).await;
        });
    }

    spawn_locate(tx, config, 0);
}

/// Resolves the session's origin and a display name for it.
pub fn spawn_locate(tx: Sender<AppEvent>, config: &Config, generation: u64) {
    let source = ConfiguredLocation::from_config(&config.location);
    let timeout = config.location.timeout();
    let fallback = config.location.fallback;
    let fallback_name = config.location.fallback_name.clone();
    let geocoder = ReverseGeocoder::new(
        config.search.geocoder_endpoint.clone(),
        config.search.request_timeout(),
    );

    tokio::spawn(async move {
        let geocoder = match geocoder {
            Ok(g) => Some(g),
            Err(e) => {
                log::error!("Failed to build reverse geocoder: {}", e);
                None
            }
        };
        let target = Target {
            tx,
            generation,
            fallback,
            fallback_name,
        };
        locate_and_name(&source, timeout, geocoder.as_ref(), target).await;
    });
}

/// Where a locate run reports, and what it reports when nothing is found.
struct Target {
    tx: Sender<AppEvent>,
    generation: u64,
    fallback: nearby::Coordinate,
    fallback_name: String,
}

async fn locate_and_name<L: LocationSource>(
    source: &L,
    timeout: Duration,
    geocoder: Option<&ReverseGeocoder>,
    target: Target,
) {
    let Target {
        tx,
        generation,
        fallback,
        fallback_name,
    } = target;

    let fix = location::locate_or_fallback(source, timeout, fallback).await;
    if tx.send(AppEvent::Located { generation, fix }).await.is_err() {
        return;
    }

    if !fix.is_located() {
        let _ = tx
            .send(AppEvent::PlaceNamed {
                generation,
                name: fallback_name,
            })
            .await;
        return;
    }

    let name = match geocoder {
        Some(geocoder) => match geocoder.place_name(fix.coordinate).await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Reverse geocoding failed: {}", e);
                UNKNOWN_PLACE.to_string()
            }
        },
        None => UNKNOWN_PLACE.to_string(),
    };
    log::info!("Searching around {}", name);
    let _ = tx.send(AppEvent::PlaceNamed { generation, name }).await;
}
