use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::ForecastSnapshot;
use crate::providers::{ProviderApi, ProviderError};
use crate::store::{SnapshotStore, save_snapshot};

/// What happened to the shared copy of a fetched snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ShareStatus {
    Written,
    /// A fetch started later had already published; the store was left alone.
    Superseded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastFetch {
    pub snapshot: Arc<ForecastSnapshot>,
    pub share: ShareStatus,
}

#[derive(Debug, Default)]
struct Published {
    ticket: u64,
    snapshot: Option<Arc<ForecastSnapshot>>,
}

/// Fetches forecasts, mirrors the newest one into the shared store and fans it out to
/// subscribers.
pub struct ForecastClient<P, S> {
    providers: P,
    store: S,
    next_ticket: AtomicU64,
    published: Mutex<Published>,
    subscribers: Mutex<Vec<Sender<Arc<ForecastSnapshot>>>>,
}

impl<P, S> ForecastClient<P, S>
where
    P: ProviderApi,
    S: SnapshotStore,
{
    pub fn new(providers: P, store: S) -> Self {
        Self {
            providers,
            store,
            next_ticket: AtomicU64::new(0),
            published: Mutex::new(Published::default()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn latest(&self) -> Option<Arc<ForecastSnapshot>> {
        self.published.lock().snapshot.clone()
    }

    pub fn subscribe(&self) -> Receiver<Arc<ForecastSnapshot>> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().push(sender);
        receiver
    }

    /// One request, no retry. Transport and decode failures leave the store and the
    /// published snapshot untouched; store failures only downgrade `share`.
    pub fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastFetch, ProviderError> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(ticket, lat, lon, "fetching forecast");

        let snapshot = match self.providers.fetch_forecast(lat, lon) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(error) => {
                tracing::debug!(ticket, %error, "forecast fetch failed");
                return Err(error);
            }
        };

        let share = self.publish(ticket, &snapshot);
        Ok(ForecastFetch { snapshot, share })
    }

    fn publish(&self, ticket: u64, snapshot: &Arc<ForecastSnapshot>) -> ShareStatus {
        let mut published = self.published.lock();
        if ticket <= published.ticket {
            tracing::debug!(
                ticket,
                latest = published.ticket,
                "dropping snapshot from superseded fetch"
            );
            return ShareStatus::Superseded;
        }

        published.ticket = ticket;
        published.snapshot = Some(Arc::clone(snapshot));

        // The store write stays under the lock so an older fetch cannot land after it.
        let share = match save_snapshot(&self.store, snapshot) {
            Ok(()) => ShareStatus::Written,
            Err(error) => {
                tracing::warn!(%error, "failed to share snapshot; keeping in-memory result");
                ShareStatus::Failed(error.to_string())
            }
        };
        drop(published);

        self.notify(snapshot);
        tracing::info!(
            ticket,
            temperature_c = snapshot.current.temperature_c,
            weather_code = snapshot.current.weather_code,
            "published forecast snapshot"
        );
        share
    }

    fn notify(&self, snapshot: &Arc<ForecastSnapshot>) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(Arc::clone(snapshot)).is_ok());
    }
}
