//! SSE broadcaster for real-time client updates
//!
//! Fans attendance outcomes out to any number of passively-displaying
//! clients (dashboards, the TV board). Events are invalidation signals:
//! subscribers re-query the attendance views rather than trusting the
//! payload as source of truth.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use tapline_common::events::TaplineEvent;

/// Event broadcaster manages client connections and event distribution
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<TaplineEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer (recommended: 100 for SSE)
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!("Event broadcaster initialized with capacity {}", capacity);
        Self { tx }
    }

    /// Broadcast an event, ignoring if no clients are connected
    pub fn broadcast_lossy(&self, event: TaplineEvent) {
        if let Ok(count) = self.tx.send(event) {
            debug!("Broadcast event to {} clients", count);
        }
    }

    /// Get current number of connected clients
    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe directly to the raw event channel (in-process consumers)
    pub fn subscribe(&self) -> broadcast::Receiver<TaplineEvent> {
        self.tx.subscribe()
    }

    /// Create an SSE stream for a new client connection
    ///
    /// Events not matching `site_filter` are dropped before transmission, so
    /// a TV board subscribed to one site never sees another site's taps.
    pub fn subscribe_stream(
        &self,
        site_filter: Option<String>,
    ) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        let stream = BroadcastStream::new(rx);

        stream.filter_map(move |result| {
            let site_filter = site_filter.clone();
            async move {
                match result {
                    Ok(tapline_event) => {
                        if let Some(site) = &site_filter {
                            if tapline_event.site_id() != site {
                                return None;
                            }
                        }
                        // Convert TaplineEvent to axum SSE Event
                        let event = Event::default()
                            .event(tapline_event.event_type())
                            .json_data(&tapline_event)
                            .ok();
                        event.map(Ok)
                    }
                    Err(e) => {
                        // BroadcastStream wraps RecvError, just log and continue
                        warn!("SSE client error: {:?}", e);
                        None
                    }
                }
            }
        })
    }

    /// Create an Axum SSE response handler
    ///
    /// This is the handler function for GET /events
    pub fn handle_sse_connection(
        &self,
        site_filter: Option<String>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
        info!(
            "New SSE client connected (site filter: {:?}), total clients: {}",
            site_filter,
            self.client_count()
        );

        let initial = futures::stream::once(async {
            Ok(Event::default().event("ConnectionStatus").data("connected"))
        });

        Sse::new(initial.chain(self.subscribe_stream(site_filter))).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
    }
}
