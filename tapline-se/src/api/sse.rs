//! Server-Sent Events (SSE) endpoint
//!
//! Streams attendance outcome events to connected clients, filtered by
//! site so a display only sees its own center's taps.

use crate::api::server::AppContext;
use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub struct EventStreamQuery {
    /// Only deliver events for this site; omit for all sites
    pub site_id: Option<String>,
}

/// GET /events - SSE event stream
pub async fn event_stream(
    State(ctx): State<AppContext>,
    Query(query): Query<EventStreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    ctx.engine
        .broadcaster()
        .handle_sse_connection(query.site_id)
}
