//! Server-sent event stream for live dashboards.
//!
//! `GET /events` registers a subscriber on the shared broadcaster and relays
//! every published event as an SSE `data:` frame. The subscriber is
//! unregistered automatically when the client disconnects and the stream is
//! dropped.

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use util::state::AppState;

/// GET /events
///
/// Opens the live event stream. The first frame is a `hello` event so clients
/// can confirm the connection; after that, every `DRIVER_LOCATION` and
/// `PACKAGE_CLOSED` event published while the client is connected is relayed
/// as a JSON data frame. Slow clients miss events rather than stalling the
/// publishers.
pub async fn stream_events(
    State(app_state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let subscriber = app_state.broadcaster().register();
    tracing::info!(subscriber_id = subscriber.id(), "SSE subscriber connected");

    let hello = stream::once(async {
        Ok::<_, Infallible>(SseEvent::default().event("hello").data("connected"))
    });

    let updates = stream::unfold(subscriber, |mut subscriber| async move {
        let payload = subscriber.recv().await?;
        Some((Ok::<_, Infallible>(SseEvent::default().data(payload)), subscriber))
    });

    Sse::new(hello.chain(updates)).keep_alive(KeepAlive::default())
}
