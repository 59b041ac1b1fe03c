use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Extension, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::{models::CurrentUser, services::monitor::MONITORS_UPDATED, AppState};

// GET /events (monitor lifecycle notifications for the caller's conversations)
pub async fn sse_events(
    State(state): State<AppState>,
    Extension(u): Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let stream = futures_util::stream::unfold((rx, u.id), |(mut rx, user_id)| async move {
        let evt = loop {
            match rx.recv().await {
                Ok(evt) if !evt.is_for(&user_id) => continue,
                Ok(evt) => {
                    break Event::default()
                        .event(MONITORS_UPDATED)
                        .data(serde_json::to_string(&evt).unwrap_or_default());
                }
                Err(RecvError::Lagged(_)) => break Event::default().event("ping").data("lagged"),
                Err(RecvError::Closed) => return None,
            }
        };

        Some((Ok(evt), (rx, user_id)))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(20))
            .text("keep-alive"),
    )
}
