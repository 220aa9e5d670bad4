use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::middleware::auth::AuthenticatedUser;
use crate::sse::{ConnectionRegistry, StreamEvent, STREAM_BUFFER};
use crate::state::AppState;

/// Open the long-lived event stream for the authenticated user. The stream is
/// the registry's handle for this user until the client disconnects or a
/// newer connection replaces it.
pub async fn connect_stream(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Sse<EventStream> {
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let connection_id = state.registry.register(user_id, tx).await;

    let stream = EventStream {
        registry: state.registry.clone(),
        user_id,
        connection_id,
        rx,
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Bridges the registry's channel onto the SSE response and deregisters the
/// connection when the transport closes.
pub struct EventStream {
    registry: ConnectionRegistry,
    user_id: Uuid,
    connection_id: Uuid,
    rx: mpsc::Receiver<StreamEvent>,
}

impl Stream for EventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(event)) => match Event::default().json_data(&event) {
                    Ok(frame) => return Poll::Ready(Some(Ok(frame))),
                    Err(e) => {
                        warn!(user_id = %this.user_id, error = %e, "failed to encode stream event, dropping frame");
                        continue;
                    }
                },
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let user_id = self.user_id;
        let connection_id = self.connection_id;
        tokio::spawn(async move {
            registry.unregister(user_id, connection_id).await;
        });
    }
}
