//! Relay Engine
//!
//! Two independent pumps, one per direction. The relay ends as soon as either
//! pump reports EOF or an error; the other pump is aborted, which drops its
//! halves and closes both sockets. Data still in flight on the unfinished
//! direction at that moment may be lost.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use super::session::{Direction, RelayCounters, RelayReport};

const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// Aborts the wrapped task when dropped, so teardown runs on every exit path
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Handles data relay between client and target connections
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayEngine;

impl RelayEngine {
    pub fn new() -> Self {
        Self
    }

    /// Relay bytes both ways until the first direction finishes.
    ///
    /// Both streams are consumed and closed before this returns or, for the
    /// aborted pump, as soon as the runtime drops it.
    pub async fn relay<C, T>(&self, client: C, target: T) -> RelayReport
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let counters = Arc::new(RelayCounters::new());

        let (client_read, client_write) = tokio::io::split(client);
        let (target_read, target_write) = tokio::io::split(target);

        let mut upstream = AbortOnDrop(tokio::spawn(
            pump(
                client_read,
                target_write,
                Direction::ClientToTarget,
                Arc::clone(&counters),
            )
            .in_current_span(),
        ));
        let mut downstream = AbortOnDrop(tokio::spawn(
            pump(
                target_read,
                client_write,
                Direction::TargetToClient,
                Arc::clone(&counters),
            )
            .in_current_span(),
        ));

        let (finished, joined) = tokio::select! {
            joined = &mut upstream.0 => (Direction::ClientToTarget, joined),
            joined = &mut downstream.0 => (Direction::TargetToClient, joined),
        };

        let result = joined.unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));
        debug!(finished = %finished, ok = result.is_ok(), "First relay direction finished");

        drop(upstream);
        drop(downstream);

        RelayReport {
            finished,
            result,
            bytes_up: counters.bytes_up(),
            bytes_down: counters.bytes_down(),
            duration: counters.duration(),
        }
    }
}

/// Copy from `reader` to `writer` until EOF or error
async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    counters: Arc<RelayCounters>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            debug!(direction = %direction, "EOF");
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        counters.add(direction, n as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio::time::timeout;
    use tracing::{info_span, Event, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use tracing_subscriber::Layer;

    /// Records the name of the span each event was emitted in
    #[derive(Clone, Default)]
    struct EventSpans(Arc<Mutex<Vec<(u32, Option<String>)>>>);

    impl<S> Layer<S> for EventSpans
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let span = ctx.event_span(event).map(|span| span.name().to_string());
            let line = event.metadata().line().unwrap_or(0);
            self.0.lock().unwrap().push((line, span));
        }
    }

    #[tokio::test]
    async fn test_relays_both_directions() {
        let (client, mut client_peer) = duplex(1024);
        let (target, mut target_peer) = duplex(1024);

        let relay = tokio::spawn(async move { RelayEngine::new().relay(client, target).await });

        client_peer.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        target_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        target_peer.write_all(b"pong!").await.unwrap();
        let mut buf = [0u8; 5];
        client_peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong!");

        drop(client_peer);
        let report = timeout(Duration::from_secs(2), relay).await.unwrap().unwrap();
        assert_eq!(report.finished, Direction::ClientToTarget);
        assert!(report.result.is_ok());
        assert_eq!(report.bytes_up, 4);
        assert_eq!(report.bytes_down, 5);
    }

    #[tokio::test]
    async fn test_target_close_ends_relay_and_closes_client() {
        let (client, mut client_peer) = duplex(1024);
        let (target, target_peer) = duplex(1024);

        let relay = tokio::spawn(async move { RelayEngine::new().relay(client, target).await });
        drop(target_peer);

        let report = timeout(Duration::from_secs(2), relay).await.unwrap().unwrap();
        assert_eq!(report.finished, Direction::TargetToClient);

        // The client side sees EOF once the relay has torn down
        let mut buf = [0u8; 1];
        let n = timeout(Duration::from_secs(2), client_peer.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_pump_events_carry_the_session_span() {
        let spans = EventSpans::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(spans.clone()),
        );

        let (client, client_peer) = duplex(64);
        let (target, _target_peer) = duplex(64);
        drop(client_peer);

        RelayEngine::new()
            .relay(client, target)
            .instrument(info_span!("session"))
            .await;

        let recorded = spans.0.lock().unwrap().clone();
        assert!(recorded.len() >= 2, "expected pump and relay events: {recorded:?}");
        for (line, span) in recorded {
            assert_eq!(span.as_deref(), Some("session"), "event at line {line}");
        }
    }
}
