//! Background task that reads server lines and broadcasts decoded events.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::WeakClient;
use crate::connection::Connection;
use crate::error::ChatError;
use crate::event::Event;
use crate::protocol;

/// Why a dispatch task stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// The connection was closed on our side.
    Closed,
    /// The server closed the stream.
    PeerClosed,
    /// Reading failed; listeners were sent [`Event::PeerDisconnected`].
    Failed,
}

/// Read lines from `conn` until it becomes inactive.
///
/// Each event is handed to every listener before the next line is read, so
/// listeners see events in arrival order and never two at once. The loop
/// also stops once every handle to the client is gone; dropping the client
/// closes `conn`, which wakes the pending read.
pub(crate) async fn run_dispatch(client: WeakClient, conn: Arc<Connection>) -> DispatchExit {
    debug!(peer = conn.peer(), "Dispatch started");
    while conn.is_active() {
        match conn.read_line().await {
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                let Some(event) = protocol::decode(&line) else {
                    continue;
                };
                let Some(client) = client.upgrade() else {
                    break;
                };
                client.broadcast(&event);
            }
            Ok(None) => {
                info!(peer = conn.peer(), "Server closed the connection");
                match client.upgrade() {
                    Some(client) => client.teardown(&conn).await,
                    None => {
                        let _ = conn.close().await;
                    }
                }
                return DispatchExit::PeerClosed;
            }
            Err(ChatError::Closed) => break,
            Err(e) => {
                warn!(peer = conn.peer(), error = %e, "Read failed");
                match client.upgrade() {
                    Some(client) => {
                        client.record_error(e.to_string());
                        client.teardown(&conn).await;
                        client.broadcast(&Event::PeerDisconnected);
                    }
                    None => {
                        let _ = conn.close().await;
                    }
                }
                return DispatchExit::Failed;
            }
        }
    }
    debug!(peer = conn.peer(), "Dispatch stopped");
    DispatchExit::Closed
}
