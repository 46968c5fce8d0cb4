//! Chat client facade.
//!
//! This is the main entry point for SDK consumers. A [`ChatClient`] owns at
//! most one live [`Connection`] plus the listener registry, sends commands,
//! and runs one dispatch task per connection that turns server lines into
//! [`Event`]s for the registered listeners.
//!
//! ## Disconnects
//!
//! A connection ends in one of three ways, and all of them run the same
//! idempotent teardown:
//!
//! - [`ChatClient::disconnect`] closes it locally. Listeners hear nothing.
//! - The server closes the stream. Listeners hear nothing either.
//! - Reading fails. The error is stored as the last error and listeners get
//!   [`Event::PeerDisconnected`].
//!
//! The SDK does not reconnect. Call [`ChatClient::connect`] again; every
//! attempt gets a fresh connection and a fresh dispatch task.
//!
//! Dropping the last handle closes the current connection. The dispatch
//! task only holds a weak reference to the client.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::dispatch::{self, DispatchExit};
use crate::error::ChatError;
use crate::event::Event;
use crate::listener::{ChatListener, ListenerRegistry};
use crate::protocol::Command;

/// Whether a client currently has a live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// A handle to a chat client. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ChatClient {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Current connection, cleared by teardown.
    connection: Mutex<Option<Arc<Connection>>>,
    /// Dispatch task of the most recent connection.
    dispatch: Mutex<Option<JoinHandle<DispatchExit>>>,
    listeners: ListenerRegistry,
    /// Reason for the most recent failure. Overwritten, never cleared.
    last_error: Mutex<Option<String>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let Some(conn) = self.connection.get_mut().take() else {
            return;
        };
        if conn.close_now() {
            info!(peer = conn.peer(), "Client dropped, connection closed");
        }
    }
}

/// Non-owning handle held by the dispatch task.
pub(crate) struct WeakClient(Weak<Inner>);

impl WeakClient {
    /// The client, unless every handle to it has been dropped.
    pub(crate) fn upgrade(&self) -> Option<ChatClient> {
        self.0.upgrade().map(|inner| ChatClient { inner })
    }
}

impl ChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect to a chat server and start reading from it.
    ///
    /// Returns false if already connected or if the connection could not be
    /// opened; [`last_error`](Self::last_error) then says why. Must be
    /// called from within a tokio runtime.
    pub async fn connect(&self, host: &str, port: u16) -> bool {
        if self.is_connection_active() {
            self.record_error(ChatError::AlreadyConnected.to_string());
            return false;
        }
        match Connection::open(host, port).await {
            Ok(conn) => self.attach(conn),
            Err(e) => {
                warn!(host, port, error = %e, "Connect failed");
                self.record_error(e.to_string());
                false
            }
        }
    }

    /// Use an already-established stream instead of opening a TCP
    /// connection. Behaves like [`connect`](Self::connect) otherwise.
    pub fn connect_with_stream<S>(&self, stream: S, peer: &str) -> bool
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        if self.is_connection_active() {
            self.record_error(ChatError::AlreadyConnected.to_string());
            return false;
        }
        self.attach(Connection::from_stream(stream, peer))
    }

    fn attach(&self, conn: Connection) -> bool {
        let conn = Arc::new(conn);
        {
            let mut slot = self.inner.connection.lock();
            if slot.as_ref().is_some_and(|c| c.is_active()) {
                // Lost a race with a concurrent connect.
                drop(slot);
                self.record_error(ChatError::AlreadyConnected.to_string());
                return false;
            }
            *slot = Some(conn.clone());
        }
        info!(peer = conn.peer(), "Connected");

        let task = tokio::spawn(dispatch::run_dispatch(self.downgrade(), conn));
        *self.inner.dispatch.lock() = Some(task);
        true
    }

    pub(crate) fn downgrade(&self) -> WeakClient {
        WeakClient(Arc::downgrade(&self.inner))
    }

    /// Close the current connection, if any.
    ///
    /// Safe to call from any task and any number of times, including while
    /// the dispatch task is tearing the same connection down.
    pub async fn disconnect(&self) {
        let conn = self.inner.connection.lock().take();
        match conn {
            Some(conn) => {
                info!(peer = conn.peer(), "Disconnecting");
                self.teardown(&conn).await;
            }
            None => debug!("Disconnect without a connection"),
        }
    }

    /// Close `conn` and clear it from the slot if it is still the current
    /// one. Runs the actual close at most once per connection.
    pub(crate) async fn teardown(&self, conn: &Arc<Connection>) {
        {
            let mut slot = self.inner.connection.lock();
            if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, conn)) {
                *slot = None;
            }
        }
        match conn.close().await {
            Ok(true) => debug!(peer = conn.peer(), "Connection closed"),
            Ok(false) => {}
            Err(e) => {
                warn!(peer = conn.peer(), error = %e, "Error while closing connection");
                self.record_error(e.to_string());
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        let active = self
            .inner
            .connection
            .lock()
            .as_ref()
            .is_some_and(|c| c.is_active());
        if active {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// True while a connection is open and has not been torn down.
    pub fn is_connection_active(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Reason for the most recent failure, or `""` if there was none.
    pub fn last_error(&self) -> String {
        self.inner.last_error.lock().clone().unwrap_or_default()
    }

    pub(crate) fn record_error(&self, reason: String) {
        *self.inner.last_error.lock() = Some(reason);
    }

    /// Wait for the dispatch task of the most recent connection to stop.
    ///
    /// Returns `None` if no task was started since the last call, or if it
    /// panicked.
    pub async fn wait_dispatch_exit(&self) -> Option<DispatchExit> {
        let task = self.inner.dispatch.lock().take()?;
        task.await.ok()
    }

    #[cfg(test)]
    pub(crate) fn take_dispatch_task(&self) -> Option<JoinHandle<DispatchExit>> {
        self.inner.dispatch.lock().take()
    }

    // ── Listeners ──

    /// Register a listener. Adding one that is already registered is a
    /// no-op.
    pub fn add_listener(&self, listener: Arc<dyn ChatListener>) {
        self.inner.listeners.add(listener);
    }

    /// Unregister a listener. Removing one that is not registered is a
    /// no-op.
    pub fn remove_listener(&self, listener: &Arc<dyn ChatListener>) {
        self.inner.listeners.remove(listener);
    }

    pub(crate) fn broadcast(&self, event: &Event) {
        self.inner.listeners.broadcast(event);
    }

    // ── Commands ──

    /// Send a message to everyone. Returns false if it could not be sent.
    pub async fn send_public_message(&self, text: &str) -> bool {
        self.send_command(Command::PublicMessage(text.to_string()))
            .await
    }

    /// Ask the server to log us in as `username`. The outcome arrives as
    /// [`Event::LoginResult`].
    pub async fn try_login(&self, username: &str) -> bool {
        self.send_command(Command::Login(username.to_string())).await
    }

    /// Send a message to a single user.
    pub async fn send_private_message(&self, recipient: &str, text: &str) -> bool {
        self.send_command(Command::PrivateMessage {
            recipient: recipient.to_string(),
            text: text.to_string(),
        })
        .await
    }

    /// Ask for the current user list; it arrives as
    /// [`Event::UserListUpdate`].
    pub async fn refresh_user_list(&self) -> bool {
        self.send_command(Command::UserList).await
    }

    /// Ask which commands the server supports.
    pub async fn ask_supported_commands(&self) -> bool {
        self.send_command(Command::Help).await
    }

    async fn send_command(&self, command: Command) -> bool {
        let conn = self.inner.connection.lock().clone();
        let Some(conn) = conn else {
            debug!(%command, "No connection");
            return false;
        };
        match conn.write_line(&command.to_string()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Send failed");
                self.record_error(e.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_client_has_no_error_and_no_connection() {
        let client = ChatClient::new();
        assert_eq!(client.last_error(), "");
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.wait_dispatch_exit().await.is_none());
    }

    #[tokio::test]
    async fn sends_fail_quietly_without_connection() {
        let client = ChatClient::new();
        assert!(!client.send_public_message("hello").await);
        assert!(!client.try_login("alice").await);
        assert!(!client.send_private_message("bob", "hi").await);
        assert!(!client.refresh_user_list().await);
        assert!(!client.ask_supported_commands().await);
        // Not a failure worth recording.
        assert_eq!(client.last_error(), "");
    }

    #[tokio::test]
    async fn disconnect_without_connection_is_noop() {
        let client = ChatClient::new();
        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connection_active());
    }

    #[tokio::test]
    async fn second_connect_fails_fast() {
        let client = ChatClient::new();
        let (a, _server_a) = tokio::io::duplex(1024);
        let (b, _server_b) = tokio::io::duplex(1024);

        assert!(client.connect_with_stream(a, "a"));
        assert!(!client.connect_with_stream(b, "b"));
        assert_eq!(client.last_error(), "Already connected");
        assert_eq!(client.state(), ConnectionState::Connected);

        client.disconnect().await;
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn commands_reach_the_wire() {
        use tokio::io::{AsyncBufReadExt, BufReader};

        let client = ChatClient::new();
        let (stream, server) = tokio::io::duplex(1024);
        assert!(client.connect_with_stream(stream, "duplex"));

        assert!(client.try_login("alice").await);
        assert!(client.send_public_message("hello there").await);
        assert!(client.send_private_message("bob", "psst").await);
        assert!(client.refresh_user_list().await);
        assert!(client.ask_supported_commands().await);

        let mut lines = BufReader::new(server).lines();
        let mut got = Vec::new();
        for _ in 0..5 {
            got.push(lines.next_line().await.unwrap().unwrap());
        }
        assert_eq!(
            got,
            ["login alice", "msg hello there", "privmsg bob psst", "users", "help"]
        );

        client.disconnect().await;
        assert!(!client.send_public_message("too late").await);
    }

    #[tokio::test]
    async fn dropping_last_handle_closes_connection() {
        use tokio::io::AsyncReadExt;

        let (stream, mut server) = tokio::io::duplex(1024);
        {
            let client = ChatClient::new();
            assert!(client.connect_with_stream(stream, "duplex"));
            // Let the dispatch task block in read_line.
            tokio::task::yield_now().await;
        }

        let mut buf = [0u8; 16];
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), server.read(&mut buf))
            .await
            .expect("peer should see the stream close")
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn dropping_a_clone_keeps_connection() {
        use tokio::io::AsyncReadExt;

        let (stream, mut server) = tokio::io::duplex(1024);
        let client = ChatClient::new();
        assert!(client.connect_with_stream(stream, "duplex"));
        drop(client.clone());
        tokio::task::yield_now().await;

        assert!(client.is_connection_active());
        assert!(client.refresh_user_list().await);
        let mut buf = [0u8; 16];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"users\n");
    }
}
