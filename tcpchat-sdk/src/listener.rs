//! Observers of client events and the registry that fans events out to them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::Event;

/// Receives events from a [`ChatClient`](crate::client::ChatClient).
///
/// Every handler has an empty default, so implementors only override what
/// they care about. Handlers run on the client's dispatch task and should
/// return quickly; the next server line is not read until all listeners
/// have handled the current event.
pub trait ChatListener: Send + Sync {
    /// Login finished. `reason` is the server's explanation on failure.
    fn on_login_result(&self, _success: bool, _reason: Option<&str>) {}

    /// A public or private message arrived.
    fn on_message_received(&self, _sender: &str, _text: &str, _private: bool) {}

    /// Our message could not be delivered.
    fn on_message_error(&self, _reason: &str) {}

    /// The server rejected our command.
    fn on_command_error(&self, _reason: &str) {}

    /// The server sent the list of connected users.
    fn on_user_list(&self, _usernames: &[String]) {}

    /// The server sent the commands it supports.
    fn on_supported_commands(&self, _commands: &[String]) {}

    /// The connection failed while we were reading from it.
    fn on_disconnect(&self) {}

    /// Route an event to the matching handler.
    fn on_event(&self, event: &Event) {
        match event {
            Event::LoginResult { success, reason } => {
                self.on_login_result(*success, reason.as_deref())
            }
            Event::PublicMessage { sender, text } => self.on_message_received(sender, text, false),
            Event::PrivateMessage { sender, text } => self.on_message_received(sender, text, true),
            Event::MessageDeliveryError { reason } => self.on_message_error(reason),
            Event::CommandError { reason } => self.on_command_error(reason),
            Event::UserListUpdate { usernames } => self.on_user_list(usernames),
            Event::SupportedCommands { commands } => self.on_supported_commands(commands),
            Event::PeerDisconnected => self.on_disconnect(),
        }
    }
}

/// Insertion-ordered set of listeners, compared by pointer identity.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn ChatListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns false if it was already registered.
    pub fn add(&self, listener: Arc<dyn ChatListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Unregister a listener. Returns false if it was not registered.
    pub fn remove(&self, listener: &Arc<dyn ChatListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `event` to every listener, in registration order, on the
    /// calling task.
    ///
    /// Works on a snapshot, so handlers may add or remove listeners; the
    /// change applies from the next event. A handler that panics is logged
    /// and skipped.
    pub fn broadcast(&self, event: &Event) {
        let snapshot: Vec<_> = self.listeners.read().clone();
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                tracing::warn!(event = event.kind(), "Listener panicked, continuing");
            }
        }
    }
}
