//! Client SDK for line-based TCP chat servers.
//!
//! The protocol is plain text, one command or response per `\n`-terminated
//! line. [`client::ChatClient`] connects, sends commands, and runs a
//! background task that decodes server lines into [`event::Event`]s and
//! hands them to registered [`listener::ChatListener`]s.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tcpchat_sdk::{ChatClient, ChatListener};
//!
//! struct Printer;
//!
//! impl ChatListener for Printer {
//!     fn on_message_received(&self, sender: &str, text: &str, _private: bool) {
//!         println!("{sender}: {text}");
//!     }
//! }
//!
//! let client = ChatClient::new();
//! client.add_listener(Arc::new(Printer));
//! if client.connect("127.0.0.1", 1300).await {
//!     client.try_login("alice").await;
//!     client.send_public_message("hello everyone").await;
//! } else {
//!     eprintln!("{}", client.last_error());
//! }
//! ```

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod listener;
pub mod protocol;

pub use client::{ChatClient, ConnectionState};
pub use connection::MAX_LINE_LEN;
pub use dispatch::DispatchExit;
pub use error::{ChatError, ChatResult};
pub use event::Event;
pub use listener::{ChatListener, ListenerRegistry};
pub use protocol::Command;
