//! Listeners that print client events to stdout.

use tcpchat_sdk::{ChatListener, Event};

/// Human-readable output, one line per event.
pub struct TextPrinter;

impl ChatListener for TextPrinter {
    fn on_login_result(&self, success: bool, reason: Option<&str>) {
        if success {
            println!("* logged in");
        } else {
            println!("* login failed: {}", reason.unwrap_or("no reason given"));
        }
    }

    fn on_message_received(&self, sender: &str, text: &str, private: bool) {
        if private {
            println!("[private] <{sender}> {text}");
        } else {
            println!("<{sender}> {text}");
        }
    }

    fn on_message_error(&self, reason: &str) {
        println!("* message not delivered: {reason}");
    }

    fn on_command_error(&self, reason: &str) {
        println!("* command rejected: {reason}");
    }

    fn on_user_list(&self, usernames: &[String]) {
        println!("* users ({}): {}", usernames.len(), usernames.join(", "));
    }

    fn on_supported_commands(&self, commands: &[String]) {
        println!("* server supports: {}", commands.join(" "));
    }

    fn on_disconnect(&self) {
        println!("* connection lost");
    }
}

/// One JSON object per event, for piping into other tools.
pub struct JsonPrinter;

impl ChatListener for JsonPrinter {
    fn on_event(&self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("Can't serialize {} event: {e}", event.kind()),
        }
    }
}
