//! Chat protocol lines: outgoing commands and incoming responses.
//!
//! Every message is one `\n`-terminated line. The first space-delimited
//! token is the keyword; the rest of the line holds the arguments. The
//! final argument runs to the end of the line and may contain spaces, so
//! nothing is escaped in either direction.

use std::fmt;

use crate::event::Event;

/// Requests the client can send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(String),
    PublicMessage(String),
    PrivateMessage { recipient: String, text: String },
    UserList,
    Help,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Login(username) => write!(f, "login {username}"),
            Command::PublicMessage(text) => write!(f, "msg {text}"),
            Command::PrivateMessage { recipient, text } => {
                write!(f, "privmsg {recipient} {text}")
            }
            Command::UserList => write!(f, "users"),
            Command::Help => write!(f, "help"),
        }
    }
}

/// Decode one server line (terminator already stripped) into an event.
///
/// Unknown keywords, empty lines and lines the grammar cannot fully parse
/// yield `None`. Decoding never fails.
pub fn decode(line: &str) -> Option<Event> {
    if line.is_empty() {
        return None;
    }
    let (keyword, params) = line.split_once(' ').unwrap_or((line, ""));

    let event = match keyword {
        "loginok" => Event::LoginResult {
            success: true,
            reason: None,
        },
        "loginerr" => Event::LoginResult {
            success: false,
            reason: Some(params.to_string()),
        },
        "msg" => {
            let (sender, text) = params.split_once(' ').unwrap_or((params, ""));
            Event::PublicMessage {
                sender: sender.to_string(),
                text: text.to_string(),
            }
        }
        "privmsg" => {
            // A private message without text is dropped rather than
            // delivered empty.
            let Some((sender, text)) = params.split_once(' ') else {
                tracing::trace!(line, "privmsg without text, dropping");
                return None;
            };
            Event::PrivateMessage {
                sender: sender.to_string(),
                text: text.to_string(),
            }
        }
        "msgerr" => Event::MessageDeliveryError {
            reason: params.to_string(),
        },
        "cmderr" => Event::CommandError {
            reason: params.to_string(),
        },
        "users" => Event::UserListUpdate {
            usernames: split_words(params),
        },
        "supported" => Event::SupportedCommands {
            commands: split_words(params),
        },
        _ => {
            tracing::trace!(keyword, "unknown keyword, dropping");
            return None;
        }
    };
    Some(event)
}

/// Split on single spaces, skipping the empty tokens that runs of spaces
/// (or an empty list) would produce.
fn split_words(params: &str) -> Vec<String> {
    params
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_commands() {
        assert_eq!(Command::Login("alice".into()).to_string(), "login alice");
        assert_eq!(
            Command::PublicMessage("hello there".into()).to_string(),
            "msg hello there"
        );
        assert_eq!(
            Command::PrivateMessage {
                recipient: "bob".into(),
                text: "see you at 5".into(),
            }
            .to_string(),
            "privmsg bob see you at 5"
        );
        assert_eq!(Command::UserList.to_string(), "users");
        assert_eq!(Command::Help.to_string(), "help");
    }

    #[test]
    fn decode_login_ok() {
        assert_eq!(
            decode("loginok"),
            Some(Event::LoginResult {
                success: true,
                reason: None,
            })
        );
    }

    #[test]
    fn decode_login_err_keeps_full_reason() {
        assert_eq!(
            decode("loginerr username already in use"),
            Some(Event::LoginResult {
                success: false,
                reason: Some("username already in use".into()),
            })
        );
    }

    #[test]
    fn decode_public_message_keeps_spaces_in_text() {
        assert_eq!(
            decode("msg bob hello  there "),
            Some(Event::PublicMessage {
                sender: "bob".into(),
                text: "hello  there ".into(),
            })
        );
    }

    #[test]
    fn decode_public_message_without_text() {
        assert_eq!(
            decode("msg bob"),
            Some(Event::PublicMessage {
                sender: "bob".into(),
                text: String::new(),
            })
        );
    }

    #[test]
    fn decode_private_message() {
        assert_eq!(
            decode("privmsg carol psst, over here"),
            Some(Event::PrivateMessage {
                sender: "carol".into(),
                text: "psst, over here".into(),
            })
        );
    }

    #[test]
    fn private_message_without_text_is_dropped() {
        assert_eq!(decode("privmsg carol"), None);
        assert_eq!(decode("privmsg"), None);
    }

    #[test]
    fn decode_errors() {
        assert_eq!(
            decode("msgerr no such user"),
            Some(Event::MessageDeliveryError {
                reason: "no such user".into(),
            })
        );
        assert_eq!(
            decode("cmderr command not understood"),
            Some(Event::CommandError {
                reason: "command not understood".into(),
            })
        );
    }

    #[test]
    fn decode_user_list_preserves_order() {
        assert_eq!(
            decode("users alice bob carol"),
            Some(Event::UserListUpdate {
                usernames: vec!["alice".into(), "bob".into(), "carol".into()],
            })
        );
    }

    #[test]
    fn decode_empty_user_list() {
        assert_eq!(
            decode("users"),
            Some(Event::UserListUpdate { usernames: vec![] })
        );
    }

    #[test]
    fn runs_of_spaces_do_not_yield_empty_names() {
        assert_eq!(
            decode("users a  b "),
            Some(Event::UserListUpdate {
                usernames: vec!["a".into(), "b".into()],
            })
        );
    }

    #[test]
    fn decode_supported_commands() {
        assert_eq!(
            decode("supported login msg privmsg users help"),
            Some(Event::SupportedCommands {
                commands: ["login", "msg", "privmsg", "users", "help"]
                    .map(String::from)
                    .to_vec(),
            })
        );
    }

    #[test]
    fn unknown_and_empty_lines_yield_nothing() {
        assert_eq!(decode(""), None);
        assert_eq!(decode("joke why did the chicken"), None);
        assert_eq!(decode("LOGINOK"), None);
        assert_eq!(decode(" loginok"), None);
    }
}
