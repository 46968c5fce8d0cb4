//! Parsing of what the user types at the prompt.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input<'a> {
    Login(&'a str),
    Private { recipient: &'a str, text: &'a str },
    Users,
    Help,
    Quit,
    Public(&'a str),
    /// Blank line, nothing to do.
    Empty,
    /// A slash command we could not make sense of.
    Invalid(String),
}

/// Parse a prompt line. Anything not starting with `/` is a public message;
/// `//text` sends `/text` publicly.
pub fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Public(line);
    };
    if rest.starts_with('/') {
        return Input::Public(rest);
    }

    let (cmd, args) = rest.split_once(' ').unwrap_or((rest, ""));
    let args = args.trim_start();
    match cmd {
        "login" if !args.is_empty() && !args.contains(' ') => Input::Login(args),
        "login" => Input::Invalid("usage: /login <username>".into()),
        "msg" => match args.split_once(' ') {
            Some((recipient, text)) if !text.is_empty() => Input::Private { recipient, text },
            _ => Input::Invalid("usage: /msg <user> <text>".into()),
        },
        "users" => Input::Users,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command /{other}")),
    }
}
