use super::command_registry::{find_action, NO_ARG_COMMANDS, PATH_COMMANDS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    Select { path: String },
    Submit,
    Status,
    Wait,
    Reset,
    Help,
    Quit,
    Unknown { command: String, arg: String },
}

/// Only quoted arguments are shell-split. Anything else is the path verbatim.
fn parse_path_arg(arg: &str) -> String {
    let trimmed = arg.trim();
    if !trimmed.starts_with(['"', '\'']) {
        return trimmed.to_string();
    }
    match shell_words::split(trimmed) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => trimmed.to_string(),
    }
}

fn command_for_action(action: &str, arg: &str) -> SessionCommand {
    match action {
        "select" => SessionCommand::Select {
            path: parse_path_arg(arg),
        },
        "submit" => SessionCommand::Submit,
        "status" => SessionCommand::Status,
        "wait" => SessionCommand::Wait,
        "reset" => SessionCommand::Reset,
        "help" => SessionCommand::Help,
        _ => SessionCommand::Quit,
    }
}

/// Parses one line of the interactive session.
///
/// Slash commands are case-insensitive. Any other non-blank line is treated as
/// a path to select, the way a dropped file would be.
pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::Noop;
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return SessionCommand::Select {
            path: parse_path_arg(raw_trimmed),
        };
    };

    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    if let Some(action) = find_action(&command, PATH_COMMANDS) {
        return command_for_action(action, arg);
    }
    if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
        return command_for_action(action, arg);
    }
    SessionCommand::Unknown {
        command,
        arg: arg.to_string(),
    }
}
