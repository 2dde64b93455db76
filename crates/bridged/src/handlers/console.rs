//! `console_command`: screened console command execution.

use std::sync::Arc;

use serde_json::json;

use super::payload::required_str;
use crate::dispatch::{Handler, HandlerError, HandlerResult, RequestContext, error_code};
use crate::host::EditorHost;

const BLOCKED_COMMANDS: &[&str] = &[
    "quit",
    "exit",
    "crash",
    "shutdown",
    "restart",
    "reboot",
    "debug exec",
];

const FORBIDDEN_TOKENS: &[&str] = &[
    "rm ",
    "rm-",
    "del ",
    "format ",
    "rmdir",
    "mklink",
    "copy ",
    "move ",
    "start \"",
    "system(",
    "import os",
    "import subprocess",
    "subprocess.",
    "os.system",
    "exec(",
    "eval(",
    "__import__",
    "import sys",
    "import importlib",
    "with open",
    "open(",
];

/// Why a console command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockReason {
    Explicit,
    ForbiddenToken(&'static str),
    Chaining,
    MultiLine,
    SemicolonOrPipe,
    Backtick,
}

impl BlockReason {
    fn describe(self, command: &str) -> String {
        match self {
            Self::Explicit => format!("Command '{command}' is explicitly blocked for safety"),
            Self::ForbiddenToken(token) => {
                format!("Command '{command}' contains forbidden token '{token}' and is blocked")
            }
            Self::Chaining => "Command chaining is blocked for safety".to_owned(),
            Self::MultiLine => "Multi-line commands are blocked for safety".to_owned(),
            Self::SemicolonOrPipe => {
                "Command chaining with semicolon or pipe is blocked for safety".to_owned()
            }
            Self::Backtick => "Commands containing backticks are blocked for safety".to_owned(),
        }
    }
}

/// Checks `command` against the block rules, first match wins.
pub(crate) fn screen_command(command: &str) -> Option<BlockReason> {
    let lower = command.to_lowercase();

    let explicitly_blocked = BLOCKED_COMMANDS.iter().any(|blocked| {
        lower == *blocked
            || lower
                .strip_prefix(blocked)
                .is_some_and(|rest| rest.starts_with(' '))
    });
    if explicitly_blocked {
        return Some(BlockReason::Explicit);
    }
    if let Some(token) = FORBIDDEN_TOKENS.iter().copied().find(|token| lower.contains(token)) {
        return Some(BlockReason::ForbiddenToken(token));
    }
    if lower.contains("&&") || lower.contains("||") {
        return Some(BlockReason::Chaining);
    }
    if lower.contains(['\n', '\r']) {
        return Some(BlockReason::MultiLine);
    }
    if lower.contains([';', '|']) {
        return Some(BlockReason::SemicolonOrPipe);
    }
    if lower.contains('`') {
        return Some(BlockReason::Backtick);
    }
    None
}

/// Runs console commands that pass [`screen_command`].
pub(crate) struct ConsoleCommandHandler {
    editor: Arc<dyn EditorHost>,
}

impl ConsoleCommandHandler {
    pub(crate) fn new(editor: Arc<dyn EditorHost>) -> Self {
        Self { editor }
    }
}

impl Handler for ConsoleCommandHandler {
    fn handle(&self, ctx: &RequestContext<'_>) -> HandlerResult {
        let command = required_str(ctx.payload(), "command").map_err(|_| {
            HandlerError::invalid_argument("Console command requires command parameter")
        })?;

        if let Some(reason) = screen_command(command) {
            ctx.fail(&reason.describe(command), error_code::COMMAND_BLOCKED);
            return Ok(true);
        }

        self.editor
            .execute_console_command(command)
            .map_err(|error| HandlerError::new(format!("Failed to execute command: {error}")))?;
        ctx.succeed(
            &format!("Executed console command: {command}"),
            Some(json!({"command": command, "executed": true})),
        );
        Ok(true)
    }
}
