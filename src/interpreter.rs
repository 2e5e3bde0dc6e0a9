// ============================================================================
// INTERPRETER — one script line at a time against a shared workspace
// ============================================================================

use crate::command::{Command, Cursor, Workspace, WorkspaceOptions};
use crate::dispatch;
use crate::error::Result;

/// Owns the named stores and the cursors. Lines run strictly in order:
/// parse, execute, then update the cursors, before the next line is read.
#[derive(Debug, Default)]
pub struct Interpreter {
    workspace: Workspace,
    cursor: Cursor,
}

impl Interpreter {
    pub fn new(options: WorkspaceOptions) -> Self {
        Self {
            workspace: Workspace::new(options),
            cursor: Cursor::default(),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Tokenize, dispatch and run one line. Returns the command that ran.
    pub fn run_line(&mut self, line: &str) -> Result<Command> {
        let command = dispatch::parse_line(line, &self.cursor)?;
        self.run(&command)?;
        Ok(command)
    }

    /// Run an already-built command.
    pub fn run(&mut self, command: &Command) -> Result<()> {
        log::debug!("executing {:?}", command);
        command.execute(&mut self.workspace)?;
        command.alter_language_state(&mut self.cursor, &self.workspace)
    }
}
