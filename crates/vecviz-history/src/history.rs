//! Undo/redo stacks of [`Command`]s.
//!
//! Recording can be suppressed while a command is being performed so that
//! mutations it triggers are not logged twice. Suppression is a counter, so
//! scopes nest; [`History::suppress`] returns a guard that releases its level
//! when dropped, including on early return through `?`.
//!
//! An action that records several entries before squashing them opens a
//! group with [`History::begin_group`]. The entry limit is enforced when the
//! outermost group ends, never between the entries of one action.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use vecviz_core::Graph;

use crate::command::Command;
use crate::error::HistoryError;

/// Configuration for the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undo entries to keep. 0 = unlimited.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

impl HistoryConfig {
    /// Creates config with unlimited entries.
    pub fn unlimited() -> Self {
        Self { max_entries: 0 }
    }

    /// Creates config with a specific limit.
    pub fn with_limit(max: usize) -> Self {
        Self { max_entries: max }
    }
}

/// Command-based history manager.
#[derive(Debug, Default)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Number of active suppression scopes.
    disabled: usize,
    /// Number of open groups; trimming waits until it drops to zero.
    grouped: usize,
    config: HistoryConfig,
}

impl History {
    /// Creates an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            disabled: 0,
            grouped: 0,
            config,
        }
    }

    /// Returns true when new commands are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.disabled == 0
    }

    /// Enters a suppression scope. Pair with [`History::enable`].
    pub fn disable(&mut self) {
        self.disabled += 1;
    }

    /// Leaves a suppression scope.
    pub fn enable(&mut self) {
        if self.disabled == 0 {
            log::warn!("history enabled more often than it was disabled");
        }
        self.disabled = self.disabled.saturating_sub(1);
    }

    /// Suppresses recording until the returned guard is dropped.
    pub fn suppress(&mut self) -> Suppressed<'_> {
        self.disable();
        Suppressed { history: self }
    }

    /// Records a command that has already been performed.
    ///
    /// Clears the redo stack. Returns false (and records nothing) while
    /// recording is suppressed.
    pub fn add(&mut self, command: Command) -> bool {
        if !self.is_enabled() {
            log::trace!("not recording while suppressed: {}", command.description());
            return false;
        }
        log::trace!("recording: {}", command.description());
        self.undo_stack.push(command);
        self.redo_stack.clear();
        if self.grouped == 0 {
            self.trim();
        }
        true
    }

    /// Opens a group of entries belonging to one action. Pair with
    /// [`History::end_group`].
    pub fn begin_group(&mut self) {
        self.grouped += 1;
    }

    /// Closes a group, enforcing the entry limit once the outermost group
    /// is closed.
    pub fn end_group(&mut self) {
        if self.grouped == 0 {
            log::warn!("history group ended more often than it was begun");
        }
        self.grouped = self.grouped.saturating_sub(1);
        if self.grouped == 0 {
            self.trim();
        }
    }

    /// Returns true while a group is open.
    pub fn is_grouping(&self) -> bool {
        self.grouped > 0
    }

    fn trim(&mut self) {
        let max = self.config.max_entries;
        if max > 0 && self.undo_stack.len() > max {
            let excess = self.undo_stack.len() - max;
            log::trace!("dropping {excess} oldest entries");
            self.undo_stack.drain(..excess);
        }
    }

    /// Performs a command with recording suppressed, then records it.
    pub fn add_and_do(&mut self, command: Command, graph: &mut Graph) -> Result<bool, HistoryError> {
        {
            let _scope = self.suppress();
            command.apply(graph)?;
        }
        Ok(self.add(command))
    }

    /// Undoes the most recent command.
    ///
    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self, graph: &mut Graph) -> Result<bool, HistoryError> {
        let Some(command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let result = {
            let _scope = self.suppress();
            command.revert(graph)
        };
        match result {
            Ok(()) => {
                log::debug!("undo: {}", command.description());
                self.redo_stack.push(command);
                Ok(true)
            }
            Err(e) => {
                self.undo_stack.push(command);
                Err(e)
            }
        }
    }

    /// Redoes the most recently undone command.
    ///
    /// Returns false when there is nothing to redo.
    pub fn redo(&mut self, graph: &mut Graph) -> Result<bool, HistoryError> {
        let Some(command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let result = {
            let _scope = self.suppress();
            command.apply(graph)
        };
        match result {
            Ok(()) => {
                log::debug!("redo: {}", command.description());
                self.undo_stack.push(command);
                Ok(true)
            }
            Err(e) => {
                self.redo_stack.push(command);
                Err(e)
            }
        }
    }

    /// Merges the `n` most recent entries into one batch.
    ///
    /// The batch performs the entries oldest first and reverts them newest
    /// first. It takes the description of the oldest entry, which is the
    /// action that triggered the others.
    pub fn squash_top_actions(&mut self, n: usize) -> Result<(), HistoryError> {
        let available = self.undo_stack.len();
        if n > available {
            return Err(HistoryError::NotEnoughEntries {
                requested: n,
                available,
            });
        }
        if n < 2 {
            return Ok(());
        }
        let commands = self.undo_stack.split_off(available - n);
        let description = commands.first().map(Command::description);
        log::debug!(
            "squashed {n} entries into '{}'",
            description.as_deref().unwrap_or_default()
        );
        self.undo_stack.push(Command::batch(commands, description));
        Ok(())
    }

    /// Returns true if undo is possible.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if redo is possible.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of undo entries.
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of redo entries.
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The entry the next undo would revert.
    pub fn peek_undo(&self) -> Option<&Command> {
        self.undo_stack.last()
    }

    /// The entry the next redo would perform.
    pub fn peek_redo(&self) -> Option<&Command> {
        self.redo_stack.last()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Clears both stacks.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

/// Recording stays suppressed while this guard is alive.
pub struct Suppressed<'a> {
    history: &'a mut History,
}

impl Deref for Suppressed<'_> {
    type Target = History;

    fn deref(&self) -> &History {
        self.history
    }
}

impl DerefMut for Suppressed<'_> {
    fn deref_mut(&mut self) -> &mut History {
        self.history
    }
}

impl Drop for Suppressed<'_> {
    fn drop(&mut self) {
        self.history.enable();
    }
}
