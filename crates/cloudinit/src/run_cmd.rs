//! `runcmd` block

use crate::action::null_as_empty;
use serde::Deserialize;

/// A single `runcmd` entry: either a shell line or an argv list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RunCmdEntry {
    /// Shell line, run as written
    Line(String),
    /// Argument list
    Argv(Vec<String>),
}

impl RunCmdEntry {
    /// Argv lists are joined with single spaces, without quoting.
    pub fn to_command(&self) -> String {
        match self {
            RunCmdEntry::Line(line) => line.clone(),
            RunCmdEntry::Argv(argv) => argv.join(" "),
        }
    }
}

/// A decoded `runcmd` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunCmdAction {
    /// Entries in document order
    #[serde(rename = "runcmd", default, deserialize_with = "null_as_empty")]
    pub entries: Vec<RunCmdEntry>,
}

impl RunCmdAction {
    /// One command per entry, in order. Commands run with the privileges of
    /// the SSH user; nothing is prefixed.
    pub fn commands(&self) -> Vec<String> {
        self.entries.iter().map(RunCmdEntry::to_command).collect()
    }
}
