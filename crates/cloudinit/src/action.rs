//! Splitting a cloud-config document into actions
//!
//! The document is cut into blocks at every unindented `key:` line. Each block
//! (key line included) is decoded on its own, so one bad block cannot take
//! the rest of the document down with it.

use crate::error::CloudInitError;
use crate::run_cmd::RunCmdAction;
use crate::write_files::WriteFilesAction;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TOP_LEVEL_KEY: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^([A-Za-z_]+):"));

/// The block types we know how to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// `write_files`: files to create on the host
    WriteFiles,
    /// `runcmd`: shell commands to run
    RunCmd,
}

/// Top-level key to action kind.
const ACTION_TABLE: [(&str, ActionKind); 2] = [
    ("write_files", ActionKind::WriteFiles),
    ("runcmd", ActionKind::RunCmd),
];

impl ActionKind {
    /// Kind registered for a top-level key, if any.
    pub fn from_key(key: &str) -> Option<Self> {
        ACTION_TABLE
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }

    /// The top-level key of this kind.
    pub fn key(&self) -> &'static str {
        match self {
            ActionKind::WriteFiles => "write_files",
            ActionKind::RunCmd => "runcmd",
        }
    }

    /// Decodes a block, key line included.
    fn decode(&self, block: &str) -> Result<Action, serde_yaml::Error> {
        match self {
            ActionKind::WriteFiles => serde_yaml::from_str(block).map(Action::WriteFiles),
            ActionKind::RunCmd => serde_yaml::from_str(block).map(Action::RunCmd),
        }
    }
}

/// One translated block of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Decoded `write_files` block
    WriteFiles(WriteFilesAction),
    /// Decoded `runcmd` block
    RunCmd(RunCmdAction),
}

impl Action {
    /// Kind of the block this action was decoded from.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::WriteFiles(_) => ActionKind::WriteFiles,
            Action::RunCmd(_) => ActionKind::RunCmd,
        }
    }

    /// Shell commands for this action, in order.
    pub fn commands(&self) -> Result<Vec<String>, CloudInitError> {
        match self {
            Action::WriteFiles(action) => action.commands(),
            Action::RunCmd(action) => Ok(action.commands()),
        }
    }
}

/// Actions in document order plus the blocks that were skipped.
#[derive(Debug, Default)]
pub struct ParsedActions {
    /// Decoded blocks in document order
    pub actions: Vec<Action>,
    /// Block-local errors; see [`CloudInitError::is_block_local`]
    pub diagnostics: Vec<CloudInitError>,
}

struct Block<'a> {
    key: &'a str,
    /// 1-based line of the key
    line: usize,
    lines: Vec<&'a str>,
}

impl ParsedActions {
    fn close(&mut self, block: Block<'_>) {
        let Some(kind) = ActionKind::from_key(block.key) else {
            warn!("Skipping unknown cloud-config action {:?} at line {}", block.key, block.line);
            self.diagnostics.push(CloudInitError::UnknownAction {
                key: block.key.to_string(),
                line: block.line,
            });
            return;
        };

        let mut text = block.lines.join("\n");
        text.push('\n');

        match kind.decode(&text) {
            Ok(action) => {
                debug!("Parsed {} block at line {}", kind.key(), block.line);
                self.actions.push(action);
            }
            Err(source) => {
                let error = CloudInitError::MalformedBlock {
                    key: block.key.to_string(),
                    line: block.line,
                    source,
                };
                warn!("Skipping cloud-config block: {}", error);
                self.diagnostics.push(error);
            }
        }
    }
}

/// Splits `document` into actions.
///
/// Lines before the first top-level key (such as the `#cloud-config`
/// header) belong to no block and are dropped.
pub fn get_actions(document: &str) -> Result<ParsedActions, CloudInitError> {
    let top_level_key = TOP_LEVEL_KEY.as_ref().map_err(|e| CloudInitError::KeyPattern(e.clone()))?;
    let mut parsed = ParsedActions::default();
    let mut open: Option<Block<'_>> = None;

    for (index, line) in document.lines().enumerate() {
        if let Some(captures) = top_level_key.captures(line) {
            if let Some(block) = open.take() {
                parsed.close(block);
            }
            let key = captures.get(1).map_or("", |m| m.as_str());
            open = Some(Block {
                key,
                line: index + 1,
                lines: vec![line],
            });
        } else if let Some(block) = open.as_mut() {
            block.lines.push(line);
        }
    }
    if let Some(block) = open {
        parsed.close(block);
    }

    Ok(parsed)
}

/// `key:` with no value decodes as an empty list.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
