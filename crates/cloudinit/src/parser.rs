//! Bootstrap data parser

use crate::action::{ParsedActions, get_actions};
use crate::error::CloudInitError;
use ssh_client::Command;
use tracing::{debug, warn};

/// Format of the bootstrap data, read from the Secret's `format` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapFormat {
    /// `#cloud-config` user data
    CloudConfig,
}

impl BootstrapFormat {
    /// An empty tag means cloud-config.
    pub fn from_tag(tag: &[u8]) -> Result<Self, CloudInitError> {
        let tag = String::from_utf8_lossy(tag);
        match tag.trim() {
            "" | "cloud-config" => Ok(BootstrapFormat::CloudConfig),
            other => Err(CloudInitError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Translated bootstrap data.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// Commands of every action, in document order
    pub command: Command,
    /// Blocks that were skipped
    pub diagnostics: Vec<CloudInitError>,
}

/// Translates cloud-config bootstrap data into shell commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapDataParser;

impl BootstrapDataParser {
    /// Creates a parser.
    pub fn new() -> Self {
        Self
    }

    /// Translates `data` into one command batch.
    ///
    /// Actions contribute their commands in document order.
    pub fn parse(&self, data: &[u8], format: &[u8]) -> Result<ParseOutcome, CloudInitError> {
        match BootstrapFormat::from_tag(format)? {
            BootstrapFormat::CloudConfig => self.parse_cloud_config(data),
        }
    }

    fn parse_cloud_config(&self, data: &[u8]) -> Result<ParseOutcome, CloudInitError> {
        let document = std::str::from_utf8(data)?;
        let ParsedActions { actions, diagnostics } = get_actions(document)?;

        let mut command = Command::default();
        for action in &actions {
            command.append(Command::from(action.commands()?));
        }

        if !diagnostics.is_empty() {
            warn!("Skipped {} cloud-config block(s) while parsing bootstrap data", diagnostics.len());
        }
        debug!(
            "Parsed {} action(s) into {} command(s)",
            actions.len(),
            command.flatten().len()
        );

        Ok(ParseOutcome { command, diagnostics })
    }
}
