//! Cloud-config Bootstrap Data Translator
//!
//! Converts the cloud-config document produced by a cluster bootstrap
//! provider into an ordered [`ssh_client::Command`] that can be replayed on a
//! host over SSH.
//!
//! Supported top-level keys:
//! - `write_files`: each file becomes `mkdir`, a `tee` write, and optional
//!   `chmod`/`chown` commands
//! - `runcmd`: each entry is run verbatim
//!
//! Unknown or malformed blocks are skipped and reported as diagnostics; the
//! rest of the document is still translated.

pub mod action;
pub mod error;
pub mod parser;
pub mod run_cmd;
pub mod write_files;

pub use action::{Action, ActionKind, ParsedActions, get_actions};
pub use error::CloudInitError;
pub use parser::{BootstrapDataParser, BootstrapFormat, ParseOutcome};
pub use run_cmd::{RunCmdAction, RunCmdEntry};
pub use write_files::{ContentEncoding, FileMode, WriteFile, WriteFilesAction};
