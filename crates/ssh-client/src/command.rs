//! Command batches
//!
//! A `Command` is an ordered list of shell commands plus the files to upload
//! before they run, all executed on the same host.

use std::fmt;

/// A local file copied to the remote host before the commands run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Local source path
    pub src: String,
    /// Remote destination (file or directory)
    pub dst: String,
}

impl FileUpload {
    /// Upload of local `src` to remote `dst`.
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Ordered shell commands and file uploads for one host.
///
/// Command strings are passed to the remote shell as-is; callers are
/// responsible for quoting anything they interpolate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    commands: Vec<String>,
    file_uploads: Vec<FileUpload>,
}

impl Command {
    /// Batch of `commands` with no uploads.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            file_uploads: Vec::new(),
        }
    }

    /// Adds a file to upload before the commands run.
    #[must_use]
    pub fn with_upload(mut self, file: FileUpload) -> Self {
        self.file_uploads.push(file);
        self
    }

    /// Replaces the command list, keeping the uploads.
    pub fn set_commands(&mut self, commands: Vec<String>) {
        self.commands = commands;
    }

    /// The commands in execution order.
    pub fn flatten(&self) -> &[String] {
        &self.commands
    }

    /// Uploads, copied before any command runs.
    pub fn file_uploads(&self) -> &[FileUpload] {
        &self.file_uploads
    }

    /// Appends `other` so that its commands run after ours.
    pub fn append(&mut self, other: Command) {
        self.commands.extend(other.commands);
        self.file_uploads.extend(other.file_uploads);
    }

    /// True when there is nothing to run or upload.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.file_uploads.is_empty()
    }
}

impl From<Vec<String>> for Command {
    fn from(commands: Vec<String>) -> Self {
        Self {
            commands,
            file_uploads: Vec::new(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.commands.join(" && "))
    }
}
