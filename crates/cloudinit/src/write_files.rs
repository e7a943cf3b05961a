//! `write_files` block
//!
//! Every file turns into shell commands run through `sudo`:
//!
//! 1. `mkdir -p` of the parent directory
//! 2. a `tee` (or `tee -a` when appending) fed with the decoded content
//! 3. `chmod` when the permissions differ from `0644`
//! 4. `chown` when the owner differs from `root:root`

use crate::action::null_as_empty;
use crate::error::CloudInitError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fmt;
use std::io::Read;

/// Mode of a file with no `permissions`; no chmod is emitted for it.
pub const DEFAULT_PERMISSIONS: &str = "0644";
/// Owner of a file with no `owner`; no chown is emitted for it.
pub const DEFAULT_OWNER: &str = "root:root";

/// One decoding step applied to `write_files` content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Standard base64, whitespace ignored
    Base64,
    /// gzip stream
    Gzip,
    /// Taken as-is
    Plain,
}

/// File mode as written in the document.
///
/// `'0644'` and `0644` both arrive as text (YAML 1.2 reads a leading zero
/// as a string); a bare `644` arrives as a number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileMode {
    /// Quoted or zero-led mode, used verbatim
    Text(String),
    /// Bare integer, zero-padded to four digits
    Number(u64),
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMode::Text(mode) => f.write_str(mode.trim()),
            FileMode::Number(mode) => write!(f, "{mode:04}"),
        }
    }
}

/// One `write_files` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WriteFile {
    /// Absolute path on the host
    pub path: String,
    /// Encoding of `content`, such as `b64` or `gz+b64`
    #[serde(default)]
    pub encoding: Option<String>,
    /// `user:group`, defaults to [`DEFAULT_OWNER`]
    #[serde(default)]
    pub owner: Option<String>,
    /// Octal mode, defaults to [`DEFAULT_PERMISSIONS`]
    #[serde(default)]
    pub permissions: Option<FileMode>,
    /// File content, encoded as `encoding` says
    #[serde(default)]
    pub content: Option<String>,
    /// Append instead of overwriting
    #[serde(default)]
    pub append: bool,
}

/// A decoded `write_files` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WriteFilesAction {
    /// Entries in document order
    #[serde(rename = "write_files", default, deserialize_with = "null_as_empty")]
    pub files: Vec<WriteFile>,
}

impl WriteFilesAction {
    /// Commands for every file, in document order.
    ///
    /// A file whose content fails to decode fails the whole action.
    pub fn commands(&self) -> Result<Vec<String>, CloudInitError> {
        let mut commands = Vec::with_capacity(self.files.len() * 4);
        for file in &self.files {
            commands.extend(file.commands()?);
        }
        Ok(commands)
    }
}

impl WriteFile {
    /// mkdir and write, then chmod and chown when they differ from the defaults.
    pub fn commands(&self) -> Result<Vec<String>, CloudInitError> {
        let path = fix_path(&self.path);
        let encodings = fix_encoding(self.encoding.as_deref().unwrap_or_default());
        let content = fix_content(self.content.as_deref().unwrap_or_default().as_bytes(), &encodings, path)?;
        let permissions = fix_permissions(self.permissions.as_ref());
        let owner = fix_owner(self.owner.as_deref());

        let mut commands = vec![
            format!("sudo mkdir -p {}", parent_dir(path)),
            write_command(&content, path, self.append),
        ];
        if permissions != DEFAULT_PERMISSIONS {
            commands.push(format!("sudo chmod {permissions} {path}"));
        }
        if owner != DEFAULT_OWNER {
            commands.push(format!("sudo chown {owner} {path}"));
        }
        Ok(commands)
    }
}

/// Path with surrounding whitespace removed.
pub fn fix_path(path: &str) -> &str {
    path.trim()
}

/// Owner, or [`DEFAULT_OWNER`] when missing or blank.
pub fn fix_owner(owner: Option<&str>) -> String {
    match owner.map(str::trim) {
        Some(owner) if !owner.is_empty() => owner.to_string(),
        _ => DEFAULT_OWNER.to_string(),
    }
}

/// Mode text, or [`DEFAULT_PERMISSIONS`] when missing or blank.
pub fn fix_permissions(permissions: Option<&FileMode>) -> String {
    match permissions.map(ToString::to_string) {
        Some(mode) if !mode.is_empty() => mode,
        _ => DEFAULT_PERMISSIONS.to_string(),
    }
}

/// Maps an encoding name to its decoding steps, applied in order.
///
/// Unrecognized names are treated as plain text.
pub fn fix_encoding(encoding: &str) -> Vec<ContentEncoding> {
    match encoding.trim().to_ascii_lowercase().as_str() {
        "gz" | "gzip" => vec![ContentEncoding::Gzip],
        "gz+base64" | "gzip+base64" | "gz+b64" | "gzip+b64" => vec![ContentEncoding::Base64, ContentEncoding::Gzip],
        "base64" | "b64" => vec![ContentEncoding::Base64],
        _ => vec![ContentEncoding::Plain],
    }
}

/// Runs `content` through every decoding step and returns the text.
pub fn fix_content(content: &[u8], encodings: &[ContentEncoding], path: &str) -> Result<String, CloudInitError> {
    let mut data = content.to_vec();
    for encoding in encodings {
        data = match encoding {
            ContentEncoding::Base64 => {
                let compact: Vec<u8> = data.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
                STANDARD.decode(compact).map_err(|source| CloudInitError::Base64 {
                    path: path.to_string(),
                    source,
                })?
            }
            ContentEncoding::Gzip => gunzip(&data).map_err(|source| CloudInitError::Gzip {
                path: path.to_string(),
                source,
            })?,
            ContentEncoding::Plain => data,
        };
    }
    String::from_utf8(data).map_err(|_| CloudInitError::NonUtf8Content { path: path.to_string() })
}

fn gunzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    GzDecoder::new(data).read_to_end(&mut decoded)?;
    Ok(decoded)
}

/// Directory to create before writing `path`.
fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        None => ".",
        Some(0) => "/",
        Some(index) => &path[..index],
    }
}

/// `printf` keeps the content byte-exact; single quotes are closed, escaped
/// and reopened.
fn write_command(content: &str, path: &str, append: bool) -> String {
    let escaped = content.replace('\'', r"'\''");
    let tee = if append { "sudo tee -a" } else { "sudo tee" };
    format!("printf '%s' '{escaped}' | {tee} {path} > /dev/null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn file(path: &str, content: &str) -> WriteFile {
        WriteFile {
            path: path.to_string(),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_mode_and_owner_emit_two_commands() {
        let commands = file("/etc/kubernetes/a.conf", "hello\n").commands().unwrap();

        assert_eq!(
            commands,
            [
                "sudo mkdir -p /etc/kubernetes",
                "printf '%s' 'hello\n' | sudo tee /etc/kubernetes/a.conf > /dev/null",
            ]
        );
    }

    #[test]
    fn test_non_default_permissions_and_owner() {
        let mut with_mode = file("/etc/a", "x");
        with_mode.permissions = Some(FileMode::Text("0600".to_string()));
        assert_eq!(with_mode.commands().unwrap().len(), 3);
        assert_eq!(with_mode.commands().unwrap()[2], "sudo chmod 0600 /etc/a");

        let mut with_both = with_mode.clone();
        with_both.owner = Some("kube:kube".to_string());
        let commands = with_both.commands().unwrap();
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[3], "sudo chown kube:kube /etc/a");

        let mut explicit_defaults = file("/etc/a", "x");
        explicit_defaults.permissions = Some(FileMode::Text(" 0644 ".to_string()));
        explicit_defaults.owner = Some(" root:root ".to_string());
        assert_eq!(explicit_defaults.commands().unwrap().len(), 2);
    }

    #[test]
    fn test_append_only_changes_tee_flag() {
        let overwrite = file("/var/log/x", "line\n");
        let mut append = overwrite.clone();
        append.append = true;

        let overwrite = overwrite.commands().unwrap();
        let append = append.commands().unwrap();

        assert_eq!(overwrite[0], append[0]);
        assert_eq!(append[1], overwrite[1].replace("sudo tee ", "sudo tee -a "));
        assert!(append[1].contains("| sudo tee -a /var/log/x"));
    }

    #[test]
    fn test_single_quotes_are_escaped() {
        let commands = file("/tmp/q", "it's").commands().unwrap();
        assert_eq!(commands[1], r"printf '%s' 'it'\''s' | sudo tee /tmp/q > /dev/null");
    }

    #[test]
    fn test_path_is_trimmed_and_parent_resolved() {
        assert_eq!(file("  /etc/a.conf \n", "").commands().unwrap()[0], "sudo mkdir -p /etc");
        assert_eq!(file("/a.conf", "").commands().unwrap()[0], "sudo mkdir -p /");
        assert_eq!(file("relative.conf", "").commands().unwrap()[0], "sudo mkdir -p .");
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!(fix_encoding("b64"), [ContentEncoding::Base64]);
        assert_eq!(fix_encoding("BASE64"), [ContentEncoding::Base64]);
        assert_eq!(fix_encoding("gzip"), [ContentEncoding::Gzip]);
        assert_eq!(fix_encoding("gz+b64"), [ContentEncoding::Base64, ContentEncoding::Gzip]);
        assert_eq!(fix_encoding(""), [ContentEncoding::Plain]);
        assert_eq!(fix_encoding("text/plain"), [ContentEncoding::Plain]);
    }

    #[test]
    fn test_content_round_trips_through_encodings() {
        let payload = "apiVersion: kubeadm.k8s.io/v1beta3\nkind: JoinConfiguration\n";

        let b64 = STANDARD.encode(payload);
        assert_eq!(fix_content(b64.as_bytes(), &fix_encoding("base64"), "/p").unwrap(), payload);

        let gz = gzip(payload.as_bytes());
        assert_eq!(fix_content(&gz, &fix_encoding("gzip"), "/p").unwrap(), payload);

        let gz_b64 = STANDARD.encode(gzip(payload.as_bytes()));
        assert_eq!(fix_content(gz_b64.as_bytes(), &fix_encoding("gzip+base64"), "/p").unwrap(), payload);
    }

    #[test]
    fn test_base64_ignores_line_breaks() {
        let wrapped = "aGVsbG8g\nd29ybGQ=\n";
        assert_eq!(fix_content(wrapped.as_bytes(), &[ContentEncoding::Base64], "/p").unwrap(), "hello world");
    }

    #[test]
    fn test_decode_failures() {
        let err = fix_content(b"!!not base64!!", &[ContentEncoding::Base64], "/etc/x").unwrap_err();
        assert!(matches!(err, CloudInitError::Base64 { ref path, .. } if path == "/etc/x"));

        let err = fix_content(b"plainly not gzip", &[ContentEncoding::Gzip], "/etc/y").unwrap_err();
        assert!(matches!(err, CloudInitError::Gzip { ref path, .. } if path == "/etc/y"));

        let binary = STANDARD.encode([0xff, 0xfe, 0x00]);
        let err = fix_content(binary.as_bytes(), &[ContentEncoding::Base64], "/etc/z").unwrap_err();
        assert!(matches!(err, CloudInitError::NonUtf8Content { .. }));
    }

    #[test]
    fn test_decode_failure_fails_action() {
        let action = WriteFilesAction {
            files: vec![
                file("/etc/ok", "fine"),
                WriteFile {
                    encoding: Some("base64".to_string()),
                    ..file("/etc/bad", "%%%")
                },
            ],
        };
        assert!(action.commands().is_err());
    }

    #[test]
    fn test_permissions_forms() {
        let action: WriteFilesAction = serde_yaml::from_str(
            "write_files:\n- path: /a\n  permissions: '0600'\n- path: /b\n  permissions: 0644\n- path: /c\n  permissions: 755\n- path: /d\n",
        )
        .unwrap();

        let modes: Vec<_> = action
            .files
            .iter()
            .map(|f| fix_permissions(f.permissions.as_ref()))
            .collect();
        assert_eq!(modes, ["0600", "0644", "0755", "0644"]);
    }

    #[test]
    fn test_decoded_from_yaml() {
        let action: WriteFilesAction = serde_yaml::from_str(
            "write_files:\n-   path: /etc/kubernetes/pki/ca.crt\n    owner: root:root\n    permissions: '0640'\n    content: |\n      -----BEGIN CERTIFICATE-----\n",
        )
        .unwrap();

        assert_eq!(
            action.commands().unwrap(),
            [
                "sudo mkdir -p /etc/kubernetes/pki",
                "printf '%s' '-----BEGIN CERTIFICATE-----\n' | sudo tee /etc/kubernetes/pki/ca.crt > /dev/null",
                "sudo chmod 0640 /etc/kubernetes/pki/ca.crt",
            ]
        );
    }
}
