//! Remote host descriptors

use std::fmt;
use std::net::Ipv6Addr;

/// How to authenticate against a host.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Password login, delegated to `sshpass`
    Password(String),
    /// PEM encoded private key
    PrivateKey(String),
    /// Whatever the ssh client finds on its own (agent, default identities)
    Agent,
}

impl Credential {
    /// Picks a credential from optional password and key fields.
    ///
    /// A non-empty key wins over a password.
    pub fn from_parts(password: Option<&str>, private_key: Option<&str>) -> Self {
        match (password, private_key) {
            (_, Some(key)) if !key.trim().is_empty() => Credential::PrivateKey(key.to_string()),
            (Some(password), _) if !password.is_empty() => Credential::Password(password.to_string()),
            _ => Credential::Agent,
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::PrivateKey(_) => f.write_str("PrivateKey(<redacted>)"),
            Credential::Agent => f.write_str("Agent"),
        }
    }
}

/// A host reachable over SSH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    /// Login user
    pub user: String,
    /// IP address or hostname; keys the per-host failure map
    pub address: String,
    /// SSH port
    pub port: u16,
    /// Password or private key
    pub credential: Credential,
}

impl Host {
    /// Creates a host entry.
    pub fn new(user: impl Into<String>, address: impl Into<String>, port: u16, credential: Credential) -> Self {
        Self {
            user: user.into(),
            address: address.into(),
            port,
            credential,
        }
    }

    /// `user@address` as understood by ssh.
    pub fn ssh_target(&self) -> String {
        format!("{}@{}", self.user, self.address)
    }

    /// `user@address:path` as understood by scp, bracketing IPv6 addresses.
    pub fn scp_target(&self, path: &str) -> String {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            format!("{}@[{}]:{}", self.user, self.address, path)
        } else {
            format!("{}@{}:{}", self.user, self.address, path)
        }
    }
}
