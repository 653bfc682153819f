//! Credential values exchanged during an authentication challenge.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// The kind of a credential, as named by a challenge's allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    /// Username and password.
    Plaintext,
    /// SSH key pair, optionally passphrase-protected.
    SshKey,
    /// Ambient credentials (agent, NTLM/Negotiate, ...).
    Default,
}

impl CredentialKind {
    /// All kinds, in the order they are reported to resolvers.
    pub const ALL: [CredentialKind; 3] = [Self::Plaintext, Self::SshKey, Self::Default];

    const fn bit(self) -> u8 {
        match self {
            Self::Plaintext => 0b001,
            Self::SshKey => 0b010,
            Self::Default => 0b100,
        }
    }

    /// Returns the name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "plaintext",
            Self::SshKey => "ssh_key",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitset of credential kinds a challenge accepts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllowedKinds(u8);

impl AllowedKinds {
    /// Accepts nothing.
    pub const NONE: Self = Self(0);
    /// Accepts username/password.
    pub const PLAINTEXT: Self = Self(CredentialKind::Plaintext.bit());
    /// Accepts SSH keys.
    pub const SSH_KEY: Self = Self(CredentialKind::SshKey.bit());
    /// Accepts ambient credentials.
    pub const DEFAULT: Self = Self(CredentialKind::Default.bit());
    /// Accepts every kind.
    pub const ALL: Self = Self(0b111);

    /// Returns true if `kind` is in the set.
    pub fn contains(self, kind: CredentialKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Returns a copy of the set with `kind` added.
    pub fn with(self, kind: CredentialKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the kinds present, in [`CredentialKind::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = CredentialKind> {
        CredentialKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl BitOr for AllowedKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<CredentialKind> for AllowedKinds {
    fn from(kind: CredentialKind) -> Self {
        Self(kind.bit())
    }
}

impl FromIterator<CredentialKind> for AllowedKinds {
    fn from_iter<I: IntoIterator<Item = CredentialKind>>(iter: I) -> Self {
        iter.into_iter().fold(Self::NONE, Self::with)
    }
}

impl fmt::Debug for AllowedKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for AllowedKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|kind| kind.as_str()).collect();
        f.write_str(&names.join(", "))
    }
}

/// A credential answering exactly one challenge.
///
/// `Debug` output never includes passwords, private keys or passphrases.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Username and password.
    Plaintext { username: String, password: String },
    /// SSH key pair. Keys are paths or key material, as the transport expects.
    SshKey {
        username: Option<String>,
        public_key: Option<String>,
        private_key: String,
        passphrase: Option<String>,
    },
    /// Ambient credentials supplied by the platform.
    Default,
}

impl Credential {
    /// Creates a username/password credential.
    pub fn plaintext(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Plaintext {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates an SSH key credential with only the private key set.
    pub fn ssh_key(private_key: impl Into<String>) -> Self {
        Self::SshKey {
            username: None,
            public_key: None,
            private_key: private_key.into(),
            passphrase: None,
        }
    }

    /// Creates an SSH key credential with every field specified.
    pub fn ssh_key_full(
        username: Option<String>,
        public_key: Option<String>,
        private_key: impl Into<String>,
        passphrase: Option<String>,
    ) -> Self {
        Self::SshKey {
            username,
            public_key,
            private_key: private_key.into(),
            passphrase,
        }
    }

    /// Returns the kind of this credential.
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Plaintext { .. } => CredentialKind::Plaintext,
            Self::SshKey { .. } => CredentialKind::SshKey,
            Self::Default => CredentialKind::Default,
        }
    }

    /// Returns the username carried by this credential, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Plaintext { username, .. } => Some(username),
            Self::SshKey { username, .. } => username.as_deref(),
            Self::Default => None,
        }
    }

    /// Returns true if this credential may answer a challenge allowing `allowed`.
    pub fn is_allowed(&self, allowed: AllowedKinds) -> bool {
        allowed.contains(self.kind())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plaintext { username, .. } => f
                .debug_struct("Plaintext")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::SshKey {
                username,
                public_key,
                passphrase,
                ..
            } => f
                .debug_struct("SshKey")
                .field("username", username)
                .field("public_key", public_key)
                .field("private_key", &"<redacted>")
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Default => f.write_str("Default"),
        }
    }
}

/// One authentication challenge raised by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    url: String,
    username_from_url: Option<String>,
    allowed: AllowedKinds,
}

impl CredentialRequest {
    /// Creates a new request.
    pub fn new(
        url: impl Into<String>,
        username_from_url: Option<String>,
        allowed: AllowedKinds,
    ) -> Self {
        Self {
            url: url.into(),
            username_from_url,
            allowed,
        }
    }

    /// Returns the url being authenticated.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the username embedded in the url, if any.
    pub fn username_from_url(&self) -> Option<&str> {
        self.username_from_url.as_deref()
    }

    /// Returns the kinds this challenge accepts.
    pub fn allowed(&self) -> AllowedKinds {
        self.allowed
    }
}
