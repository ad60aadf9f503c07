// ABOUTME: TLS verification policy for the controller API client.
// ABOUTME: Derives the verify flag from an explicit override or a process default.

/// Values that disable certificate verification, compared case-insensitively.
const DISABLE_VALUES: [&str; 4] = ["true", "1", "yes", "on"];

/// Whether the controller client validates the remote certificate chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsPolicy {
    verify: bool,
}

impl Default for TlsPolicy {
    fn default() -> Self {
        Self::verified()
    }
}

impl TlsPolicy {
    pub fn verified() -> Self {
        Self { verify: true }
    }

    pub fn insecure() -> Self {
        Self { verify: false }
    }

    /// Resolve from "disable TLS" flags.
    ///
    /// A non-blank override wins over the default. Anything other than a
    /// recognized disable value means verify.
    pub fn from_disable_flags(override_flag: Option<&str>, default_flag: Option<&str>) -> Self {
        let flag = override_flag
            .filter(|f| !f.trim().is_empty())
            .or(default_flag)
            .unwrap_or("");
        let flag = flag.trim().to_ascii_lowercase();

        if DISABLE_VALUES.contains(&flag.as_str()) {
            Self::insecure()
        } else {
            Self::verified()
        }
    }

    pub fn verify(&self) -> bool {
        self.verify
    }
}
