// ── HardwareId ──
//
// Primary key of the device table: the interface MAC, lower-cased with
// separators stripped, so `AA:BB:CC:DD:EE:FF` and `aa-bb-cc-dd-ee-ff`
// name the same device.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareId(String);

impl HardwareId {
    /// Normalize any common MAC rendering.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw
            .as_ref()
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.'))
            .flat_map(char::to_lowercase)
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last six characters, used for default display names.
    pub fn suffix(&self) -> &str {
        let start = self.0.len().saturating_sub(6);
        self.0.get(start..).unwrap_or(&self.0)
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HardwareId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for HardwareId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
