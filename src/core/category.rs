//! Environment categories of a lock artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which group of requirements a package belongs to.
///
/// `Default` holds runtime requirements (`[packages]`), `Develop` holds
/// development-only requirements (`[dev-packages]`). The ordering is the
/// canonical resolution and serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Runtime requirements
    Default,
    /// Development requirements
    Develop,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Self; 2] = [Self::Default, Self::Develop];

    /// Key used in the lock artifact.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Develop => "develop",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "develop" => Ok(Self::Develop),
            other => Err(format!("unknown category '{other}'")),
        }
    }
}
