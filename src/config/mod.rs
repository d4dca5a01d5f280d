//! Configuration inputs that are not part of the manifest.
//!
//! Two layers exist:
//!
//! 1. [`EnvOverrides`] - a snapshot of the pinsync environment variables,
//!    captured once per command invocation and passed down explicitly. Nothing
//!    below the CLI reads the process environment.
//! 2. [`GlobalConfig`] - optional user-wide defaults from
//!    `~/.pinsync/config.toml` (or `PINSYNC_CONFIG`).
//!
//! Precedence for every setting: CLI flag > environment > global config >
//! built-in default. [`first_set`] applies it.

pub mod global;

pub use global::GlobalConfig;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::constants::{ENV_CONFIG_PATH, ENV_INDEX_MIRROR, ENV_INSTALL_TARGET, ENV_NO_PROGRESS};

/// Environment-derived settings for one invocation.
///
/// Empty values are treated as unset, so `PINSYNC_TARGET=` behaves like an
/// unset variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `PINSYNC_TARGET`: install destination override
    pub install_target: Option<String>,
    /// `PINSYNC_INDEX_MIRROR`: replacement URL for the primary index
    pub index_mirror: Option<String>,
    /// `PINSYNC_CONFIG`: global configuration file location
    pub config_path: Option<PathBuf>,
    /// `PINSYNC_NO_PROGRESS`: disable progress bars
    pub no_progress: bool,
}

impl EnvOverrides {
    /// Snapshot the current process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build a snapshot from arbitrary key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        Self {
            install_target: vars.get(ENV_INSTALL_TARGET).cloned(),
            index_mirror: vars.get(ENV_INDEX_MIRROR).cloned(),
            config_path: vars.get(ENV_CONFIG_PATH).map(PathBuf::from),
            no_progress: vars.get(ENV_NO_PROGRESS).is_some_and(|v| is_truthy(v)),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
}

/// First present value in precedence order.
pub fn first_set<T>(cli: Option<T>, env: Option<T>, config: Option<T>) -> Option<T> {
    cli.or(env).or(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_reads_known_keys() {
        let env = EnvOverrides::from_vars([
            (ENV_INSTALL_TARGET, "/tmp/target"),
            (ENV_INDEX_MIRROR, "https://mirror.invalid"),
            (ENV_NO_PROGRESS, "1"),
            ("UNRELATED", "x"),
        ]);
        assert_eq!(env.install_target.as_deref(), Some("/tmp/target"));
        assert_eq!(env.index_mirror.as_deref(), Some("https://mirror.invalid"));
        assert!(env.no_progress);
        assert!(env.config_path.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let env = EnvOverrides::from_vars([(ENV_INSTALL_TARGET, ""), (ENV_NO_PROGRESS, "false")]);
        assert_eq!(env, EnvOverrides::default());
    }

    #[test]
    fn test_first_set_precedence() {
        assert_eq!(first_set(Some(1), Some(2), Some(3)), Some(1));
        assert_eq!(first_set(None, Some(2), Some(3)), Some(2));
        assert_eq!(first_set(None, None, Some(3)), Some(3));
        assert_eq!(first_set::<u8>(None, None, None), None);
    }
}
