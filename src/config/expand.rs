//! `~` and environment variable expansion for configured paths.
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Expands `~`, `$VAR` and `${VAR}` in configured paths.
///
/// The process environment is used unless the expander was built with
/// [`Expander::fixed`].
#[derive(Debug, Clone, Default)]
pub struct Expander {
    fixed: Option<(String, HashMap<String, String>)>,
}

impl Expander {
    /// Expand against the process environment and home directory.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Expand against an explicit home directory and variable set.
    #[must_use]
    pub fn fixed(home: &str, vars: &[(&str, &str)]) -> Self {
        let vars = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self {
            fixed: Some((home.to_string(), vars)),
        }
    }

    /// Expand `value`; `owner` names the bundle (or `settings`) in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Expansion`] if a referenced variable is unset.
    pub fn expand(&self, owner: &str, value: &str) -> Result<PathBuf, ConfigError> {
        let expanded = match &self.fixed {
            Some((home, vars)) => shellexpand::full_with_context(
                value,
                || Some(home.as_str()),
                |name| {
                    vars.get(name)
                        .map(|v| Some(v.as_str()))
                        .ok_or(std::env::VarError::NotPresent)
                },
            )
            .map(std::borrow::Cow::into_owned),
            None => shellexpand::full(value).map(std::borrow::Cow::into_owned),
        };
        expanded.map(PathBuf::from).map_err(|e| ConfigError::Expansion {
            bundle: owner.to_string(),
            value: value.to_string(),
            message: e.to_string(),
        })
    }
}
