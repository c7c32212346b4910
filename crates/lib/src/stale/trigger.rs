//! Rebuild triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which change makes a target stale.
///
/// Every trigger except [`Trigger::Always`] also rebuilds a target that has
/// no existing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
  /// Rebuild unconditionally.
  Always,
  /// Rebuild on any of the command, dependency or output checks.
  #[default]
  Any,
  /// Rebuild when the normalized command text changed.
  Command,
  /// Rebuild when a direct dependency's recorded hash changed.
  Depends,
  /// Rebuild when the stored output no longer matches its recorded hash.
  File,
  /// Rebuild only when the target has no value.
  Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trigger {0:?}, expected one of: always, any, command, depends, file, missing")]
pub struct TriggerParseError(pub String);

impl Trigger {
  pub fn as_str(&self) -> &'static str {
    match self {
      Trigger::Always => "always",
      Trigger::Any => "any",
      Trigger::Command => "command",
      Trigger::Depends => "depends",
      Trigger::File => "file",
      Trigger::Missing => "missing",
    }
  }

  pub(crate) fn checks_command(self) -> bool {
    matches!(self, Trigger::Any | Trigger::Command)
  }

  pub(crate) fn checks_depends(self) -> bool {
    matches!(self, Trigger::Any | Trigger::Depends)
  }

  pub(crate) fn checks_file(self) -> bool {
    matches!(self, Trigger::Any | Trigger::File)
  }
}

impl fmt::Display for Trigger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Trigger {
  type Err = TriggerParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "always" => Ok(Trigger::Always),
      "any" => Ok(Trigger::Any),
      "command" => Ok(Trigger::Command),
      "depends" => Ok(Trigger::Depends),
      "file" => Ok(Trigger::File),
      "missing" => Ok(Trigger::Missing),
      _ => Err(TriggerParseError(s.to_string())),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_any() {
    assert_eq!(Trigger::default(), Trigger::Any);
  }

  #[test]
  fn parse_is_case_insensitive() {
    assert_eq!("Depends".parse::<Trigger>().unwrap(), Trigger::Depends);
    assert_eq!(" always ".parse::<Trigger>().unwrap(), Trigger::Always);
    assert!("sometimes".parse::<Trigger>().is_err());
  }

  #[test]
  fn serde_uses_lowercase_names() {
    assert_eq!(serde_json::to_string(&Trigger::Missing).unwrap(), r#""missing""#);
    let t: Trigger = serde_json::from_str(r#""command""#).unwrap();
    assert_eq!(t, Trigger::Command);
    assert_eq!(t.to_string(), "command");
  }

  #[test]
  fn any_covers_every_check() {
    let any = Trigger::Any;
    assert!(any.checks_command() && any.checks_depends() && any.checks_file());
    assert!(!Trigger::Missing.checks_file());
    assert!(!Trigger::Always.checks_command());
  }
}
