//! Secret references in configuration values.
//!
//! A value such as `store.api_key` may point at a secret kept outside
//! `config.toml`:
//!
//! - `pass::path/in/store` reads the first line of `pass show path/in/store`
//! - `env::VAR_NAME` reads `$VAR_NAME`
//! - anything else is the secret itself

use std::process::Command;

/// A parsed secret reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    /// Entry in the `pass` password store.
    Pass(&'a str),
    /// Environment variable.
    Env(&'a str),
    /// Inline value.
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    /// Parses a configuration value.
    pub fn parse(value: &'a str) -> Self {
        if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else {
            Self::Plain(value)
        }
    }

    /// Looks up the secret.
    pub fn resolve(&self) -> Result<String, String> {
        match self {
            Self::Pass(path) => read_pass(path),
            Self::Env(var) => {
                std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
            }
            Self::Plain(value) => Ok((*value).to_string()),
        }
    }
}

/// Resolves a value that may contain a secret reference prefix.
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn read_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", path])
        .output()
        .map_err(|e| format!("cannot run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}: {}",
            path,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("`pass show {}` printed nothing", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefixes() {
        assert_eq!(SecretRef::parse("pass::relay/key"), SecretRef::Pass("relay/key"));
        assert_eq!(SecretRef::parse("env::KEY"), SecretRef::Env("KEY"));
        assert_eq!(SecretRef::parse("eyJhbGci"), SecretRef::Plain("eyJhbGci"));
        assert_eq!(SecretRef::parse(""), SecretRef::Plain(""));
    }

    #[test]
    fn plain_value_is_returned() {
        assert_eq!(resolve("service-role-key").unwrap(), "service-role-key");
    }

    #[test]
    fn env_reference() {
        unsafe {
            std::env::set_var("_VIDRELAY_TEST_SECRET", "from-env");
        }
        assert_eq!(resolve("env::_VIDRELAY_TEST_SECRET").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_VIDRELAY_TEST_SECRET");
        }

        let err = resolve("env::_VIDRELAY_UNSET_VAR_98765").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn pass_reference_failure_is_an_error() {
        assert!(resolve("pass::vidrelay/no/such/entry/98765").is_err());
    }
}
