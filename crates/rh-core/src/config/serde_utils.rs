//! Shared deserialization helpers for configuration
//!
//! This module provides serde helpers used across configuration types.

/// Deserialize an optional `Duration` written as whole seconds
///
/// Use together with `#[serde(default)]` so that a missing key maps to
/// `None`.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Entry {
///     #[serde(default, deserialize_with = "rh_core::config::serde_utils::option_duration_secs")]
///     read_timeout: Option<Duration>,
/// }
/// ```
pub fn option_duration_secs<'de, D>(
    deserializer: D,
) -> Result<Option<std::time::Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    let secs = Option::<u64>::deserialize(deserializer)?;
    Ok(secs.map(std::time::Duration::from_secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize)]
    struct TestEntry {
        #[serde(default, deserialize_with = "option_duration_secs")]
        timeout: Option<Duration>,
    }

    #[test]
    fn test_option_duration_present() {
        let entry: TestEntry = toml::from_str("timeout = 45").unwrap();
        assert_eq!(entry.timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_option_duration_missing() {
        let entry: TestEntry = toml::from_str("").unwrap();
        assert_eq!(entry.timeout, None);
    }
}
