//! Environment variable parsing utilities for configuration.

use crate::errors::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::paths;

/// Read a variable; unset and non-unicode values both count as absent.
fn read(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Parse environment variable value or return error if empty/whitespace.
fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Parse environment variable as a path, expanding tilde.
fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    let value = parse_env_string(name, value)?;
    Ok(paths::expand_home(&PathBuf::from(value)))
}

/// Parse environment variable with the target type's `FromStr`.
fn parse_env_value<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    let value = parse_env_string(name, value)?;
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    let value = parse_env_string(name, value)?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: '{other}' (expected true or false)"
        ))),
    }
}

/// Parse a comma-separated list, dropping blank entries.
fn parse_env_list(name: &str, value: &str) -> Result<Vec<String>, Error> {
    let value = parse_env_string(name, value)?;
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        return Err(Error::Config(format!("{name} lists no entries")));
    }
    Ok(items)
}

pub fn override_string(name: &str, target: &mut String) -> Result<(), Error> {
    if let Some(val) = read(name) {
        *target = parse_env_string(name, &val)?;
    }
    Ok(())
}

pub fn override_optional_string(name: &str, target: &mut Option<String>) -> Result<(), Error> {
    if let Some(val) = read(name) {
        *target = Some(parse_env_string(name, &val)?);
    }
    Ok(())
}

pub fn override_path(name: &str, target: &mut PathBuf) -> Result<(), Error> {
    if let Some(val) = read(name) {
        *target = parse_env_path(name, &val)?;
    }
    Ok(())
}

pub fn override_parsed<T>(name: &str, target: &mut T) -> Result<(), Error>
where
    T: FromStr,
    T::Err: Display,
{
    if let Some(val) = read(name) {
        *target = parse_env_value(name, &val)?;
    }
    Ok(())
}

pub fn override_bool(name: &str, target: &mut bool) -> Result<(), Error> {
    if let Some(val) = read(name) {
        *target = parse_env_bool(name, &val)?;
    }
    Ok(())
}

pub fn override_list(name: &str, target: &mut Vec<String>) -> Result<(), Error> {
    if let Some(val) = read(name) {
        *target = parse_env_list(name, &val)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BackendKind;

    #[test]
    fn test_parse_env_string_empty() {
        let result = parse_env_string("TEST_VAR", "");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_whitespace() {
        let result = parse_env_string("TEST_VAR", "   ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_valid() {
        let result = parse_env_string("TEST_VAR", "valid");
        assert_eq!(result.unwrap(), "valid");
    }

    #[test]
    fn test_parse_env_number() {
        assert_eq!(parse_env_value::<usize>("TEST_NUM", " 12 ").unwrap(), 12);
        assert!(matches!(
            parse_env_value::<usize>("TEST_NUM", "twelve"),
            Err(Error::Config(_))
        ));
        assert!(parse_env_value::<usize>("TEST_NUM", "-1").is_err());
    }

    #[test]
    fn test_parse_env_backend() {
        assert_eq!(
            parse_env_value::<BackendKind>("TEST_BACKEND", "remote").unwrap(),
            BackendKind::Remote
        );
        assert!(parse_env_value::<BackendKind>("TEST_BACKEND", "s3").is_err());
    }

    #[test]
    fn test_parse_env_bool() {
        assert!(parse_env_bool("TEST_BOOL", "true").unwrap());
        assert!(parse_env_bool("TEST_BOOL", "1").unwrap());
        assert!(!parse_env_bool("TEST_BOOL", "No").unwrap());
        assert!(parse_env_bool("TEST_BOOL", "maybe").is_err());
    }

    #[test]
    fn test_parse_env_list() {
        let items = parse_env_list("TEST_LIST", "chrome-extension://*, https://a.test ,").unwrap();
        assert_eq!(items, vec!["chrome-extension://*", "https://a.test"]);
        assert!(parse_env_list("TEST_LIST", " , ,").is_err());
    }
}
