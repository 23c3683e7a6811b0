use std::env;

/// Retrieves an environment variable, treating unset and blank values alike.
///
/// # Arguments
/// - `var`: The name of the environment variable.
///
/// # Returns
/// - `Some(value)` with surrounding whitespace removed, or `None`.
pub fn get_env_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a positive integer, naming `var` in the error message.
pub fn parse_positive(var: &str, value: &str) -> Result<u64, String> {
    match value.parse::<u64>() {
        Ok(0) => Err(format!("{} must be greater than zero", var)),
        Ok(n) => Ok(n),
        Err(err) => Err(format!("{} must be a positive integer ('{}'): {}", var, value, err)),
    }
}
