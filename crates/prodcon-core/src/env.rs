//! Environment variable helpers
//!
//! All `PC_*` overrides go through here. A variable that is set but does
//! not parse is reported once with a warning and the default is used, so a
//! typo in `PC_CAPACITY` never silently changes a run.

use std::str::FromStr;

/// Parse `key` as `T`, falling back to `default` when unset or invalid
///
/// ```ignore
/// let capacity: usize = env_get("PC_CAPACITY", 25);
/// let strategy: Strategy = env_get("PC_STRATEGY", Strategy::Condvar);
/// ```
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                crate::pc_warn!("ignoring {}={:?}: not a valid value", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Boolean variable: "1", "true", "yes", "on" (any case) are true,
/// "0", "false", "no", "off" are false, anything else is the default.
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

/// `Some(T)` only when set and parseable
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// First of `keys` that is set and parseable, else `default`
pub fn env_get_first<T>(keys: &[&str], default: T) -> T
where
    T: FromStr,
{
    keys.iter()
        .find_map(|k| env_get_opt(k))
        .unwrap_or(default)
}

pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names: tests run in parallel threads
    // of one process and share the environment.

    #[test]
    fn test_unset_returns_default() {
        let val: usize = env_get("__PC_TEST_UNSET_1__", 42);
        assert_eq!(val, 42);
        assert!(env_get_bool("__PC_TEST_UNSET_1__", true));
        assert_eq!(env_get_opt::<usize>("__PC_TEST_UNSET_1__"), None);
        assert_eq!(env_get_str("__PC_TEST_UNSET_1__", "log.txt"), "log.txt");
    }

    #[test]
    fn test_parse_and_invalid() {
        std::env::set_var("__PC_TEST_NUM__", " 17 ");
        assert_eq!(env_get::<usize>("__PC_TEST_NUM__", 0), 17);

        std::env::set_var("__PC_TEST_NUM__", "seventeen");
        assert_eq!(env_get::<usize>("__PC_TEST_NUM__", 5), 5);
        std::env::remove_var("__PC_TEST_NUM__");
    }

    #[test]
    fn test_bool_variants() {
        for (raw, expected) in [("1", true), ("Yes", true), ("ON", true), ("0", false), ("off", false)] {
            std::env::set_var("__PC_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__PC_TEST_BOOL__", !expected), expected, "{}", raw);
        }
        std::env::set_var("__PC_TEST_BOOL__", "maybe");
        assert!(env_get_bool("__PC_TEST_BOOL__", true));
        std::env::remove_var("__PC_TEST_BOOL__");
    }

    #[test]
    fn test_first_wins() {
        std::env::set_var("__PC_TEST_SECOND__", "9");
        let v: usize = env_get_first(&["__PC_TEST_FIRST__", "__PC_TEST_SECOND__"], 1);
        assert_eq!(v, 9);

        std::env::set_var("__PC_TEST_FIRST__", "3");
        let v: usize = env_get_first(&["__PC_TEST_FIRST__", "__PC_TEST_SECOND__"], 1);
        assert_eq!(v, 3);

        std::env::remove_var("__PC_TEST_FIRST__");
        std::env::remove_var("__PC_TEST_SECOND__");
    }
}
