// edep-aio/src/env.rs
//! Environment variable substitution for project files.
use std::env;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref ENV_VAR_RE: Regex =
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

/// Replaces `$NAME` and `${NAME}` with the value of the environment variable,
/// or with an empty string when it is unset.
pub fn expand_env(input: &str) -> String {
    expand_with(input, |name| env::var(name).ok())
}

/// Same as [`expand_env`] but resolving names through `lookup`.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_RE
        .replace_all(input, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            lookup(name).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HZN_ORG_ID" => Some("org1".to_string()),
            "SERVICE_VERSION" => Some("1.2.3".to_string()),
            _ => None,
        }
    }

    #[test]
    fn both_forms_are_expanded() {
        assert_eq!(
            expand_with("$HZN_ORG_ID/${SERVICE_VERSION}", lookup),
            "org1/1.2.3"
        );
    }

    #[test]
    fn unset_variables_become_empty() {
        assert_eq!(expand_with("a-$NOPE-b", lookup), "a--b");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(expand_with("https://example.com/svc", lookup), "https://example.com/svc");
    }
}
