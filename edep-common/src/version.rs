// edep-common/src/version.rs
//! Version ordering and range membership for service versions.
//!
//! Service versions are dotted numeric strings with one to three components
//! (`1`, `1.2`, `1.2.3`). Ranges use the registry's policy syntax: a bare
//! version `V` means `[V, INFINITY)`, otherwise an interval such as
//! `[1.0.0,2.0.0)` or `(1.0,INFINITY)`.
use std::cmp::Ordering;
use std::fmt;

use semver::Version;

use crate::error::{EdepError, Result};

pub const INFINITY: &str = "INFINITY";

/// Parses a service version, padding missing minor/patch components.
pub fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();
    if trimmed.is_empty()
        || parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(EdepError::Validation(format!(
            "'{raw}' is not a valid version, expected up to three dot-separated numbers"
        )));
    }
    let mut padded: Vec<&str> = parts;
    while padded.len() < 3 {
        padded.push("0");
    }
    Ok(Version::parse(&padded.join("."))?)
}

pub fn is_valid_version(raw: &str) -> bool {
    parse_version(raw).is_ok()
}

/// Orders two service versions numerically.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse_version(a)?.cmp(&parse_version(b)?))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Inclusive(Version),
    Exclusive(Version),
    Unbounded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    expression: String,
    lower: Bound,
    upper: Bound,
}

impl VersionRange {
    /// Range that accepts every version.
    pub fn any() -> Self {
        Self {
            expression: String::new(),
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    pub fn parse(expression: &str) -> Result<Self> {
        let expr = expression.trim();
        if expr.is_empty() {
            return Ok(Self::any());
        }

        let invalid = |why: &str| {
            EdepError::Validation(format!("invalid version range '{expression}': {why}"))
        };

        let first = expr.chars().next().unwrap_or_default();
        if first != '[' && first != '(' {
            let v = parse_version(expr).map_err(|_| invalid("not a version"))?;
            return Ok(Self {
                expression: expr.to_string(),
                lower: Bound::Inclusive(v),
                upper: Bound::Unbounded,
            });
        }

        let last = expr.chars().last().unwrap_or_default();
        if last != ']' && last != ')' {
            return Err(invalid("missing closing bracket"));
        }
        let inner = &expr[1..expr.len() - 1];
        let (low_raw, high_raw) = inner
            .split_once(',')
            .ok_or_else(|| invalid("expected two comma-separated bounds"))?;

        let low_version = parse_version(low_raw).map_err(|_| invalid("bad lower bound"))?;
        let lower = if first == '[' {
            Bound::Inclusive(low_version)
        } else {
            Bound::Exclusive(low_version)
        };

        let high_raw = high_raw.trim();
        let upper = if high_raw.eq_ignore_ascii_case(INFINITY) {
            Bound::Unbounded
        } else {
            let high_version = parse_version(high_raw).map_err(|_| invalid("bad upper bound"))?;
            if last == ']' {
                Bound::Inclusive(high_version)
            } else {
                Bound::Exclusive(high_version)
            }
        };

        Ok(Self {
            expression: expr.to_string(),
            lower,
            upper,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn contains(&self, version: &str) -> Result<bool> {
        let v = parse_version(version)?;
        let above_lower = match &self.lower {
            Bound::Inclusive(l) => v >= *l,
            Bound::Exclusive(l) => v > *l,
            Bound::Unbounded => true,
        };
        let below_upper = match &self.upper {
            Bound::Inclusive(u) => v <= *u,
            Bound::Exclusive(u) => v < *u,
            Bound::Unbounded => true,
        };
        Ok(above_lower && below_upper)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.expression.is_empty() {
            write!(f, "[0.0.0,{INFINITY})")
        } else {
            f.write_str(&self.expression)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_versions_are_padded() {
        assert_eq!(parse_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert!(parse_version("1.2.3.4").is_err());
        assert!(parse_version("v1").is_err());
        assert!(parse_version("").is_err());
    }

    #[test]
    fn versions_order_numerically() {
        assert_eq!(compare_versions("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn bare_version_is_open_ended() {
        let range = VersionRange::parse("1.0.0").unwrap();
        assert!(range.contains("1.0.0").unwrap());
        assert!(range.contains("7.3.1").unwrap());
        assert!(!range.contains("0.9.9").unwrap());
    }

    #[test]
    fn half_open_interval() {
        let range = VersionRange::parse("[1.0.0,2.0.0)").unwrap();
        assert!(!range.contains("0.9.0").unwrap());
        assert!(range.contains("1.5.0").unwrap());
        assert!(!range.contains("2.0.0").unwrap());
    }

    #[test]
    fn exclusive_lower_and_infinite_upper() {
        let range = VersionRange::parse("(1.0,INFINITY)").unwrap();
        assert!(!range.contains("1.0.0").unwrap());
        assert!(range.contains("1.0.1").unwrap());
    }

    #[test]
    fn empty_expression_accepts_anything() {
        let range = VersionRange::parse("").unwrap();
        assert!(range.contains("0.0.1").unwrap());
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        assert!(VersionRange::parse("[1.0.0").is_err());
        assert!(VersionRange::parse("[1.0.0;2.0.0]").is_err());
        assert!(VersionRange::parse("latest").is_err());
    }
}
