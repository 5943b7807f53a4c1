//! HTTP method tokens and the method-set attached to every route.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP verbs a route can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// All method variants for iteration.
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Patch,
        Method::Head,
        Method::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known HTTP method token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown HTTP method: {0}")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    /// Method tokens are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

/// The set of verbs a route answers to.
///
/// Never empty: a route either accepts every verb (`Any`) or at least one
/// explicit verb. Building a set from an empty collection yields `Any`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodSet {
    Any,
    Only(BTreeSet<Method>),
}

impl MethodSet {
    /// Build a set from a list of verbs. An empty list means "any verb".
    pub fn of<I: IntoIterator<Item = Method>>(methods: I) -> Self {
        let set: BTreeSet<Method> = methods.into_iter().collect();
        if set.is_empty() {
            MethodSet::Any
        } else {
            MethodSet::Only(set)
        }
    }

    pub fn contains(&self, method: Method) -> bool {
        match self {
            MethodSet::Any => true,
            MethodSet::Only(set) => set.contains(&method),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, MethodSet::Any)
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        MethodSet::of([method])
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        MethodSet::of(methods)
    }
}

impl From<Vec<Method>> for MethodSet {
    fn from(methods: Vec<Method>) -> Self {
        MethodSet::of(methods)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodSet::Any => f.write_str("ANY"),
            MethodSet::Only(set) => {
                let names: Vec<&str> = set.iter().map(Method::as_str).collect();
                f.write_str(&names.join("|"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!(
            "BREW".parse::<Method>().unwrap_err(),
            ParseMethodError("BREW".to_string())
        );
    }

    #[test]
    fn test_method_serialization() {
        let json = serde_json::to_string(&Method::Post).unwrap();
        assert_eq!(json, r#""POST""#);
        let parsed: Method = serde_json::from_str(r#""PATCH""#).unwrap();
        assert_eq!(parsed, Method::Patch);
    }

    #[test]
    fn test_empty_method_set_is_any() {
        let set = MethodSet::of(Vec::new());
        assert!(set.is_any());
        for method in Method::ALL {
            assert!(set.contains(method));
        }
    }

    #[test]
    fn test_method_set_restricts() {
        let set = MethodSet::from([Method::Get, Method::Head]);
        assert!(set.contains(Method::Get));
        assert!(set.contains(Method::Head));
        assert!(!set.contains(Method::Post));
        assert_eq!(set.to_string(), "GET|HEAD");
    }

    #[test]
    fn test_single_method_set_equals_list_of_one() {
        assert_eq!(MethodSet::from(Method::Put), MethodSet::of(vec![Method::Put]));
    }
}
