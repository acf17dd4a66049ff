//! Repository names, tags and stream references.
//!
//! A stream is addressed externally as `repo:tag`. The separator is therefore
//! forbidden inside either component and is rejected at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Separator between repository name and tag in an external stream reference.
pub const STREAM_SEPARATOR: char = ':';

/// Validate one component of a stream reference.
///
/// `kind` names the component in the error message ("repo name", "tag").
pub fn validate_name(kind: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::Empty { kind });
    }
    if name.contains(STREAM_SEPARATOR) {
        return Err(ValidationError::ContainsSeparator {
            kind,
            name: name.to_string(),
        });
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidCharacter {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

/// A validated repository name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoName(String);

impl RepoName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name("repo name", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A validated stream tag (the branch-equivalent inside a repository).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Result<Self, ValidationError> {
        let tag = tag.into();
        validate_name("tag", &tag)?;
        Ok(Self(tag))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! name_impls {
    ($ty:ident) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($ty), self.0)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_impls!(RepoName);
name_impls!(Tag);

/// A stream: one named history line (`tag`) inside a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamRef {
    pub repo: RepoName,
    pub tag: Tag,
}

impl StreamRef {
    pub fn new(repo: RepoName, tag: Tag) -> Self {
        Self { repo, tag }
    }

    /// Parse the external `repo:tag` form.
    ///
    /// Exactly one separator is accepted; both halves are validated.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let (repo, tag) = s
            .split_once(STREAM_SEPARATOR)
            .ok_or_else(|| ValidationError::MalformedStreamRef(s.to_string()))?;
        Ok(Self {
            repo: RepoName::new(repo)?,
            tag: Tag::new(tag)?,
        })
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.repo, STREAM_SEPARATOR, self.tag)
    }
}

impl FromStr for StreamRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_stream_ref() {
        let stream = StreamRef::parse("my-repo:main").unwrap();
        assert_eq!(stream.repo.as_str(), "my-repo");
        assert_eq!(stream.tag.as_str(), "main");
        assert_eq!(stream.to_string(), "my-repo:main");
    }

    #[test]
    fn test_tag_with_separator_rejected() {
        // "a:b:c" splits at the first separator, leaving "b:c" as the tag.
        let err = StreamRef::parse("a:b:c").unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ContainsSeparator { kind: "tag", .. }
        ));
    }

    #[test]
    fn test_missing_separator_rejected() {
        let err = StreamRef::parse("just-a-repo").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MalformedStreamRef("just-a-repo".into())
        );
    }

    #[test]
    fn test_empty_halves_rejected() {
        assert!(matches!(
            StreamRef::parse(":tag"),
            Err(ValidationError::Empty { kind: "repo name" })
        ));
        assert!(matches!(
            StreamRef::parse("repo:"),
            Err(ValidationError::Empty { kind: "tag" })
        ));
    }

    #[test]
    fn test_repo_name_with_separator_rejected() {
        assert!(RepoName::new("a:b").is_err());
    }

    #[test]
    fn test_serde_revalidates() {
        let ok: RepoName = serde_json::from_str("\"repo\"").unwrap();
        assert_eq!(ok.as_str(), "repo");
        assert!(serde_json::from_str::<Tag>("\"x:y\"").is_err());
    }

    proptest! {
        #[test]
        fn valid_names_roundtrip(repo in "[a-zA-Z0-9_./-]{1,24}", tag in "[a-zA-Z0-9_./-]{1,24}") {
            let text = format!("{}:{}", repo, tag);
            let stream = StreamRef::parse(&text).unwrap();
            prop_assert_eq!(stream.to_string(), text);
        }

        #[test]
        fn names_containing_separator_never_validate(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
            let name = format!("{}:{}", prefix, suffix);
            prop_assert!(RepoName::new(name.clone()).is_err());
            prop_assert!(Tag::new(name).is_err());
        }
    }
}
