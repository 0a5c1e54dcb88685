//! Development package descriptors
//!
//! A descriptor names a package and optionally the tag (`name@tag`) or
//! branch (`name^branch`) whose sources should be checked out for it.

use std::fmt;
use std::str::FromStr;

use crate::error::PackageRefError;

/// Source revision requested for a development package
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSelector {
    /// Version-control tag (e.g., "v3_02_00")
    Tag(String),
    /// Version-control branch (e.g., "develop")
    Branch(String),
}

impl VersionSelector {
    /// Get the tag or branch name
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(s) | Self::Branch(s) => s,
        }
    }

    /// Descriptor marker character for this selector kind
    pub fn marker(&self) -> char {
        match self {
            Self::Tag(_) => '@',
            Self::Branch(_) => '^',
        }
    }

    /// Human-readable kind ("tag" or "branch")
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag(_) => "tag",
            Self::Branch(_) => "branch",
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.as_str())
    }
}

/// A package to develop, with its optional source revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageRef {
    name: String,
    selector: Option<VersionSelector>,
}

impl PackageRef {
    /// Create a descriptor without a version selector
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: None,
        }
    }

    /// Create a descriptor with an explicit selector
    pub fn with_selector(name: impl Into<String>, selector: VersionSelector) -> Self {
        Self {
            name: name.into(),
            selector: Some(selector),
        }
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested tag or branch, if any
    pub fn selector(&self) -> Option<&VersionSelector> {
        self.selector.as_ref()
    }

    /// Fill in `default` when no selector was given explicitly
    #[must_use]
    pub fn or_default_selector(self, default: Option<&VersionSelector>) -> Self {
        match (&self.selector, default) {
            (None, Some(default)) => Self {
                name: self.name,
                selector: Some(default.clone()),
            },
            _ => self,
        }
    }
}

impl FromStr for PackageRef {
    type Err = PackageRefError;

    /// Split on the first `@` or `^`; the name is everything before it.
    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        let (name, selector) = match descriptor.find(['@', '^']) {
            Some(pos) => {
                let value = &descriptor[pos + 1..];
                if value.is_empty() {
                    return Err(PackageRefError::EmptySelector {
                        descriptor: descriptor.to_string(),
                    });
                }
                let selector = if descriptor[pos..].starts_with('@') {
                    VersionSelector::Tag(value.to_string())
                } else {
                    VersionSelector::Branch(value.to_string())
                };
                (&descriptor[..pos], Some(selector))
            }
            None => (descriptor, None),
        };

        if name.is_empty() {
            return Err(PackageRefError::MissingName {
                descriptor: descriptor.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            selector,
        })
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Some(selector) => write!(f, "{}{}{}", self.name, selector.marker(), selector.as_str()),
            None => f.write_str(&self.name),
        }
    }
}

/// Parse a whitespace-separated list of descriptors
pub fn parse_descriptor_list(line: &str) -> Result<Vec<PackageRef>, PackageRefError> {
    line.split_whitespace().map(str::parse).collect()
}

/// Format descriptors as a single space-separated line
pub fn format_descriptor_list(refs: &[PackageRef]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain_name() {
        let r: PackageRef = "art".parse().unwrap();
        assert_eq!(r.name(), "art");
        assert!(r.selector().is_none());
    }

    #[test]
    fn test_parse_tag() {
        let r: PackageRef = "art@v3_02_00".parse().unwrap();
        assert_eq!(r.name(), "art");
        assert_eq!(
            r.selector(),
            Some(&VersionSelector::Tag("v3_02_00".to_string()))
        );
    }

    #[test]
    fn test_parse_branch() {
        let r: PackageRef = "canvas-root-io^feature/x".parse().unwrap();
        assert_eq!(r.name(), "canvas-root-io");
        assert_eq!(
            r.selector(),
            Some(&VersionSelector::Branch("feature/x".to_string()))
        );
    }

    #[test]
    fn test_first_marker_wins() {
        let r: PackageRef = "pkg^br@weird".parse().unwrap();
        assert_eq!(r.name(), "pkg");
        assert_eq!(r.selector().unwrap().as_str(), "br@weird");
    }

    #[test]
    fn test_rejects_empty_name_and_selector() {
        assert!(matches!(
            "@v1".parse::<PackageRef>(),
            Err(PackageRefError::MissingName { .. })
        ));
        assert!(matches!(
            "pkg^".parse::<PackageRef>(),
            Err(PackageRefError::EmptySelector { .. })
        ));
    }

    #[test]
    fn test_default_selector_only_fills_gaps() {
        let default = VersionSelector::Branch("develop".to_string());
        let plain = PackageRef::new("a").or_default_selector(Some(&default));
        assert_eq!(plain.to_string(), "a^develop");

        let tagged: PackageRef = "b@v1".parse().unwrap();
        assert_eq!(tagged.or_default_selector(Some(&default)).to_string(), "b@v1");
    }

    #[test]
    fn test_descriptor_list() {
        let refs = parse_descriptor_list("a  b@v1\tc^dev").unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(format_descriptor_list(&refs), "a b@v1 c^dev");
        assert!(parse_descriptor_list("").unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_display_parses_back(
            name in "[a-z][a-z0-9_-]{0,20}",
            value in "[A-Za-z0-9_./-]{1,20}",
            kind in 0u8..3,
        ) {
            let r = match kind {
                0 => PackageRef::new(&name),
                1 => PackageRef::with_selector(&name, VersionSelector::Tag(value)),
                _ => PackageRef::with_selector(&name, VersionSelector::Branch(value)),
            };
            let parsed: PackageRef = r.to_string().parse().unwrap();
            prop_assert_eq!(parsed, r);
        }
    }
}
