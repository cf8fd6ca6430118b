//! Target version parsing and per-family capability resolution.
//!
//! JMeter changed its element set at specific releases, and not every feature
//! family moved at the same release. The table below is the single place that
//! records those boundaries; emitters never look at the version themselves.
use crate::error::{CompileError, Result};
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Feature families the compiler knows how to render.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureFamily {
    ExtractRegexp,
    ExtractJsonPath,
    ExtractXPath,
    ExtractCssJquery,
    Assert,
    AssertJsonPath,
}

impl FeatureFamily {
    /// All families, in the order their elements appear under a sampler.
    pub const ALL: [FeatureFamily; 6] = [
        FeatureFamily::ExtractRegexp,
        FeatureFamily::ExtractJsonPath,
        FeatureFamily::ExtractXPath,
        FeatureFamily::ExtractCssJquery,
        FeatureFamily::Assert,
        FeatureFamily::AssertJsonPath,
    ];

    /// Scenario key that carries specs of this family.
    pub fn key(self) -> &'static str {
        match self {
            FeatureFamily::ExtractRegexp => "extract-regexp",
            FeatureFamily::ExtractJsonPath => "extract-jsonpath",
            FeatureFamily::ExtractXPath => "extract-xpath",
            FeatureFamily::ExtractCssJquery => "extract-css-jquery",
            FeatureFamily::Assert => "assert",
            FeatureFamily::AssertJsonPath => "assert-jsonpath",
        }
    }
}

impl fmt::Display for FeatureFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Rendering strategy chosen for a family at a given target version.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityLevel {
    /// Third-party plugin element, registered through a declaration.
    Legacy,
    /// Element shipped with JMeter itself.
    Integrated,
}

/// Dotted numeric version; missing trailing components compare as zero.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
}

fn version_regex() -> &'static Regex {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    VERSION_RE.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)*$").expect("compile version regex"))
}

impl Version {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !version_regex().is_match(trimmed) {
            return Err(CompileError::InvalidVersionFormat(input.to_string()));
        }
        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| CompileError::InvalidVersionFormat(input.to_string()))?;
        Ok(Self { components })
    }

    fn component(&self, idx: usize) -> u64 {
        self.components.get(idx).copied().unwrap_or(0)
    }

    fn cmp_components(&self, other: &[u64]) -> Ordering {
        let len = self.components.len().max(other.len());
        for idx in 0..len {
            let rhs = other.get(idx).copied().unwrap_or(0);
            match self.component(idx).cmp(&rhs) {
                Ordering::Equal => continue,
                ordering => return ordering,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_components(&other.components)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .components
            .iter()
            .map(|part| part.to_string())
            .collect::<Vec<_>>();
        f.write_str(&parts.join("."))
    }
}

/// Compiled-in threshold version.
#[derive(Debug, Clone, Copy)]
struct StaticVersion(&'static [u64]);

struct CapabilityRule {
    family: FeatureFamily,
    threshold: StaticVersion,
    below: CapabilityLevel,
    at_or_above: CapabilityLevel,
}

static CAPABILITY_TABLE: [CapabilityRule; 6] = [
    CapabilityRule {
        family: FeatureFamily::ExtractRegexp,
        threshold: StaticVersion(&[0]),
        below: CapabilityLevel::Integrated,
        at_or_above: CapabilityLevel::Integrated,
    },
    // JSONPostProcessor ships with JMeter 3.0.
    CapabilityRule {
        family: FeatureFamily::ExtractJsonPath,
        threshold: StaticVersion(&[3, 0]),
        below: CapabilityLevel::Legacy,
        at_or_above: CapabilityLevel::Integrated,
    },
    CapabilityRule {
        family: FeatureFamily::ExtractXPath,
        threshold: StaticVersion(&[0]),
        below: CapabilityLevel::Integrated,
        at_or_above: CapabilityLevel::Integrated,
    },
    CapabilityRule {
        family: FeatureFamily::ExtractCssJquery,
        threshold: StaticVersion(&[0]),
        below: CapabilityLevel::Integrated,
        at_or_above: CapabilityLevel::Integrated,
    },
    CapabilityRule {
        family: FeatureFamily::Assert,
        threshold: StaticVersion(&[0]),
        below: CapabilityLevel::Integrated,
        at_or_above: CapabilityLevel::Integrated,
    },
    // JSONPathAssertion ships with JMeter 4.0.
    CapabilityRule {
        family: FeatureFamily::AssertJsonPath,
        threshold: StaticVersion(&[4, 0]),
        below: CapabilityLevel::Legacy,
        at_or_above: CapabilityLevel::Integrated,
    },
];

fn rule_for(family: FeatureFamily) -> Result<&'static CapabilityRule> {
    CAPABILITY_TABLE
        .iter()
        .find(|rule| rule.family == family)
        .ok_or_else(|| CompileError::UnknownFeatureFamily(family.key().to_string()))
}

/// Level for `family` at an already parsed version.
pub fn resolve_version(family: FeatureFamily, version: &Version) -> Result<CapabilityLevel> {
    let rule = rule_for(family)?;
    let level = if version.cmp_components(rule.threshold.0) == Ordering::Less {
        rule.below
    } else {
        rule.at_or_above
    };
    Ok(level)
}

/// Level for `family` at the target version string.
pub fn resolve(family: FeatureFamily, version: &str) -> Result<CapabilityLevel> {
    let version = Version::parse(version)?;
    resolve_version(family, &version)
}

/// Levels resolved for every family at one version.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    pub version: String,
    pub levels: Vec<(FeatureFamily, CapabilityLevel)>,
}

impl CapabilitySet {
    pub fn level(&self, family: FeatureFamily) -> Result<CapabilityLevel> {
        self.levels
            .iter()
            .find(|(candidate, _)| *candidate == family)
            .map(|(_, level)| *level)
            .ok_or_else(|| CompileError::UnknownFeatureFamily(family.key().to_string()))
    }
}

pub fn resolve_all(version: &str) -> Result<CapabilitySet> {
    let parsed = Version::parse(version)?;
    let mut levels = Vec::with_capacity(FeatureFamily::ALL.len());
    for family in FeatureFamily::ALL {
        let level = resolve_version(family, &parsed)?;
        tracing::debug!(family = family.key(), ?level, "resolved capability");
        levels.push((family, level));
    }
    Ok(CapabilitySet {
        version: parsed.to_string(),
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_extraction_boundary_is_three_zero_inclusive() {
        let family = FeatureFamily::ExtractJsonPath;
        assert_eq!(resolve(family, "2.13").unwrap(), CapabilityLevel::Legacy);
        assert_eq!(resolve(family, "2.99.9").unwrap(), CapabilityLevel::Legacy);
        assert_eq!(resolve(family, "3").unwrap(), CapabilityLevel::Integrated);
        assert_eq!(resolve(family, "3.0").unwrap(), CapabilityLevel::Integrated);
        assert_eq!(resolve(family, "3.3").unwrap(), CapabilityLevel::Integrated);
    }

    #[test]
    fn json_assertion_moves_at_four_zero() {
        let family = FeatureFamily::AssertJsonPath;
        assert_eq!(resolve(family, "3.3").unwrap(), CapabilityLevel::Legacy);
        assert_eq!(resolve(family, "4.0").unwrap(), CapabilityLevel::Integrated);
    }

    #[test]
    fn native_only_families_never_resolve_to_legacy() {
        for version in ["0", "2.13", "5.6.3"] {
            let set = resolve_all(version).expect("resolve all");
            for family in [
                FeatureFamily::ExtractRegexp,
                FeatureFamily::ExtractXPath,
                FeatureFamily::ExtractCssJquery,
                FeatureFamily::Assert,
            ] {
                assert_eq!(set.level(family).unwrap(), CapabilityLevel::Integrated);
            }
        }
    }

    #[test]
    fn missing_components_compare_as_zero() {
        let short = Version::parse("3").unwrap();
        let long = Version::parse("3.0.0").unwrap();
        assert_eq!(short, long);
        assert!(Version::parse("2.13").unwrap() < Version::parse("3").unwrap());
        assert!(Version::parse("3.10").unwrap() > Version::parse("3.9").unwrap());
    }

    #[test]
    fn rejects_unparsable_versions() {
        for input in ["", "v3", "3.x", "3..1", "5.0-SNAPSHOT", ".3", "99999999999999999999"] {
            let err = resolve(FeatureFamily::ExtractJsonPath, input).expect_err(input);
            assert!(matches!(err, CompileError::InvalidVersionFormat(_)), "{input}");
        }
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert_eq!(
            resolve(FeatureFamily::ExtractJsonPath, " 3.3\n").unwrap(),
            CapabilityLevel::Integrated
        );
    }

    #[test]
    fn table_covers_every_family() {
        for family in FeatureFamily::ALL {
            assert!(rule_for(family).is_ok(), "{family}");
        }
    }
}
