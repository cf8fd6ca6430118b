//! Serde types for the merged scenario document.
//!
//! Presence is always explicit: optional fields are `Option`, and defaults
//! that the target engine owns (sentinel values, match numbers) are applied
//! by the emitters, not here.
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_concurrency() -> u32 {
    1
}

/// One load-test scenario, already merged from its configuration layers.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Scenario {
    #[serde(default)]
    pub requests: Vec<Request>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub think_time: Option<TimeSpan>,
    #[serde(default)]
    pub load: LoadProfile,
    #[serde(default = "default_true")]
    pub keepalive: bool,
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
}

/// Thread group shape.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LoadProfile {
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub iterations: Option<i64>,
    #[serde(default)]
    pub ramp_up: Option<TimeSpan>,
    #[serde(default)]
    pub hold_for: Option<TimeSpan>,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            iterations: None,
            ramp_up: None,
            hold_for: None,
        }
    }
}

/// A single HTTP request and the post-processing attached to it.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Request {
    pub url: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<RequestBody>,
    #[serde(default)]
    pub think_time: Option<TimeSpan>,
    #[serde(default)]
    pub follow_redirects: Option<bool>,
    #[serde(default, deserialize_with = "shorthand_map")]
    pub extract_regexp: BTreeMap<String, RegexpExtraction>,
    #[serde(default, deserialize_with = "shorthand_map")]
    pub extract_jsonpath: BTreeMap<String, JsonPathExtraction>,
    #[serde(default, deserialize_with = "shorthand_map")]
    pub extract_xpath: BTreeMap<String, XPathExtraction>,
    #[serde(default, deserialize_with = "shorthand_map")]
    pub extract_css_jquery: BTreeMap<String, CssExtraction>,
    #[serde(default, deserialize_with = "shorthand_list")]
    pub assert: Vec<ResponseAssertion>,
    #[serde(default, deserialize_with = "shorthand_list")]
    pub assert_jsonpath: Vec<JsonPathAssertion>,
    /// Keys this model does not know; checked by the assembler.
    #[serde(flatten)]
    pub unrecognized: BTreeMap<String, serde_json::Value>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: None,
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            think_time: None,
            follow_redirects: None,
            extract_regexp: BTreeMap::new(),
            extract_jsonpath: BTreeMap::new(),
            extract_xpath: BTreeMap::new(),
            extract_css_jquery: BTreeMap::new(),
            assert: Vec::new(),
            assert_jsonpath: Vec::new(),
            unrecognized: BTreeMap::new(),
        }
    }

    /// Sampler name shown in JMeter results.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RequestBody {
    Raw(String),
    Form(BTreeMap<String, String>),
}

/// JSON-path extraction rule; a bare string is shorthand for `jsonpath`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct JsonPathExtraction {
    #[serde(default)]
    pub jsonpath: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub from_variable: Option<String>,
    #[serde(default)]
    pub match_no: Option<i32>,
    #[serde(default)]
    pub concat: Option<bool>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RegexpSubject {
    #[default]
    Body,
    Headers,
    Url,
    HttpCode,
    Message,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RegexpExtraction {
    #[serde(default)]
    pub regexp: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub match_no: Option<i32>,
    #[serde(default)]
    pub template: Option<u32>,
    #[serde(default)]
    pub subject: RegexpSubject,
    #[serde(default)]
    pub from_variable: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct XPathExtraction {
    #[serde(default)]
    pub xpath: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub validate_xml: bool,
    #[serde(default = "default_true")]
    pub ignore_whitespace: bool,
    #[serde(default)]
    pub use_tolerant_parser: bool,
    #[serde(default)]
    pub use_namespaces: bool,
    #[serde(default)]
    pub from_variable: Option<String>,
}

impl Default for XPathExtraction {
    fn default() -> Self {
        Self {
            xpath: String::new(),
            default: None,
            validate_xml: false,
            ignore_whitespace: true,
            use_tolerant_parser: false,
            use_namespaces: false,
            from_variable: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CssExtraction {
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub match_no: Option<i32>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub from_variable: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AssertSubject {
    #[default]
    Body,
    Headers,
    HttpCode,
}

/// Response assertion; a bare string is shorthand for `contains: [string]`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ResponseAssertion {
    #[serde(default)]
    pub contains: Vec<String>,
    #[serde(default)]
    pub subject: AssertSubject,
    #[serde(default = "default_true")]
    pub regexp: bool,
    #[serde(default)]
    pub not: bool,
    #[serde(default)]
    pub assume_success: bool,
}

impl Default for ResponseAssertion {
    fn default() -> Self {
        Self {
            contains: Vec::new(),
            subject: AssertSubject::Body,
            regexp: true,
            not: false,
            assume_success: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct JsonPathAssertion {
    #[serde(default)]
    pub jsonpath: String,
    #[serde(default)]
    pub expected_value: Option<String>,
    #[serde(default)]
    pub validate: bool,
    #[serde(default)]
    pub expect_null: bool,
    #[serde(default)]
    pub invert: bool,
    #[serde(default = "default_true")]
    pub regexp: bool,
}

impl Default for JsonPathAssertion {
    fn default() -> Self {
        Self {
            jsonpath: String::new(),
            expected_value: None,
            validate: false,
            expect_null: false,
            invert: false,
            regexp: true,
        }
    }
}

/// Specs that accept a bare string in place of the full object.
pub trait FromShorthand: Sized {
    fn from_shorthand(value: String) -> Self;
}

impl FromShorthand for JsonPathExtraction {
    fn from_shorthand(value: String) -> Self {
        Self {
            jsonpath: value,
            ..Default::default()
        }
    }
}

impl FromShorthand for RegexpExtraction {
    fn from_shorthand(value: String) -> Self {
        Self {
            regexp: value,
            ..Default::default()
        }
    }
}

impl FromShorthand for XPathExtraction {
    fn from_shorthand(value: String) -> Self {
        Self {
            xpath: value,
            ..Default::default()
        }
    }
}

impl FromShorthand for CssExtraction {
    fn from_shorthand(value: String) -> Self {
        Self {
            expression: value,
            ..Default::default()
        }
    }
}

impl FromShorthand for ResponseAssertion {
    fn from_shorthand(value: String) -> Self {
        Self {
            contains: vec![value],
            ..Default::default()
        }
    }
}

impl FromShorthand for JsonPathAssertion {
    fn from_shorthand(value: String) -> Self {
        Self {
            jsonpath: value,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Shorthand<T> {
    Bare(String),
    Full(T),
}

impl<T: FromShorthand> Shorthand<T> {
    fn into_spec(self) -> T {
        match self {
            Shorthand::Bare(value) => T::from_shorthand(value),
            Shorthand::Full(spec) => spec,
        }
    }
}

fn shorthand_map<'de, D, T>(deserializer: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromShorthand,
{
    let raw = BTreeMap::<String, Shorthand<T>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, spec)| (name, spec.into_spec()))
        .collect())
}

fn shorthand_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromShorthand,
{
    let raw = Vec::<Shorthand<T>>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(Shorthand::into_spec).collect())
}

/// Non-negative duration, written as seconds (`1.5`) or with units
/// (`500ms`, `2s`, `1m30s`, `1h`).
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "TimeSpanInput")]
pub struct TimeSpan {
    millis: u64,
}

impl TimeSpan {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_millis(self) -> u64 {
        self.millis
    }

    /// Whole seconds, rounded up.
    pub fn as_secs_ceil(self) -> u64 {
        self.millis.div_ceil(1000)
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        static FULL_RE: OnceLock<Regex> = OnceLock::new();
        static PART_RE: OnceLock<Regex> = OnceLock::new();
        let full = FULL_RE.get_or_init(|| {
            Regex::new(r"^([0-9]+(\.[0-9]+)?(ms|s|m|h|d)?)+$").expect("compile duration regex")
        });
        let part = PART_RE.get_or_init(|| {
            Regex::new(r"([0-9]+(?:\.[0-9]+)?)(ms|s|m|h|d)?").expect("compile duration regex")
        });
        let trimmed = text.trim().to_lowercase();
        if !full.is_match(&trimmed) {
            return Err(format!("invalid duration {text:?}"));
        }
        let mut millis = 0f64;
        for caps in part.captures_iter(&trimmed) {
            let value: f64 = caps[1]
                .parse()
                .map_err(|_| format!("invalid duration {text:?}"))?;
            let scale = match caps.get(2).map(|unit| unit.as_str()) {
                Some("ms") => 1.0,
                Some("m") => 60_000.0,
                Some("h") => 3_600_000.0,
                Some("d") => 86_400_000.0,
                _ => 1000.0,
            };
            millis += value * scale;
        }
        Ok(Self::from_millis(millis.round() as u64))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeSpanInput {
    Seconds(f64),
    Text(String),
}

impl TryFrom<TimeSpanInput> for TimeSpan {
    type Error = String;

    fn try_from(input: TimeSpanInput) -> Result<Self, Self::Error> {
        match input {
            TimeSpanInput::Seconds(secs) if secs.is_finite() && secs >= 0.0 => {
                Ok(TimeSpan::from_millis((secs * 1000.0).round() as u64))
            }
            TimeSpanInput::Seconds(secs) => Err(format!("invalid duration {secs}")),
            TimeSpanInput::Text(text) => TimeSpan::parse(&text),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_forms() {
        assert_eq!(TimeSpan::parse("500ms").unwrap().as_millis(), 500);
        assert_eq!(TimeSpan::parse("2s").unwrap().as_millis(), 2000);
        assert_eq!(TimeSpan::parse("1m30s").unwrap().as_millis(), 90_000);
        assert_eq!(TimeSpan::parse("1.5").unwrap().as_millis(), 1500);
        assert_eq!(TimeSpan::parse("1H").unwrap().as_millis(), 3_600_000);
        TimeSpan::parse("soon").expect_err("not a duration");
        TimeSpan::parse("").expect_err("empty");
    }

    #[test]
    fn duration_accepts_json_numbers() {
        let span: TimeSpan = serde_json::from_str("0.25").expect("number");
        assert_eq!(span.as_millis(), 250);
        serde_json::from_str::<TimeSpan>("-1").expect_err("negative");
    }

    #[test]
    fn seconds_round_up() {
        assert_eq!(TimeSpan::from_millis(1500).as_secs_ceil(), 2);
        assert_eq!(TimeSpan::from_millis(0).as_secs_ceil(), 0);
    }

    #[test]
    fn extraction_maps_accept_shorthand_and_objects() {
        let request: Request = serde_json::from_str(
            r#"{
                "url": "http://blazedemo.com",
                "extract-jsonpath": {
                    "IP": "$.net[0].ip",
                    "URL": {"jsonpath": "$.net[1].url", "default": "def", "from-variable": "Jm_VaR"}
                }
            }"#,
        )
        .expect("parse request");
        let ip = &request.extract_jsonpath["IP"];
        assert_eq!(ip.jsonpath, "$.net[0].ip");
        assert_eq!(ip.default, None);
        assert_eq!(ip.from_variable, None);
        let url = &request.extract_jsonpath["URL"];
        assert_eq!(url.default.as_deref(), Some("def"));
        assert_eq!(url.from_variable.as_deref(), Some("Jm_VaR"));
        assert!(request.unrecognized.is_empty());
    }

    #[test]
    fn assertion_lists_accept_shorthand() {
        let request: Request = serde_json::from_str(
            r#"{"url": "/", "assert": ["Welcome", {"contains": ["200"], "subject": "http-code"}]}"#,
        )
        .expect("parse request");
        assert_eq!(request.assert[0].contains, ["Welcome"]);
        assert!(request.assert[0].regexp);
        assert_eq!(request.assert[1].subject, AssertSubject::HttpCode);
    }

    #[test]
    fn unknown_request_keys_are_collected() {
        let request: Request =
            serde_json::from_str(r#"{"url": "/", "extract-boundary": {}, "note": 1}"#)
                .expect("parse request");
        let keys = request.unrecognized.keys().collect::<Vec<_>>();
        assert_eq!(keys, ["extract-boundary", "note"]);
    }
}
