//! Per-family emitters.
//!
//! Each (family, capability level) pair is bound to one emitter value behind
//! the single-method [`Emit`] interface. Dispatch happens once per family in
//! [`emit_request`]; emitters never branch on the target version.
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::Result;
use crate::jmx::{string_prop, Element};
use crate::scenario::Request;

mod assertion;
mod css;
mod json_assertion;
mod jsonpath;
mod regexp;
mod xpath;

pub use jsonpath::{NativeJsonExtractor, PluginJsonExtractor};

/// Value JMeter stores when an extractor finds nothing and no default is set.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Plugin the test plan must load for a legacy element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration {
    /// JMeter plugins manager id.
    pub id: &'static str,
    pub classpath: &'static str,
}

/// `jpgc-json`, home of the pre-3.0 JSON extractor and pre-4.0 JSON assertion.
pub const JSON_PLUGIN: Declaration = Declaration {
    id: "jpgc-json",
    classpath: "lib/ext/jmeter-plugins-json.jar",
};

/// One emitted subtree and the declarations it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub element: Element,
    pub declarations: Vec<Declaration>,
}

impl Fragment {
    pub fn native(element: Element) -> Self {
        Self {
            element,
            declarations: Vec::new(),
        }
    }

    pub fn plugin(element: Element, declaration: Declaration) -> Self {
        Self {
            element,
            declarations: vec![declaration],
        }
    }
}

/// Rendering strategy for one family at one capability level.
pub trait Emit<S: ?Sized> {
    fn emit(&self, specs: &S) -> Result<Vec<Fragment>>;
}

/// Emit every spec of `family` attached to `request`.
pub fn emit_request(
    request: &Request,
    family: FeatureFamily,
    level: CapabilityLevel,
) -> Result<Vec<Fragment>> {
    match family {
        FeatureFamily::ExtractRegexp => regexp::emitter(level).emit(&request.extract_regexp),
        FeatureFamily::ExtractJsonPath => jsonpath::emitter(level).emit(&request.extract_jsonpath),
        FeatureFamily::ExtractXPath => xpath::emitter(level).emit(&request.extract_xpath),
        FeatureFamily::ExtractCssJquery => css::emitter(level).emit(&request.extract_css_jquery),
        FeatureFamily::Assert => assertion::emitter(level).emit(request.assert.as_slice()),
        FeatureFamily::AssertJsonPath => {
            json_assertion::emitter(level).emit(request.assert_jsonpath.as_slice())
        }
    }
}

/// Whether `request` carries any spec of `family`.
pub fn has_specs(request: &Request, family: FeatureFamily) -> bool {
    match family {
        FeatureFamily::ExtractRegexp => !request.extract_regexp.is_empty(),
        FeatureFamily::ExtractJsonPath => !request.extract_jsonpath.is_empty(),
        FeatureFamily::ExtractXPath => !request.extract_xpath.is_empty(),
        FeatureFamily::ExtractCssJquery => !request.extract_css_jquery.is_empty(),
        FeatureFamily::Assert => !request.assert.is_empty(),
        FeatureFamily::AssertJsonPath => !request.assert_jsonpath.is_empty(),
    }
}

pub(crate) fn effective_default(default: Option<&str>) -> &str {
    default.unwrap_or(NOT_FOUND)
}

/// Variable an extraction reads from, if any. A blank name counts as absent.
pub(crate) fn source_variable<'a>(
    family: FeatureFamily,
    variable: &str,
    from_variable: Option<&'a str>,
) -> Option<&'a str> {
    match from_variable {
        Some(name) if name.trim().is_empty() => {
            tracing::warn!(
                family = family.key(),
                variable,
                "blank from-variable ignored, reading the sample instead"
            );
            None
        }
        other => other,
    }
}

/// Scope properties shared by JMeter's scoped post-processors.
pub(crate) fn append_scope(element: &mut Element, source: Option<&str>) {
    if let Some(name) = source {
        element.push(string_prop("Sample.scope", "variable"));
        element.push(string_prop("Scope.variable", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::JsonPathExtraction;

    #[test]
    fn dispatch_follows_capability_level() {
        let mut request = Request::new("http://blazedemo.com");
        request.extract_jsonpath.insert(
            "IP".to_string(),
            JsonPathExtraction {
                jsonpath: "$.net[0].ip".to_string(),
                ..Default::default()
            },
        );
        let legacy = emit_request(
            &request,
            FeatureFamily::ExtractJsonPath,
            CapabilityLevel::Legacy,
        )
        .expect("legacy");
        assert_eq!(legacy[0].declarations, [JSON_PLUGIN]);
        let native = emit_request(
            &request,
            FeatureFamily::ExtractJsonPath,
            CapabilityLevel::Integrated,
        )
        .expect("native");
        assert_eq!(native[0].element.tag, "JSONPostProcessor");
        assert!(native[0].declarations.is_empty());
    }

    #[test]
    fn scope_is_untouched_without_source() {
        let mut element = Element::new("RegexExtractor");
        append_scope(&mut element, None);
        assert!(element.children.is_empty());
        append_scope(&mut element, Some("token"));
        assert_eq!(element.prop_text("Sample.scope"), Some("variable"));
        assert_eq!(element.prop_text("Scope.variable"), Some("token"));
    }

    #[test]
    fn blank_source_variable_is_absent() {
        let family = FeatureFamily::ExtractJsonPath;
        assert_eq!(source_variable(family, "v", Some("  ")), None);
        assert_eq!(source_variable(family, "v", Some("src")), Some("src"));
        assert_eq!(source_variable(family, "v", None), None);
    }
}
