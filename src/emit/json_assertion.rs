//! JSON-path assertion.
//!
//! Both variants share property names; only the element class and the
//! plugin declaration differ.
use super::{Emit, Fragment, JSON_PLUGIN};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{bool_prop, string_prop, Element};
use crate::scenario::JsonPathAssertion;

const FAMILY: FeatureFamily = FeatureFamily::AssertJsonPath;
const PLUGIN_PACKAGE: &str = "com.atlantbh.jmeter.plugins.jsonutils.jsonpathassertion";

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<[JsonPathAssertion]> {
    match level {
        CapabilityLevel::Legacy => &PluginJsonAssertion,
        CapabilityLevel::Integrated => &NativeJsonAssertion,
    }
}

struct PluginJsonAssertion;

struct NativeJsonAssertion;

fn checked(specs: &[JsonPathAssertion]) -> Result<()> {
    for (idx, spec) in specs.iter().enumerate() {
        if spec.jsonpath.is_empty() {
            return Err(CompileError::missing(
                FAMILY,
                &format!("assert-jsonpath[{idx}]"),
                "jsonpath",
            ));
        }
    }
    Ok(())
}

fn with_props(mut element: Element, spec: &JsonPathAssertion) -> Element {
    element.push(string_prop("JSON_PATH", spec.jsonpath.as_str()));
    element.push(string_prop(
        "EXPECTED_VALUE",
        spec.expected_value.as_deref().unwrap_or(""),
    ));
    element.push(bool_prop("JSONVALIDATION", spec.validate));
    element.push(bool_prop("EXPECT_NULL", spec.expect_null));
    element.push(bool_prop("INVERT", spec.invert));
    element.push(bool_prop("ISREGEX", spec.regexp));
    element
}

impl Emit<[JsonPathAssertion]> for PluginJsonAssertion {
    fn emit(&self, specs: &[JsonPathAssertion]) -> Result<Vec<Fragment>> {
        checked(specs)?;
        Ok(specs
            .iter()
            .map(|spec| {
                let element = Element::test_element(
                    &format!("{PLUGIN_PACKAGE}.JSONPathAssertion"),
                    &format!("{PLUGIN_PACKAGE}.gui.JSONPathAssertionGui"),
                    &format!("{PLUGIN_PACKAGE}.JSONPathAssertion"),
                    &format!("Assert {}", spec.jsonpath),
                );
                Fragment::plugin(with_props(element, spec), JSON_PLUGIN)
            })
            .collect())
    }
}

impl Emit<[JsonPathAssertion]> for NativeJsonAssertion {
    fn emit(&self, specs: &[JsonPathAssertion]) -> Result<Vec<Fragment>> {
        checked(specs)?;
        Ok(specs
            .iter()
            .map(|spec| {
                let element = Element::test_element(
                    "JSONPathAssertion",
                    "JSONPathAssertionGui",
                    "JSONPathAssertion",
                    &format!("Assert {}", spec.jsonpath),
                );
                Fragment::native(with_props(element, spec))
            })
            .collect())
    }
}
