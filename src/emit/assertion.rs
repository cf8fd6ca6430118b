use super::{Emit, Fragment};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{bool_prop, collection_prop, int_prop, string_prop, Element};
use crate::scenario::{AssertSubject, ResponseAssertion};

const FAMILY: FeatureFamily = FeatureFamily::Assert;

// Assertion.test_type bit flags.
const TEST_TYPE_CONTAINS: i64 = 2;
const TEST_TYPE_NOT: i64 = 4;
const TEST_TYPE_SUBSTRING: i64 = 16;

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<[ResponseAssertion]> {
    match level {
        CapabilityLevel::Legacy | CapabilityLevel::Integrated => &ResponseAssertionEmitter,
    }
}

struct ResponseAssertionEmitter;

fn test_field(subject: AssertSubject) -> &'static str {
    match subject {
        AssertSubject::Body => "Assertion.response_data",
        AssertSubject::Headers => "Assertion.response_headers",
        AssertSubject::HttpCode => "Assertion.response_code",
    }
}

fn test_type(spec: &ResponseAssertion) -> i64 {
    let base = if spec.regexp {
        TEST_TYPE_CONTAINS
    } else {
        TEST_TYPE_SUBSTRING
    };
    if spec.not {
        base | TEST_TYPE_NOT
    } else {
        base
    }
}

impl Emit<[ResponseAssertion]> for ResponseAssertionEmitter {
    fn emit(&self, specs: &[ResponseAssertion]) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::with_capacity(specs.len());
        for (idx, spec) in specs.iter().enumerate() {
            if spec.contains.is_empty() {
                return Err(CompileError::missing(
                    FAMILY,
                    &format!("assert[{idx}]"),
                    "contains",
                ));
            }
            // JMeter keys test strings by an arbitrary unique name.
            let strings = spec
                .contains
                .iter()
                .enumerate()
                .map(|(pos, value)| string_prop(&pos.to_string(), value.as_str()))
                .collect();
            let mut element = Element::test_element(
                "ResponseAssertion",
                "AssertionGui",
                "ResponseAssertion",
                &format!("Assert {}", idx + 1),
            );
            element.push(collection_prop("Asserion.test_strings", strings));
            element.push(string_prop("Assertion.test_field", test_field(spec.subject)));
            element.push(bool_prop("Assertion.assume_success", spec.assume_success));
            element.push(int_prop("Assertion.test_type", test_type(spec)));
            fragments.push(Fragment::native(element));
        }
        Ok(fragments)
    }
}
