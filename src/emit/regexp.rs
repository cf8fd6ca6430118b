use super::{append_scope, effective_default, source_variable, Emit, Fragment};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{string_prop, Element};
use crate::scenario::{RegexpExtraction, RegexpSubject};
use std::collections::BTreeMap;

type RegexpExtractions = BTreeMap<String, RegexpExtraction>;

const FAMILY: FeatureFamily = FeatureFamily::ExtractRegexp;

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<RegexpExtractions> {
    match level {
        CapabilityLevel::Legacy | CapabilityLevel::Integrated => &RegexExtractor,
    }
}

/// Native `RegexExtractor`, one element per variable.
struct RegexExtractor;

fn use_headers(subject: RegexpSubject) -> &'static str {
    match subject {
        RegexpSubject::Body => "false",
        RegexpSubject::Headers => "true",
        RegexpSubject::Url => "URL",
        RegexpSubject::HttpCode => "code",
        RegexpSubject::Message => "message",
    }
}

impl Emit<RegexpExtractions> for RegexExtractor {
    fn emit(&self, specs: &RegexpExtractions) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::with_capacity(specs.len());
        for (variable, spec) in specs {
            if spec.regexp.is_empty() {
                return Err(CompileError::missing(FAMILY, variable, "regexp"));
            }
            let mut element = Element::test_element(
                "RegexExtractor",
                "RegexExtractorGui",
                "RegexExtractor",
                &format!("Get {variable}"),
            );
            element.push(string_prop(
                "RegexExtractor.useHeaders",
                use_headers(spec.subject),
            ));
            element.push(string_prop("RegexExtractor.refname", variable.as_str()));
            element.push(string_prop("RegexExtractor.regex", spec.regexp.as_str()));
            element.push(string_prop(
                "RegexExtractor.template",
                format!("${}$", spec.template.unwrap_or(1)),
            ));
            element.push(string_prop(
                "RegexExtractor.default",
                effective_default(spec.default.as_deref()),
            ));
            element.push(string_prop(
                "RegexExtractor.match_number",
                spec.match_no.unwrap_or(1).to_string(),
            ));
            let source = source_variable(FAMILY, variable, spec.from_variable.as_deref());
            append_scope(&mut element, source);
            fragments.push(Fragment::native(element));
        }
        Ok(fragments)
    }
}
