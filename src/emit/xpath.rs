use super::{append_scope, effective_default, source_variable, Emit, Fragment};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{bool_prop, string_prop, Element};
use crate::scenario::XPathExtraction;
use std::collections::BTreeMap;

type XPathExtractions = BTreeMap<String, XPathExtraction>;

const FAMILY: FeatureFamily = FeatureFamily::ExtractXPath;

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<XPathExtractions> {
    match level {
        CapabilityLevel::Legacy | CapabilityLevel::Integrated => &XPathExtractor,
    }
}

/// Native `XPathExtractor`, one element per variable.
struct XPathExtractor;

impl Emit<XPathExtractions> for XPathExtractor {
    fn emit(&self, specs: &XPathExtractions) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::with_capacity(specs.len());
        for (variable, spec) in specs {
            if spec.xpath.is_empty() {
                return Err(CompileError::missing(FAMILY, variable, "xpath"));
            }
            let mut element = Element::test_element(
                "XPathExtractor",
                "XPathExtractorGui",
                "XPathExtractor",
                &format!("Get {variable}"),
            );
            element.push(string_prop(
                "XPathExtractor.default",
                effective_default(spec.default.as_deref()),
            ));
            element.push(string_prop("XPathExtractor.refname", variable.as_str()));
            element.push(string_prop("XPathExtractor.xpathQuery", spec.xpath.as_str()));
            element.push(bool_prop("XPathExtractor.validate", spec.validate_xml));
            element.push(bool_prop(
                "XPathExtractor.tolerant",
                spec.use_tolerant_parser,
            ));
            element.push(bool_prop("XPathExtractor.namespace", spec.use_namespaces));
            element.push(bool_prop(
                "XPathExtractor.whitespace",
                spec.ignore_whitespace,
            ));
            let source = source_variable(FAMILY, variable, spec.from_variable.as_deref());
            append_scope(&mut element, source);
            fragments.push(Fragment::native(element));
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_parser_flags() {
        let mut specs = BTreeMap::new();
        specs.insert(
            "title".to_string(),
            XPathExtraction {
                xpath: "//title".to_string(),
                use_tolerant_parser: true,
                from_variable: Some("page".to_string()),
                ..Default::default()
            },
        );
        let fragments = emitter(CapabilityLevel::Integrated)
            .emit(&specs)
            .expect("emit");
        let element = &fragments[0].element;
        assert_eq!(
            element.prop_text("XPathExtractor.xpathQuery"),
            Some("//title")
        );
        assert_eq!(element.prop_text("XPathExtractor.tolerant"), Some("true"));
        assert_eq!(
            element.prop_text("XPathExtractor.whitespace"),
            Some("true")
        );
        assert_eq!(
            element.prop_text("XPathExtractor.default"),
            Some("NOT_FOUND")
        );
        assert_eq!(element.prop_text("Sample.scope"), Some("variable"));
        assert_eq!(element.prop_text("Scope.variable"), Some("page"));
    }
}
