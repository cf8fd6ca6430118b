use super::{append_scope, effective_default, source_variable, Emit, Fragment};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{string_prop, Element};
use crate::scenario::CssExtraction;
use std::collections::BTreeMap;

type CssExtractions = BTreeMap<String, CssExtraction>;

const FAMILY: FeatureFamily = FeatureFamily::ExtractCssJquery;

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<CssExtractions> {
    match level {
        CapabilityLevel::Legacy | CapabilityLevel::Integrated => &HtmlExtractor,
    }
}

/// Native `HtmlExtractor` (CSS/JQuery selectors), one element per variable.
struct HtmlExtractor;

impl Emit<CssExtractions> for HtmlExtractor {
    fn emit(&self, specs: &CssExtractions) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::with_capacity(specs.len());
        for (variable, spec) in specs {
            if spec.expression.is_empty() {
                return Err(CompileError::missing(FAMILY, variable, "expression"));
            }
            let mut element = Element::test_element(
                "HtmlExtractor",
                "HtmlExtractorGui",
                "HtmlExtractor",
                &format!("Get {variable}"),
            );
            element.push(string_prop("HtmlExtractor.refname", variable.as_str()));
            element.push(string_prop("HtmlExtractor.expr", spec.expression.as_str()));
            element.push(string_prop(
                "HtmlExtractor.attribute",
                spec.attribute.as_deref().unwrap_or(""),
            ));
            element.push(string_prop(
                "HtmlExtractor.match_number",
                spec.match_no.unwrap_or(1).to_string(),
            ));
            element.push(string_prop(
                "HtmlExtractor.default",
                effective_default(spec.default.as_deref()),
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
    fn renders_selector_and_attribute() {
        let mut specs = BTreeMap::new();
        specs.insert(
            "link".to_string(),
            CssExtraction {
                expression: "a.next".to_string(),
                attribute: Some("href".to_string()),
                ..Default::default()
            },
        );
        let fragments = emitter(CapabilityLevel::Integrated)
            .emit(&specs)
            .expect("emit");
        let element = &fragments[0].element;
        assert_eq!(element.prop_text("HtmlExtractor.expr"), Some("a.next"));
        assert_eq!(element.prop_text("HtmlExtractor.attribute"), Some("href"));
        assert_eq!(element.prop_text("HtmlExtractor.default"), Some("NOT_FOUND"));
        assert_eq!(element.prop_text("Sample.scope"), None);
    }

    #[test]
    fn empty_expression_is_rejected() {
        let mut specs = BTreeMap::new();
        specs.insert("link".to_string(), CssExtraction::default());
        emitter(CapabilityLevel::Integrated)
            .emit(&specs)
            .expect_err("empty expression");
    }
}
