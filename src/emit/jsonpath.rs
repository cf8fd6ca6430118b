//! JSON-path extraction.
//!
//! Before JMeter 3.0 the only JSON extractor was the jmeter-plugins one,
//! which holds one variable per element. The native `JSONPostProcessor`
//! holds parallel `;`-separated lists, so one element covers a request.
use super::{
    append_scope, effective_default, source_variable, Declaration, Emit, Fragment, JSON_PLUGIN,
};
use crate::capability::{CapabilityLevel, FeatureFamily};
use crate::error::{CompileError, Result};
use crate::jmx::{bool_prop, string_prop, Element};
use crate::scenario::JsonPathExtraction;
use std::collections::BTreeMap;

type JsonExtractions = BTreeMap<String, JsonPathExtraction>;

const FAMILY: FeatureFamily = FeatureFamily::ExtractJsonPath;
const PLUGIN_PACKAGE: &str = "com.atlantbh.jmeter.plugins.jsonutils.jsonpathextractor";
const LIST_SEPARATOR: &str = ";";
const DEFAULT_MATCH_NO: i32 = 1;

pub(super) fn emitter(level: CapabilityLevel) -> &'static dyn Emit<JsonExtractions> {
    match level {
        CapabilityLevel::Legacy => &PluginJsonExtractor,
        CapabilityLevel::Integrated => &NativeJsonExtractor,
    }
}

fn require_path(variable: &str, spec: &JsonPathExtraction) -> Result<()> {
    if spec.jsonpath.is_empty() {
        return Err(CompileError::missing(FAMILY, variable, "jsonpath"));
    }
    Ok(())
}

/// jmeter-plugins `JSONPathExtractor`, one element per variable.
pub struct PluginJsonExtractor;

impl PluginJsonExtractor {
    pub fn declaration(&self) -> Declaration {
        JSON_PLUGIN
    }

    pub fn emit_variable(&self, variable: &str, spec: &JsonPathExtraction) -> Result<Fragment> {
        require_path(variable, spec)?;
        if spec.match_no.is_some() || spec.concat.is_some() {
            tracing::warn!(
                variable,
                "match-no and concat need JMeter 3.0+, ignored by the plugin extractor"
            );
        }
        let mut element = Element::test_element(
            &format!("{PLUGIN_PACKAGE}.JSONPathExtractor"),
            &format!("{PLUGIN_PACKAGE}.gui.JSONPathExtractorGui"),
            &format!("{PLUGIN_PACKAGE}.JSONPathExtractor"),
            &format!("Get {variable}"),
        );
        element.push(string_prop("VAR", variable));
        element.push(string_prop("JSONPATH", spec.jsonpath.as_str()));
        element.push(string_prop(
            "DEFAULT",
            effective_default(spec.default.as_deref()),
        ));
        if let Some(source) = source_variable(FAMILY, variable, spec.from_variable.as_deref()) {
            element.push(string_prop("VARIABLE", source));
            element.push(string_prop("SUBJECT", "VAR"));
        }
        Ok(Fragment::plugin(element, self.declaration()))
    }
}

impl Emit<JsonExtractions> for PluginJsonExtractor {
    fn emit(&self, specs: &JsonExtractions) -> Result<Vec<Fragment>> {
        specs
            .iter()
            .map(|(variable, spec)| self.emit_variable(variable, spec))
            .collect()
    }
}

/// Native `JSONPostProcessor`, parallel lists per element.
pub struct NativeJsonExtractor;

/// Specs sharing one element: JMeter scopes and concatenates per element.
struct Group<'a> {
    source: Option<&'a str>,
    concat: bool,
    entries: Vec<(&'a str, &'a JsonPathExtraction)>,
}

impl NativeJsonExtractor {
    fn group<'a>(&self, specs: &'a JsonExtractions) -> Result<Vec<Group<'a>>> {
        let mut groups: Vec<Group<'a>> = Vec::new();
        for (variable, spec) in specs {
            require_path(variable, spec)?;
            let source = source_variable(FAMILY, variable, spec.from_variable.as_deref());
            let concat = spec.concat.unwrap_or(false);
            match groups
                .iter_mut()
                .find(|group| group.source == source && group.concat == concat)
            {
                Some(group) => group.entries.push((variable, spec)),
                None => groups.push(Group {
                    source,
                    concat,
                    entries: vec![(variable, spec)],
                }),
            }
        }
        Ok(groups)
    }

    fn render(&self, group: &Group<'_>) -> Element {
        let names = join(group.entries.iter().map(|(variable, _)| *variable));
        let paths = join(group.entries.iter().map(|(_, spec)| spec.jsonpath.as_str()));
        let match_numbers = join(
            group
                .entries
                .iter()
                .map(|(_, spec)| spec.match_no.unwrap_or(DEFAULT_MATCH_NO).to_string()),
        );
        let defaults = join(
            group
                .entries
                .iter()
                .map(|(_, spec)| effective_default(spec.default.as_deref())),
        );
        for (variable, spec) in &group.entries {
            let ambiguous = [*variable, spec.jsonpath.as_str()]
                .into_iter()
                .chain(spec.default.as_deref())
                .any(|value| value.contains(LIST_SEPARATOR));
            if ambiguous {
                tracing::warn!(
                    variable = *variable,
                    "value contains ';', JMeter will split it into separate list entries"
                );
            }
        }

        let mut element = Element::test_element(
            "JSONPostProcessor",
            "JSONPostProcessorGui",
            "JSONPostProcessor",
            &format!("Get {names}"),
        );
        element.push(string_prop("JSONPostProcessor.referenceNames", names));
        element.push(string_prop("JSONPostProcessor.jsonPathExprs", paths));
        element.push(string_prop(
            "JSONPostProcessor.match_numbers",
            match_numbers,
        ));
        element.push(string_prop("JSONPostProcessor.defaultValues", defaults));
        append_scope(&mut element, group.source);
        element.push(bool_prop("JSONPostProcessor.compute_concat", group.concat));
        element
    }
}

impl Emit<JsonExtractions> for NativeJsonExtractor {
    fn emit(&self, specs: &JsonExtractions) -> Result<Vec<Fragment>> {
        let groups = self.group(specs)?;
        Ok(groups
            .iter()
            .map(|group| Fragment::native(self.render(group)))
            .collect())
    }
}

fn join<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    values
        .into_iter()
        .map(|value| value.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}
