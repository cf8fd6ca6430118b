//! Recover declared fields from a written test plan.
//!
//! Readback works on the element tree alone, so it accepts plans produced at
//! any target version and from either JSON extractor variant.
use crate::jmx::parse::parse_document;
use crate::jmx::Element;
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

const PLUGIN_EXTRACTOR: &str =
    "com.atlantbh.jmeter.plugins.jsonutils.jsonpathextractor.JSONPathExtractor";
const PLUGIN_ASSERTION: &str =
    "com.atlantbh.jmeter.plugins.jsonutils.jsonpathassertion.JSONPathAssertion";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Plugin,
    Native,
}

/// One JSON extraction as JMeter will see it.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JsonExtraction {
    pub variable: String,
    pub jsonpath: String,
    /// Default as written, sentinel included.
    pub default: String,
    pub from_variable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_no: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concat: Option<bool>,
    pub variant: Variant,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JsonAssertion {
    pub jsonpath: String,
    pub expected_value: String,
    pub variant: Variant,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RequestReadback {
    pub label: String,
    pub url: String,
    pub method: String,
    /// Elements scoped to the sampler.
    pub blocks: usize,
    pub json_extractions: Vec<JsonExtraction>,
    pub json_assertions: Vec<JsonAssertion>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct PlanReadback {
    pub jmeter_version: Option<String>,
    pub plan_name: Option<String>,
    /// Entries of `TestPlan.user_define_classpath`.
    pub classpath: Vec<String>,
    pub requests: Vec<RequestReadback>,
}

impl PlanReadback {
    pub fn json_extractions(&self) -> impl Iterator<Item = &JsonExtraction> {
        self.requests
            .iter()
            .flat_map(|request| request.json_extractions.iter())
    }

    pub fn block_count(&self) -> usize {
        self.requests.iter().map(|request| request.blocks).sum()
    }
}

/// Read and parse a `.jmx` file.
pub fn read_file(path: &Path) -> Result<PlanReadback> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read test plan {}", path.display()))?;
    let root =
        parse_document(&text).with_context(|| format!("parse test plan {}", path.display()))?;
    read_plan(&root)
}

pub fn read_plan(root: &Element) -> Result<PlanReadback> {
    if root.tag != "jmeterTestPlan" {
        bail!("root element is <{}>, expected <jmeterTestPlan>", root.tag);
    }
    let test_plan = root.descendants("TestPlan").into_iter().next();
    let classpath = test_plan
        .and_then(|plan| plan.prop_text("TestPlan.user_define_classpath"))
        .map(|text| {
            text.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let mut samplers = Vec::new();
    for tree in root.children.iter().filter(|child| child.tag == "hashTree") {
        collect_samplers(tree, &mut samplers);
    }
    let requests = samplers
        .into_iter()
        .map(|(sampler, subtree)| read_request(sampler, subtree))
        .collect::<Result<Vec<_>>>()?;

    Ok(PlanReadback {
        jmeter_version: root.attr("jmeter").map(str::to_string),
        plan_name: test_plan
            .and_then(|plan| plan.attr("testname"))
            .map(str::to_string),
        classpath,
        requests,
    })
}

/// Pair every sampler with the `hashTree` that follows it.
fn collect_samplers<'a>(tree: &'a Element, found: &mut Vec<(&'a Element, Option<&'a Element>)>) {
    let mut children = tree.children.iter().peekable();
    while let Some(element) = children.next() {
        let subtree = match children.peek() {
            Some(next) if next.tag == "hashTree" => children.next(),
            _ => None,
        };
        if element.tag == "HTTPSamplerProxy" {
            found.push((element, subtree));
        } else if let Some(subtree) = subtree {
            collect_samplers(subtree, found);
        }
    }
}

fn read_request(sampler: &Element, subtree: Option<&Element>) -> Result<RequestReadback> {
    let blocks = subtree
        .map(|tree| {
            tree.children
                .iter()
                .filter(|child| child.tag != "hashTree")
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let mut json_extractions = Vec::new();
    let mut json_assertions = Vec::new();
    for block in &blocks {
        match block.tag.as_str() {
            PLUGIN_EXTRACTOR => json_extractions.push(read_plugin_extractor(block)?),
            "JSONPostProcessor" => json_extractions.extend(read_native_extractor(block)?),
            PLUGIN_ASSERTION => json_assertions.push(read_assertion(block, Variant::Plugin)),
            "JSONPathAssertion" => json_assertions.push(read_assertion(block, Variant::Native)),
            _ => {}
        }
    }
    Ok(RequestReadback {
        label: sampler.attr("testname").unwrap_or_default().to_string(),
        url: sampler
            .prop_text("HTTPSampler.path")
            .unwrap_or_default()
            .to_string(),
        method: sampler
            .prop_text("HTTPSampler.method")
            .unwrap_or_default()
            .to_string(),
        blocks: blocks.len(),
        json_extractions,
        json_assertions,
    })
}

fn required<'a>(block: &'a Element, name: &str) -> Result<&'a str> {
    block
        .prop_text(name)
        .ok_or_else(|| anyhow!("<{}> has no {name} property", block.tag))
}

/// `;`-separated list property of the native extractor.
fn list<'a>(block: &'a Element, name: &str) -> Result<Vec<&'a str>> {
    Ok(required(block, name)?.split(';').collect())
}

fn read_plugin_extractor(block: &Element) -> Result<JsonExtraction> {
    let from_variable = match block.prop_text("SUBJECT") {
        Some("VAR") => Some(required(block, "VARIABLE")?.to_string()),
        _ => None,
    };
    Ok(JsonExtraction {
        variable: required(block, "VAR")?.to_string(),
        jsonpath: required(block, "JSONPATH")?.to_string(),
        default: required(block, "DEFAULT")?.to_string(),
        from_variable,
        match_no: None,
        concat: None,
        variant: Variant::Plugin,
    })
}

fn read_native_extractor(block: &Element) -> Result<Vec<JsonExtraction>> {
    let names = list(block, "JSONPostProcessor.referenceNames")?;
    let paths = list(block, "JSONPostProcessor.jsonPathExprs")?;
    let defaults = list(block, "JSONPostProcessor.defaultValues")?;
    let match_numbers = match block.prop_text("JSONPostProcessor.match_numbers") {
        Some(text) if !text.is_empty() => text
            .split(';')
            .map(|value| {
                value
                    .trim()
                    .parse::<i32>()
                    .with_context(|| format!("match number {value:?}"))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };
    if paths.len() != names.len()
        || defaults.len() != names.len()
        || (!match_numbers.is_empty() && match_numbers.len() != names.len())
    {
        bail!(
            "JSONPostProcessor lists differ in length ({} names, {} paths, {} defaults)",
            names.len(),
            paths.len(),
            defaults.len()
        );
    }
    let from_variable = match block.prop_text("Sample.scope") {
        Some("variable") => Some(required(block, "Scope.variable")?.to_string()),
        _ => None,
    };
    let concat = block
        .prop_text("JSONPostProcessor.compute_concat")
        .map(|text| text == "true");
    Ok(names
        .iter()
        .enumerate()
        .map(|(idx, name)| JsonExtraction {
            variable: name.to_string(),
            jsonpath: paths[idx].to_string(),
            default: defaults[idx].to_string(),
            from_variable: from_variable.clone(),
            match_no: match_numbers.get(idx).copied(),
            concat,
            variant: Variant::Native,
        })
        .collect())
}

fn read_assertion(block: &Element, variant: Variant) -> JsonAssertion {
    JsonAssertion {
        jsonpath: block.prop_text("JSON_PATH").unwrap_or_default().to_string(),
        expected_value: block
            .prop_text("EXPECTED_VALUE")
            .unwrap_or_default()
            .to_string(),
        variant,
    }
}
