//! Artifact assembly.
//!
//! Walks the scenario in request order, resolves every feature family once,
//! and collects the emitted fragments into a plan that the serializer can
//! render without further decisions.
use crate::capability::{self, CapabilitySet, FeatureFamily};
use crate::emit::{self, Declaration};
use crate::error::{CompileError, Result};
use crate::jmx::{
    bool_prop, collection_prop, element_prop, hash_tree, leaf_tree, string_prop, Element,
};
use crate::scenario::{Request, RequestBody, Scenario, TimeSpan};
use std::collections::BTreeMap;

pub const DEFAULT_PLAN_NAME: &str = "jmx-builder test plan";

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// `TestPlan` name; [`DEFAULT_PLAN_NAME`] when unset.
    pub plan_name: Option<String>,
}

/// Sampler and the elements scoped to it, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSection {
    pub sampler: Element,
    pub children: Vec<Element>,
}

/// Fully assembled test plan, ready for serialization.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub jmeter_version: String,
    pub plan_name: String,
    pub capabilities: CapabilitySet,
    pub variables: BTreeMap<String, String>,
    /// Plugin requirements, unique by id, in first-appearance order.
    pub declarations: Vec<Declaration>,
    pub thread_group: Element,
    /// Thread-group wide config elements, placed before the samplers.
    pub config: Vec<Element>,
    pub sections: Vec<RequestSection>,
}

impl Artifact {
    /// Number of elements emitted under samplers.
    pub fn block_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.children.len())
            .sum()
    }

    /// Classpath entries for `TestPlan.user_define_classpath`.
    pub fn classpath(&self) -> String {
        self.declarations
            .iter()
            .map(|declaration| declaration.classpath)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Build the `jmeterTestPlan` element tree.
    pub fn to_tree(&self) -> Element {
        let mut group_entries = Vec::new();
        for element in &self.config {
            group_entries.push((element.clone(), Element::new("hashTree")));
        }
        for section in &self.sections {
            group_entries.push((section.sampler.clone(), leaf_tree(section.children.clone())));
        }
        let plan_tree = hash_tree(vec![(self.thread_group.clone(), hash_tree(group_entries))]);
        Element::new("jmeterTestPlan")
            .with_attr("version", "1.2")
            .with_attr("properties", "5.0")
            .with_attr("jmeter", self.jmeter_version.as_str())
            .with_child(hash_tree(vec![(self.test_plan(), plan_tree)]))
    }

    fn test_plan(&self) -> Element {
        let arguments = self
            .variables
            .iter()
            .map(|(name, value)| {
                element_prop(name, "Argument")
                    .with_child(string_prop("Argument.name", name.as_str()))
                    .with_child(string_prop("Argument.value", value.as_str()))
                    .with_child(string_prop("Argument.metadata", "="))
            })
            .collect();
        let variables = element_prop("TestPlan.user_defined_variables", "Arguments")
            .with_attr("guiclass", "ArgumentsPanel")
            .with_attr("testclass", "Arguments")
            .with_attr("testname", "User Defined Variables")
            .with_attr("enabled", "true")
            .with_child(collection_prop("Arguments.arguments", arguments));
        Element::test_element("TestPlan", "TestPlanGui", "TestPlan", &self.plan_name)
            .with_child(bool_prop("TestPlan.functional_mode", false))
            .with_child(bool_prop("TestPlan.serialize_threadgroups", false))
            .with_child(variables)
            .with_child(string_prop("TestPlan.user_define_classpath", self.classpath()))
    }
}

/// Compile `scenario` for the JMeter release `version`.
pub fn assemble(scenario: &Scenario, version: &str, options: &AssembleOptions) -> Result<Artifact> {
    let capabilities = capability::resolve_all(version)?;
    let mut declarations: Vec<Declaration> = Vec::new();
    let mut sections = Vec::with_capacity(scenario.requests.len());

    for (idx, request) in scenario.requests.iter().enumerate() {
        check_unrecognized(idx, request)?;
        let mut children = Vec::new();
        if !request.headers.is_empty() {
            children.push(header_manager(&request.headers));
        }
        if let Some(think_time) = request.think_time.or(scenario.think_time) {
            children.push(constant_timer(think_time));
        }
        for family in FeatureFamily::ALL {
            if !emit::has_specs(request, family) {
                continue;
            }
            let level = capabilities.level(family)?;
            for fragment in emit::emit_request(request, family, level)? {
                for declaration in fragment.declarations {
                    if !declarations.iter().any(|seen| seen.id == declaration.id) {
                        declarations.push(declaration);
                    }
                }
                children.push(fragment.element);
            }
        }
        sections.push(RequestSection {
            sampler: sampler(scenario, request),
            children,
        });
    }

    let mut config = Vec::new();
    if !scenario.headers.is_empty() {
        config.push(header_manager(&scenario.headers));
    }

    let artifact = Artifact {
        jmeter_version: capabilities.version.clone(),
        plan_name: options
            .plan_name
            .clone()
            .unwrap_or_else(|| DEFAULT_PLAN_NAME.to_string()),
        capabilities,
        variables: scenario.variables.clone(),
        declarations,
        thread_group: thread_group(scenario),
        config,
        sections,
    };
    tracing::info!(
        version = %artifact.jmeter_version,
        requests = artifact.sections.len(),
        blocks = artifact.block_count(),
        declarations = artifact.declarations.len(),
        "assembled test plan"
    );
    Ok(artifact)
}

fn check_unrecognized(idx: usize, request: &Request) -> Result<()> {
    for key in request.unrecognized.keys() {
        if key.starts_with("extract-") || key.starts_with("assert-") {
            return Err(CompileError::UnknownFeatureFamily(key.clone()));
        }
        tracing::warn!(request = idx, key = key.as_str(), "ignoring unknown request key");
    }
    Ok(())
}

fn thread_group(scenario: &Scenario) -> Element {
    let load = &scenario.load;
    let loops = match (load.iterations, load.hold_for) {
        (Some(iterations), _) => iterations,
        (None, Some(_)) => -1,
        (None, None) => 1,
    };
    let controller = element_prop("ThreadGroup.main_controller", "LoopController")
        .with_attr("guiclass", "LoopControlPanel")
        .with_attr("testclass", "LoopController")
        .with_attr("testname", "Loop Controller")
        .with_attr("enabled", "true")
        .with_child(bool_prop("LoopController.continue_forever", false))
        .with_child(string_prop("LoopController.loops", loops.to_string()));
    let ramp_up = load.ramp_up.map(TimeSpan::as_secs_ceil).unwrap_or(0);
    let duration = load
        .hold_for
        .map(|span| span.as_secs_ceil().to_string())
        .unwrap_or_default();
    Element::test_element("ThreadGroup", "ThreadGroupGui", "ThreadGroup", "Thread Group")
        .with_child(string_prop("ThreadGroup.on_sample_error", "continue"))
        .with_child(controller)
        .with_child(string_prop(
            "ThreadGroup.num_threads",
            load.concurrency.to_string(),
        ))
        .with_child(string_prop("ThreadGroup.ramp_time", ramp_up.to_string()))
        .with_child(bool_prop("ThreadGroup.scheduler", load.hold_for.is_some()))
        .with_child(string_prop("ThreadGroup.duration", duration))
}

fn sampler(scenario: &Scenario, request: &Request) -> Element {
    let follow_redirects = request
        .follow_redirects
        .unwrap_or(scenario.follow_redirects);
    let mut element = Element::test_element(
        "HTTPSamplerProxy",
        "HttpTestSampleGui",
        "HTTPSamplerProxy",
        request.display_label(),
    );
    if matches!(request.body, Some(RequestBody::Raw(_))) {
        element.push(bool_prop("HTTPSampler.postBodyRaw", true));
    }
    element.push(sampler_arguments(request.body.as_ref()));
    element.push(string_prop("HTTPSampler.path", request.url.as_str()));
    element.push(string_prop("HTTPSampler.method", request.method.as_str()));
    element.push(bool_prop("HTTPSampler.follow_redirects", follow_redirects));
    element.push(bool_prop("HTTPSampler.use_keepalive", scenario.keepalive));
    element
}

fn sampler_arguments(body: Option<&RequestBody>) -> Element {
    let arguments = match body {
        None => Vec::new(),
        Some(RequestBody::Raw(text)) => vec![element_prop("", "HTTPArgument")
            .with_child(bool_prop("HTTPArgument.always_encode", false))
            .with_child(string_prop("Argument.value", text.as_str()))
            .with_child(string_prop("Argument.metadata", "="))],
        Some(RequestBody::Form(fields)) => fields
            .iter()
            .map(|(name, value)| {
                element_prop(name, "HTTPArgument")
                    .with_child(bool_prop("HTTPArgument.always_encode", true))
                    .with_child(string_prop("Argument.name", name.as_str()))
                    .with_child(string_prop("Argument.value", value.as_str()))
                    .with_child(string_prop("Argument.metadata", "="))
                    .with_child(bool_prop("HTTPArgument.use_equals", true))
            })
            .collect(),
    };
    element_prop("HTTPsampler.Arguments", "Arguments")
        .with_attr("guiclass", "HTTPArgumentsPanel")
        .with_attr("testclass", "Arguments")
        .with_attr("enabled", "true")
        .with_child(collection_prop("Arguments.arguments", arguments))
}

fn header_manager(headers: &BTreeMap<String, String>) -> Element {
    let entries = headers
        .iter()
        .map(|(name, value)| {
            element_prop("", "Header")
                .with_child(string_prop("Header.name", name.as_str()))
                .with_child(string_prop("Header.value", value.as_str()))
        })
        .collect();
    Element::test_element("HeaderManager", "HeaderPanel", "HeaderManager", "Headers")
        .with_child(collection_prop("HeaderManager.headers", entries))
}

fn constant_timer(think_time: TimeSpan) -> Element {
    Element::test_element(
        "ConstantTimer",
        "ConstantTimerGui",
        "ConstantTimer",
        "Think-time",
    )
    .with_child(string_prop(
        "ConstantTimer.delay",
        think_time.as_millis().to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::JSON_PLUGIN;
    use crate::jmx::write::serialize;
    use crate::scenario::parse_scenario;

    const BLAZEDEMO: &str = r#"{
        "requests": [{
            "url": "http://blazedemo.com",
            "extract-jsonpath": {
                "IP": "$.net[0].ip",
                "URL": {"jsonpath": "$.net[1].url", "default": "def", "from-variable": "Jm_VaR"}
            }
        }]
    }"#;

    fn compile(text: &str, version: &str) -> Result<Artifact> {
        let scenario = parse_scenario(text).expect("scenario");
        assemble(&scenario, version, &AssembleOptions::default())
    }

    fn tags(section: &RequestSection) -> Vec<&str> {
        section
            .children
            .iter()
            .map(|child| child.tag.as_str())
            .collect()
    }

    #[test]
    fn legacy_plan_declares_json_plugin_once() {
        let artifact = compile(BLAZEDEMO, "2.13").expect("assemble");
        assert_eq!(artifact.declarations, [JSON_PLUGIN]);
        assert_eq!(artifact.block_count(), 2);
        assert_eq!(artifact.classpath(), "lib/ext/jmeter-plugins-json.jar");
    }

    #[test]
    fn integrated_plan_has_no_declarations() {
        let artifact = compile(BLAZEDEMO, "3.3").expect("assemble");
        assert!(artifact.declarations.is_empty());
        assert_eq!(artifact.classpath(), "");
        assert_eq!(tags(&artifact.sections[0]), ["JSONPostProcessor"; 2]);
    }

    #[test]
    fn children_follow_schema_order() {
        let text = r#"{
            "think-time": "250ms",
            "requests": [{
                "url": "http://blazedemo.com/reserve.php",
                "method": "POST",
                "headers": {"Accept": "application/json"},
                "body": {"fromPort": "Paris"},
                "assert-jsonpath": ["$.ok"],
                "assert": ["Reserve"],
                "extract-css-jquery": {"link": "a.next"},
                "extract-xpath": {"title": "//title"},
                "extract-jsonpath": {"id": "$.id"},
                "extract-regexp": {"token": "token=(\\w+)"}
            }]
        }"#;
        let artifact = compile(text, "5.6.3").expect("assemble");
        assert_eq!(
            tags(&artifact.sections[0]),
            [
                "HeaderManager",
                "ConstantTimer",
                "RegexExtractor",
                "JSONPostProcessor",
                "XPathExtractor",
                "HtmlExtractor",
                "ResponseAssertion",
                "JSONPathAssertion",
            ]
        );
        let timer = &artifact.sections[0].children[1];
        assert_eq!(timer.prop_text("ConstantTimer.delay"), Some("250"));
        let sampler = &artifact.sections[0].sampler;
        assert_eq!(sampler.prop_text("HTTPSampler.method"), Some("POST"));
        assert_eq!(
            sampler.prop_text("HTTPSampler.path"),
            Some("http://blazedemo.com/reserve.php")
        );
    }

    #[test]
    fn json_assertion_below_four_zero_shares_the_declaration() {
        let text = r#"{
            "requests": [
                {"url": "http://a", "extract-jsonpath": {"v": "$.v"}},
                {"url": "http://b", "assert-jsonpath": ["$.ok"]}
            ]
        }"#;
        let artifact = compile(text, "3.3").expect("assemble");
        assert_eq!(artifact.declarations, [JSON_PLUGIN]);
        assert_eq!(
            artifact.sections[1].children[0].tag,
            "com.atlantbh.jmeter.plugins.jsonutils.jsonpathassertion.JSONPathAssertion"
        );
    }

    #[test]
    fn unknown_feature_family_key_fails() {
        let text = r#"{"requests": [{"url": "http://a", "extract-boundary": {"v": "x"}}]}"#;
        let err = compile(text, "5.0").expect_err("unknown family");
        assert!(matches!(err, CompileError::UnknownFeatureFamily(key) if key == "extract-boundary"));
    }

    #[test]
    fn other_unknown_keys_are_ignored() {
        let text = r#"{"requests": [{"url": "http://a", "content-encoding": "utf-8"}]}"#;
        let artifact = compile(text, "5.0").expect("assemble");
        assert!(artifact.sections[0].children.is_empty());
    }

    #[test]
    fn invalid_version_aborts_before_emitting() {
        let err = compile(BLAZEDEMO, "3.x").expect_err("bad version");
        assert!(matches!(err, CompileError::InvalidVersionFormat(_)));
    }

    #[test]
    fn missing_path_aborts_the_whole_compile() {
        let text = r#"{"requests": [
            {"url": "http://a", "extract-jsonpath": {"ok": "$.ok"}},
            {"url": "http://b", "extract-jsonpath": {"broken": {"default": "x"}}}
        ]}"#;
        let err = compile(text, "5.0").expect_err("missing path");
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn thread_group_reflects_load_profile() {
        let text = r#"{
            "load": {"concurrency": 10, "ramp-up": "1m", "hold-for": "90s"},
            "requests": [{"url": "http://a"}]
        }"#;
        let artifact = compile(text, "5.0").expect("assemble");
        let group = &artifact.thread_group;
        assert_eq!(group.prop_text("ThreadGroup.num_threads"), Some("10"));
        assert_eq!(group.prop_text("ThreadGroup.ramp_time"), Some("60"));
        assert_eq!(group.prop_text("ThreadGroup.scheduler"), Some("true"));
        assert_eq!(group.prop_text("ThreadGroup.duration"), Some("90"));
        let controller = group
            .prop("ThreadGroup.main_controller")
            .expect("loop controller");
        assert_eq!(controller.prop_text("LoopController.loops"), Some("-1"));
    }

    #[test]
    fn tree_nests_sections_under_thread_group() {
        let text = r#"{
            "headers": {"User-Agent": "jmxb"},
            "variables": {"host": "blazedemo.com"},
            "requests": [{"url": "http://${host}/"}]
        }"#;
        let artifact = compile(text, "5.6.3").expect("assemble");
        let tree = artifact.to_tree();
        assert_eq!(tree.attr("jmeter"), Some("5.6.3"));
        let plan = &tree.children[0].children[0];
        assert_eq!(plan.tag, "TestPlan");
        assert_eq!(plan.attr("testname"), Some(DEFAULT_PLAN_NAME));
        let variables = plan
            .prop("TestPlan.user_defined_variables")
            .and_then(|args| args.prop("Arguments.arguments"))
            .expect("user defined variables");
        assert_eq!(variables.children.len(), 1);
        assert_eq!(
            variables.children[0].prop_text("Argument.value"),
            Some("blazedemo.com")
        );
        let group_tree = &tree.children[0].children[1].children[1];
        let tags = group_tree
            .children
            .iter()
            .map(|child| child.tag.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            tags,
            ["HeaderManager", "hashTree", "HTTPSamplerProxy", "hashTree"]
        );
    }

    #[test]
    fn serializing_twice_is_byte_identical() {
        let first = serialize(&compile(BLAZEDEMO, "2.13").expect("assemble"));
        let second = serialize(&compile(BLAZEDEMO, "2.13").expect("assemble"));
        assert_eq!(first, second);
    }
}
