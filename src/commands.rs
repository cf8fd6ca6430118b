//! Command bodies for the `jmxb` binary.
use crate::cli::{CapabilitiesArgs, CompileArgs, InspectArgs};
use anyhow::{Context, Result};
use jmx_builder::assemble::{assemble, AssembleOptions};
use jmx_builder::capability::{resolve_all, CapabilityLevel, FeatureFamily};
use jmx_builder::jmx::write;
use jmx_builder::readback::{read_file, PlanReadback, Variant};
use jmx_builder::scenario::load_scenario;
use jmx_builder::settings::{effective_version, load_settings, Settings};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct CompileSummary {
    out: PathBuf,
    jmeter_version: String,
    requests: usize,
    blocks: usize,
    declarations: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct FamilyLevel {
    family: FeatureFamily,
    level: CapabilityLevel,
}

#[derive(Debug, Serialize)]
struct CapabilityReport {
    jmeter_version: String,
    families: Vec<FamilyLevel>,
}

pub fn run_compile(args: CompileArgs) -> Result<()> {
    let settings = match args.settings.as_deref() {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    let version = effective_version(args.jmeter_version.as_deref(), &settings);
    let scenario = load_scenario(&args.scenario)?;
    tracing::debug!(
        scenario = %args.scenario.display(),
        requests = scenario.requests.len(),
        version = %version,
        "loaded scenario"
    );
    let options = AssembleOptions {
        plan_name: settings.plan_name.clone(),
    };
    let artifact = assemble(&scenario, &version, &options)
        .with_context(|| format!("compile {}", args.scenario.display()))?;
    write::write(&artifact, &args.out)?;

    let summary = CompileSummary {
        out: args.out.clone(),
        jmeter_version: artifact.jmeter_version.clone(),
        requests: artifact.sections.len(),
        blocks: artifact.block_count(),
        declarations: artifact
            .declarations
            .iter()
            .map(|declaration| declaration.id)
            .collect(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "wrote {} (jmeter {}, {} requests, {} blocks)",
        summary.out.display(),
        summary.jmeter_version,
        summary.requests,
        summary.blocks
    );
    if !summary.declarations.is_empty() {
        println!("plugins: {}", summary.declarations.join(", "));
    }
    Ok(())
}

pub fn run_capabilities(args: CapabilitiesArgs) -> Result<()> {
    let set = resolve_all(&args.jmeter_version)?;
    let report = CapabilityReport {
        jmeter_version: set.version.clone(),
        families: set
            .levels
            .iter()
            .map(|(family, level)| FamilyLevel {
                family: *family,
                level: *level,
            })
            .collect(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("jmeter {}", report.jmeter_version);
    for entry in &report.families {
        let level = match entry.level {
            CapabilityLevel::Legacy => "legacy",
            CapabilityLevel::Integrated => "integrated",
        };
        println!("  {:<20} {level}", entry.family.key());
    }
    Ok(())
}

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let plan = read_file(&args.jmx)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }
    print_plan(&plan);
    Ok(())
}

fn print_plan(plan: &PlanReadback) {
    println!(
        "jmeter {} ({} requests, {} blocks)",
        plan.jmeter_version.as_deref().unwrap_or("unknown"),
        plan.requests.len(),
        plan.block_count()
    );
    for entry in &plan.classpath {
        println!("classpath: {entry}");
    }
    for request in &plan.requests {
        println!("{} {} [{}]", request.method, request.url, request.label);
        for extraction in &request.json_extractions {
            let variant = match extraction.variant {
                Variant::Plugin => "plugin",
                Variant::Native => "native",
            };
            let source = extraction
                .from_variable
                .as_deref()
                .map(|name| format!(" from ${{{name}}}"))
                .unwrap_or_default();
            println!(
                "  extract {} = {} default {:?}{source} ({variant})",
                extraction.variable, extraction.jsonpath, extraction.default
            );
        }
        for assertion in &request.json_assertions {
            println!("  assert {}", assertion.jsonpath);
        }
    }
}
