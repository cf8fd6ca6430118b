//! Scenario loading and validation.
//!
//! Validation covers what the compiler cannot express as a typed error:
//! malformed requests and load profiles. Missing extraction paths are left
//! to the emitters so they surface with the family and variable name.
use super::Scenario;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Load and validate a merged scenario from a JSON file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let bytes = fs::read(path).with_context(|| format!("read scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse scenario JSON {}", path.display()))?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

/// Parse and validate a scenario from JSON text.
pub fn parse_scenario(text: &str) -> Result<Scenario> {
    let scenario: Scenario = serde_json::from_str(text).context("parse scenario JSON")?;
    validate_scenario(&scenario)?;
    Ok(scenario)
}

fn method_regex() -> &'static Regex {
    static METHOD_RE: OnceLock<Regex> = OnceLock::new();
    METHOD_RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z_-]*$").expect("compile method regex"))
}

pub fn validate_scenario(scenario: &Scenario) -> Result<()> {
    if scenario.requests.is_empty() {
        return Err(anyhow!("scenario contains no requests"));
    }
    if scenario.load.concurrency == 0 {
        return Err(anyhow!("load.concurrency must be > 0"));
    }
    if let Some(iterations) = scenario.load.iterations {
        if iterations == 0 || iterations < -1 {
            return Err(anyhow!(
                "load.iterations must be -1 (unbounded) or > 0 (got {iterations})"
            ));
        }
    }
    for name in scenario.variables.keys() {
        if name.trim().is_empty() {
            return Err(anyhow!("variables must not contain an empty name"));
        }
    }
    for (idx, request) in scenario.requests.iter().enumerate() {
        if request.url.trim().is_empty() {
            return Err(anyhow!("requests[{idx}].url must not be empty"));
        }
        if !method_regex().is_match(&request.method) {
            return Err(anyhow!(
                "requests[{idx}].method {:?} is not an HTTP method token",
                request.method
            ));
        }
        for header in request.headers.keys().chain(scenario.headers.keys()) {
            if header.trim().is_empty() {
                return Err(anyhow!("requests[{idx}] has an empty header name"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_scenario_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scenario.json");
        fs::write(
            &path,
            r#"{"requests": [{"url": "http://blazedemo.com", "extract-jsonpath": {"IP": "$.net[0].ip"}}]}"#,
        )
        .expect("write scenario");
        let scenario = load_scenario(&path).expect("load scenario");
        assert_eq!(scenario.requests.len(), 1);
        assert_eq!(scenario.requests[0].method, "GET");
        assert!(scenario.keepalive);
        assert_eq!(scenario.load.concurrency, 1);
    }

    #[test]
    fn rejects_empty_scenarios() {
        let err = parse_scenario(r#"{"requests": []}"#).expect_err("no requests");
        assert!(err.to_string().contains("no requests"));
    }

    #[test]
    fn rejects_blank_urls_and_bad_methods() {
        let err = parse_scenario(r#"{"requests": [{"url": "  "}]}"#).expect_err("blank url");
        assert!(err.to_string().contains("requests[0].url"));
        let err = parse_scenario(r#"{"requests": [{"url": "/", "method": "get it"}]}"#)
            .expect_err("bad method");
        assert!(err.to_string().contains("HTTP method"));
    }

    #[test]
    fn rejects_unknown_scenario_keys() {
        parse_scenario(r#"{"requests": [{"url": "/"}], "retries": 3}"#)
            .expect_err("unknown scenario key");
    }

    #[test]
    fn rejects_zero_iterations() {
        let err = parse_scenario(r#"{"requests": [{"url": "/"}], "load": {"iterations": 0}}"#)
            .expect_err("zero iterations");
        assert!(err.to_string().contains("load.iterations"));
    }

    #[test]
    fn reports_missing_file_path() {
        let err = load_scenario(Path::new("/nonexistent/scenario.json")).expect_err("missing");
        assert!(err.to_string().contains("read scenario /nonexistent/scenario.json"));
    }
}
