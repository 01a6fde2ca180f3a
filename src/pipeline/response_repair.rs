//! Turns raw model text into a displayable JSON object.
//!
//! Stages, each only run when the previous one did not yield an object:
//! fence stripping and control-character removal, a direct parse, a parse of
//! the widest `{...}` span, and finally a canned fallback object. `repair`
//! never fails.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};

// Greedy: first `{` to last `}`.
static OBJECT_SPAN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").ok());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepairStage {
    Direct,
    Extracted,
    Fallback,
}

/// Generation facts attached to the repaired object.
#[derive(Clone, Debug)]
pub struct RepairContext<'a> {
    pub prompt: &'a str,
    pub document_names: &'a [String],
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RepairOutcome {
    pub value: Value,
    pub stage: RepairStage,
}

impl RepairOutcome {
    pub fn parse_error(&self) -> bool {
        self.stage == RepairStage::Fallback
    }
}

/// Remove a leading ```` ```lang ```` line and a trailing ```` ``` ```` if present.
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Drop C0/C1 control characters, newlines and tabs included.
pub fn remove_control_characters(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

fn extract_object(text: &str) -> Option<Map<String, Value>> {
    let regex = OBJECT_SPAN.as_ref()?;
    let span = regex.find(text)?;
    parse_object(span.as_str())
}

fn attach_metadata(mut object: Map<String, Value>, context: &RepairContext<'_>) -> Value {
    object.insert(
        "generatedAt".to_string(),
        Value::String(context.generated_at.to_rfc3339()),
    );
    object.insert(
        "documentsUsed".to_string(),
        Value::from(context.document_names.len()),
    );
    object.insert("ragEnhanced".to_string(), Value::Bool(true));
    Value::Object(object)
}

/// Canned object shown when nothing parseable came back.
pub fn fallback_object(raw: &str, context: &RepairContext<'_>) -> Value {
    json!({
        "type": "fallback",
        "title": format!("Carte : {}", context.prompt.trim()),
        "description": format!(
            "La réponse générée pour « {} » n'a pas pu être interprétée. Les données brutes sont conservées pour analyse.",
            context.prompt.trim()
        ),
        "documentsAvailable": context.document_names.len(),
        "sources": context.document_names,
        "technicalSpecs": {
            "projection": "WGS84 (EPSG:4326)",
            "region": "Bourgogne-Franche-Comté",
            "format": "GeoJSON FeatureCollection",
        },
        "rawResponse": raw,
        "parseError": true,
        "ragEnhanced": true,
        "generatedAt": context.generated_at.to_rfc3339(),
    })
}

pub fn repair(raw: &str, context: &RepairContext<'_>) -> RepairOutcome {
    let cleaned = remove_control_characters(strip_code_fence(raw));

    if let Some(object) = parse_object(&cleaned) {
        return RepairOutcome {
            value: attach_metadata(object, context),
            stage: RepairStage::Direct,
        };
    }

    if let Some(object) = extract_object(&cleaned) {
        tracing::debug!("Recovered JSON object from surrounding text");
        return RepairOutcome {
            value: attach_metadata(object, context),
            stage: RepairStage::Extracted,
        };
    }

    tracing::warn!(
        raw_chars = raw.len(),
        "Model response is not parseable JSON, using fallback object"
    );
    RepairOutcome {
        value: fallback_object(raw, context),
        stage: RepairStage::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context<'a>(names: &'a [String]) -> RepairContext<'a> {
        RepairContext {
            prompt: "hôpitaux de Côte-d'Or",
            document_names: names,
            generated_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn fenced_json_gets_metadata() {
        let names = vec!["Communes".to_string()];
        let outcome = repair("```json\n{\"title\":\"X\"}\n```", &context(&names));

        assert_eq!(outcome.stage, RepairStage::Direct);
        assert!(!outcome.parse_error());
        assert_eq!(outcome.value["title"], json!("X"));
        assert_eq!(outcome.value["ragEnhanced"], json!(true));
        assert_eq!(outcome.value["documentsUsed"], json!(1));
        assert_eq!(outcome.value["generatedAt"], json!("2024-05-01T12:00:00+00:00"));
    }

    #[test]
    fn untagged_fence_and_control_characters() {
        let raw = "```\n{\"title\":\"A\u{0007}B\",\n\t\"n\":1}\n```";
        let outcome = repair(raw, &context(&[]));
        assert_eq!(outcome.stage, RepairStage::Direct);
        assert_eq!(outcome.value["title"], json!("AB"));
        assert_eq!(outcome.value["n"], json!(1));
    }

    #[test]
    fn raw_newlines_inside_strings_are_repaired() {
        let raw = "{\"description\":\"ligne 1\nligne 2\"}";
        let outcome = repair(raw, &context(&[]));
        assert_eq!(outcome.stage, RepairStage::Direct);
        assert_eq!(outcome.value["description"], json!("ligne 1ligne 2"));
    }

    #[test]
    fn object_is_extracted_from_prose() {
        let raw = "Voici la carte demandée : {\"type\":\"complexe\",\"layers\":[]} Bonne lecture !";
        let outcome = repair(raw, &context(&[]));
        assert_eq!(outcome.stage, RepairStage::Extracted);
        assert_eq!(outcome.value["type"], json!("complexe"));
        assert_eq!(outcome.value["ragEnhanced"], json!(true));
    }

    #[test]
    fn garbage_falls_back_without_panicking() {
        let names = vec!["Communes".to_string(), "EPCI".to_string()];
        for raw in ["", "pas de json ici", "{\"title\": ", "[1, 2, 3]", "} inverted {"] {
            let outcome = repair(raw, &context(&names));
            assert!(outcome.parse_error(), "expected fallback for {:?}", raw);
            assert_eq!(outcome.value["parseError"], json!(true));
            assert_eq!(outcome.value["type"], json!("fallback"));
            assert_eq!(outcome.value["documentsAvailable"], json!(2));
            assert_eq!(outcome.value["sources"], json!(["Communes", "EPCI"]));
            assert_eq!(outcome.value["rawResponse"], json!(raw));
        }
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}"), "{\"a\":1}");
    }
}
