use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{CoreError, CoreResult};

static HEX_COLOR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").ok());
static LAYER_NAME: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").ok());

fn field_error(field: &str, message: String) -> CoreError {
    let mut fields = BTreeMap::new();
    fields.insert("field".to_string(), field.to_string());
    CoreError::validation(message).with_fields(fields)
}

/// Service for input validation and sanitization
pub struct ValidationService;

impl ValidationService {
    /// Trimmed, non-empty title of at most 200 characters.
    pub fn validate_title(field: &str, title: &str) -> CoreResult<String> {
        let trimmed = title.trim();

        if trimmed.is_empty() {
            return Err(field_error(field, format!("{} cannot be empty", field)));
        }

        if trimmed.chars().count() > 200 {
            return Err(field_error(
                field,
                format!("{} is too long (max 200 characters)", field),
            ));
        }

        Ok(trimmed.to_string())
    }

    /// Optional free text; blank input is stored as absent.
    pub fn validate_description(description: Option<&str>) -> CoreResult<Option<String>> {
        let Some(description) = description.map(str::trim) else {
            return Ok(None);
        };

        if description.is_empty() {
            return Ok(None);
        }

        if description.chars().count() > 5000 {
            return Err(CoreError::validation(
                "Description is too long (max 5000 characters)",
            ));
        }

        Ok(Some(description.to_string()))
    }

    pub fn validate_hex_color(color: &str) -> CoreResult<String> {
        let regex = HEX_COLOR
            .as_ref()
            .ok_or_else(|| CoreError::internal("Color pattern unavailable"))?;
        let trimmed = color.trim();
        if !regex.is_match(trimmed) {
            return Err(CoreError::validation(format!("Invalid color: {}", color)));
        }
        Ok(trimmed.to_lowercase())
    }

    /// Boundary layer names map to file stems inside the data directory.
    pub fn validate_layer_name(name: &str) -> CoreResult<String> {
        let trimmed = name.trim();

        if trimmed.is_empty() || trimmed.len() > 100 {
            return Err(CoreError::validation("Layer name must be 1-100 characters"));
        }

        let regex = LAYER_NAME
            .as_ref()
            .ok_or_else(|| CoreError::internal("Layer name pattern unavailable"))?;
        if !regex.is_match(trimmed) {
            return Err(CoreError::validation(
                "Layer name can only contain letters, numbers, underscores, and hyphens",
            ));
        }

        Ok(trimmed.to_string())
    }

    /// Trim, drop blanks and duplicates, keep first-seen order.
    pub fn normalize_tags(tags: &[String]) -> Vec<String> {
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !normalized.iter().any(|existing| existing == tag) {
                normalized.push(tag.to_string());
            }
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation() {
        assert_eq!(
            ValidationService::validate_title("Title", "  Carte des lycées ").unwrap(),
            "Carte des lycées"
        );
        assert!(ValidationService::validate_title("Title", "   ").is_err());
        assert!(ValidationService::validate_title("Title", &"x".repeat(201)).is_err());
    }

    #[test]
    fn test_title_errors_name_the_field() {
        let err = ValidationService::validate_title("EPCI name", " ").unwrap_err();
        let fields = err.fields().unwrap();
        assert_eq!(fields.get("field").map(String::as_str), Some("EPCI name"));
    }

    #[test]
    fn test_description_validation() {
        assert_eq!(ValidationService::validate_description(None).unwrap(), None);
        assert_eq!(ValidationService::validate_description(Some("  ")).unwrap(), None);
        assert_eq!(
            ValidationService::validate_description(Some(" ok ")).unwrap(),
            Some("ok".to_string())
        );
    }

    #[test]
    fn test_color_validation() {
        assert_eq!(ValidationService::validate_hex_color("#08306B").unwrap(), "#08306b");
        assert!(ValidationService::validate_hex_color("#fff").is_ok());
        assert!(ValidationService::validate_hex_color("blue").is_err());
    }

    #[test]
    fn test_layer_name_validation() {
        assert!(ValidationService::validate_layer_name("communes-bfc").is_ok());
        assert!(ValidationService::validate_layer_name("../etc/passwd").is_err());
        assert!(ValidationService::validate_layer_name("").is_err());
        for _ in 0..3 {
            assert!(ValidationService::validate_layer_name("departements").is_ok());
        }
        assert!(LAYER_NAME.is_some());
        assert!(HEX_COLOR.is_some());
    }

    #[test]
    fn test_tag_normalization() {
        let tags = vec![
            " santé ".to_string(),
            "".to_string(),
            "santé".to_string(),
            "éducation".to_string(),
        ];
        assert_eq!(
            ValidationService::normalize_tags(&tags),
            vec!["santé".to_string(), "éducation".to_string()]
        );
    }
}
