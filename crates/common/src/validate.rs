//! Structural validation of imported reports
//!
//! Runs on the migrated JSON value, before typed deserialization, so a
//! rejection can point at the offending field. A report is accepted or
//! rejected as a whole; there is no per-item recovery.

use serde_json::Value;
use thiserror::Error;

use crate::types::{TestPath, TestStatus};

/// Why a value is not a well-formed report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {reason}")]
pub struct ValidationError {
    /// JSON pointer of the offending value (`""` for the document root)
    pub location: String,
    pub reason: String,
}

impl ValidationError {
    fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

pub type ValidationResult = std::result::Result<(), ValidationError>;

/// Shape of an accepted import document
#[derive(Debug, Clone, PartialEq)]
pub enum ImportShape {
    Single(TestPath),
    Many(Vec<TestPath>),
}

impl ImportShape {
    pub fn into_reports(self) -> Vec<TestPath> {
        match self {
            ImportShape::Single(report) => vec![report],
            ImportShape::Many(reports) => reports,
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require_integer(value: Option<&Value>, at: &str) -> ValidationResult {
    match value {
        None => Err(ValidationError::new(at, "missing")),
        Some(v) if v.is_i64() => Ok(()),
        Some(v @ Value::Number(_)) => Err(ValidationError::new(at, format!("{} is not an integer id", v))),
        Some(v) => Err(ValidationError::new(at, format!("expected number, found {}", type_name(v)))),
    }
}

fn require_string(value: Option<&Value>, at: &str) -> ValidationResult {
    match value {
        None => Err(ValidationError::new(at, "missing")),
        Some(Value::String(_)) => Ok(()),
        Some(v) => Err(ValidationError::new(at, format!("expected string, found {}", type_name(v)))),
    }
}

fn optional_string(value: Option<&Value>, at: &str) -> ValidationResult {
    match value {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(v) => Err(ValidationError::new(at, format!("expected string or null, found {}", type_name(v)))),
    }
}

/// Validate one checklist item at `at`
pub fn validate_item(item: &Value, at: &str) -> ValidationResult {
    let Value::Object(fields) = item else {
        return Err(ValidationError::new(at, format!("expected object, found {}", type_name(item))));
    };

    require_integer(fields.get("id"), &format!("{at}/id"))?;
    require_string(fields.get("description"), &format!("{at}/description"))?;
    optional_string(fields.get("details"), &format!("{at}/details"))?;

    let status_at = format!("{at}/status");
    require_string(fields.get("status"), &status_at)?;
    if let Some(Value::String(label)) = fields.get("status") {
        if TestStatus::from_label(label).is_none() {
            return Err(ValidationError::new(status_at, format!("unknown status '{}'", label)));
        }
    }

    optional_string(fields.get("comment"), &format!("{at}/comment"))?;

    let images_at = format!("{at}/commentImages");
    match fields.get("commentImages") {
        None | Some(Value::Null) => {}
        Some(Value::Array(images)) => {
            if let Some((index, img)) = images.iter().enumerate().find(|(_, img)| !img.is_string()) {
                return Err(ValidationError::new(
                    format!("{images_at}/{index}"),
                    format!("expected string, found {}", type_name(img)),
                ));
            }
        }
        Some(v) => {
            return Err(ValidationError::new(images_at, format!("expected array, found {}", type_name(v))));
        }
    }

    Ok(())
}

/// Validate one report at `at`
pub fn validate_path(report: &Value, at: &str) -> ValidationResult {
    let Value::Object(fields) = report else {
        return Err(ValidationError::new(at, format!("expected report object, found {}", type_name(report))));
    };

    require_integer(fields.get("id"), &format!("{at}/id"))?;
    require_string(fields.get("title"), &format!("{at}/title"))?;

    let items_at = format!("{at}/items");
    match fields.get("items") {
        None => return Err(ValidationError::new(items_at, "missing")),
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                validate_item(item, &format!("{items_at}/{index}"))?;
            }
        }
        Some(v) => {
            return Err(ValidationError::new(items_at, format!("expected array, found {}", type_name(v))));
        }
    }

    optional_string(fields.get("testerName"), &format!("{at}/testerName"))?;
    optional_string(fields.get("exportTimestamp"), &format!("{at}/exportTimestamp"))?;
    Ok(())
}

/// Validate an array of reports
pub fn validate_path_array(value: &Value) -> ValidationResult {
    let Value::Array(reports) = value else {
        return Err(ValidationError::new("", format!("expected array, found {}", type_name(value))));
    };
    for (index, report) in reports.iter().enumerate() {
        validate_path(report, &format!("/{index}"))?;
    }
    Ok(())
}

pub fn is_test_path(value: &Value) -> bool {
    validate_path(value, "").is_ok()
}

pub fn is_test_path_array(value: &Value) -> bool {
    validate_path_array(value).is_ok()
}

/// Accept a migrated document as either a single report or an array of
/// reports. When neither holds, the error of the interpretation matching the
/// document's outer shape is returned.
pub fn classify(document: Value) -> std::result::Result<ImportShape, ValidationError> {
    let checked = if document.is_array() {
        validate_path_array(&document)
    } else {
        validate_path(&document, "")
    };
    checked?;

    // Structure is verified; typed conversion can only fail on values the
    // checks above already exclude.
    let is_array = document.is_array();
    let convert = |e: serde_json::Error| ValidationError::new("", e.to_string());
    if is_array {
        serde_json::from_value(document).map(ImportShape::Many).map_err(convert)
    } else {
        serde_json::from_value(document).map(ImportShape::Single).map_err(convert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> Value {
        json!({
            "id": 1,
            "title": "Plan A",
            "items": [
                {"id": 0, "description": "Step 1", "status": "Bestanden"},
                {"id": 1, "description": "Step 2", "status": "Nicht begonnen", "comment": null, "commentImages": null}
            ],
            "testerName": null
        })
    }

    #[test]
    fn test_accepts_well_formed_report() {
        assert!(is_test_path(&report()));
        assert!(is_test_path_array(&json!([report(), report()])));
        assert!(is_test_path_array(&json!([])));
    }

    #[test]
    fn test_rejects_missing_id() {
        let mut doc = report();
        doc.as_object_mut().unwrap().remove("id");
        let err = validate_path(&doc, "").unwrap_err();
        assert_eq!(err.location, "/id");
        assert_eq!(err.reason, "missing");
    }

    #[test]
    fn test_rejects_missing_title() {
        let mut doc = report();
        doc.as_object_mut().unwrap().remove("title");
        assert!(!is_test_path(&doc));
    }

    #[test]
    fn test_rejects_out_of_enum_status() {
        let mut doc = report();
        doc["items"][1]["status"] = json!("Not Started");
        let err = validate_path(&doc, "").unwrap_err();
        assert_eq!(err.location, "/items/1/status");
        assert!(err.reason.contains("Not Started"));
    }

    #[test]
    fn test_rejects_non_string_image() {
        let mut doc = report();
        doc["items"][0]["commentImages"] = json!(["data:image/png;base64,AA", 7]);
        let err = validate_path(&doc, "").unwrap_err();
        assert_eq!(err.location, "/items/0/commentImages/1");
    }

    #[test]
    fn test_rejects_fractional_id() {
        let mut doc = report();
        doc["id"] = json!(1.5);
        assert!(!is_test_path(&doc));
    }

    #[test]
    fn test_one_bad_item_rejects_whole_report() {
        let mut doc = report();
        doc["items"][1]["description"] = json!(12);
        assert!(classify(doc).is_err());
    }

    #[test]
    fn test_classify_single_and_many() {
        match classify(report()).unwrap() {
            ImportShape::Single(path) => {
                assert_eq!(path.title, "Plan A");
                assert!(path.tester_name.is_none());
            }
            other => panic!("expected single report, got {:?}", other),
        }

        let many = classify(json!([report(), report()])).unwrap();
        assert_eq!(many.into_reports().len(), 2);
    }

    #[test]
    fn test_classify_points_into_array() {
        let mut bad = report();
        bad["title"] = json!(false);
        let err = classify(json!([report(), bad])).unwrap_err();
        assert_eq!(err.location, "/1/title");
        assert_eq!(err.to_string(), "/1/title: expected string, found boolean");
    }
}
