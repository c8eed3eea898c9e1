//! Schema migration for imported reports
//!
//! Brings legacy export shapes up to the current one before validation.
//! Migration never fails: anything it cannot interpret is left as found and
//! judged later by the validator.

use serde_json::{Map, Value};
use tracing::debug;

use crate::media::MediaTypeTable;
use crate::types::TestStatus;

/// Current status for a legacy English label
pub fn legacy_status(label: &str) -> Option<TestStatus> {
    match label {
        "Not Started" => Some(TestStatus::NotStarted),
        "In Progress" => Some(TestStatus::InProgress),
        "Passed" => Some(TestStatus::Passed),
        "Failed" => Some(TestStatus::Failed),
        _ => None,
    }
}

/// Applies the migration rules to a parsed import document
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    media: MediaTypeTable,
}

impl Migrator {
    pub fn new(media: MediaTypeTable) -> Self {
        Self { media }
    }

    /// Migrate a single report or an array of reports
    pub fn migrate(&self, document: Value) -> Value {
        match document {
            Value::Array(reports) => {
                Value::Array(reports.into_iter().map(|r| self.migrate_report(r)).collect())
            }
            other => self.migrate_report(other),
        }
    }

    fn migrate_report(&self, report: Value) -> Value {
        let Value::Object(mut report) = report else {
            return report;
        };
        if let Some(Value::Array(items)) = report.get_mut("items") {
            let migrated = std::mem::take(items)
                .into_iter()
                .map(|i| self.migrate_item(i))
                .collect();
            *items = migrated;
        }
        Value::Object(report)
    }

    fn migrate_item(&self, item: Value) -> Value {
        let Value::Object(mut item) = item else {
            return item;
        };
        self.migrate_status(&mut item);
        self.migrate_images(&mut item);
        Value::Object(item)
    }

    fn migrate_status(&self, item: &mut Map<String, Value>) {
        let Some(Value::String(label)) = item.get("status") else {
            return;
        };
        if let Some(status) = legacy_status(label) {
            debug!(from = %label, to = %status, "migrated legacy status");
            item.insert("status".to_string(), Value::String(status.label().to_string()));
        }
    }

    fn migrate_images(&self, item: &mut Map<String, Value>) {
        let Some(Value::Array(images)) = item.get("commentImages") else {
            return;
        };
        let images: Vec<Value> = images
            .iter()
            .filter_map(|img| match img {
                Value::String(s) if !s.is_empty() => {
                    Some(Value::String(self.media.ensure_data_url(s)))
                }
                _ => None,
            })
            .collect();
        item.insert("commentImages".to_string(), Value::Array(images));
    }
}

/// Migrate with the default media-type table
pub fn migrate_imported_data(document: Value) -> Value {
    Migrator::default().migrate(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Not Started", "Nicht begonnen")]
    #[test_case("In Progress", "In Bearbeitung")]
    #[test_case("Passed", "Bestanden")]
    #[test_case("Failed", "Fehlgeschlagen")]
    fn test_legacy_status_mapped(legacy: &str, current: &str) {
        let doc = json!({"id": 1, "title": "T", "items": [{"id": 0, "description": "d", "status": legacy}]});
        let migrated = migrate_imported_data(doc);
        assert_eq!(migrated["items"][0]["status"], current);
    }

    #[test_case("Bestanden" ; "current label")]
    #[test_case("Skipped" ; "unknown label")]
    #[test_case("passed" ; "lowercase is not legacy")]
    fn test_other_status_unchanged(status: &str) {
        let doc = json!({"items": [{"status": status}]});
        let migrated = migrate_imported_data(doc);
        assert_eq!(migrated["items"][0]["status"], status);
    }

    #[test]
    fn test_images_promoted_and_filtered() {
        let doc = json!({
            "id": 1,
            "title": "T",
            "items": [{
                "id": 0,
                "description": "d",
                "status": "Failed",
                "commentImages": ["/9j/AAA", 42, null, "", "data:image/gif;base64,R0lGODlh", "ZZZZ"]
            }]
        });
        let migrated = migrate_imported_data(doc);
        assert_eq!(
            migrated["items"][0]["commentImages"],
            json!([
                "data:image/jpeg;base64,/9j/AAA",
                "data:image/gif;base64,R0lGODlh",
                "data:image/png;base64,ZZZZ"
            ])
        );
    }

    #[test]
    fn test_array_documents_migrated_per_report() {
        let doc = json!([
            {"items": [{"status": "Passed"}]},
            {"items": [{"status": "Failed"}]}
        ]);
        let migrated = migrate_imported_data(doc);
        assert_eq!(migrated[0]["items"][0]["status"], "Bestanden");
        assert_eq!(migrated[1]["items"][0]["status"], "Fehlgeschlagen");
    }

    #[test]
    fn test_malformed_shapes_preserved() {
        for doc in [
            json!("plain string"),
            json!(17),
            json!({"title": "no items"}),
            json!({"items": "not an array"}),
            json!({"items": [null, 3, {"status": 5}, {"commentImages": "x"}]}),
        ] {
            assert_eq!(migrate_imported_data(doc.clone()), doc);
        }
    }

    #[test]
    fn test_current_shape_is_fixed_point() {
        let doc = json!([{
            "id": 4,
            "title": "Checkout",
            "testerName": "Jane",
            "exportTimestamp": "2024-05-01T10:00:00.000Z",
            "items": [
                {"id": 0, "description": "Pay", "status": "Bestanden"},
                {"id": 1, "description": "Ship", "status": "Fehlgeschlagen",
                 "comment": "<p>late</p>", "commentImages": ["data:image/png;base64,iVBORw0KGgo"]}
            ]
        }]);
        let once = migrate_imported_data(doc.clone());
        assert_eq!(once, doc);
        assert_eq!(migrate_imported_data(once.clone()), once);
    }

    #[test]
    fn test_non_image_fallback_is_fixed_point() {
        let migrator = Migrator::new(MediaTypeTable {
            fallback: "application/octet-stream".to_string(),
            ..MediaTypeTable::default()
        });
        let doc = json!({
            "id": 1,
            "title": "Scan",
            "items": [{"id": 0, "description": "Upload", "status": "Bestanden", "commentImages": ["QUJD"]}]
        });
        let once = migrator.migrate(doc);
        assert_eq!(
            once["items"][0]["commentImages"],
            json!(["data:application/octet-stream;base64,QUJD"])
        );
        assert_eq!(migrator.migrate(once.clone()), once);
    }
}
