//! Device-settings field patch.
//!
//! Works on an untyped `serde_json::Value` so that unknown keys survive the
//! round trip. Every traversal step is an `Option`; a document of the wrong
//! shape simply means the patch does not apply.

use serde_json::{Map, Value};

/// What the patch found and changed in one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    /// Previous `result.settings.autoWork`, when the key was present.
    pub auto_work: Option<Value>,
    /// Previous `result.regionId`, when it was overwritten.
    pub region: Option<String>,
    /// `result.sn`, when it is a string.
    pub serial: Option<String>,
}

impl PatchReport {
    /// Whether the settings patch fired.
    pub fn settings_patched(&self) -> bool {
        self.auto_work.is_some()
    }

    /// Whether the document has been changed in any way.
    pub fn mutated(&self) -> bool {
        self.auto_work.is_some() || self.region.is_some()
    }

    /// Whether the settings patch fired for the given device.
    pub fn matches_serial(&self, target: Option<&str>) -> bool {
        match (target, self.serial.as_deref()) {
            (Some(target), Some(serial)) => self.settings_patched() && target == serial,
            _ => false,
        }
    }
}

/// Force `autoWork = 1` and `unit = 0` under `result.settings`, and
/// overwrite a non-empty `result.regionId` with `region_id` when given.
///
/// The two patches are independent; neither depends on the other firing.
pub fn patch_device_settings(doc: &mut Value, region_id: Option<&str>) -> PatchReport {
    let mut report = PatchReport::default();

    let Some(result) = doc.get_mut("result").and_then(Value::as_object_mut) else {
        return report;
    };

    report.serial = result.get("sn").and_then(Value::as_str).map(str::to_owned);

    if let Some(settings) = result.get_mut("settings").and_then(Value::as_object_mut) {
        report.auto_work = patch_settings(settings);
    }

    if let Some(token) = region_id {
        report.region = patch_region(result, token);
    }

    report
}

fn patch_settings(settings: &mut Map<String, Value>) -> Option<Value> {
    let slot = settings.get_mut("autoWork")?;
    let previous = std::mem::replace(slot, Value::from(1));
    settings.insert("unit".to_string(), Value::from(0));
    Some(previous)
}

fn patch_region(result: &mut Map<String, Value>, token: &str) -> Option<String> {
    match result.get_mut("regionId") {
        Some(Value::String(region)) if !region.is_empty() => {
            Some(std::mem::replace(region, token.to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_forces_fields() {
        let mut doc = json!({"result": {"sn": "ABC123", "settings": {"autoWork": 0, "unit": 1, "lightMode": 1}}});

        let report = patch_device_settings(&mut doc, None);

        assert_eq!(report.auto_work, Some(json!(0)));
        assert_eq!(report.serial.as_deref(), Some("ABC123"));
        assert_eq!(
            doc,
            json!({"result": {"sn": "ABC123", "settings": {"autoWork": 1, "unit": 0, "lightMode": 1}}})
        );
        assert_eq!(
            serde_json::to_string(&doc).unwrap(),
            r#"{"result":{"sn":"ABC123","settings":{"autoWork":1,"unit":0,"lightMode":1}}}"#
        );
    }

    #[test]
    fn test_patch_applies_when_already_set() {
        let mut doc = json!({"result": {"settings": {"autoWork": 1, "unit": 0}}});
        let before = doc.clone();

        let report = patch_device_settings(&mut doc, None);

        assert!(report.settings_patched());
        assert_eq!(doc, before);
    }

    #[test]
    fn test_unit_inserted_when_missing() {
        let mut doc = json!({"result": {"settings": {"autoWork": 0}}});
        patch_device_settings(&mut doc, None);
        assert_eq!(doc["result"]["settings"]["unit"], json!(0));
    }

    #[test]
    fn test_missing_structure_is_noop() {
        let cases = [
            json!({"result": {"sn": "ABC123"}}),
            json!({"result": {"settings": {"unit": 1}}}),
            json!({"result": {"settings": "off"}}),
            json!({"result": []}),
            json!({"data": {"settings": {"autoWork": 0}}}),
            json!([1, 2, 3]),
            json!(null),
        ];

        for case in cases {
            let mut doc = case.clone();
            let report = patch_device_settings(&mut doc, Some("eu"));
            assert!(!report.mutated(), "unexpected patch of {}", case);
            assert_eq!(doc, case);
        }
    }

    #[test]
    fn test_region_patch_independent_of_settings() {
        let mut doc = json!({"result": {"regionId": "ap-southeast-1", "sn": "X"}});

        let report = patch_device_settings(&mut doc, Some("eu-central-1"));

        assert!(!report.settings_patched());
        assert_eq!(report.region.as_deref(), Some("ap-southeast-1"));
        assert_eq!(doc["result"]["regionId"], json!("eu-central-1"));
    }

    #[test]
    fn test_region_patch_skips_empty_or_disabled() {
        let mut empty = json!({"result": {"regionId": ""}});
        assert!(patch_device_settings(&mut empty, Some("eu")).region.is_none());
        assert_eq!(empty["result"]["regionId"], json!(""));

        let mut numeric = json!({"result": {"regionId": 3}});
        assert!(patch_device_settings(&mut numeric, Some("eu")).region.is_none());

        let mut disabled = json!({"result": {"regionId": "ap-southeast-1"}});
        assert!(patch_device_settings(&mut disabled, None).region.is_none());
        assert_eq!(disabled["result"]["regionId"], json!("ap-southeast-1"));
    }

    #[test]
    fn test_serial_matching() {
        let mut doc = json!({"result": {"sn": "ABC123", "settings": {"autoWork": 0}}});
        let report = patch_device_settings(&mut doc, None);

        assert!(report.matches_serial(Some("ABC123")));
        assert!(!report.matches_serial(Some("ZZZ999")));
        assert!(!report.matches_serial(None));

        let mut numeric_sn = json!({"result": {"sn": 123, "settings": {"autoWork": 0}}});
        let report = patch_device_settings(&mut numeric_sn, None);
        assert!(report.settings_patched());
        assert!(!report.matches_serial(Some("123")));

        let mut no_settings = json!({"result": {"sn": "ABC123"}});
        let report = patch_device_settings(&mut no_settings, None);
        assert!(!report.matches_serial(Some("ABC123")));
    }
}
