//! `periodic_gc_plugin`: invokes the JVM garbage collector on a schedule

use super::PLUGINS;
use crate::{set_for_add, string_for_add};
use dirconf_core::diff::{Operation, OperationsBuilder};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{Endpoint, ResourceAdapter};
use serde::{Deserialize, Serialize};

const SCHEMA_URN: &str = "urn:pingidentity:schemas:configuration:2.0:plugin:periodic-gc";

const DAYS_OF_WEEK: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodicGcPluginModel {
    pub id: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub invoke_gc_day_of_week: Option<Vec<String>>,
    pub invoke_gc_time_utc: Option<Vec<String>>,
    pub delay_after_alert: Option<String>,
    pub delay_post_gc: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPeriodicGcPluginRequest {
    schemas: Vec<&'static str>,
    plugin_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(rename = "invokeGCDayOfWeek", skip_serializing_if = "Option::is_none")]
    invoke_gc_day_of_week: Option<Vec<String>>,
    #[serde(rename = "invokeGCTimeUtc", skip_serializing_if = "Option::is_none")]
    invoke_gc_time_utc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_after_alert: Option<String>,
    #[serde(rename = "delayPostGC", skip_serializing_if = "Option::is_none")]
    delay_post_gc: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodicGcPluginResponse {
    id: String,
    description: Option<String>,
    enabled: Option<bool>,
    #[serde(rename = "invokeGCDayOfWeek")]
    invoke_gc_day_of_week: Option<Vec<String>>,
    #[serde(rename = "invokeGCTimeUtc")]
    invoke_gc_time_utc: Option<Vec<String>>,
    delay_after_alert: Option<String>,
    #[serde(rename = "delayPostGC")]
    delay_post_gc: Option<String>,
}

pub struct PeriodicGcPluginAdapter;

impl ResourceAdapter for PeriodicGcPluginAdapter {
    type Model = PeriodicGcPluginModel;
    type AddRequest = AddPeriodicGcPluginRequest;
    type Response = PeriodicGcPluginResponse;

    fn type_name(&self) -> &'static str {
        "periodic_gc_plugin"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Manages a Periodic Gc Plugin.")
            .with_attribute(
                Attribute::required_string("id")
                    .requires_replace()
                    .describe("Name of this object."),
            )
            .with_attribute(Attribute::optional_string("description"))
            .with_attribute(
                Attribute::required_bool("enabled")
                    .describe("Indicates whether the plug-in is enabled for use."),
            )
            .with_attribute(
                Attribute::optional_set("invoke_gc_day_of_week")
                    .one_of(DAYS_OF_WEEK)
                    .describe("Days of the week on which garbage collection may be invoked."),
            )
            .with_attribute(
                Attribute::required_set("invoke_gc_time_utc")
                    .describe("Times of day (HH:MM, UTC) at which garbage collection is invoked."),
            )
            .with_attribute(
                Attribute::optional_string("delay_after_alert")
                    .describe("Delay after the server raises an alert before invoking garbage collection."),
            )
            .with_attribute(
                Attribute::optional_string("delay_post_gc")
                    .describe("Delay after garbage collection before the server is considered ready again."),
            )
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Collection(PLUGINS)
    }

    fn irregular_keys(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("invoke-gc-day-of-week", "invokeGCDayOfWeek"),
            ("invoke-gc-time-utc", "invokeGCTimeUtc"),
            ("delay-post-gc", "delayPostGC"),
        ]
    }

    fn id(&self, model: &PeriodicGcPluginModel) -> String {
        model.id.clone()
    }

    fn model_for_import(&self, id: &str) -> PeriodicGcPluginModel {
        PeriodicGcPluginModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn add_request(&self, plan: &PeriodicGcPluginModel) -> AddPeriodicGcPluginRequest {
        AddPeriodicGcPluginRequest {
            schemas: vec![SCHEMA_URN],
            plugin_name: plan.id.clone(),
            description: string_for_add(&plan.description),
            enabled: plan.enabled,
            invoke_gc_day_of_week: set_for_add(&plan.invoke_gc_day_of_week),
            invoke_gc_time_utc: set_for_add(&plan.invoke_gc_time_utc),
            delay_after_alert: string_for_add(&plan.delay_after_alert),
            delay_post_gc: string_for_add(&plan.delay_post_gc),
        }
    }

    fn read_response(&self, response: PeriodicGcPluginResponse, model: &mut PeriodicGcPluginModel) {
        model.id = response.id;
        model.description = response.description;
        model.enabled = response.enabled;
        model.invoke_gc_day_of_week = response.invoke_gc_day_of_week;
        model.invoke_gc_time_utc = response.invoke_gc_time_utc;
        model.delay_after_alert = response.delay_after_alert;
        model.delay_post_gc = response.delay_post_gc;
    }

    fn operations(&self, plan: &PeriodicGcPluginModel, state: &PeriodicGcPluginModel) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .scalar("enabled", &plan.enabled, &state.enabled)
            .set(
                "invoke-gc-day-of-week",
                &plan.invoke_gc_day_of_week,
                &state.invoke_gc_day_of_week,
            )
            .set(
                "invoke-gc-time-utc",
                &plan.invoke_gc_time_utc,
                &state.invoke_gc_time_utc,
            )
            .scalar("delay-after-alert", &plan.delay_after_alert, &state.delay_after_alert)
            .scalar("delay-post-gc", &plan.delay_post_gc, &state.delay_post_gc)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirconf_core::TypedResource;
    use dirconf_core::diff::OperationKind;
    use dirconf_core::traits::Resource;
    use serde_json::json;

    fn plan() -> PeriodicGcPluginModel {
        serde_json::from_value(json!({
            "id": "Nightly GC",
            "enabled": true,
            "invoke_gc_time_utc": ["04:00", "16:00"],
            "delay_post_gc": "30 s"
        }))
        .unwrap()
    }

    #[test]
    fn test_schema_validation() {
        let schema = PeriodicGcPluginAdapter.schema();
        assert!(
            schema
                .validate(
                    "periodic_gc_plugin",
                    &json!({"id": "gc", "enabled": true, "invoke_gc_time_utc": ["04:00"]})
                )
                .is_ok()
        );

        let err = schema
            .validate(
                "periodic_gc_plugin",
                &json!({"id": "gc", "enabled": true, "invoke_gc_day_of_week": ["caturday"]}),
            )
            .unwrap_err()
            .to_string();
        assert!(err.contains("caturday"));
        assert!(err.contains("invoke_gc_time_utc"));
    }

    #[test]
    fn test_add_request() {
        let body = serde_json::to_value(PeriodicGcPluginAdapter.add_request(&plan())).unwrap();
        assert_eq!(
            body,
            json!({
                "schemas": [SCHEMA_URN],
                "pluginName": "Nightly GC",
                "enabled": true,
                "invokeGCTimeUtc": ["04:00", "16:00"],
                "delayPostGC": "30 s"
            })
        );
    }

    #[test]
    fn test_operations_use_hyphenated_paths() {
        let state = plan();
        let mut desired = plan();
        desired.invoke_gc_time_utc = Some(vec!["04:00".to_string()]);
        desired.invoke_gc_day_of_week = Some(vec!["sunday".to_string()]);
        desired.enabled = Some(false);

        let ops = PeriodicGcPluginAdapter.operations(&desired, &state);
        let summary: Vec<(OperationKind, &str)> =
            ops.iter().map(|o| (o.op, o.path.as_str())).collect();
        assert_eq!(
            summary,
            vec![
                (OperationKind::Replace, "enabled"),
                (OperationKind::Add, "invoke-gc-day-of-week"),
                (OperationKind::Remove, "invoke-gc-time-utc"),
            ]
        );
        assert_eq!(ops[2].value, Some(json!(["16:00"])));
    }

    #[test]
    fn test_operation_paths_match_add_request_keys() {
        let full: PeriodicGcPluginModel = serde_json::from_value(json!({
            "id": "gc",
            "description": "nightly",
            "enabled": true,
            "invoke_gc_day_of_week": ["sunday"],
            "invoke_gc_time_utc": ["04:00"],
            "delay_after_alert": "1 s",
            "delay_post_gc": "2 s"
        }))
        .unwrap();
        let body = serde_json::to_value(PeriodicGcPluginAdapter.add_request(&full)).unwrap();
        let resource = TypedResource::new(PeriodicGcPluginAdapter);

        let ops = PeriodicGcPluginAdapter.operations(&full, &PeriodicGcPluginModel::default());
        assert_eq!(ops.len(), 6);
        for op in ops {
            let key = resource.wire_format().json_key(&op.path);
            assert!(body.get(&key).is_some(), "{} maps to unknown key {}", op.path, key);
        }
    }

    #[test]
    fn test_converged_model_has_no_operations() {
        let mut state = plan();
        state.invoke_gc_time_utc = Some(vec!["16:00".to_string(), "04:00".to_string()]);
        assert!(PeriodicGcPluginAdapter.operations(&plan(), &state).is_empty());
    }

    #[test]
    fn test_read_response() {
        let response: PeriodicGcPluginResponse = serde_json::from_value(json!({
            "schemas": [SCHEMA_URN],
            "id": "Nightly GC",
            "enabled": true,
            "invokeGCTimeUtc": ["04:00"],
            "delayAfterAlert": "30 m"
        }))
        .unwrap();

        let mut model = PeriodicGcPluginAdapter.model_for_import("Nightly GC");
        PeriodicGcPluginAdapter.read_response(response, &mut model);
        assert_eq!(model.invoke_gc_time_utc, Some(vec!["04:00".to_string()]));
        assert_eq!(model.delay_after_alert.as_deref(), Some("30 m"));
        assert_eq!(model.delay_post_gc, None);
    }
}
