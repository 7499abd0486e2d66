//! `global_configuration`: server-wide settings
//!
//! The object always exists, so creating the resource adopts it and
//! destroying the resource only stops managing it.

use dirconf_core::diff::{Operation, OperationsBuilder};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{Endpoint, ResourceAdapter};
use serde::{Deserialize, Serialize};

const PATH: &str = "global-configuration";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfigurationModel {
    pub location: Option<String>,
    pub size_limit: Option<i64>,
    pub time_limit: Option<String>,
    pub lookthrough_limit: Option<i64>,
    pub idle_time_limit: Option<String>,
    pub writability_mode: Option<String>,
    pub disabled_privilege: Option<Vec<String>>,
    pub smtp_server: Option<Vec<String>>,
    pub allowed_task: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfigurationResponse {
    location: Option<String>,
    size_limit: Option<i64>,
    time_limit: Option<String>,
    lookthrough_limit: Option<i64>,
    idle_time_limit: Option<String>,
    writability_mode: Option<String>,
    disabled_privilege: Option<Vec<String>>,
    smtp_server: Option<Vec<String>>,
    allowed_task: Option<Vec<String>>,
}

pub struct GlobalConfigurationAdapter;

impl ResourceAdapter for GlobalConfigurationAdapter {
    type Model = GlobalConfigurationModel;
    type AddRequest = ();
    type Response = GlobalConfigurationResponse;

    fn type_name(&self) -> &'static str {
        "global_configuration"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Manages the Global Configuration.")
            .with_attribute(
                Attribute::optional_string("location")
                    .describe("Location of this server, used to prefer nearby servers."),
            )
            .with_attribute(Attribute::optional_int64("size_limit"))
            .with_attribute(Attribute::optional_string("time_limit"))
            .with_attribute(Attribute::optional_int64("lookthrough_limit"))
            .with_attribute(Attribute::optional_string("idle_time_limit"))
            .with_attribute(
                Attribute::optional_string("writability_mode")
                    .one_of(&["enabled", "disabled", "internal-only"]),
            )
            .with_attribute(Attribute::optional_set("disabled_privilege"))
            .with_attribute(
                Attribute::optional_set("smtp_server")
                    .describe("SMTP servers (host[:port]) used to send notifications."),
            )
            .with_attribute(Attribute::optional_set("allowed_task"))
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Singleton(PATH)
    }

    fn id(&self, _model: &GlobalConfigurationModel) -> String {
        PATH.to_string()
    }

    fn model_for_import(&self, _id: &str) -> GlobalConfigurationModel {
        GlobalConfigurationModel::default()
    }

    fn add_request(&self, _plan: &GlobalConfigurationModel) {}

    fn read_response(&self, response: GlobalConfigurationResponse, model: &mut GlobalConfigurationModel) {
        model.location = response.location;
        model.size_limit = response.size_limit;
        model.time_limit = response.time_limit;
        model.lookthrough_limit = response.lookthrough_limit;
        model.idle_time_limit = response.idle_time_limit;
        model.writability_mode = response.writability_mode;
        model.disabled_privilege = response.disabled_privilege;
        model.smtp_server = response.smtp_server;
        model.allowed_task = response.allowed_task;
    }

    fn operations(&self, plan: &GlobalConfigurationModel, state: &GlobalConfigurationModel) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("location", &plan.location, &state.location)
            .scalar("size-limit", &plan.size_limit, &state.size_limit)
            .scalar("time-limit", &plan.time_limit, &state.time_limit)
            .scalar("lookthrough-limit", &plan.lookthrough_limit, &state.lookthrough_limit)
            .scalar("idle-time-limit", &plan.idle_time_limit, &state.idle_time_limit)
            .scalar("writability-mode", &plan.writability_mode, &state.writability_mode)
            .set("disabled-privilege", &plan.disabled_privilege, &state.disabled_privilege)
            .set("smtp-server", &plan.smtp_server, &state.smtp_server)
            .set("allowed-task", &plan.allowed_task, &state.allowed_task)
            .build()
    }
}
