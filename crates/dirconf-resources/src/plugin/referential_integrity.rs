//! `referential_integrity_plugin`: keeps DN references consistent when
//! entries are deleted or renamed

use super::PLUGINS;
use crate::{set_for_add, string_for_add};
use dirconf_core::diff::{Operation, OperationsBuilder};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{Endpoint, ResourceAdapter};
use serde::{Deserialize, Serialize};

const SCHEMA_URN: &str =
    "urn:pingidentity:schemas:configuration:2.0:plugin:referential-integrity";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferentialIntegrityPluginModel {
    pub id: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub attribute_type: Option<Vec<String>>,
    pub base_dn: Option<Vec<String>>,
    pub log_file: Option<String>,
    pub update_interval: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReferentialIntegrityPluginRequest {
    schemas: Vec<&'static str>,
    plugin_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute_type: Option<Vec<String>>,
    #[serde(rename = "baseDN", skip_serializing_if = "Option::is_none")]
    base_dn: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_interval: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferentialIntegrityPluginResponse {
    id: String,
    description: Option<String>,
    enabled: Option<bool>,
    attribute_type: Option<Vec<String>>,
    #[serde(rename = "baseDN")]
    base_dn: Option<Vec<String>>,
    log_file: Option<String>,
    update_interval: Option<String>,
}

pub struct ReferentialIntegrityPluginAdapter;

impl ResourceAdapter for ReferentialIntegrityPluginAdapter {
    type Model = ReferentialIntegrityPluginModel;
    type AddRequest = AddReferentialIntegrityPluginRequest;
    type Response = ReferentialIntegrityPluginResponse;

    fn type_name(&self) -> &'static str {
        "referential_integrity_plugin"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Manages a Referential Integrity Plugin.")
            .with_attribute(
                Attribute::required_string("id")
                    .requires_replace()
                    .describe("Name of this object."),
            )
            .with_attribute(Attribute::optional_string("description"))
            .with_attribute(Attribute::required_bool("enabled"))
            .with_attribute(
                Attribute::required_set("attribute_type")
                    .describe("Attribute types whose values are DN references to maintain."),
            )
            .with_attribute(
                Attribute::optional_set("base_dn")
                    .describe("Base DNs of the entries whose references are maintained."),
            )
            .with_attribute(Attribute::optional_string("log_file"))
            .with_attribute(
                Attribute::optional_string("update_interval")
                    .describe("Interval between background updates; zero means updates are synchronous."),
            )
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Collection(PLUGINS)
    }

    fn irregular_keys(&self) -> &'static [(&'static str, &'static str)] {
        &[("base-dn", "baseDN")]
    }

    fn id(&self, model: &ReferentialIntegrityPluginModel) -> String {
        model.id.clone()
    }

    fn model_for_import(&self, id: &str) -> ReferentialIntegrityPluginModel {
        ReferentialIntegrityPluginModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn add_request(&self, plan: &ReferentialIntegrityPluginModel) -> AddReferentialIntegrityPluginRequest {
        AddReferentialIntegrityPluginRequest {
            schemas: vec![SCHEMA_URN],
            plugin_name: plan.id.clone(),
            description: string_for_add(&plan.description),
            enabled: plan.enabled,
            attribute_type: set_for_add(&plan.attribute_type),
            base_dn: set_for_add(&plan.base_dn),
            log_file: string_for_add(&plan.log_file),
            update_interval: string_for_add(&plan.update_interval),
        }
    }

    fn read_response(
        &self,
        response: ReferentialIntegrityPluginResponse,
        model: &mut ReferentialIntegrityPluginModel,
    ) {
        model.id = response.id;
        model.description = response.description;
        model.enabled = response.enabled;
        model.attribute_type = response.attribute_type;
        model.base_dn = response.base_dn;
        model.log_file = response.log_file;
        model.update_interval = response.update_interval;
    }

    fn operations(
        &self,
        plan: &ReferentialIntegrityPluginModel,
        state: &ReferentialIntegrityPluginModel,
    ) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .scalar("enabled", &plan.enabled, &state.enabled)
            .set("attribute-type", &plan.attribute_type, &state.attribute_type)
            .set("base-dn", &plan.base_dn, &state.base_dn)
            .scalar("log-file", &plan.log_file, &state.log_file)
            .scalar("update-interval", &plan.update_interval, &state.update_interval)
            .build()
    }
}
