//! `location`: a named data center or region that servers belong to

use crate::string_for_add;
use dirconf_core::diff::{Operation, OperationsBuilder};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{Endpoint, ResourceAdapter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationModel {
    pub id: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddLocationRequest {
    location_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationResponse {
    id: String,
    description: Option<String>,
}

pub struct LocationAdapter;

impl ResourceAdapter for LocationAdapter {
    type Model = LocationModel;
    type AddRequest = AddLocationRequest;
    type Response = LocationResponse;

    fn type_name(&self) -> &'static str {
        "location"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Manages a Location.")
            .with_attribute(
                Attribute::required_string("id")
                    .requires_replace()
                    .describe("Name of this object."),
            )
            .with_attribute(
                Attribute::optional_string("description").describe("A description for this Location"),
            )
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Collection("locations")
    }

    fn id(&self, model: &LocationModel) -> String {
        model.id.clone()
    }

    fn model_for_import(&self, id: &str) -> LocationModel {
        LocationModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn add_request(&self, plan: &LocationModel) -> AddLocationRequest {
        AddLocationRequest {
            location_name: plan.id.clone(),
            description: string_for_add(&plan.description),
        }
    }

    fn read_response(&self, response: LocationResponse, model: &mut LocationModel) {
        model.id = response.id;
        model.description = response.description;
    }

    fn operations(&self, plan: &LocationModel, state: &LocationModel) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .build()
    }
}
