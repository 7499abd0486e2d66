//! `file_based_trust_manager_provider`: trusts the certificates of a trust
//! store file
//!
//! The trust store PIN is write-only: the server never returns it, so the
//! recorded value is whatever was last sent.

use crate::string_for_add;
use dirconf_core::diff::{Operation, OperationsBuilder};
use dirconf_core::schema::{Attribute, ResourceSchema};
use dirconf_core::traits::{Endpoint, ResourceAdapter};
use serde::{Deserialize, Serialize};

const SCHEMA_URN: &str =
    "urn:pingidentity:schemas:configuration:2.0:trust-manager-provider:file-based";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileBasedTrustManagerProviderModel {
    pub id: String,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub trust_store_file: Option<String>,
    pub trust_store_type: Option<String>,
    pub trust_store_pin: Option<String>,
    pub trust_store_pin_file: Option<String>,
    pub trust_store_pin_passphrase_provider: Option<String>,
    pub include_jvm_default_issuers: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFileBasedTrustManagerProviderRequest {
    schemas: Vec<&'static str>,
    provider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_store_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_store_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_store_pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_store_pin_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trust_store_pin_passphrase_provider: Option<String>,
    #[serde(rename = "includeJVMDefaultIssuers", skip_serializing_if = "Option::is_none")]
    include_jvm_default_issuers: Option<bool>,
}

/// `trustStorePin` is never part of a response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileBasedTrustManagerProviderResponse {
    id: String,
    description: Option<String>,
    enabled: Option<bool>,
    trust_store_file: Option<String>,
    trust_store_type: Option<String>,
    trust_store_pin_file: Option<String>,
    trust_store_pin_passphrase_provider: Option<String>,
    #[serde(rename = "includeJVMDefaultIssuers")]
    include_jvm_default_issuers: Option<bool>,
}

pub struct FileBasedTrustManagerProviderAdapter;

impl ResourceAdapter for FileBasedTrustManagerProviderAdapter {
    type Model = FileBasedTrustManagerProviderModel;
    type AddRequest = AddFileBasedTrustManagerProviderRequest;
    type Response = FileBasedTrustManagerProviderResponse;

    fn type_name(&self) -> &'static str {
        "file_based_trust_manager_provider"
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::new("Manages a File Based Trust Manager Provider.")
            .with_attribute(
                Attribute::required_string("id")
                    .requires_replace()
                    .describe("Name of this object."),
            )
            .with_attribute(Attribute::optional_string("description"))
            .with_attribute(Attribute::required_bool("enabled"))
            .with_attribute(
                Attribute::required_string("trust_store_file")
                    .describe("Path to the trust store file, absolute or relative to the server root."),
            )
            .with_attribute(
                Attribute::optional_string("trust_store_type")
                    .describe("Format of the trust store, e.g. JKS or PKCS12."),
            )
            .with_attribute(
                Attribute::optional_string("trust_store_pin")
                    .sensitive()
                    .describe("Clear-text PIN of the trust store."),
            )
            .with_attribute(Attribute::optional_string("trust_store_pin_file"))
            .with_attribute(Attribute::optional_string("trust_store_pin_passphrase_provider"))
            .with_attribute(
                Attribute::optional_bool("include_jvm_default_issuers")
                    .describe("Also trust the issuers in the JVM's default trust store."),
            )
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::Collection("trust-manager-providers")
    }

    fn irregular_keys(&self) -> &'static [(&'static str, &'static str)] {
        &[("include-jvm-default-issuers", "includeJVMDefaultIssuers")]
    }

    fn id(&self, model: &FileBasedTrustManagerProviderModel) -> String {
        model.id.clone()
    }

    fn model_for_import(&self, id: &str) -> FileBasedTrustManagerProviderModel {
        FileBasedTrustManagerProviderModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn add_request(
        &self,
        plan: &FileBasedTrustManagerProviderModel,
    ) -> AddFileBasedTrustManagerProviderRequest {
        AddFileBasedTrustManagerProviderRequest {
            schemas: vec![SCHEMA_URN],
            provider_name: plan.id.clone(),
            description: string_for_add(&plan.description),
            enabled: plan.enabled,
            trust_store_file: string_for_add(&plan.trust_store_file),
            trust_store_type: string_for_add(&plan.trust_store_type),
            trust_store_pin: string_for_add(&plan.trust_store_pin),
            trust_store_pin_file: string_for_add(&plan.trust_store_pin_file),
            trust_store_pin_passphrase_provider: string_for_add(
                &plan.trust_store_pin_passphrase_provider,
            ),
            include_jvm_default_issuers: plan.include_jvm_default_issuers,
        }
    }

    fn read_response(
        &self,
        response: FileBasedTrustManagerProviderResponse,
        model: &mut FileBasedTrustManagerProviderModel,
    ) {
        model.id = response.id;
        model.description = response.description;
        model.enabled = response.enabled;
        model.trust_store_file = response.trust_store_file;
        model.trust_store_type = response.trust_store_type;
        model.trust_store_pin_file = response.trust_store_pin_file;
        model.trust_store_pin_passphrase_provider = response.trust_store_pin_passphrase_provider;
        model.include_jvm_default_issuers = response.include_jvm_default_issuers;
    }

    fn operations(
        &self,
        plan: &FileBasedTrustManagerProviderModel,
        state: &FileBasedTrustManagerProviderModel,
    ) -> Vec<Operation> {
        OperationsBuilder::new()
            .scalar("description", &plan.description, &state.description)
            .scalar("enabled", &plan.enabled, &state.enabled)
            .scalar("trust-store-file", &plan.trust_store_file, &state.trust_store_file)
            .scalar("trust-store-type", &plan.trust_store_type, &state.trust_store_type)
            .scalar("trust-store-pin", &plan.trust_store_pin, &state.trust_store_pin)
            .scalar(
                "trust-store-pin-file",
                &plan.trust_store_pin_file,
                &state.trust_store_pin_file,
            )
            .scalar(
                "trust-store-pin-passphrase-provider",
                &plan.trust_store_pin_passphrase_provider,
                &state.trust_store_pin_passphrase_provider,
            )
            .scalar(
                "include-jvm-default-issuers",
                &plan.include_jvm_default_issuers,
                &state.include_jvm_default_issuers,
            )
            .build()
    }
}
