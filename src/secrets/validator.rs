//! Schema validator backed by the `secret_schemas` table

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::SyncError;
use crate::models::secret_schema;
use crate::repositories::SchemaRepository;
use crate::secrets::{SchemaValidator, SecretPayload, SecretUsage};

#[derive(Debug, Clone)]
pub struct RepositorySchemaValidator {
    schemas: SchemaRepository,
}

impl RepositorySchemaValidator {
    pub fn new(schemas: SchemaRepository) -> Self {
        Self { schemas }
    }
}

fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Checks `data` against a schema's usage and required fields.
pub fn check_payload(
    schema: &secret_schema::Model,
    data: &SecretPayload,
    usage: SecretUsage,
) -> Result<(), SyncError> {
    if schema.usage != usage.as_str() {
        return Err(SyncError::SecretValidation(format!(
            "schema {} is for {} secrets, not {}",
            schema.schema_id, schema.usage, usage
        )));
    }

    let missing: Vec<String> = schema
        .required_fields()
        .into_iter()
        .filter(|field| data.get(field).is_none_or(is_blank))
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::SecretValidation(format!(
            "secret data for schema {} is missing required fields: {}",
            schema.schema_id,
            missing.join(", ")
        )));
    }
    Ok(())
}

#[async_trait]
impl SchemaValidator for RepositorySchemaValidator {
    async fn get_schema(
        &self,
        schema_id: &str,
        _domain_id: &str,
    ) -> Result<secret_schema::Model, SyncError> {
        self.schemas
            .find(schema_id)
            .await?
            .ok_or_else(|| SyncError::not_found("secret schema", schema_id))
    }

    async fn validate_secret_data(
        &self,
        schema_id: &str,
        domain_id: &str,
        data: &SecretPayload,
        usage: SecretUsage,
    ) -> Result<(), SyncError> {
        let schema = match self.get_schema(schema_id, domain_id).await {
            Ok(schema) => schema,
            Err(SyncError::NotFound { .. }) => {
                return Err(SyncError::SecretValidation(format!(
                    "unknown secret schema {schema_id}"
                )));
            }
            Err(other) => return Err(other),
        };
        check_payload(&schema, data, usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn schema(usage: &str) -> secret_schema::Model {
        secret_schema::Model {
            schema_id: "aws_access_key".into(),
            name: "AWS access key".into(),
            usage: usage.into(),
            required_fields: json!(["aws_access_key_id", "aws_secret_access_key"]),
            created_at: Utc::now().fixed_offset(),
        }
    }

    fn payload(value: JsonValue) -> SecretPayload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_complete_payload_passes() {
        let data = payload(json!({
            "aws_access_key_id": "AKIA",
            "aws_secret_access_key": "s3cr3t",
            "region": "eu-west-1"
        }));
        assert!(check_payload(&schema("SECRET"), &data, SecretUsage::Secret).is_ok());
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let data = payload(json!({"aws_access_key_id": "AKIA", "aws_secret_access_key": "  "}));
        let err = check_payload(&schema("SECRET"), &data, SecretUsage::Secret).unwrap_err();
        assert!(matches!(err, SyncError::SecretValidation(msg) if msg.contains("aws_secret_access_key")));
    }

    #[test]
    fn test_usage_mismatch_rejected() {
        let data = payload(json!({"aws_access_key_id": "AKIA", "aws_secret_access_key": "x"}));
        let err = check_payload(&schema("SECRET"), &data, SecretUsage::TrustingSecret).unwrap_err();
        assert!(matches!(err, SyncError::SecretValidation(_)));
    }
}
