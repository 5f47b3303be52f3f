//! JSON Schema validation for tool arguments

use anyhow::{bail, Result};
use serde_json::Value;

/// Validate tool arguments against the tool's input schema
pub fn validate_input(input: &Value, schema: &Value) -> Result<()> {
    if schema.is_null() {
        return Ok(()); // No schema = no validation
    }

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| anyhow::anyhow!("Invalid JSON schema: {e}"))?;

    if let Err(error) = validator.validate(input) {
        bail!("Input validation failed: {}", error);
    }

    Ok(())
}

/// Arguments as an object; absent arguments are an empty object
pub fn normalize_arguments(arguments: Option<Value>) -> Value {
    match arguments {
        None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
        Some(value) => value,
    }
}
