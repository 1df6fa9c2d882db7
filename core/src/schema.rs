//! Derives the input schema a tool advertises to the model from the Rust type
//! its `execute` decodes into.

use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use serde_json::{Map, Value, json};

/// Build a fully inlined object schema for `T`.
///
/// Field doc comments become `description`s, `Option` fields are left out of
/// `required` without widening their type to `null`, and undeclared properties
/// are rejected.
pub fn generate_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.option_nullable = false;
        s.option_add_null_type = false;
    });
    let root = settings.into_generator().into_root_schema_for::<T>();

    let mut schema = match serde_json::to_value(root) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    schema.remove("$schema");
    schema.remove("title");
    schema.remove("definitions");
    schema.insert("type".to_string(), json!("object"));
    schema
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    schema.insert("additionalProperties".to_string(), Value::Bool(false));

    Value::Object(schema)
}
