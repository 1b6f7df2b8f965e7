//! Declarative schema validation for tool arguments.
//!
//! The registry validates every call against the schema the adapter
//! declared at registration time: required properties, primitive
//! types, enumerations, and numeric bounds. Adapters with stronger
//! requirements layer their own `validate` on top.

use relay0::tool::{PropKind, PropertySchema, ToolSchema};
use serde_json::Value;

/// A schema rejection: a human message naming the offending property
/// plus structured detail for the error payload.
#[derive(Debug, Clone)]
pub struct SchemaViolation {
    /// Human-readable rejection reason.
    pub message: String,
    /// Structured detail (property name, expected/actual).
    pub details: Value,
}

impl SchemaViolation {
    fn new(property: &str, message: String, expected: &str, actual: &Value) -> Self {
        Self {
            message,
            details: serde_json::json!({
                "property": property,
                "expected": expected,
                "actual": actual,
            }),
        }
    }
}

/// Validate arguments against a declared schema. Returns the first
/// violation found, properties in declaration order.
pub fn validate_args(schema: &ToolSchema, args: &Value) -> Result<(), SchemaViolation> {
    let Some(object) = args.as_object() else {
        return Err(SchemaViolation {
            message: "arguments must be an object".to_owned(),
            details: serde_json::json!({"expected": "object", "actual": args}),
        });
    };

    for required in &schema.required {
        if !object.contains_key(required) {
            return Err(SchemaViolation::new(
                required,
                format!("missing required property: {required}"),
                "present",
                &Value::Null,
            ));
        }
    }

    for (name, prop) in &schema.properties {
        let Some(value) = object.get(name) else {
            continue;
        };
        check_property(name, prop, value)?;
    }

    Ok(())
}

fn check_property(
    name: &str,
    prop: &PropertySchema,
    value: &Value,
) -> Result<(), SchemaViolation> {
    let matches_kind = match prop.kind {
        PropKind::String => value.is_string(),
        PropKind::Integer => value.is_i64() || value.is_u64(),
        PropKind::Number => value.is_number(),
        PropKind::Boolean => value.is_boolean(),
        PropKind::Array => value.is_array(),
        PropKind::Object => value.is_object(),
        _ => false,
    };
    if !matches_kind {
        return Err(SchemaViolation::new(
            name,
            format!("property {name} must be of type {}", prop.kind.as_str()),
            prop.kind.as_str(),
            value,
        ));
    }

    if let Some(allowed) = &prop.one_of {
        if !allowed.contains(value) {
            return Err(SchemaViolation::new(
                name,
                format!("property {name} must be one of the allowed values"),
                "enumerated value",
                value,
            ));
        }
    }

    if let Some(number) = value.as_f64() {
        if let Some(min) = prop.minimum {
            if number < min {
                return Err(SchemaViolation::new(
                    name,
                    format!("property {name} must be >= {min}"),
                    &format!(">= {min}"),
                    value,
                ));
            }
        }
        if let Some(max) = prop.maximum {
            if number > max {
                return Err(SchemaViolation::new(
                    name,
                    format!("property {name} must be <= {max}"),
                    &format!("<= {max}"),
                    value,
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay0::tool::PropertySchema;
    use serde_json::json;

    fn schema() -> ToolSchema {
        ToolSchema::new()
            .property("query", PropertySchema::string("search text"))
            .property(
                "limit",
                PropertySchema::integer("max results").range(Some(1.0), Some(50.0)),
            )
            .property(
                "kind",
                PropertySchema::string("entry kind")
                    .one_of(vec![json!("function"), json!("class")]),
            )
            .required(["query"])
    }

    #[test]
    fn accepts_valid_args() {
        let args = json!({"query": "ranking", "limit": 10, "kind": "function"});
        assert!(validate_args(&schema(), &args).is_ok());
    }

    #[test]
    fn rejects_non_object_args() {
        let violation = validate_args(&schema(), &json!("query")).unwrap_err();
        assert!(violation.message.contains("object"));
    }

    #[test]
    fn rejects_missing_required() {
        let violation = validate_args(&schema(), &json!({"limit": 3})).unwrap_err();
        assert!(violation.message.contains("query"));
        assert_eq!(violation.details["property"], "query");
    }

    #[test]
    fn rejects_wrong_type() {
        let violation =
            validate_args(&schema(), &json!({"query": 42})).unwrap_err();
        assert!(violation.message.contains("query"));
        assert!(violation.message.contains("string"));
    }

    #[test]
    fn rejects_float_for_integer() {
        let violation =
            validate_args(&schema(), &json!({"query": "x", "limit": 2.5})).unwrap_err();
        assert!(violation.message.contains("limit"));
    }

    #[test]
    fn rejects_out_of_range() {
        let violation =
            validate_args(&schema(), &json!({"query": "x", "limit": 99})).unwrap_err();
        assert!(violation.message.contains("<= 50"));
    }

    #[test]
    fn rejects_value_outside_enumeration() {
        let violation =
            validate_args(&schema(), &json!({"query": "x", "kind": "module"})).unwrap_err();
        assert!(violation.message.contains("kind"));
    }

    #[test]
    fn unknown_properties_pass_through() {
        let args = json!({"query": "x", "extra": true});
        assert!(validate_args(&schema(), &args).is_ok());
    }
}
