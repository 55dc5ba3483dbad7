//! Rebuilding typed records from a transform's JSON schema.
//!
//! The schema is read once per transform call and the value is checked
//! against it; objects become [`Record`]s named after the schema `title`,
//! arrays become lists, and scalars are kept as JSON values of the declared
//! kind. `$defs`/`$ref` are followed so schemas emitted by pydantic models
//! work too.

use crate::data::{Data, Record};
use crate::errors::{AgentError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

const DEFAULT_TITLE: &str = "Record";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<SchemaKind>,
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub items: Option<Box<Schema>>,
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
    #[serde(rename = "$defs", default)]
    pub definitions: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl Schema {
    pub fn parse(source: &str) -> Result<Self> {
        serde_json::from_str(source)
            .map_err(|e| AgentError::transform("transform emitted an unreadable schema", e.to_string()))
    }

    /// Check `value` against this schema and turn it into pipeline data.
    pub fn build(&self, value: Value) -> Result<Data> {
        self.build_at(value, &self.definitions, "$")
    }

    fn build_at(&self, value: Value, defs: &BTreeMap<String, Schema>, path: &str) -> Result<Data> {
        if let Some(reference) = &self.reference {
            let name = reference.strip_prefix("#/$defs/").unwrap_or(reference);
            let target = defs.get(name).ok_or_else(|| {
                AgentError::transform("schema reference cannot be resolved", reference.clone())
            })?;
            return target.build_at(value, defs, path);
        }

        match self.kind {
            Some(SchemaKind::Object) => self.build_record(value, defs, path),
            Some(SchemaKind::Array) => match value {
                Value::Array(items) => {
                    let mut built = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let item_path = format!("{}[{}]", path, index);
                        built.push(match &self.items {
                            Some(schema) => schema.build_at(item, defs, &item_path)?,
                            None => Data::Value(item),
                        });
                    }
                    Ok(Data::List(built))
                }
                other => Err(mismatch(path, "array", &other)),
            },
            Some(kind) => {
                let matches = match kind {
                    SchemaKind::String => value.is_string(),
                    SchemaKind::Integer => value.is_i64() || value.is_u64(),
                    SchemaKind::Number => value.is_number(),
                    SchemaKind::Boolean => value.is_boolean(),
                    SchemaKind::Null => value.is_null(),
                    SchemaKind::Object | SchemaKind::Array => false,
                };
                if matches {
                    Ok(Data::Value(value))
                } else {
                    Err(mismatch(path, kind_name(kind), &value))
                }
            }
            None => Ok(Data::Value(value)),
        }
    }

    fn build_record(&self, value: Value, defs: &BTreeMap<String, Schema>, path: &str) -> Result<Data> {
        let object = match value {
            Value::Object(object) => object,
            other => return Err(mismatch(path, "object", &other)),
        };

        if let Some(missing) = self.required.iter().find(|name| !object.contains_key(*name)) {
            return Err(AgentError::transform(
                "transform output does not match its schema",
                format!("{}: missing required field '{}'", path, missing),
            ));
        }

        let mut id = None;
        let mut fields = BTreeMap::new();
        for (name, field) in object {
            let field_path = format!("{}.{}", path, name);
            if name == "id" {
                id = Some(match field {
                    Value::String(value) => value,
                    Value::Number(value) => value.to_string(),
                    other => {
                        return Err(AgentError::transform(
                            "transform output has an unusable id",
                            format!("{}: expected string or number, found {}", field_path, other),
                        ))
                    }
                });
                continue;
            }
            if Record::METADATA_FIELDS.contains(&name.as_str()) {
                return Err(AgentError::transform(
                    "transform output collides with record metadata",
                    format!("{}: '{}' is reserved", field_path, name),
                ));
            }
            let built = match self.properties.get(&name) {
                Some(schema) => schema.build_at(field, defs, &field_path)?,
                None => Data::Value(field),
            };
            fields.insert(name, built);
        }

        let title = self.title.as_deref().unwrap_or(DEFAULT_TITLE);
        let record = Record::new(title, fields);
        Ok(Data::Record(match id {
            Some(id) => record.with_id(id),
            None => record,
        }))
    }
}

fn kind_name(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Object => "object",
        SchemaKind::Array => "array",
        SchemaKind::String => "string",
        SchemaKind::Integer => "integer",
        SchemaKind::Number => "number",
        SchemaKind::Boolean => "boolean",
        SchemaKind::Null => "null",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> AgentError {
    AgentError::transform(
        "transform output does not match its schema",
        format!("{}: expected {}, found {}", path, expected, found),
    )
}

/// Split subprocess stdout into `(schema, value)`; anything but exactly two
/// JSON lines is rejected.
pub fn parse_transform_output(stdout: &str) -> Result<(Schema, Value)> {
    let lines: Vec<&str> = stdout.lines().collect();
    let [schema_line, value_line] = lines.as_slice() else {
        return Err(AgentError::transform(
            format!("transform printed {} line(s), expected 2", lines.len()),
            stdout.to_string(),
        ));
    };

    let schema = Schema::parse(schema_line)?;
    let value = serde_json::from_str(value_line)
        .map_err(|e| AgentError::transform("transform emitted an unreadable value", e.to_string()))?;
    Ok((schema, value))
}
