//! Values that flow through the pipeline's memory slot.

use crate::dom::element::{Element, ElementSequence};
use crate::errors::{AgentError, Result};
use crate::types::{new_id, EntityMeta};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Anything an action can produce or consume.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Id(IdData),
    Element(Element),
    Elements(ElementSequence),
    Record(Record),
    List(Vec<Data>),
    Value(Value),
}

/// Result of `GenerateId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdData {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub value: String,
}

impl IdData {
    pub const TYPE_ID: &'static str = "id_data";

    pub fn generate() -> Self {
        Self {
            meta: EntityMeta::new(),
            value: new_id(),
        }
    }
}

/// A typed output record rebuilt from a transform's schema and value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub meta: EntityMeta,
    pub type_id: String,
    pub fields: BTreeMap<String, Data>,
}

impl Record {
    /// Keys written alongside `id` from the record's own metadata; a field
    /// with one of these names would be shadowed on disk.
    pub const METADATA_FIELDS: [&'static str; 3] = ["type_id", "created_at", "updated_at"];

    pub fn new(type_id: impl Into<String>, fields: BTreeMap<String, Data>) -> Self {
        Self {
            meta: EntityMeta::new(),
            type_id: type_id.into(),
            fields,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.meta.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn get(&self, field: &str) -> Option<&Data> {
        self.fields.get(field)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 4))?;
        map.serialize_entry("id", &self.meta.id)?;
        map.serialize_entry("type_id", &self.type_id)?;
        map.serialize_entry("created_at", &self.meta.created_at)?;
        map.serialize_entry("updated_at", &self.meta.updated_at)?;
        for (name, value) in &self.fields {
            if name != "id" && !Self::METADATA_FIELDS.contains(&name.as_str()) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

impl Serialize for Data {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Data::Id(id) => id.serialize(serializer),
            Data::Element(element) => element.serialize(serializer),
            Data::Elements(elements) => elements.serialize(serializer),
            Data::Record(record) => record.serialize(serializer),
            Data::List(items) => items.serialize(serializer),
            Data::Value(value) => value.serialize(serializer),
        }
    }
}

impl From<Element> for Data {
    fn from(element: Element) -> Self {
        Data::Element(element)
    }
}

impl From<ElementSequence> for Data {
    fn from(elements: ElementSequence) -> Self {
        Data::Elements(elements)
    }
}

impl From<Record> for Data {
    fn from(record: Record) -> Self {
        Data::Record(record)
    }
}

impl From<IdData> for Data {
    fn from(id: IdData) -> Self {
        Data::Id(id)
    }
}

impl Data {
    pub fn type_id(&self) -> &str {
        match self {
            Data::Id(_) => IdData::TYPE_ID,
            Data::Element(_) => Element::TYPE_ID,
            Data::Elements(_) => ElementSequence::TYPE_ID,
            Data::Record(record) => record.type_id.as_str(),
            Data::List(_) => "list",
            Data::Value(_) => "value",
        }
    }

    /// `(type_id, id)` for values that can be persisted on their own.
    pub fn identity(&self) -> Option<(&str, &str)> {
        match self {
            Data::Id(id) => Some((IdData::TYPE_ID, id.meta.id.as_str())),
            Data::Element(element) => Some((Element::TYPE_ID, element.meta.id.as_str())),
            Data::Elements(elements) => Some((ElementSequence::TYPE_ID, elements.meta.id.as_str())),
            Data::Record(record) => Some((record.type_id.as_str(), record.meta.id.as_str())),
            Data::List(_) | Data::Value(_) => None,
        }
    }

    /// Named attribute of this value, as `getattr` would see it.
    pub fn attribute(&self, name: &str) -> Result<Data> {
        let found = match self {
            Data::Record(record) => match record.fields.get(name) {
                Some(value) => Some(value.clone()),
                None => match name {
                    "id" => Some(Data::Value(json!(record.meta.id))),
                    "type_id" => Some(Data::Value(json!(record.type_id))),
                    _ => None,
                },
            },
            Data::Element(element) => match name {
                "id" => Some(Data::Value(json!(element.meta.id))),
                "url" => Some(Data::Value(json!(element.url.as_str()))),
                "html_source" => Some(Data::Value(json!(element.html_source.as_str()))),
                "tag_name" => Some(Data::Value(json!(element.tag_name()))),
                "classes" => Some(Data::Value(json!(element.classes()))),
                "text" => Some(Data::Value(json!(element.text()))),
                "location" => element
                    .location
                    .map(|location| Data::Value(json!(location))),
                _ => None,
            },
            Data::Elements(elements) => match name {
                "id" => Some(Data::Value(json!(elements.meta.id))),
                "elements" => Some(Data::List(
                    elements.elements.iter().cloned().map(Data::Element).collect(),
                )),
                _ => None,
            },
            Data::Id(id) => match name {
                "id" => Some(Data::Value(json!(id.meta.id))),
                "value" => Some(Data::Value(json!(id.value))),
                _ => None,
            },
            Data::Value(Value::Object(map)) => map.get(name).cloned().map(Data::Value),
            Data::Value(_) | Data::List(_) => None,
        };

        found.ok_or_else(|| AgentError::MissingAttribute {
            type_id: self.type_id().to_string(),
            attribute: name.to_string(),
        })
    }

    /// Items of a collection value, in collection order.
    pub fn into_items(self) -> Result<Vec<Data>> {
        match self {
            Data::List(items) => Ok(items),
            Data::Elements(elements) => Ok(elements.elements.into_iter().map(Data::Element).collect()),
            Data::Value(Value::Array(items)) => Ok(items.into_iter().map(Data::Value).collect()),
            other => Err(AgentError::unsupported(format!(
                "cannot expand a value of type '{}'",
                other.type_id()
            ))),
        }
    }

    /// JSON handed to user transforms.
    pub fn to_transport(&self) -> Result<Value> {
        match self {
            Data::Element(element) => element.to_transport(),
            Data::Elements(elements) => elements.to_transport(),
            Data::List(items) => Ok(Value::Array(
                items.iter().map(Data::to_transport).collect::<Result<_>>()?,
            )),
            Data::Record(record) => {
                let mut map = serde_json::Map::new();
                map.insert("id".to_string(), json!(record.meta.id));
                map.insert("type_id".to_string(), json!(record.type_id));
                for (name, value) in &record.fields {
                    map.insert(name.clone(), value.to_transport()?);
                }
                Ok(Value::Object(map))
            }
            Data::Id(id) => {
                let mut value = serde_json::to_value(id)?;
                if let Value::Object(map) = &mut value {
                    map.insert("type_id".to_string(), json!(IdData::TYPE_ID));
                }
                Ok(value)
            }
            Data::Value(value) => Ok(value.clone()),
        }
    }
}
