// Label schema registry and attribute value normalization.
// The schema itself is owned by the host application; this is a read-only view of it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::types::{AttributeId, LabelId};

/// Widget type of an attribute. Decides how raw values are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Checkbox,
    Radio,
    Number,
    Text,
    Select,
}

/// Attribute schema entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub id: AttributeId,
    pub name: String,
    pub input_type: InputType,
    /// Mutable attributes change per keyframe; immutable ones hold for the whole shape.
    #[serde(default)]
    pub mutable: bool,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl AttributeSpec {
    /// Explicit default, else the first declared value, else the type's zero value.
    pub fn default_value(&self) -> AttributeValue {
        self.default_value
            .as_ref()
            .or_else(|| self.values.first())
            .and_then(|raw| self.normalize(RawValue::Text(raw.clone())).ok())
            .unwrap_or_else(|| match self.input_type {
                InputType::Checkbox => AttributeValue::Bool(false),
                InputType::Number => AttributeValue::Number(0.0),
                _ => AttributeValue::Text(String::new()),
            })
    }

    /// Coerce a raw value into this attribute's type.
    pub fn normalize(&self, raw: RawValue) -> Result<AttributeValue> {
        let invalid = |raw: &RawValue| AnnotationError::InvalidAttributeValue {
            attribute: self.id,
            value: raw.to_string(),
        };

        match self.input_type {
            InputType::Checkbox => match &raw {
                RawValue::Bool(b) => Ok(AttributeValue::Bool(*b)),
                RawValue::Number(n) => Ok(AttributeValue::Bool(*n != 0.0)),
                RawValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(AttributeValue::Bool(true)),
                    "false" => Ok(AttributeValue::Bool(false)),
                    _ => Err(invalid(&raw)),
                },
            },
            InputType::Number => match &raw {
                RawValue::Number(n) => Ok(AttributeValue::Number(*n)),
                RawValue::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(AttributeValue::Number)
                    .map_err(|_| invalid(&raw)),
                RawValue::Bool(_) => Err(invalid(&raw)),
            },
            InputType::Radio | InputType::Select => {
                let text = raw.to_string();
                if !self.values.is_empty() && !self.values.contains(&text) {
                    return Err(invalid(&raw));
                }
                Ok(AttributeValue::Text(text))
            }
            InputType::Text => Ok(AttributeValue::Text(raw.to_string())),
        }
    }
}

/// Label schema entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub id: LabelId,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
}

/// Normalized attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    /// Export form: numbers and booleans are stringified.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => f.write_str(s),
        }
    }
}

/// Attribute value as found in a payload, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

/// Label registry: label id -> attribute schemas.
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    labels: BTreeMap<LabelId, LabelSpec>,
    attributes: BTreeMap<AttributeId, AttributeSpec>,
}

impl LabelRegistry {
    pub fn new(labels: Vec<LabelSpec>) -> Result<Self> {
        let mut registry = LabelRegistry::default();

        for label in labels {
            for attr in &label.attributes {
                if registry.attributes.insert(attr.id, attr.clone()).is_some() {
                    return Err(AnnotationError::InvalidConfig(format!(
                        "duplicate attribute id {}",
                        attr.id
                    )));
                }
            }
            let id = label.id;
            if registry.labels.insert(id, label).is_some() {
                return Err(AnnotationError::InvalidConfig(format!(
                    "duplicate label id {}",
                    id
                )));
            }
        }

        Ok(registry)
    }

    pub fn contains_label(&self, label: LabelId) -> bool {
        self.labels.contains_key(&label)
    }

    pub fn label(&self, label: LabelId) -> Result<&LabelSpec> {
        self.labels
            .get(&label)
            .ok_or(AnnotationError::UnknownLabel(label))
    }

    pub fn label_attributes(&self, label: LabelId) -> Result<&[AttributeSpec]> {
        self.label(label).map(|l| l.attributes.as_slice())
    }

    pub fn attr_info(&self, attr: AttributeId) -> Result<&AttributeSpec> {
        self.attributes
            .get(&attr)
            .ok_or(AnnotationError::UnknownAttribute(attr))
    }

    pub fn normalize(&self, attr: AttributeId, raw: RawValue) -> Result<AttributeValue> {
        self.attr_info(attr)?.normalize(raw)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn defaults_come_from_first_value() {
        let registry = registry();
        assert_eq!(
            registry.attr_info(CAR_MODEL).unwrap().default_value(),
            AttributeValue::Text("sedan".into())
        );
        assert_eq!(
            registry.attr_info(CAR_PARKED).unwrap().default_value(),
            AttributeValue::Bool(false)
        );
        assert_eq!(
            registry.attr_info(CAR_SPEED).unwrap().default_value(),
            AttributeValue::Number(0.0)
        );
    }

    #[test]
    fn normalizes_raw_values() {
        let registry = registry();
        assert_eq!(
            registry.normalize(CAR_PARKED, "TRUE".into()).unwrap(),
            AttributeValue::Bool(true)
        );
        assert_eq!(
            registry.normalize(CAR_SPEED, "42.5".into()).unwrap(),
            AttributeValue::Number(42.5)
        );
        assert!(registry.normalize(CAR_SPEED, true.into()).is_err());
        assert!(registry.normalize(CAR_MODEL, "bicycle".into()).is_err());
    }

    #[test]
    fn numbers_export_as_strings() {
        assert_eq!(AttributeValue::Number(12.0).to_string(), "12");
        assert_eq!(AttributeValue::Number(12.5).to_string(), "12.5");
        assert_eq!(AttributeValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn unknown_label_is_reported() {
        let registry = registry();
        assert_eq!(
            registry.label_attributes(99).unwrap_err(),
            AnnotationError::UnknownLabel(99)
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut labels = labels();
        labels.push(labels[0].clone());
        assert!(matches!(
            LabelRegistry::new(labels),
            Err(AnnotationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn raw_values_deserialize_untagged() {
        let values: Vec<RawValue> = serde_json::from_str(r#"["a", 3, false]"#).unwrap();
        assert_eq!(
            values,
            vec![RawValue::Text("a".into()), RawValue::Number(3.0), RawValue::Bool(false)]
        );
    }
}
