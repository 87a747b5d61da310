//! Field definitions and the values submitted for them at signing time

use crate::geometry::{PdfPoints, Percent, Rect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Signature,
    Text,
    Image,
    Date,
    Radio,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Signature,
        FieldType::Text,
        FieldType::Image,
        FieldType::Date,
        FieldType::Radio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Signature => "signature",
            FieldType::Text => "text",
            FieldType::Image => "image",
            FieldType::Date => "date",
            FieldType::Radio => "radio",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signature" => Ok(FieldType::Signature),
            "text" => Ok(FieldType::Text),
            "image" => Ok(FieldType::Image),
            "date" => Ok(FieldType::Date),
            "radio" => Ok(FieldType::Radio),
            other => Err(format!("Unknown field type: {}", other)),
        }
    }
}

/// A field placed on a document page, stored in percent space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: String,
    pub document_id: String,
    pub field_type: FieldType,
    /// 1-based
    pub page_number: u32,
    pub x_percent: f64,
    /// Measured from the bottom of the page
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    pub created_at: DateTime<Utc>,
}

impl FieldDefinition {
    pub fn rect(&self) -> Rect<Percent> {
        Rect::new(
            self.x_percent,
            self.y_percent,
            self.width_percent,
            self.height_percent,
        )
    }
}

/// A field as submitted by the editor when replacing a page's fields.
///
/// Positions may overflow the page (x + width > 100); only non-positive
/// sizes and non-finite numbers are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewField {
    pub field_type: FieldType,
    pub x_percent: f64,
    pub y_percent: f64,
    pub width_percent: f64,
    pub height_percent: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
}

impl NewField {
    pub fn rect(&self) -> Rect<Percent> {
        Rect::new(
            self.x_percent,
            self.y_percent,
            self.width_percent,
            self.height_percent,
        )
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.rect().is_finite() {
            return Err("Field position must be finite");
        }
        if self.width_percent <= 0.0 {
            return Err("Field width must be positive");
        }
        if self.height_percent <= 0.0 {
            return Err("Field height must be positive");
        }
        Ok(())
    }
}

/// Value submitted for a field: either a string payload or a flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Flag(bool),
    Text(String),
}

impl From<&str> for SubmittedValue {
    fn from(value: &str) -> Self {
        SubmittedValue::Text(value.to_string())
    }
}

impl From<bool> for SubmittedValue {
    fn from(value: bool) -> Self {
        SubmittedValue::Flag(value)
    }
}

/// A value to rasterize, positioned in PDF points on a 1-based page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(alias = "type", alias = "fieldType")]
    pub field_type: FieldType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub page: u32,
    #[serde(default)]
    pub value: Option<SubmittedValue>,
}

impl FieldValue {
    pub fn new(
        field_type: FieldType,
        rect: Rect<PdfPoints>,
        page: u32,
        value: Option<SubmittedValue>,
    ) -> Self {
        Self {
            field_type,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            page,
            value,
        }
    }

    pub fn rect(&self) -> Rect<PdfPoints> {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_type_parses_case_insensitive() {
        assert_eq!("Signature".parse::<FieldType>(), Ok(FieldType::Signature));
        assert_eq!("RADIO".parse::<FieldType>(), Ok(FieldType::Radio));
        assert!("checkbox".parse::<FieldType>().is_err());
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>(), Ok(ty));
        }
    }

    #[test]
    fn test_submitted_value_untagged() {
        let v: SubmittedValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, SubmittedValue::Flag(true));
        let v: SubmittedValue = serde_json::from_str("\"true\"").unwrap();
        assert_eq!(v, SubmittedValue::Text("true".to_string()));
    }

    #[test]
    fn test_field_value_accepts_type_alias() {
        let json = r#"{"type":"text","x":1,"y":2,"width":3,"height":4,"page":1,"value":"hi"}"#;
        let value: FieldValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.field_type, FieldType::Text);
        assert_eq!(value.value, Some(SubmittedValue::Text("hi".to_string())));
    }

    #[test]
    fn test_field_value_missing_value_is_none() {
        let json = r#"{"field_type":"radio","x":1,"y":2,"width":3,"height":4,"page":2}"#;
        let value: FieldValue = serde_json::from_str(json).unwrap();
        assert_eq!(value.value, None);
        assert_eq!(value.page, 2);
    }

    #[test]
    fn test_new_field_validation() {
        let mut field = NewField {
            field_type: FieldType::Text,
            x_percent: 95.0,
            y_percent: 10.0,
            width_percent: 20.0,
            height_percent: 5.0,
            label: "Name".to_string(),
            required: true,
        };
        // Overflowing the right edge is allowed
        assert!(field.validate().is_ok());

        field.width_percent = 0.0;
        assert_eq!(field.validate(), Err("Field width must be positive"));

        field.width_percent = 10.0;
        field.y_percent = f64::INFINITY;
        assert_eq!(field.validate(), Err("Field position must be finite"));
    }
}
