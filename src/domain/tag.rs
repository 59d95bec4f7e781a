use serde::{Deserialize, Serialize};
use std::fmt;

/// An OSM attribute value as it appears on a road edge.
///
/// Raw OSM tags are strings, but merged edges carry lists of the distinct
/// values they were built from, and numeric values may come from other
/// sources. Serialized untagged, so `Absent` is `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    #[default]
    Absent,
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl TagValue {
    /// Wrap an optional raw tag.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) => TagValue::Text(t.to_string()),
            None => TagValue::Absent,
        }
    }

    /// Combine the values of several edges into one.
    ///
    /// Absent values are ignored. A single distinct value is kept as is;
    /// several distinct values become a `List` in first-seen order.
    pub fn merge<'a>(values: impl IntoIterator<Item = &'a TagValue>) -> TagValue {
        let mut distinct: Vec<TagValue> = Vec::new();
        let mut push = |value: TagValue| {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        };

        for value in values {
            match value {
                TagValue::Absent => {}
                TagValue::List(items) => {
                    for item in items {
                        push(TagValue::Text(item.clone()));
                    }
                }
                scalar => push(scalar.clone()),
            }
        }

        match distinct.len() {
            0 => TagValue::Absent,
            1 => distinct.remove(0),
            _ => TagValue::List(distinct.iter().map(|v| v.to_string()).collect()),
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Absent => Ok(()),
            TagValue::Number(n) => write!(f, "{}", n),
            TagValue::Text(s) => write!(f, "{}", s),
            TagValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}
