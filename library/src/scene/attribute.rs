//! Attribute values and attribute storage for scene nodes.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
#[serde(untagged)]
pub enum AttrValue {
    Boolean(bool),
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(String),
}

impl AttrValue {
    /// Numeric view of the value. Booleans read as 0/1, strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(n.into_inner()),
            AttrValue::Integer(i) => Some(*i as f64),
            AttrValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttrValue::String(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Boolean(b) => Some(*b),
            AttrValue::Integer(i) => Some(*i != 0),
            AttrValue::Number(n) => Some(n.into_inner() != 0.0),
            AttrValue::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(OrderedFloat(value))
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Integer(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Boolean(value)
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

/// A named attribute on a node.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
    /// Shows up for keying in the channel box.
    #[serde(default)]
    pub keyable: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

impl Attribute {
    /// A keyable, visible attribute, the way rig channels are exposed.
    pub fn keyable(name: &str, value: impl Into<AttrValue>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            keyable: true,
            hidden: false,
            min: None,
        }
    }

    /// A visible but non-keyable attribute.
    pub fn plain(name: &str, value: impl Into<AttrValue>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            keyable: false,
            hidden: false,
            min: None,
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_keyable_visible(&self) -> bool {
        self.keyable && !self.hidden
    }
}

/// Filter used when listing attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttrFilter {
    pub keyable_visible: bool,
}

impl AttrFilter {
    pub const ALL: AttrFilter = AttrFilter {
        keyable_visible: false,
    };
    pub const KEYABLE_VISIBLE: AttrFilter = AttrFilter {
        keyable_visible: true,
    };

    pub fn accepts(&self, attr: &Attribute) -> bool {
        !self.keyable_visible || attr.is_keyable_visible()
    }
}

/// Attributes of one node, kept in declaration order.
///
/// Order matters: the host lists attributes in the order they were added and
/// discovery walks aggregator inputs in that order.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(transparent)]
pub struct AttributeMap {
    attributes: Vec<Attribute>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts `attr`, returning `false` when an attribute of that name exists.
    pub fn insert(&mut self, attr: Attribute) -> bool {
        if self.contains(&attr.name) {
            return false;
        }
        self.attributes.push(attr);
        true
    }

    pub fn names(&self, filter: AttrFilter) -> Vec<String> {
        self.attributes
            .iter()
            .filter(|a| filter.accepts(a))
            .map(|a| a.name.clone())
            .collect()
    }
}
