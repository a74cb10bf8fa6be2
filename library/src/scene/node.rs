use serde::{Deserialize, Serialize};
use std::fmt;

use super::attribute::{AttrFilter, Attribute, AttributeMap};
use super::connection::NodeId;
use crate::color::UnitColor;

/// Node type tags, named after the host's type strings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Transform,
    Mesh,
    Locator,
    #[serde(rename = "animCurveTL")]
    AnimCurveTL,
    #[serde(rename = "animCurveTA")]
    AnimCurveTA,
    #[serde(rename = "animCurveTU")]
    AnimCurveTU,
    #[serde(rename = "animCurveUL")]
    AnimCurveUL,
    #[serde(rename = "animCurveUA")]
    AnimCurveUA,
    #[serde(rename = "animCurveUU")]
    AnimCurveUU,
    BlendWeighted,
    Constraint,
    UnitConversion,
    PolyColorMod,
    Expression,
    CreateColorSet,
    DeleteColorSet,
    PolyColorPerVertex,
    /// Any other host type, kept by name.
    #[serde(untagged)]
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Transform => "transform",
            NodeType::Mesh => "mesh",
            NodeType::Locator => "locator",
            NodeType::AnimCurveTL => "animCurveTL",
            NodeType::AnimCurveTA => "animCurveTA",
            NodeType::AnimCurveTU => "animCurveTU",
            NodeType::AnimCurveUL => "animCurveUL",
            NodeType::AnimCurveUA => "animCurveUA",
            NodeType::AnimCurveUU => "animCurveUU",
            NodeType::BlendWeighted => "blendWeighted",
            NodeType::Constraint => "constraint",
            NodeType::UnitConversion => "unitConversion",
            NodeType::PolyColorMod => "polyColorMod",
            NodeType::Expression => "expression",
            NodeType::CreateColorSet => "createColorSet",
            NodeType::DeleteColorSet => "deleteColorSet",
            NodeType::PolyColorPerVertex => "polyColorPerVertex",
            NodeType::Other(name) => name,
        }
    }

    pub fn is_anim_curve(&self) -> bool {
        self.is_time_curve() || self.is_driven_key_curve()
    }

    /// Curves keyed against time.
    pub fn is_time_curve(&self) -> bool {
        matches!(
            self,
            NodeType::AnimCurveTL | NodeType::AnimCurveTA | NodeType::AnimCurveTU
        )
    }

    /// Curves keyed against another attribute (set driven keys).
    pub fn is_driven_key_curve(&self) -> bool {
        matches!(
            self,
            NodeType::AnimCurveUL | NodeType::AnimCurveUA | NodeType::AnimCurveUU
        )
    }

    /// Shape nodes live under a transform.
    pub fn is_shape(&self) -> bool {
        matches!(self, NodeType::Mesh | NodeType::Locator)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named per-vertex color channel on a mesh.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct ColorSetData {
    pub name: String,
    #[serde(default)]
    pub colors: Vec<UnitColor>,
}

/// Geometry payload carried by mesh nodes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct MeshData {
    pub vertex_count: usize,
    #[serde(default)]
    pub color_sets: Vec<ColorSetData>,
    #[serde(default)]
    pub current_color_set: Option<String>,
}

impl MeshData {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            vertex_count,
            ..Default::default()
        }
    }

    pub fn color_set(&self, name: &str) -> Option<&ColorSetData> {
        self.color_sets.iter().find(|s| s.name == name)
    }

    pub fn color_set_mut(&mut self, name: &str) -> Option<&mut ColorSetData> {
        self.color_sets.iter_mut().find(|s| s.name == name)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SceneNode {
    pub id: NodeId,
    /// Unique name, possibly namespaced (`rig:CTRL_L_eye`).
    pub name: String,
    pub node_type: NodeType,
    /// DAG parent for shapes and nested transforms.
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh: Option<MeshData>,
}

impl SceneNode {
    pub fn new(id: NodeId, name: &str, node_type: NodeType) -> Self {
        let mesh = (node_type == NodeType::Mesh).then(MeshData::default);
        Self {
            id,
            name: name.to_string(),
            node_type,
            parent: None,
            attributes: AttributeMap::new(),
            mesh,
        }
    }

    pub fn add_attribute(&mut self, attr: Attribute) -> bool {
        self.attributes.insert(attr)
    }

    pub fn attribute_names(&self, filter: AttrFilter) -> Vec<String> {
        self.attributes.names(filter)
    }
}

/// Last `|`-separated element of a DAG path.
fn leaf_name(path: &str) -> &str {
    path.rsplit('|').next().unwrap_or(path)
}

/// Name with DAG path and namespace stripped (`|grp|rig:CTRL_L_eye` → `CTRL_L_eye`).
pub fn short_name(name: &str) -> &str {
    let leaf = leaf_name(name);
    leaf.rsplit(':').next().unwrap_or(leaf)
}
