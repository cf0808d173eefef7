pub mod serialization;

use crate::color::Color;
use glam::Vec3;

pub const MIN_ROOM_DIMENSION: f32 = 100.0;
pub const MAX_ROOM_DIMENSION: f32 = 1000.0;

/// Centimeter vector as carried by furniture records.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveShape {
    Cube,
    Rectangular,
}

impl PrimitiveShape {
    pub fn default_dimensions(self) -> Vector3 {
        match self {
            Self::Cube => Vector3::new(80.0, 80.0, 80.0),
            Self::Rectangular => Vector3::new(120.0, 60.0, 80.0),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cube => "Куб",
            Self::Rectangular => "Параллелепипед",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Rectangular => "rectangular",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FurnitureKind {
    Primitive(PrimitiveShape),
    /// Key into the model catalog. Unknown keys render as a plain box.
    CatalogModel(String),
}

impl FurnitureKind {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "FurnitureRecord", into = "FurnitureRecord")]
pub struct Furniture {
    pub id: String,
    pub name: String,
    pub kind: FurnitureKind,
    /// Corner nearest the room origin, at floor level for primitives.
    pub position: Vector3,
    /// Width (x), height (y), depth (z).
    pub dimensions: Vector3,
    pub color: Color,
    /// Yaw in degrees.
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Room {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
    #[serde(default)]
    pub furniture: Vec<Furniture>,
}

/// Wire shape of a furniture item: `type` plus `modelType` for catalog models.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct FurnitureRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model_type: Option<String>,
    position: Vector3,
    dimensions: Vector3,
    color: Color,
    #[serde(default)]
    rotation: f32,
}

impl TryFrom<FurnitureRecord> for Furniture {
    type Error = String;

    fn try_from(record: FurnitureRecord) -> Result<Self, Self::Error> {
        let kind = match (record.kind.as_str(), record.model_type) {
            ("cube", _) => FurnitureKind::Primitive(PrimitiveShape::Cube),
            ("rectangular", _) => FurnitureKind::Primitive(PrimitiveShape::Rectangular),
            ("model", Some(key)) => FurnitureKind::CatalogModel(key),
            ("model", None) => {
                return Err(format!("furniture {:?} has type model but no modelType", record.id))
            }
            (other, _) => return Err(format!("unknown furniture type {other:?}")),
        };
        Ok(Self {
            id: record.id,
            name: record.name,
            kind,
            position: record.position,
            dimensions: record.dimensions,
            color: record.color,
            rotation: record.rotation,
        })
    }
}

impl From<Furniture> for FurnitureRecord {
    fn from(furniture: Furniture) -> Self {
        let (kind, model_type) = match furniture.kind {
            FurnitureKind::Primitive(shape) => (shape.tag().to_string(), None),
            FurnitureKind::CatalogModel(key) => ("model".to_string(), Some(key)),
        };
        Self {
            id: furniture.id,
            name: furniture.name,
            kind,
            model_type,
            position: furniture.position,
            dimensions: furniture.dimensions,
            color: furniture.color,
            rotation: furniture.rotation,
        }
    }
}

/// Room dimensions without the furniture list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomDimensions {
    pub width: f32,
    pub depth: f32,
    pub height: f32,
}

impl RoomDimensions {
    pub const fn new(width: f32, depth: f32, height: f32) -> Self {
        Self {
            width,
            depth,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.width, self.depth, self.height]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    pub fn clamped(&self) -> Self {
        Self::new(
            clamp_dimension(self.width),
            clamp_dimension(self.depth),
            clamp_dimension(self.height),
        )
    }

    /// Volumetric center of the room.
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.width / 2.0, self.height / 2.0, self.depth / 2.0)
    }
}

pub fn clamp_dimension(value: f32) -> f32 {
    if value.is_nan() {
        return MIN_ROOM_DIMENSION;
    }
    value.clamp(MIN_ROOM_DIMENSION, MAX_ROOM_DIMENSION)
}

impl Room {
    pub fn empty(dimensions: RoomDimensions) -> Self {
        Self {
            width: dimensions.width,
            depth: dimensions.depth,
            height: dimensions.height,
            furniture: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> RoomDimensions {
        RoomDimensions::new(self.width, self.depth, self.height)
    }

    pub fn find(&self, id: &str) -> Option<&Furniture> {
        self.furniture.iter().find(|item| item.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Furniture> {
        self.furniture.iter_mut().find(|item| item.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// The starter room: a sofa, a table, an air conditioner and a chair.
    pub fn initial() -> Self {
        Self {
            width: 800.0,
            depth: 600.0,
            height: 280.0,
            furniture: vec![
                Furniture {
                    id: "1".to_string(),
                    name: "Диван".to_string(),
                    kind: FurnitureKind::Primitive(PrimitiveShape::Rectangular),
                    position: Vector3::new(100.0, 0.0, 100.0),
                    dimensions: Vector3::new(200.0, 80.0, 80.0),
                    color: Color::from_u32(0x8b4513),
                    rotation: 45.0,
                },
                Furniture {
                    id: "2".to_string(),
                    name: "Стол".to_string(),
                    kind: FurnitureKind::Primitive(PrimitiveShape::Cube),
                    position: Vector3::new(400.0, 0.0, 300.0),
                    dimensions: Vector3::new(100.0, 75.0, 100.0),
                    color: Color::from_u32(0xd2691e),
                    rotation: 0.0,
                },
                Furniture {
                    id: "3".to_string(),
                    name: "Кондиционер".to_string(),
                    kind: FurnitureKind::CatalogModel("conditioner".to_string()),
                    position: Vector3::new(650.0, 180.0, 50.0),
                    dimensions: Vector3::new(90.0, 30.0, 40.0),
                    color: Color::from_u32(0xd3d3d3),
                    rotation: 0.0,
                },
                Furniture {
                    id: "4".to_string(),
                    name: "Стул".to_string(),
                    kind: FurnitureKind::CatalogModel("chair".to_string()),
                    position: Vector3::new(350.0, 0.0, 400.0),
                    dimensions: Vector3::new(55.0, 50.0, 55.0),
                    color: Color::from_u32(0x9b8c75),
                    rotation: 180.0,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn furniture_uses_type_tag_on_the_wire() {
        let json = r##"{
            "id": "3",
            "name": "AC",
            "type": "model",
            "modelType": "conditioner",
            "position": {"x": 650, "y": 180, "z": 50},
            "dimensions": {"x": 90, "y": 30, "z": 40},
            "color": "#D3D3D3",
            "rotation": 0
        }"##;
        let item: Furniture = serde_json::from_str(json).unwrap();
        assert_eq!(item.kind, FurnitureKind::CatalogModel("conditioner".into()));
        assert_eq!(item.color, Color::from_u32(0xd3d3d3));

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["type"], "model");
        assert_eq!(back["modelType"], "conditioner");
    }

    #[test]
    fn primitive_records_omit_model_type() {
        let room = Room::initial();
        let value = serde_json::to_value(&room.furniture[0]).unwrap();
        assert_eq!(value["type"], "rectangular");
        assert!(value.get("modelType").is_none());
    }

    #[test]
    fn model_without_key_is_rejected() {
        let json = r##"{"id":"x","name":"x","type":"model","position":{"x":0,"y":0,"z":0},
            "dimensions":{"x":1,"y":1,"z":1},"color":"#000000","rotation":0}"##;
        assert!(serde_json::from_str::<Furniture>(json).is_err());
    }

    #[test]
    fn clamps_dimensions_to_supported_range() {
        let dims = RoomDimensions::new(50.0, 1200.0, 280.0).clamped();
        assert_eq!(dims, RoomDimensions::new(100.0, 1000.0, 280.0));
        assert_eq!(clamp_dimension(f32::NAN), MIN_ROOM_DIMENSION);
    }

    #[test]
    fn initial_room_has_unique_ids() {
        let room = Room::initial();
        let mut ids: Vec<_> = room.furniture.iter().map(|f| f.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), room.furniture.len());
    }
}
