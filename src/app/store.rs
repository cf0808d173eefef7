use crate::catalog::Catalog;
use crate::color::Color;
use crate::scene::{
    clamp_dimension, Furniture, FurnitureKind, PrimitiveShape, Room, RoomDimensions, Vector3,
};

/// Where newly added furniture lands, in room centimeters.
const SPAWN_POSITION: Vector3 = Vector3 {
    x: 100.0,
    y: 0.0,
    z: 100.0,
};

/// Partial update of one furniture record. `None` fields keep their value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FurniturePatch {
    pub name: Option<String>,
    pub kind: Option<FurnitureKind>,
    pub position: Option<Vector3>,
    pub dimensions: Option<Vector3>,
    pub color: Option<Color>,
    pub rotation: Option<f32>,
}

impl FurniturePatch {
    fn apply(self, item: &mut Furniture) {
        if let Some(name) = self.name {
            item.name = name;
        }
        if let Some(kind) = self.kind {
            item.kind = kind;
        }
        if let Some(position) = self.position {
            item.position = position;
        }
        if let Some(dimensions) = self.dimensions {
            item.dimensions = dimensions;
        }
        if let Some(color) = self.color {
            item.color = color;
        }
        if let Some(rotation) = self.rotation {
            item.rotation = rotation.rem_euclid(360.0);
        }
    }
}

/// Partial room resize. `None` fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionsPatch {
    pub width: Option<f32>,
    pub depth: Option<f32>,
    pub height: Option<f32>,
}

/// Owner of the room and the selection. Every mutation bumps `revision` so
/// the driver knows when the scene needs another sync.
#[derive(Debug, Clone)]
pub struct RoomStore {
    room: Room,
    selected: Option<String>,
    revision: u64,
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore {
    pub fn new() -> Self {
        Self::with_room(Room::initial())
    }

    pub fn with_room(room: Room) -> Self {
        let mut store = Self {
            room: Room::empty(RoomDimensions::new(0.0, 0.0, 0.0)),
            selected: None,
            revision: 0,
        };
        store.set_room(room);
        store
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_item(&self) -> Option<&Furniture> {
        self.selected.as_deref().and_then(|id| self.room.find(id))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Replaces the whole room. Dimensions are clamped to the allowed range.
    pub fn set_room(&mut self, mut room: Room) {
        let dims = room.dimensions().clamped();
        if dims != room.dimensions() {
            log::warn!(
                "Room {}x{}x{} clamped to {}x{}x{}",
                room.width,
                room.depth,
                room.height,
                dims.width,
                dims.depth,
                dims.height
            );
        }
        room.width = dims.width;
        room.depth = dims.depth;
        room.height = dims.height;
        self.room = room;
        self.touch();
    }

    pub fn update_room_dimensions(&mut self, patch: DimensionsPatch) {
        if let Some(width) = patch.width {
            self.room.width = clamp_dimension(width);
        }
        if let Some(depth) = patch.depth {
            self.room.depth = clamp_dimension(depth);
        }
        if let Some(height) = patch.height {
            self.room.height = clamp_dimension(height);
        }
        self.touch();
    }

    /// Appends a record. A record whose id is already taken is rejected.
    pub fn add_furniture(&mut self, furniture: Furniture) -> bool {
        if self.room.contains(&furniture.id) {
            log::warn!("Furniture id {:?} already exists; not added", furniture.id);
            return false;
        }
        self.room.furniture.push(furniture);
        self.touch();
        true
    }

    /// Adds a box of the shape's default size with a random color and
    /// selects it. Returns the new id.
    pub fn add_primitive(&mut self, shape: PrimitiveShape) -> String {
        let item = Furniture {
            id: generate_id(),
            name: format!("{} {}", shape.display_name(), self.room.furniture.len() + 1),
            kind: FurnitureKind::Primitive(shape),
            position: SPAWN_POSITION,
            dimensions: shape.default_dimensions(),
            color: random_color(),
            rotation: 0.0,
        };
        self.add_and_select(item)
    }

    /// Adds a catalog model at its natural size and selects it. Unknown keys
    /// add nothing.
    pub fn add_catalog_model(&mut self, catalog: &Catalog, key: &str) -> Option<String> {
        let Some(entry) = catalog.get(key) else {
            log::warn!("Unknown catalog model {key:?}");
            return None;
        };
        let item = Furniture {
            id: generate_id(),
            name: format!("{} {}", entry.display_name, self.room.furniture.len() + 1),
            kind: FurnitureKind::CatalogModel(entry.key.to_string()),
            position: SPAWN_POSITION,
            dimensions: entry.dimensions(),
            color: random_color(),
            rotation: 0.0,
        };
        Some(self.add_and_select(item))
    }

    fn add_and_select(&mut self, item: Furniture) -> String {
        let id = item.id.clone();
        self.room.furniture.push(item);
        self.selected = Some(id.clone());
        self.touch();
        id
    }

    /// Returns false when no record has `id`.
    pub fn update_furniture(&mut self, id: &str, patch: FurniturePatch) -> bool {
        let Some(item) = self.room.find_mut(id) else {
            return false;
        };
        patch.apply(item);
        self.touch();
        true
    }

    /// Removes the record and clears the selection if it pointed at it.
    pub fn delete_furniture(&mut self, id: &str) -> bool {
        let before = self.room.furniture.len();
        self.room.furniture.retain(|item| item.id != id);
        if self.room.furniture.len() == before {
            return false;
        }
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.touch();
        true
    }

    /// Any id is accepted; one that is not in the room renders as no
    /// selection.
    pub fn set_selected(&mut self, id: Option<&str>) {
        let id = id.map(str::to_string);
        if self.selected != id {
            self.selected = id;
            self.touch();
        }
    }

    pub fn reset(&mut self) {
        self.room = Room::initial();
        self.selected = None;
        self.touch();
    }
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn random_color() -> Color {
    let [r, g, b] = rand::random::<[u8; 3]>();
    Color { r, g, b }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_the_initial_room() {
        let store = RoomStore::new();
        assert_eq!(store.room(), &Room::initial());
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn dimensions_are_clamped_independently() {
        let mut store = RoomStore::new();
        store.update_room_dimensions(DimensionsPatch {
            width: Some(50.0),
            height: Some(5000.0),
            ..DimensionsPatch::default()
        });
        let room = store.room();
        assert_eq!((room.width, room.depth, room.height), (100.0, 600.0, 1000.0));

        store.set_room(Room::empty(RoomDimensions::new(2000.0, 10.0, 300.0)));
        assert_eq!(store.room().dimensions(), RoomDimensions::new(1000.0, 100.0, 300.0));
    }

    #[test]
    fn add_primitive_selects_new_item() {
        let mut store = RoomStore::new();
        let id = store.add_primitive(PrimitiveShape::Rectangular);
        let item = store.selected_item().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.name, "Параллелепипед 5");
        assert_eq!(item.dimensions, Vector3::new(120.0, 60.0, 80.0));
        assert_eq!(item.position, SPAWN_POSITION);

        let other = store.add_primitive(PrimitiveShape::Cube);
        assert_ne!(id, other);
    }

    #[test]
    fn add_catalog_model_uses_natural_size() {
        let mut store = RoomStore::new();
        let id = store.add_catalog_model(Catalog::builtin(), "conditioner").unwrap();
        let item = store.room().find(&id).unwrap();
        assert_eq!(item.kind, FurnitureKind::CatalogModel("conditioner".into()));
        assert_eq!(item.dimensions, Vector3::new(90.0, 30.0, 40.0));
        assert_eq!(store.selected(), Some(id.as_str()));

        let revision = store.revision();
        assert!(store.add_catalog_model(Catalog::builtin(), "piano").is_none());
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn update_patches_only_given_fields() {
        let mut store = RoomStore::new();
        let before = store.room().find("2").unwrap().clone();
        assert!(store.update_furniture(
            "2",
            FurniturePatch {
                rotation: Some(-90.0),
                color: Some(Color::from_u32(0x00ff00)),
                ..FurniturePatch::default()
            }
        ));
        let after = store.room().find("2").unwrap();
        assert_eq!(after.rotation, 270.0);
        assert_eq!(after.color, Color::from_u32(0x00ff00));
        assert_eq!(after.position, before.position);
        assert!(!store.update_furniture("missing", FurniturePatch::default()));
    }

    #[test]
    fn delete_clears_matching_selection() {
        let mut store = RoomStore::new();
        store.set_selected(Some("3"));
        assert!(store.delete_furniture("1"));
        assert_eq!(store.selected(), Some("3"));
        assert!(store.delete_furniture("3"));
        assert_eq!(store.selected(), None);
        assert!(!store.delete_furniture("3"));
    }

    #[test]
    fn added_primitives_get_varied_colors() {
        let mut store = RoomStore::new();
        let colors: Vec<Color> = (0..8)
            .map(|_| {
                let id = store.add_primitive(PrimitiveShape::Cube);
                store.room().find(&id).unwrap().color
            })
            .collect();
        assert!(colors.iter().any(|color| *color != colors[0]));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut store = RoomStore::new();
        let copy = store.room().find("1").unwrap().clone();
        assert!(!store.add_furniture(copy));
        assert_eq!(store.room().furniture.len(), 4);
    }

    #[test]
    fn revision_tracks_mutations() {
        let mut store = RoomStore::new();
        let start = store.revision();
        store.set_selected(Some("1"));
        store.set_selected(Some("1"));
        assert_eq!(store.revision(), start + 1);
        store.reset();
        assert_eq!(store.revision(), start + 2);
        assert_eq!(store.selected(), None);
    }
}
