use crate::scene::Room;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate furniture id {0:?}")]
    DuplicateId(String),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

pub fn save_room_to_file(room: &Room, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(room)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Loads a room snapshot. Ids must be unique across the furniture list.
pub fn load_room_from_file(path: &Path) -> Result<Room> {
    let json = std::fs::read_to_string(path)?;
    room_from_json(&json)
}

pub fn room_from_json(json: &str) -> Result<Room> {
    let room: Room = serde_json::from_str(json)?;
    let mut seen = std::collections::HashSet::new();
    for item in &room.furniture {
        if !seen.insert(item.id.as_str()) {
            return Err(SerializationError::DuplicateId(item.id.clone()));
        }
    }
    Ok(room)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FurnitureKind, Room};

    #[test]
    fn empty_room_roundtrip() {
        let json = r#"{"width": 300, "depth": 400, "height": 250}"#;
        let room = room_from_json(json).unwrap();
        assert!(room.furniture.is_empty());
        assert_eq!(room.width, 300.0);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut room = Room::initial();
        let copy = room.furniture[0].clone();
        room.furniture.push(copy);
        let json = serde_json::to_string(&room).unwrap();
        assert!(matches!(
            room_from_json(&json),
            Err(SerializationError::DuplicateId(id)) if id == "1"
        ));
    }

    #[test]
    fn save_load_loop_via_file() {
        let mut room = Room::initial();

        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("roomviz_room_{}_{}.json", std::process::id(), nonce));

        for _ in 0..20 {
            save_room_to_file(&room, &path).unwrap();
            room = load_room_from_file(&path).unwrap();
            assert_eq!(room.furniture.len(), 4);
            assert_eq!(
                room.furniture[3].kind,
                FurnitureKind::CatalogModel("chair".to_string())
            );
        }
        assert_eq!(room, Room::initial());

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("roomviz_definitely_missing.json");
        assert!(matches!(
            load_room_from_file(&path),
            Err(SerializationError::Io(_))
        ));
    }
}
