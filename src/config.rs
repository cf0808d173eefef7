use crate::color::Color;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How many walls the envelope gets. `Two` leaves the front and right sides
/// open so the camera can look in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallVariant {
    #[default]
    Four,
    Two,
}

/// Editor tunables. Missing fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub lod_far_distance: f32,
    pub highlight_color: Color,
    pub selected_opacity: f32,
    pub unselected_opacity: f32,
    pub outline_color: Color,
    pub bounds_helper_color: Color,

    pub camera_fov_deg: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    pub wall_variant: WallVariant,
    pub floor_color: Color,
    pub wall_color: Color,
    pub wall_opacity: f32,
    pub wall_thickness: f32,
    pub grid_divisions: u32,
    pub grid_color: Color,
    pub clear_color: Color,

    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    pub shadow_map_size: u32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            lod_far_distance: 500.0,
            highlight_color: Color::from_u32(0xff0000),
            selected_opacity: 0.8,
            unselected_opacity: 0.9,
            outline_color: Color::BLACK,
            bounds_helper_color: Color::from_u32(0x99c3fb),

            camera_fov_deg: 75.0,
            camera_near: 0.1,
            camera_far: 5000.0,
            damping_factor: 0.05,
            min_distance: 100.0,
            max_distance: 2000.0,

            wall_variant: WallVariant::Four,
            floor_color: Color::from_u32(0xcccccc),
            wall_color: Color::from_u32(0xaaaaaa),
            wall_opacity: 0.5,
            wall_thickness: 5.0,
            grid_divisions: 20,
            grid_color: Color::from_u32(0x888888),
            clear_color: Color::from_u32(0xf0f0f0),

            ambient_intensity: 0.6,
            directional_intensity: 0.8,
            shadow_map_size: 2048,
        }
    }
}

impl EditorConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{"lod_far_distance": 1000, "wall_variant": "two"}"#).unwrap();
        assert_eq!(config.lod_far_distance, 1000.0);
        assert_eq!(config.wall_variant, WallVariant::Two);
        assert_eq!(config.grid_divisions, 20);
        assert_eq!(config.highlight_color, Color::from_u32(0xff0000));
    }

    #[test]
    fn load_reports_path_on_bad_json() {
        let path = std::env::temp_dir().join(format!("roomviz_bad_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = EditorConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("roomviz_bad_config"));
        let _ = std::fs::remove_file(path);
    }
}
