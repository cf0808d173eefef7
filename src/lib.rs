//! roomviz: the 3D editing core of a room furnishing configurator.
//!
//! Furniture records from a [`scene::Room`] are reconciled into nodes of a
//! retained scene graph ([`engine`]), rendered with a CPU rasterizer, picked
//! with camera rays and switched between detail levels by camera distance.
//! [`render::RenderContext`] owns one live scene on a [`render::SurfaceHost`].

pub mod app;
pub mod catalog;
pub mod color;
pub mod config;
pub mod engine;
pub mod plan;
pub mod render;
pub mod scene;
