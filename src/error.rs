// src/error.rs
//! Ошибки загрузки конфигурации и построения генератора.
//!
//! Неудачное размещение объекта ошибкой не считается: оно возвращается как
//! пустой маршрут или невалидный путь.

use crate::map::ZoneId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Template has no levels or an empty layout")]
    EmptyLayout,
    #[error("Level {level}, row {row}: expected {expected} columns, got {actual}")]
    RaggedLayout {
        level: usize,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Level {level}: terrain layout does not match zone layout dimensions")]
    TerrainLayoutMismatch { level: usize },
    #[error("Zone {0} is declared twice")]
    DuplicateZone(ZoneId),
    #[error("Layout references undeclared zone char '{0}'")]
    UnknownZoneChar(char),
    #[error("Unknown terrain char '{0}' in layout")]
    UnknownTerrainChar(char),
    #[error("Water zone {0} must have water terrain")]
    WaterZoneTerrain(ZoneId),
    #[error("Template declares more than one water zone")]
    MultipleWaterZones,
    #[error("Connection references unknown zone {0}")]
    UnknownConnectionZone(ZoneId),
}

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("Unknown zone {0}")]
    UnknownZone(ZoneId),
    #[error("Stage dependency cycle detected at {stage}")]
    DependencyCycle { stage: String },
    #[error("Failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
