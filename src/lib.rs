//! Водные зоны генератора случайных карт.
//!
//! Шаблон раскладывает карту по зонам. Водная зона забирает себе всю воду,
//! делит её на озёра и решает, какие сухопутные зоны связаны морем. Там,
//! где связь сохраняется, у берега ставится верфь или лодка.

pub mod area;
pub mod config;
pub mod error;
pub mod generator;
pub mod map;
pub mod modificator;
pub mod object;
pub mod zone;

pub use area::{Area, Tile};
pub use config::{GeneratorConfig, WaterContent, WaterSettings};
pub use error::{ConfigError, GenError};
pub use generator::{GenerationReport, MapGenerator};
pub use map::{RmgMap, Terrain, ZoneId};
pub use modificator::water_proxy::{Lake, RouteInfo};
pub use zone::{Zone, ZoneType};
