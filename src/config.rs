// src/config.rs
//! Конфигурация генерации карты
//!
//! Этот модуль определяет все параметры, управляющие генератором зон:
//! - Режим воды на карте (нет воды, обычный, острова)
//! - Настройки водных маршрутов (минимальный размер озера, зазоры, охрана верфей)
//! - Шаблон карты: зоны, связи между ними и раскладка тайлов по уровням
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки через конфигурационные файлы.
//!
//! ## Раскладка уровня
//!
//! Каждая строка `zones` задаёт ряд тайлов, символ даёт id зоны в системе счисления
//! по основанию 36 (`0`–`9`, `a`–`z`). Необязательный слой `terrain` той же
//! формы переопределяет поверхность: `.` оставляет поверхность зоны, `~` вода,
//! `#` скала, `s` песок (полный список в [`Terrain::from_layout_char`]).

use crate::area::Tile;
use crate::error::ConfigError;
use crate::map::{Terrain, ZoneId};
use crate::zone::ZoneType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Режим воды на карте
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaterContent {
    /// Водные зоны не обрабатываются, связи идут только по суше и через порталы
    None,
    #[default]
    Normal,
    /// Как `Normal`, но шаблон рассчитан на зоны-острова
    Islands,
}

impl WaterContent {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self != WaterContent::None
    }
}

/// Настройки водных маршрутов
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterSettings {
    /// Озёра меньше этого числа тайлов не получают ни лодок, ни верфей
    #[serde(default = "default_min_lake_size")]
    pub min_lake_size: usize,

    /// Минимальное расстояние от тайла посадки до ближайшего объекта
    #[serde(default = "default_boat_clearance")]
    pub boat_clearance: f32,

    /// Минимальное расстояние от лодки до других объектов водной зоны
    #[serde(default = "default_boat_min_distance")]
    pub boat_min_distance: f32,

    /// Сила охраны верфи (0 = без охраны)
    #[serde(default = "default_shipyard_guard")]
    pub shipyard_guard: u32,

    /// Минимальное расстояние между обязательными объектами зоны
    #[serde(default = "default_required_object_distance")]
    pub required_object_distance: f32,
}

fn default_min_lake_size() -> usize {
    25
}
fn default_boat_clearance() -> f32 {
    3.0
}
fn default_boat_min_distance() -> f32 {
    4.0
}
fn default_shipyard_guard() -> u32 {
    1500
}
fn default_required_object_distance() -> f32 {
    3.0
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            min_lake_size: 25,
            boat_clearance: 3.0,
            boat_min_distance: 4.0,
            shipyard_guard: 1500,
            required_object_distance: 3.0,
        }
    }
}

/// Описание зоны в шаблоне
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneOptions {
    pub id: ZoneId,

    #[serde(rename = "type")]
    pub zone_type: ZoneType,

    /// Поверхность зоны (по умолчанию трава; у водной зоны только вода)
    #[serde(default)]
    pub terrain: Terrain,

    /// Число городов помимо главного
    #[serde(default)]
    pub towns: u32,

    /// Якорь зоны; без него берётся тайл, ближайший к центру зоны
    #[serde(default)]
    pub position: Option<Tile>,
}

/// Связь между двумя зонами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub zone_a: ZoneId,
    pub zone_b: ZoneId,

    /// Сила охраны прохода
    #[serde(default)]
    pub guard: u32,
}

/// Раскладка одного уровня карты
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LevelLayout {
    pub zones: Vec<String>,

    #[serde(default)]
    pub terrain: Vec<String>,
}

impl LevelLayout {
    fn width(&self) -> usize {
        self.zones.first().map_or(0, |row| row.chars().count())
    }

    /// Id зоны тайла `(x, y)`
    #[must_use]
    pub fn zone_at(&self, x: usize, y: usize) -> Option<ZoneId> {
        self.zones
            .get(y)
            .and_then(|row| row.chars().nth(x))
            .and_then(zone_char_id)
    }

    /// Переопределение поверхности; `None` — поверхность зоны
    #[must_use]
    pub fn terrain_at(&self, x: usize, y: usize) -> Option<Terrain> {
        self.terrain
            .get(y)
            .and_then(|row| row.chars().nth(x))
            .and_then(Terrain::from_layout_char)
    }
}

/// Символ раскладки → id зоны
#[must_use]
pub fn zone_char_id(c: char) -> Option<ZoneId> {
    c.to_digit(36)
}

/// Шаблон карты
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapTemplate {
    pub zones: Vec<ZoneOptions>,

    #[serde(default)]
    pub connections: Vec<ConnectionOptions>,

    pub levels: Vec<LevelLayout>,
}

impl MapTemplate {
    /// Размеры карты: ширина, высота, число уровней
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32, u32) {
        let Some(first) = self.levels.first() else {
            return (0, 0, 0);
        };
        (
            first.width() as u32,
            first.zones.len() as u32,
            self.levels.len() as u32,
        )
    }

    #[must_use]
    pub fn zone(&self, id: ZoneId) -> Option<&ZoneOptions> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Проверяет согласованность шаблона
    ///
    /// # Ошибки
    /// - пустая или рваная раскладка, несовпадение слоёв поверхности и зон
    /// - повторный id зоны, неизвестный символ зоны или поверхности
    /// - водная зона с сухопутной поверхностью или больше одной водной зоны
    /// - связь с несуществующей зоной
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (width, height, _) = self.dimensions();
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyLayout);
        }

        if self
            .zones
            .iter()
            .filter(|z| z.zone_type == ZoneType::Water)
            .count()
            > 1
        {
            return Err(ConfigError::MultipleWaterZones);
        }

        let mut ids = BTreeSet::new();
        for zone in &self.zones {
            if !ids.insert(zone.id) {
                return Err(ConfigError::DuplicateZone(zone.id));
            }
            if zone.zone_type == ZoneType::Water && !zone.terrain.is_water() {
                return Err(ConfigError::WaterZoneTerrain(zone.id));
            }
        }

        for (level, layout) in self.levels.iter().enumerate() {
            if layout.zones.len() != height as usize {
                return Err(ConfigError::RaggedLayout {
                    level,
                    row: layout.zones.len(),
                    expected: height as usize,
                    actual: layout.zones.len(),
                });
            }
            for (row, line) in layout.zones.iter().enumerate() {
                let actual = line.chars().count();
                if actual != width as usize {
                    return Err(ConfigError::RaggedLayout {
                        level,
                        row,
                        expected: width as usize,
                        actual,
                    });
                }
                for c in line.chars() {
                    match zone_char_id(c) {
                        Some(id) if ids.contains(&id) => {}
                        _ => return Err(ConfigError::UnknownZoneChar(c)),
                    }
                }
            }

            if layout.terrain.is_empty() {
                continue;
            }
            if layout.terrain.len() != layout.zones.len()
                || layout
                    .terrain
                    .iter()
                    .any(|line| line.chars().count() != width as usize)
            {
                return Err(ConfigError::TerrainLayoutMismatch { level });
            }
            for c in layout.terrain.iter().flat_map(|line| line.chars()) {
                if c != '.' && Terrain::from_layout_char(c).is_none() {
                    return Err(ConfigError::UnknownTerrainChar(c));
                }
            }
        }

        for connection in &self.connections {
            for id in [connection.zone_a, connection.zone_b] {
                if !ids.contains(&id) {
                    return Err(ConfigError::UnknownConnectionZone(id));
                }
            }
        }
        Ok(())
    }
}

/// Основные параметры генерации карты
///
/// Полная конфигурация для генерации одной карты. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeneratorConfig {
    /// Сид генератора случайных чисел (детерминированная генерация)
    #[serde(default)]
    pub seed: u64,

    /// Режим воды (по умолчанию `normal`)
    #[serde(default)]
    pub water_content: WaterContent,

    /// Настройки водных маршрутов
    #[serde(default)]
    pub water: WaterSettings,

    pub template: MapTemplate,
}

impl GeneratorConfig {
    /// Загружает параметры из TOML-файла
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден или содержит недопустимый формат.
    ///
    /// # Пример
    /// ```toml
    /// # lakes.toml
    /// seed = 42
    /// water_content = "normal"
    ///
    /// [[template.zones]]
    /// id = 1
    /// type = "player_start"
    /// ```
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
seed = 7

[water]
min_lake_size = 10

[[template.zones]]
id = 1
type = "player_start"
terrain = "grass"

[[template.zones]]
id = 2
type = "water"
terrain = "water"

[[template.connections]]
zone_a = 1
zone_b = 2

[[template.levels]]
zones = ["1122", "1122"]
terrain = ["..~.", "...."]
"#;

    #[test]
    fn parses_template_with_defaults() {
        let config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.water_content, WaterContent::Normal);
        assert_eq!(config.water.min_lake_size, 10);
        assert!((config.water.boat_clearance - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.water.shipyard_guard, 1500);
        assert_eq!(config.template.dimensions(), (4, 2, 1));
        assert_eq!(config.template.zone(2).map(|z| z.zone_type), Some(ZoneType::Water));
        config.template.validate().unwrap();
    }

    #[test]
    fn layout_lookups() {
        let config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        let level = &config.template.levels[0];
        assert_eq!(level.zone_at(0, 0), Some(1));
        assert_eq!(level.zone_at(3, 1), Some(2));
        assert_eq!(level.terrain_at(2, 0), Some(Terrain::Water));
        assert_eq!(level.terrain_at(0, 0), None);
        assert_eq!(zone_char_id('z'), Some(35));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let mut config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        config.template.levels[0].zones[1] = "112".into();
        assert!(matches!(
            config.template.validate(),
            Err(ConfigError::RaggedLayout { row: 1, expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn water_zone_needs_water_terrain() {
        let mut config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        config.template.zones[1].terrain = Terrain::Sand;
        assert!(matches!(
            config.template.validate(),
            Err(ConfigError::WaterZoneTerrain(2))
        ));
    }

    #[test]
    fn unknown_chars_and_zones_are_rejected() {
        let mut config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        config.template.levels[0].zones[0] = "1132".into();
        assert!(matches!(
            config.template.validate(),
            Err(ConfigError::UnknownZoneChar('3'))
        ));

        let mut config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        config.template.levels[0].terrain[0] = "..?.".into();
        assert!(matches!(
            config.template.validate(),
            Err(ConfigError::UnknownTerrainChar('?'))
        ));

        let mut config = GeneratorConfig::from_toml_str(SMALL).unwrap();
        config.template.connections[0].zone_b = 9;
        assert!(matches!(
            config.template.validate(),
            Err(ConfigError::UnknownConnectionZone(9))
        ));
    }
}
