// src/map/mod.rs
//! Сетка карты: поверхность, принадлежность зоне и занятость каждого тайла.
//!
//! Сетка общая для всех зон. Каждый вызов берёт блокировку ненадолго;
//! изменять тайл может только зона, которой он сейчас принадлежит.

pub mod graph;
pub mod png;
pub mod terrain;

pub use terrain::Terrain;

use crate::area::{Area, Tile};
use crate::config::{WaterContent, WaterSettings};
use crate::object::ObjectTypeRegistry;
use crate::zone::Zone;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ZoneId = u32;

/// Занятость тайла
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Occupancy {
    /// Гарантированно проходимый тайл (часть сети путей)
    Free,
    /// Тайл ещё может быть занят объектом или стать путём
    Possible,
    /// Тайл занят объектом или закрыт навсегда
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileInfo {
    pub terrain: Terrain,
    pub zone: ZoneId,
    pub occupancy: Occupancy,
    /// Расстояние до ближайшего размещённого объекта
    pub nearest_object_distance: f32,
}

impl Default for TileInfo {
    fn default() -> Self {
        Self {
            terrain: Terrain::default(),
            zone: 0,
            occupancy: Occupancy::Possible,
            nearest_object_distance: f32::MAX,
        }
    }
}

pub struct RmgMap {
    width: u32,
    height: u32,
    levels: u32,
    tiles: RwLock<Vec<TileInfo>>,
    zones: BTreeMap<ZoneId, Arc<Zone>>,
    settings: WaterSettings,
    water_content: WaterContent,
    objects: ObjectTypeRegistry,
}

impl RmgMap {
    pub fn new(
        width: u32,
        height: u32,
        levels: u32,
        settings: WaterSettings,
        water_content: WaterContent,
        objects: ObjectTypeRegistry,
    ) -> Self {
        Self {
            width,
            height,
            levels,
            tiles: RwLock::new(vec![
                TileInfo::default();
                (width * height * levels) as usize
            ]),
            zones: BTreeMap::new(),
            settings,
            water_content,
            objects,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn settings(&self) -> &WaterSettings {
        &self.settings
    }

    pub fn water_content(&self) -> WaterContent {
        self.water_content
    }

    /// Реестр типов объектов
    pub fn objects(&self) -> &ObjectTypeRegistry {
        &self.objects
    }

    pub fn add_zone(&mut self, zone: Zone) -> Arc<Zone> {
        let zone = Arc::new(zone);
        self.zones.insert(zone.id(), Arc::clone(&zone));
        zone
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Arc<Zone>> {
        self.zones.get(&id)
    }

    /// Зоны в порядке возрастания id
    pub fn zones(&self) -> impl Iterator<Item = &Arc<Zone>> {
        self.zones.values()
    }

    pub fn is_on_map(&self, tile: Tile) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && tile.z >= 0
            && (tile.x as u32) < self.width
            && (tile.y as u32) < self.height
            && (tile.z as u32) < self.levels
    }

    fn index(&self, tile: Tile) -> Option<usize> {
        self.is_on_map(tile).then(|| {
            ((tile.z as u32 * self.height + tile.y as u32) * self.width + tile.x as u32) as usize
        })
    }

    /// Все тайлы карты в каноническом порядке
    pub fn all_tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.levels as i32).flat_map(move |z| {
            (0..self.height as i32)
                .flat_map(move |y| (0..self.width as i32).map(move |x| Tile::new(x, y, z)))
        })
    }

    pub fn tile(&self, tile: Tile) -> Option<TileInfo> {
        let idx = self.index(tile)?;
        Some(self.tiles.read()[idx])
    }

    fn update(&self, tile: Tile, f: impl FnOnce(&mut TileInfo)) {
        if let Some(idx) = self.index(tile) {
            f(&mut self.tiles.write()[idx]);
        }
    }

    pub fn terrain(&self, tile: Tile) -> Option<Terrain> {
        self.tile(tile).map(|t| t.terrain)
    }

    pub fn set_terrain(&self, tile: Tile, terrain: Terrain) {
        self.update(tile, |t| t.terrain = terrain);
    }

    /// Закрашивает все тайлы области одной поверхностью
    pub fn draw_terrain(&self, area: &Area, terrain: Terrain) {
        let mut tiles = self.tiles.write();
        for tile in area {
            if let Some(idx) = self.index(tile) {
                tiles[idx].terrain = terrain;
            }
        }
    }

    pub fn zone_id(&self, tile: Tile) -> Option<ZoneId> {
        self.tile(tile).map(|t| t.zone)
    }

    pub fn set_zone_id(&self, tile: Tile, zone: ZoneId) {
        self.update(tile, |t| t.zone = zone);
    }

    pub fn occupancy(&self, tile: Tile) -> Option<Occupancy> {
        self.tile(tile).map(|t| t.occupancy)
    }

    pub fn set_occupied(&self, tile: Tile, occupancy: Occupancy) {
        self.update(tile, |t| t.occupancy = occupancy);
    }

    pub fn is_possible(&self, tile: Tile) -> bool {
        self.occupancy(tile) == Some(Occupancy::Possible)
    }

    pub fn is_blocked(&self, tile: Tile) -> bool {
        self.occupancy(tile) == Some(Occupancy::Blocked)
    }

    /// Для тайлов за краем карты расстояние бесконечно
    pub fn nearest_object_distance(&self, tile: Tile) -> f32 {
        self.tile(tile).map_or(f32::MAX, |t| t.nearest_object_distance)
    }

    pub fn lower_nearest_object_distance(&self, tile: Tile, distance: f32) {
        self.update(tile, |t| {
            t.nearest_object_distance = t.nearest_object_distance.min(distance);
        });
    }
}
