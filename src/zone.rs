// src/zone.rs
//! Зона шаблона и её разбиение на тайлы.
//!
//! У зоны три множества:
//! - `area` — подтверждённые тайлы зоны,
//! - `possible` — тайлы, которые ещё можно занять объектом или путём,
//! - `free` — сеть гарантированно проходимых путей.
//!
//! Множества лежат под одним мьютексом. Чужая зона меняет их только через
//! методы ниже, которые держат блокировку ровно на время изменения.

use crate::area::{Area, Path, Tile};
use crate::map::{Occupancy, RmgMap, Terrain, ZoneId};
use crate::modificator::{Stage, ZoneStages};
use parking_lot::{Mutex, MutexGuard};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Тип зоны шаблона
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    PlayerStart,
    CpuStart,
    Treasure,
    Junction,
    Water,
}

impl ZoneType {
    /// Стартовая зона игрока или компьютера
    #[must_use]
    pub fn is_start(self) -> bool {
        matches!(self, ZoneType::PlayerStart | ZoneType::CpuStart)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ZoneAreas {
    pub area: Area,
    pub possible: Area,
    pub free: Area,
}

pub struct Zone {
    id: ZoneId,
    zone_type: ZoneType,
    terrain: Terrain,
    towns: u32,
    pos: Mutex<Tile>,
    areas: Mutex<ZoneAreas>,
    rand: Mutex<ChaCha8Rng>,
    stages: ZoneStages,
}

impl Zone {
    /// Генератор зоны зависит только от сида карты и id зоны
    pub fn new(id: ZoneId, zone_type: ZoneType, terrain: Terrain, seed: u64) -> Self {
        let zone_seed = seed.wrapping_add(u64::from(id).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        Self {
            id,
            zone_type,
            terrain,
            towns: 0,
            pos: Mutex::new(Tile::new(0, 0, 0)),
            areas: Mutex::new(ZoneAreas::default()),
            rand: Mutex::new(ChaCha8Rng::seed_from_u64(zone_seed)),
            stages: ZoneStages::default(),
        }
    }

    #[must_use]
    pub fn with_towns(mut self, towns: u32) -> Self {
        self.towns = towns;
        self
    }

    /// Задаёт подтверждённые тайлы и якорь
    #[must_use]
    pub fn with_area(self, area: Area, pos: Tile) -> Self {
        *self.pos.lock() = pos;
        self.areas.lock().area = area;
        self
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn zone_type(&self) -> ZoneType {
        self.zone_type
    }

    pub fn terrain(&self) -> Terrain {
        self.terrain
    }

    /// Число городов из шаблона, без главного
    pub fn towns(&self) -> u32 {
        self.towns
    }

    pub fn pos(&self) -> Tile {
        *self.pos.lock()
    }

    pub fn set_pos(&self, pos: Tile) {
        *self.pos.lock() = pos;
    }

    pub fn is_underground(&self) -> bool {
        self.pos().z > 0
    }

    pub fn lock_areas(&self) -> MutexGuard<'_, ZoneAreas> {
        self.areas.lock()
    }

    pub fn area(&self) -> Area {
        self.areas.lock().area.clone()
    }

    pub fn area_possible(&self) -> Area {
        self.areas.lock().possible.clone()
    }

    pub fn free_paths(&self) -> Area {
        self.areas.lock().free.clone()
    }

    pub fn rand(&self) -> MutexGuard<'_, ChaCha8Rng> {
        self.rand.lock()
    }

    pub fn stages(&self) -> &ZoneStages {
        &self.stages
    }

    pub fn modificator<T: Stage>(&self) -> Option<Arc<T>> {
        T::slot(&self.stages).get().cloned()
    }

    /// Подключает стадию к зоне. Повторное подключение возвращает уже
    /// существующую стадию.
    pub fn attach<T: Stage>(&self, stage: T) -> Arc<T> {
        Arc::clone(T::slot(&self.stages).get_or_init(|| Arc::new(stage)))
    }

    /// Пересобирает `possible` и `free` по текущему состоянию сетки
    pub fn init_free_tiles(&self, map: &RmgMap) {
        let pos = self.pos();
        let mut guard = self.areas.lock();
        let ZoneAreas {
            area,
            possible,
            free,
        } = &mut *guard;

        free.intersect(area);
        *possible = &area.subarea(|t| map.is_possible(t)) - free;

        if free.is_empty() && area.contains(pos) {
            free.add(pos);
            possible.erase(pos);
        }
        for tile in &*free {
            map.set_occupied(tile, Occupancy::Free);
        }
    }

    /// Переносит в эту зону тайлы `donor`, подходящие под `filter`.
    ///
    /// Блокировка донора держится на всё время переноса и отпускается до
    /// того, как берётся собственная. Возвращает перенесённые тайлы.
    pub fn claim_tiles_from(
        &self,
        map: &RmgMap,
        donor: &Zone,
        filter: impl Fn(Tile) -> bool,
    ) -> Area {
        debug_assert_ne!(self.id, donor.id);

        let claimed = {
            let mut theirs = donor.areas.lock();
            let claimed = theirs.area.subarea(&filter);
            if claimed.is_empty() {
                return claimed;
            }
            theirs.area.subtract(&claimed);
            theirs.possible.subtract(&claimed);
            theirs.free.subtract(&claimed);
            for tile in &claimed {
                map.set_zone_id(tile, self.id);
                map.set_occupied(tile, Occupancy::Possible);
            }

            let pos = donor.pos();
            if claimed.contains(pos) {
                if let Some(anchor) = theirs.area.nearest(pos) {
                    donor.set_pos(anchor);
                }
            }
            // сеть путей донора не должна опустеть
            if theirs.free.is_empty() {
                let anchor = donor.pos();
                if theirs.area.contains(anchor) {
                    theirs.possible.erase(anchor);
                    theirs.free.add(anchor);
                    map.set_occupied(anchor, Occupancy::Free);
                }
            }
            claimed
        };

        let mut ours = self.areas.lock();
        ours.area.unite(&claimed);
        ours.possible.unite(&claimed);
        claimed
    }

    /// Включает путь в сеть зоны: тайлы пути перестают быть `possible`
    pub fn connect_path(&self, map: &RmgMap, path: &Path) {
        let mut guard = self.areas.lock();
        guard.possible.subtract(path.path_area());
        let own = path.path_area() * &guard.area;
        guard.free.unite(&own);
        for tile in &own {
            map.set_occupied(tile, Occupancy::Free);
        }
    }

    /// Ищет путь от каждой компоненты `target` до сети зоны.
    ///
    /// Двигаться можно по `possible ∪ free`, отфильтрованному `filter`.
    /// Если хоть одна компонента недостижима, путь невалиден.
    pub fn search_path(&self, target: &Area, straight: bool, filter: impl Fn(Tile) -> bool) -> Path {
        let (search_area, free) = {
            let guard = self.areas.lock();
            ((&guard.possible + &guard.free).subarea(&filter), guard.free.clone())
        };

        let mut network = Path::new(search_area.clone());
        network.connect_area(&free);
        let mut result = Path::new(search_area);

        for component in target.components(true) {
            let found = network.search(&component, straight);
            if !found.valid() {
                return Path::invalid();
            }
            result.connect(&found);
        }
        result
    }

    /// Переводит тайл из `possible` в сеть путей
    pub fn promote_free_tile(&self, map: &RmgMap, tile: Tile) {
        let mut guard = self.areas.lock();
        guard.possible.erase(tile);
        guard.free.add(tile);
        map.set_occupied(tile, Occupancy::Free);
    }
}
