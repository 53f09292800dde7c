// src/modificator/object_manager.rs
//! Размещение объектов в зоне.
//!
//! Основной примитив [`ObjectManager::place_and_connect_object`]: найти
//! позицию, с которой объект достижим из сети путей зоны, и вернуть путь.
//! Фиксация ([`ObjectManager::place_object`]) выполняется отдельно, когда
//! вызывающая сторона убедилась, что все нужные пути существуют.

use super::{Modificator, ModificatorKind, StageDeps};
use crate::area::{Area, Path, Tile};
use crate::error::GenError;
use crate::map::{Occupancy, RmgMap, ZoneId};
use crate::object::{Guard, Object, ObjectInstance};
use crate::zone::Zone;
use log::{debug, error};
use parking_lot::Mutex;

/// Как выбирать среди допустимых позиций
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeType {
    /// Первая допустимая позиция в каноническом порядке
    None,
    /// Позиция с наибольшим весом
    Weight,
}

/// Правило оценки позиции. Отрицательный вес отвергает позицию.
pub enum PlacementRule<'a> {
    /// Ни один тайл объекта не ближе заданного к другим объектам
    MinDistance(f32),
    /// Произвольная оценка; объект уже стоит на проверяемой позиции
    Weighted(&'a dyn Fn(Tile, &Object) -> f32),
}

/// Объект, который зона обязана разместить
#[derive(Debug, Clone)]
struct RequiredObject {
    instance: ObjectInstance,
    guard_strength: u32,
}

pub struct ObjectManager {
    zone: ZoneId,
    required: Mutex<Vec<RequiredObject>>,
    placed: Mutex<Vec<Object>>,
}

impl ObjectManager {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            required: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
        }
    }

    /// Ставит объект в очередь обязательных для этой зоны
    pub fn add_required_object(&self, instance: ObjectInstance, guard_strength: u32) {
        self.required.lock().push(RequiredObject {
            instance,
            guard_strength,
        });
    }

    pub fn required_count(&self) -> usize {
        self.required.lock().len()
    }

    /// Уже размещённые объекты в порядке размещения
    pub fn placed_objects(&self) -> Vec<Object> {
        self.placed.lock().clone()
    }

    /// Ставит охрану перед входом. При нулевой силе охраны нет.
    pub fn add_guard(&self, object: &mut Object, strength: u32) -> bool {
        if strength == 0 {
            object.set_guard(None);
            return false;
        }
        let offset = object.entrance_offset();
        object.set_guard(Some(Guard { strength, offset }));
        true
    }

    fn weight(map: &RmgMap, object: &Object, tile: Tile, rule: &PlacementRule<'_>) -> f32 {
        match rule {
            PlacementRule::MinDistance(min) => {
                let distance = map.nearest_object_distance(tile);
                if distance < *min {
                    return -1.0;
                }
                if object
                    .area()
                    .iter()
                    .any(|t| map.nearest_object_distance(t) < *min)
                {
                    return -1.0;
                }
                distance
            }
            PlacementRule::Weighted(f) => f(tile, object),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn find_place(
        map: &RmgMap,
        search_area: &Area,
        candidates: &Area,
        available: &Area,
        object: &mut Object,
        rule: &PlacementRule<'_>,
        guarded: bool,
        optimize: OptimizeType,
    ) -> Option<Tile> {
        let mut best: Option<(Tile, f32)> = None;
        for tile in candidates {
            object.set_position(tile);
            if !search_area.contains_all(&object.area()) {
                continue;
            }
            if !object.accessible_area(guarded).overlap(available) {
                continue;
            }
            let weight = Self::weight(map, object, tile, rule);
            if weight < 0.0 {
                continue;
            }
            if best.is_none_or(|(_, w)| weight > w) {
                best = Some((tile, weight));
                if optimize == OptimizeType::None {
                    break;
                }
            }
        }
        best.map(|(tile, _)| tile)
    }

    /// Ищет позицию для `object` внутри `search_area` и путь от неё до сети
    /// путей зоны. При успехе объект остаётся на найденной позиции.
    ///
    /// Позиция, от которой путь не найден, исключается, и поиск повторяется.
    /// Если позиций не осталось, возвращается невалидный путь.
    #[allow(clippy::too_many_arguments)]
    pub fn place_and_connect_object(
        &self,
        map: &RmgMap,
        search_area: &Area,
        object: &mut Object,
        rule: &PlacementRule<'_>,
        guarded: bool,
        straight: bool,
        optimize: OptimizeType,
    ) -> Path {
        let Some(zone) = map.zone(self.zone) else {
            return Path::invalid();
        };

        let mut candidates = search_area.clone();
        loop {
            let available = {
                let areas = zone.lock_areas();
                &areas.possible + &areas.free
            };
            let Some(pos) = Self::find_place(
                map,
                search_area,
                &candidates,
                &available,
                object,
                rule,
                guarded,
                optimize,
            ) else {
                return Path::invalid();
            };

            object.set_position(pos);
            let accessible = &object.accessible_area(guarded) * &available;
            let occupied = object.area();
            let path = zone.search_path(&accessible, straight, |t| !occupied.contains(t));
            if path.valid() {
                return path;
            }
            candidates.erase(pos);
        }
    }

    /// Фиксирует объект: тайлы блокируются, у охраняемого объекта
    /// закрываются все подходы, кроме прохода через охрану.
    pub fn place_object(&self, map: &RmgMap, object: Object, guarded: bool, update_distance: bool) {
        let Some(zone) = map.zone(self.zone) else {
            return;
        };

        let area = object.area();
        {
            let mut areas = zone.lock_areas();
            areas.possible.subtract(&area);
            areas.free.subtract(&area);
            for tile in &area {
                map.set_occupied(tile, Occupancy::Blocked);
            }

            if guarded {
                let mut to_block = &object.accessible_area(false) - &object.accessible_area(true);
                to_block.intersect(&areas.area);
                areas.possible.subtract(&to_block);
                for tile in &to_block {
                    if map.is_possible(tile) {
                        map.set_occupied(tile, Occupancy::Blocked);
                    }
                }
            }
        }

        if update_distance {
            self.update_distances(map, &object);
        }
        debug!(
            "Zone {}: placed {} at {}",
            self.zone,
            object.instance.name,
            object.visitable_position()
        );
        self.placed.lock().push(object);
    }

    /// Обновляет поле расстояний до объектов на свободных тайлах зоны
    pub fn update_distances(&self, map: &RmgMap, object: &Object) {
        let Some(zone) = map.zone(self.zone) else {
            return;
        };
        let area = object.area();
        let possible = zone.area_possible();
        for tile in &possible {
            if let Some(d) = area.distance_sqr(tile) {
                map.lower_nearest_object_distance(tile, (d as f32).sqrt());
            }
        }
    }

    fn place_required(&self, map: &RmgMap, zone: &Zone, required: RequiredObject) -> bool {
        let mut object = Object::new(required.instance);
        let guarded = self.add_guard(&mut object, required.guard_strength);
        let search_area = zone.area_possible();
        let rule = PlacementRule::MinDistance(map.settings().required_object_distance);
        let path = self.place_and_connect_object(
            map,
            &search_area,
            &mut object,
            &rule,
            guarded,
            false,
            OptimizeType::Weight,
        );
        if !path.valid() {
            return false;
        }
        zone.connect_path(map, &path);
        self.place_object(map, object, guarded, true);
        true
    }
}

impl Modificator for ObjectManager {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::ObjectManager
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, map: &RmgMap) -> StageDeps {
        let mut deps = StageDeps::default();
        deps.dependency(map, self.zone, ModificatorKind::WaterAdopter);
        deps
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let required = std::mem::take(&mut *self.required.lock());
        for object in required {
            let name = object.instance.name.clone();
            if !self.place_required(map, zone, object) {
                error!("Failed to fill zone {} due to lack of space: {name}", self.zone);
            }
        }
        Ok(())
    }

    fn dump_char(&self, _map: &RmgMap, tile: Tile) -> char {
        let placed = self.placed.lock();
        if placed.iter().any(|o| o.visitable_position() == tile) {
            'o'
        } else if placed.iter().any(|o| o.area().contains(tile)) {
            'x'
        } else {
            ' '
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WaterContent, WaterSettings};
    use crate::map::Terrain;
    use crate::object::{ObjectKind, ObjectTypeRegistry};
    use crate::zone::ZoneType;
    use std::sync::Arc;

    fn setup(width: u32, height: u32) -> (RmgMap, Arc<Zone>, Arc<ObjectManager>) {
        let mut map = RmgMap::new(
            width,
            height,
            1,
            WaterSettings::default(),
            WaterContent::Normal,
            ObjectTypeRegistry::default(),
        );
        let area: Area = map.all_tiles().collect();
        let zone = map.add_zone(
            Zone::new(1, ZoneType::Treasure, Terrain::Grass, 5).with_area(area, Tile::new(0, 0, 0)),
        );
        zone.init_free_tiles(&map);
        let manager = zone.attach(ObjectManager::new(1));
        (map, zone, manager)
    }

    fn monolith(map: &RmgMap) -> Object {
        Object::new(map.objects().create(ObjectKind::Monolith, 0).unwrap())
    }

    #[test]
    fn first_position_wins_without_optimisation() {
        let (map, zone, manager) = setup(6, 6);
        let mut object = monolith(&map);
        let search = zone.area_possible();
        let path = manager.place_and_connect_object(
            &map,
            &search,
            &mut object,
            &PlacementRule::MinDistance(0.0),
            false,
            false,
            OptimizeType::None,
        );
        assert!(path.valid());
        assert_eq!(object.position, Tile::new(1, 0, 0));
    }

    #[test]
    fn weighted_rule_picks_the_heaviest_position() {
        let (map, zone, manager) = setup(6, 6);
        let mut object = monolith(&map);
        let search = zone.area_possible();
        let weight = |tile: Tile, _: &Object| (tile.x + tile.y) as f32;
        let path = manager.place_and_connect_object(
            &map,
            &search,
            &mut object,
            &PlacementRule::Weighted(&weight),
            false,
            false,
            OptimizeType::Weight,
        );
        assert!(path.valid());
        assert_eq!(object.position, Tile::new(5, 5, 0));
    }

    #[test]
    fn rejecting_every_position_gives_invalid_path() {
        let (map, zone, manager) = setup(4, 4);
        let mut object = monolith(&map);
        let search = zone.area_possible();
        let reject = |_: Tile, _: &Object| -1.0_f32;
        let path = manager.place_and_connect_object(
            &map,
            &search,
            &mut object,
            &PlacementRule::Weighted(&reject),
            false,
            false,
            OptimizeType::Weight,
        );
        assert!(!path.valid());
    }

    #[test]
    fn placing_blocks_tiles_and_updates_distances() {
        let (map, zone, manager) = setup(8, 8);
        let mut object = monolith(&map);
        object.set_position(Tile::new(4, 4, 0));
        manager.place_object(&map, object, false, true);

        assert!(map.is_blocked(Tile::new(4, 4, 0)));
        assert!(!zone.area_possible().contains(Tile::new(4, 4, 0)));
        assert!((map.nearest_object_distance(Tile::new(4, 6, 0)) - 2.0).abs() < 1e-4);
        assert_eq!(manager.placed_objects().len(), 1);
    }

    #[test]
    fn required_objects_respect_min_distance() {
        let (map, _zone, manager) = setup(12, 12);
        for _ in 0..2 {
            manager.add_required_object(map.objects().create(ObjectKind::Monolith, 1).unwrap(), 0);
        }
        manager.process(&map).unwrap();

        let placed = manager.placed_objects();
        assert_eq!(placed.len(), 2);
        assert_eq!(manager.required_count(), 0);
        let d = placed[0].position.dist(placed[1].position);
        assert!(d >= map.settings().required_object_distance);
    }

    #[test]
    fn zero_guard_strength_leaves_object_unguarded() {
        let (map, _zone, manager) = setup(4, 4);
        let mut object = monolith(&map);
        assert!(!manager.add_guard(&mut object, 0));
        assert!(object.guard.is_none());
        assert!(manager.add_guard(&mut object, 200));
        assert_eq!(object.guard.map(|g| g.strength), Some(200));
    }
}
