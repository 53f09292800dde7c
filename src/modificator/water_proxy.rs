// src/modificator/water_proxy.rs
//! Водная зона: сбор воды в озёра и морские связи с сухопутными зонами.
//!
//! ## Порядок работы
//!
//! 1. `process` забирает у соседних зон все тайлы с водной поверхностью и
//!    разбивает воду на озёра (ортогонально связные компоненты).
//! 2. `ConnectionsPlacer` вызывает [`WaterProxy::water_keep_connection`] для
//!    связей шаблона, которые можно провести по воде.
//! 3. `WaterRoutes` вызывает [`WaterProxy::water_route`] для каждой
//!    сухопутной зоны. Берег озера, не отмеченного для зоны, закрывается;
//!    на отмеченном озере ставится верфь или лодка.
//!
//! Состояние озёр лежит под отдельным реентерабельным мьютексом и не
//! пересекается с мьютексом тайлов зоны.

use super::object_manager::{ObjectManager, OptimizeType, PlacementRule};
use super::{Modificator, ModificatorKind, StageDeps, TownPlacer, WaterAdopter};
use crate::area::{Area, Path, Tile, connected_areas};
use crate::error::GenError;
use crate::map::{Occupancy, RmgMap, ZoneId};
use crate::object::{Object, ObjectKind, Owner};
use crate::zone::Zone;
use log::{debug, error, info, warn};
use parking_lot::ReentrantMutex;
use rand::Rng;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Связная водная область внутри водной зоны
#[derive(Debug, Clone, Default)]
pub struct Lake {
    pub area: Area,
    /// Тайл → слой от внешней границы озера
    pub distance_map: BTreeMap<Tile, u32>,
    /// Слой → тайлы слоя
    pub reverse_distance_map: BTreeMap<u32, Area>,
    /// Зона → её тайлы, граничащие с озером
    pub neighbour_zones: BTreeMap<ZoneId, Area>,
    /// Зоны, которые должны остаться связанными через озеро
    pub keep_connections: BTreeSet<ZoneId>,
}

/// Результат морской связи. Пустой экземпляр означает, что ничего не размещено.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteInfo {
    /// Тайлы объекта вместе с охраной
    pub blocked: Area,
    pub visitable: Option<Tile>,
    /// Сухопутный тайл, с которого садятся на корабль
    pub boarding: Option<Tile>,
    /// Водные тайлы, где стоит или появляется корабль
    pub water: Area,
}

impl RouteInfo {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.visitable.is_some() && self.boarding.is_some()
    }
}

#[derive(Debug, Default)]
struct LakeIndex {
    lakes: Vec<Lake>,
    lake_map: HashMap<Tile, usize>,
    /// Берег → первое озеро, которого он касается, и зона берега
    border_map: HashMap<Tile, (usize, ZoneId)>,
}

pub struct WaterProxy {
    zone: ZoneId,
    lakes: ReentrantMutex<RefCell<LakeIndex>>,
}

impl WaterProxy {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            lakes: ReentrantMutex::new(RefCell::new(LakeIndex::default())),
        }
    }

    /// Копия текущих озёр
    pub fn lakes(&self) -> Vec<Lake> {
        let guard = self.lakes.lock();
        let lakes = guard.borrow().lakes.clone();
        lakes
    }

    /// Номер озера, которому принадлежит тайл
    pub fn lake_of(&self, tile: Tile) -> Option<usize> {
        let guard = self.lakes.lock();
        let lake = guard.borrow().lake_map.get(&tile).copied();
        lake
    }

    /// Разбивает воду зоны на озёра и строит индекс тайл → озеро.
    /// В каждом озере хотя бы один тайл попадает в сеть путей зоны.
    pub fn collect_lakes(&self, map: &RmgMap, zone: &Zone) {
        let guard = self.lakes.lock();
        let mut index = guard.borrow_mut();
        index.lakes.clear();
        index.lake_map.clear();
        index.border_map.clear();

        let area = zone.area();
        for (lake_id, component) in connected_areas(&area, true).into_iter().enumerate() {
            let (distance_map, reverse_distance_map) = component.area.compute_distance_map();

            let mut neighbour_zones: BTreeMap<ZoneId, Area> = BTreeMap::new();
            for tile in component.border_outside.iter().flatten() {
                if !map.is_on_map(tile) {
                    continue;
                }
                match map.zone_id(tile) {
                    Some(id) if id != self.zone => {
                        neighbour_zones.entry(id).or_default().add(tile);
                        index.border_map.entry(tile).or_insert((lake_id, id));
                    }
                    _ => {}
                }
            }

            for tile in &component.area {
                index.lake_map.insert(tile, lake_id);
            }

            if !component.area.overlap(&zone.free_paths()) {
                let deepest = reverse_distance_map.values().next_back().and_then(Area::first);
                if let Some(tile) = deepest {
                    zone.promote_free_tile(map, tile);
                }
            }

            index.lakes.push(Lake {
                area: component.area,
                distance_map,
                reverse_distance_map,
                neighbour_zones,
                keep_connections: BTreeSet::new(),
            });
        }
        debug!("Water zone {}: {} lakes", self.zone, index.lakes.len());
    }

    /// Отмечает первое озеро, граничащее с обеими зонами. Водная зона
    /// считается соседом любого своего озера.
    pub fn water_keep_connection(&self, zone_a: ZoneId, zone_b: ZoneId) -> bool {
        let guard = self.lakes.lock();
        let mut index = guard.borrow_mut();
        let own = self.zone;
        let borders = |lake: &Lake, id: ZoneId| id == own || lake.neighbour_zones.contains_key(&id);

        for lake in &mut index.lakes {
            if borders(lake, zone_a) && borders(lake, zone_b) {
                lake.keep_connections.insert(zone_a);
                lake.keep_connections.insert(zone_b);
                return true;
            }
        }
        false
    }

    /// Решает судьбу каждого озера, граничащего с `land`.
    ///
    /// Возвращает последний удачно размещённый маршрут или пустой,
    /// если ничего не размещено.
    pub fn water_route(&self, map: &RmgMap, land: &Zone) -> RouteInfo {
        let mut result = RouteInfo::default();

        let Some(adopter) = land.modificator::<WaterAdopter>() else {
            return result;
        };
        if adopter.coast_tiles().is_empty() {
            return result;
        }
        let Some(water) = map.zone(self.zone) else {
            return result;
        };

        let land_id = land.id();
        for lake in self.lakes() {
            let Some(border) = lake.neighbour_zones.get(&land_id) else {
                continue;
            };

            // зона не связана через это озеро по шаблону
            if !lake.keep_connections.contains(&land_id) {
                for tile in border {
                    if map.is_possible(tile) {
                        map.set_occupied(tile, Occupancy::Blocked);
                    }
                }
                land.lock_areas().possible.subtract(border);
                continue;
            }

            if lake.area.len() < map.settings().min_lake_size {
                info!("Skipping very small lake at zone {land_id}");
                continue;
            }

            let towns = land.modificator::<TownPlacer>().map_or(0, |t| t.total_towns());
            if land.zone_type().is_start() || towns > 0 {
                let guard = map.settings().shipyard_guard;
                if self.place_shipyard(map, water, land, &lake, guard, &mut result) {
                    info!("Shipyard successfully placed at zone {land_id}");
                } else {
                    warn!("Shipyard placement failed, trying boat at zone {land_id}");
                    if self.place_boat(map, water, land, &lake, &mut result) {
                        warn!("Boat successfully placed at zone {land_id}");
                    } else {
                        error!("Boat placement failed at zone {land_id}");
                    }
                }
            } else if self.place_boat(map, water, land, &lake, &mut result) {
                info!("Boat successfully placed at zone {land_id}");
            } else {
                error!("Boat placement failed at zone {land_id}");
            }
        }
        result
    }

    /// Береговые тайлы `land` у озера, с которых видна доступная вода
    fn boarding_candidates(
        lake: &Lake,
        land: &Zone,
        water_available: &Area,
        filter: impl Fn(Tile) -> bool,
    ) -> Area {
        let Some(border) = lake.neighbour_zones.get(&land.id()) else {
            return Area::new();
        };
        let coast = {
            let areas = land.lock_areas();
            border * &(&areas.possible + &areas.free)
        };
        coast.subarea(|tile| {
            filter(tile) && Area::single(tile).border_outside().overlap(water_available)
        })
    }

    fn available_water(water: &Zone, lake: &Lake) -> Area {
        let areas = water.lock_areas();
        &(&areas.possible + &areas.free) * &lake.area
    }

    fn place_boat(
        &self,
        map: &RmgMap,
        water: &Zone,
        land: &Zone,
        lake: &Lake,
        info: &mut RouteInfo,
    ) -> bool {
        let Some(manager) = water.modificator::<ObjectManager>() else {
            return false;
        };

        let registry = map.objects();
        let sailing: Vec<u32> = registry
            .known_subtypes(ObjectKind::Boat)
            .into_iter()
            .filter(|&subtype| {
                registry
                    .create(ObjectKind::Boat, subtype)
                    .is_some_and(|boat| boat.is_sailing())
            })
            .collect();
        if sailing.is_empty() {
            return false;
        }
        let subtype = sailing[water.rand().gen_range(0..sailing.len())];
        let Some(instance) = registry.create(ObjectKind::Boat, subtype) else {
            return false;
        };
        let mut boat = Object::new(instance);

        let settings = map.settings();
        let water_available = Self::available_water(water, lake);
        // лодку не ставим вплотную к объектам на суше, особенно к охране
        let mut boarding_positions = Self::boarding_candidates(lake, land, &water_available, |tile| {
            map.nearest_object_distance(tile) > settings.boat_clearance
        });

        while let Some(boarding) = boarding_positions.first() {
            let ship_positions = &Area::single(boarding).border_outside() * &water_available;
            if ship_positions.is_empty() {
                boarding_positions.erase(boarding);
                continue;
            }

            let path = manager.place_and_connect_object(
                map,
                &ship_positions,
                &mut boat,
                &PlacementRule::MinDistance(settings.boat_min_distance),
                false,
                true,
                OptimizeType::None,
            );
            let land_path = land.search_path(&Area::single(boarding), false, |_| true);
            if !path.valid() || !land_path.valid() {
                boarding_positions.erase(boarding);
                continue;
            }

            *info = RouteInfo {
                blocked: boat.area(),
                visitable: Some(boat.visitable_position()),
                boarding: Some(boarding),
                water: ship_positions,
            };

            water.connect_path(map, &path);
            land.connect_path(map, &land_path);
            if let Some(land_manager) = land.modificator::<ObjectManager>() {
                land_manager.update_distances(map, &boat);
            }
            manager.place_object(map, boat, false, true);
            return true;
        }
        false
    }

    fn place_shipyard(
        &self,
        map: &RmgMap,
        water: &Zone,
        land: &Zone,
        lake: &Lake,
        guard: u32,
        info: &mut RouteInfo,
    ) -> bool {
        let Some(manager) = land.modificator::<ObjectManager>() else {
            return false;
        };

        let registry = map.objects();
        let subtype = registry.choose_random_appearance(
            &mut water.rand(),
            ObjectKind::Shipyard,
            land.terrain(),
        );
        let Some(mut instance) = subtype.and_then(|s| registry.create(ObjectKind::Shipyard, s))
        else {
            return false;
        };
        instance.set_owner(Owner::Neutral);
        let mut shipyard = Object::new(instance);
        let guarded = manager.add_guard(&mut shipyard, guard);

        let water_available = Self::available_water(water, lake);
        let mut boarding_positions =
            Self::boarding_candidates(lake, land, &water_available, |_| true);

        while let Some(boarding) = boarding_positions.first() {
            let ship_positions = &Area::single(boarding).border_outside() * &water_available;
            if ship_positions.is_empty() {
                boarding_positions.erase(boarding);
                continue;
            }

            // проверяется граница самой верфи, без охраны
            let accept = |_: Tile, object: &Object| -> f32 {
                let out = object.base_area().border_outside();
                if !out.contains(boarding)
                    || !out.overlap(&ship_positions)
                    // охрана не должна встать на тайл посадки
                    || object.area().contains(boarding)
                {
                    -1.0
                } else {
                    1.0
                }
            };
            let search_area = land.area_possible();
            let path = manager.place_and_connect_object(
                map,
                &search_area,
                &mut shipyard,
                &PlacementRule::Weighted(&accept),
                guarded,
                true,
                OptimizeType::None,
            );

            let mut to_boarding = Path::new(&land.area_possible() - &shipyard.area());
            to_boarding.connect_area(&land.free_paths());
            to_boarding.connect(&path);
            let to_boarding = to_boarding.search(&Area::single(boarding), false);

            // корабль должен появляться только там, где выбрано
            let out_to_block =
                &(&shipyard.area().border_outside() * &water_available) - &ship_positions;
            let ship_positions = &ship_positions - &out_to_block;
            let to_boat = water.search_path(&ship_positions, true, |_| true);

            if !path.valid() || !to_boarding.valid() || !to_boat.valid() {
                boarding_positions.erase(boarding);
                continue;
            }

            land.connect_path(map, &path);
            land.connect_path(map, &to_boarding);
            water.connect_path(map, &to_boat);

            *info = RouteInfo {
                blocked: shipyard.area(),
                visitable: Some(shipyard.visitable_position()),
                boarding: Some(boarding),
                water: ship_positions,
            };
            manager.place_object(map, shipyard, guarded, true);

            water.lock_areas().possible.subtract(&out_to_block);
            for tile in &out_to_block {
                if map.is_on_map(tile) && map.is_possible(tile) {
                    map.set_occupied(tile, Occupancy::Blocked);
                }
            }
            return true;
        }
        false
    }

    /// Символ тайла для отладочного дампа:
    /// - `=`: берег зоны, связанной через озеро,
    /// - первая цифра id зоны: закрытый берег,
    /// - `~`: вода озера,
    /// - `?`: всё остальное.
    pub fn dump(&self, tile: Tile) -> char {
        let guard = self.lakes.lock();
        let index = guard.borrow();
        if let Some(&(lake, zone)) = index.border_map.get(&tile) {
            let kept = index
                .lakes
                .get(lake)
                .is_some_and(|l| l.keep_connections.contains(&zone));
            return if kept {
                '='
            } else {
                zone.to_string().chars().next().unwrap_or('?')
            };
        }
        if index.lake_map.contains_key(&tile) {
            '~'
        } else {
            '?'
        }
    }
}

impl Modificator for WaterProxy {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::WaterProxy
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, map: &RmgMap) -> StageDeps {
        let mut deps = StageDeps::default();
        for zone in map.zones() {
            deps.dependency(map, zone.id(), ModificatorKind::TownPlacer);
            deps.dependency(map, zone.id(), ModificatorKind::WaterAdopter);
            deps.postfunction(map, zone.id(), ModificatorKind::ConnectionsPlacer);
            deps.postfunction(map, zone.id(), ModificatorKind::ObjectManager);
        }
        deps
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let terrain = zone.terrain();

        let own = zone.area();
        for tile in &own {
            map.set_zone_id(tile, self.zone);
            map.set_occupied(tile, Occupancy::Possible);
        }
        map.draw_terrain(&own, terrain);
        debug_assert!(
            own.iter()
                .all(|t| map.is_on_map(t) && map.terrain(t) == Some(terrain))
        );

        for other in map.zones() {
            if other.id() == self.zone || other.zone_type() == zone.zone_type() {
                continue;
            }
            let claimed =
                zone.claim_tiles_from(map, other, |tile| map.terrain(tile) == Some(terrain));
            if !claimed.is_empty() {
                debug!(
                    "Water zone {}: claimed {} tiles from zone {}",
                    self.zone,
                    claimed.len(),
                    other.id()
                );
            }
        }

        let area = zone.area();
        if !area.contains(zone.pos()) {
            if let Some(first) = area.first() {
                zone.set_pos(first);
            }
        }

        zone.init_free_tiles(map);
        self.collect_lakes(map, zone);
        Ok(())
    }

    fn dump_char(&self, _map: &RmgMap, tile: Tile) -> char {
        match self.dump(tile) {
            '?' => ' ',
            c => c,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WaterContent, WaterSettings};
    use crate::map::Terrain;
    use crate::object::ObjectTypeRegistry;
    use crate::zone::ZoneType;
    use std::sync::Arc;

    /// Полоса воды шириной `water_cols` между двумя сухопутными зонами
    fn strip(width: i32, height: i32, water_cols: std::ops::Range<i32>) -> (RmgMap, Arc<Zone>) {
        let mut map = RmgMap::new(
            width as u32,
            height as u32,
            1,
            WaterSettings::default(),
            WaterContent::Normal,
            ObjectTypeRegistry::default(),
        );
        let mut left = Area::new();
        let mut right = Area::new();
        let mut water = Area::new();
        for y in 0..height {
            for x in 0..width {
                let t = Tile::new(x, y, 0);
                if water_cols.contains(&x) {
                    water.add(t);
                    map.set_zone_id(t, 3);
                } else if x < water_cols.start {
                    left.add(t);
                    map.set_zone_id(t, 1);
                } else {
                    right.add(t);
                    map.set_zone_id(t, 2);
                }
            }
        }
        let pos = water.first().unwrap();
        map.add_zone(Zone::new(1, ZoneType::Treasure, Terrain::Grass, 1).with_area(left, Tile::new(0, 0, 0)));
        map.add_zone(
            Zone::new(2, ZoneType::Treasure, Terrain::Grass, 1)
                .with_area(right, Tile::new(width - 1, 0, 0)),
        );
        let water = map.add_zone(Zone::new(3, ZoneType::Water, Terrain::Water, 1).with_area(water, pos));
        (map, water)
    }

    #[test]
    fn single_strip_is_one_lake_with_both_neighbours() {
        let (map, water) = strip(8, 6, 2..6);
        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();

        let lakes = proxy.lakes();
        assert_eq!(lakes.len(), 1);
        let lake = &lakes[0];
        assert_eq!(lake.area.len(), 24);
        assert_eq!(lake.neighbour_zones.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(!lake.neighbour_zones.contains_key(&3));
        assert!(lake.area.overlap(&water.free_paths()));
        for border in lake.neighbour_zones.values() {
            assert!(!border.overlap(&lake.area));
        }
    }

    #[test]
    fn painted_water_is_claimed_from_land() {
        let (map, water) = strip(8, 4, 3..5);
        map.set_terrain(Tile::new(1, 1, 0), Terrain::Water);
        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();

        let land = map.zone(1).unwrap();
        assert!(!land.area().contains(Tile::new(1, 1, 0)));
        assert!(water.area().contains(Tile::new(1, 1, 0)));
        assert_eq!(map.zone_id(Tile::new(1, 1, 0)), Some(3));
        // отдельное озеро внутри суши
        let lakes = proxy.lakes();
        assert_eq!(lakes.len(), 2);
        assert_eq!(proxy.lake_of(Tile::new(1, 1, 0)), Some(1));
        assert_eq!(proxy.lake_of(Tile::new(3, 0, 0)), Some(0));
        assert!(lakes.iter().all(|l| l.area.overlap(&water.free_paths())));
    }

    #[test]
    fn keep_connection_marks_only_shared_lake() {
        let (map, water) = strip(8, 6, 2..6);
        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();

        assert!(proxy.water_keep_connection(1, 2));
        assert!(proxy.water_keep_connection(1, 3));
        assert!(!proxy.water_keep_connection(1, 7));
        let lake = &proxy.lakes()[0];
        assert!(lake.keep_connections.contains(&1));
        assert!(lake.keep_connections.contains(&2));

        assert_eq!(proxy.dump(Tile::new(1, 0, 0)), '=');
        assert_eq!(proxy.dump(Tile::new(3, 3, 0)), '~');
        assert_eq!(proxy.dump(Tile::new(0, 0, 0)), '?');
    }

    #[test]
    fn unkept_zone_without_adopter_gets_nothing() {
        let (map, water) = strip(8, 6, 2..6);
        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();
        let land = map.zone(1).unwrap();
        let before = land.area_possible();
        assert_eq!(proxy.water_route(&map, land), RouteInfo::default());
        assert_eq!(land.area_possible(), before);
    }

    #[test]
    fn dump_follows_the_first_lake_of_a_shared_shore() {
        let (map, water) = strip(8, 4, 3..5);
        map.set_terrain(Tile::new(1, 1, 0), Terrain::Water);
        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();
        assert!(proxy.water_keep_connection(1, 2));

        // (2, 1) касается и пруда, и пролива
        assert_eq!(proxy.dump(Tile::new(2, 1, 0)), '=');
        assert_eq!(proxy.dump(Tile::new(0, 0, 0)), '1');
        assert_eq!(proxy.dump(Tile::new(1, 1, 0)), '~');
        assert_eq!(proxy.dump(Tile::new(3, 2, 0)), '~');
        assert_eq!(proxy.dump(Tile::new(6, 3, 0)), '?');
    }

    #[test]
    fn coast_without_a_shared_lake_is_left_alone() {
        let mut map = RmgMap::new(
            8,
            6,
            1,
            WaterSettings::default(),
            WaterContent::Normal,
            ObjectTypeRegistry::default(),
        );
        let mut areas = [Area::new(), Area::new(), Area::new()];
        for tile in map.all_tiles() {
            let id: ZoneId = match tile.x {
                0..=1 => 1,
                2..=3 => 2,
                _ => 3,
            };
            map.set_zone_id(tile, id);
            areas[id as usize - 1].add(tile);
        }
        let [left, middle, water] = areas;
        let land = map.add_zone(
            Zone::new(1, ZoneType::Treasure, Terrain::Grass, 1).with_area(left, Tile::new(0, 3, 0)),
        );
        map.add_zone(
            Zone::new(2, ZoneType::Treasure, Terrain::Grass, 1).with_area(middle, Tile::new(2, 3, 0)),
        );
        let water = map.add_zone(
            Zone::new(3, ZoneType::Water, Terrain::Water, 1).with_area(water, Tile::new(6, 3, 0)),
        );

        // берег зоны 1 считается по луже, которой к озёрам уже нет
        map.set_terrain(Tile::new(1, 0, 0), Terrain::Water);
        let adopter = land.attach(WaterAdopter::new(1));
        adopter.process(&map).unwrap();
        assert!(!adopter.coast_tiles().is_empty());
        map.set_terrain(Tile::new(1, 0, 0), Terrain::Grass);
        land.init_free_tiles(&map);

        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();
        assert!(proxy.lakes().iter().all(|l| !l.neighbour_zones.contains_key(&1)));

        let possible = land.area_possible();
        let occupancy: Vec<_> = land.area().iter().map(|t| map.occupancy(t)).collect();
        assert_eq!(proxy.water_route(&map, &land), RouteInfo::default());
        assert_eq!(land.area_possible(), possible);
        assert_eq!(
            land.area().iter().map(|t| map.occupancy(t)).collect::<Vec<_>>(),
            occupancy
        );
    }

    #[test]
    fn unkept_border_is_severed() {
        let (map, water) = strip(8, 6, 2..6);
        let land = map.zone(1).unwrap();
        let adopter = land.attach(WaterAdopter::new(1));
        adopter.process(&map).unwrap();
        land.init_free_tiles(&map);

        let proxy = water.attach(WaterProxy::new(3));
        proxy.process(&map).unwrap();
        let route = proxy.water_route(&map, land);

        assert!(!route.is_valid());
        let border = proxy.lakes()[0].neighbour_zones[&1].clone();
        assert!(!land.area_possible().overlap(&border));
        assert!(border.iter().all(|t| !map.is_possible(t)));
        assert_eq!(proxy.dump(Tile::new(1, 2, 0)), '1');
    }
}
