// src/modificator/connections.rs
//! Связи шаблона между зонами.
//!
//! Связь обрабатывает та из двух зон, чья стадия выполняется первой; вторая
//! получает отметку о завершении. Способы перебираются по очереди:
//! - прямой проход через общую границу сухопутных зон,
//! - водный путь через озеро водной зоны,
//! - если ничего не вышло, пара связанных порталов.
//!
//! Стадии связей выполняются по одной в порядке id зон: каждая меняет сеть
//! путей соседней зоны.

use super::{Modificator, ModificatorKind, ObjectManager, StageDeps, WaterProxy};
use crate::area::{Area, Path, Tile};
use crate::config::ConnectionOptions;
use crate::error::GenError;
use crate::map::graph::ZoneGraph;
use crate::map::{Occupancy, RmgMap, ZoneId};
use crate::object::ObjectKind;
use crate::zone::{Zone, ZoneType};
use log::{debug, error, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Минимальное расстояние от прохода до других объектов
const MIN_PASSAGE_DISTANCE: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    Direct,
    Water,
    Monolith,
}

/// Чем закончилась связь шаблона
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionOutcome {
    pub index: usize,
    pub zone_a: ZoneId,
    pub zone_b: ZoneId,
    pub kinds: Vec<ConnectionKind>,
    /// Тайл прохода для прямой связи
    pub passage: Option<Tile>,
}

pub struct ConnectionsPlacer {
    zone: ZoneId,
    /// Связи зоны вместе с их номером в шаблоне
    connections: Vec<(usize, ConnectionOptions)>,
    completed: Mutex<BTreeSet<usize>>,
    outcomes: Mutex<Vec<ConnectionOutcome>>,
}

impl ConnectionsPlacer {
    /// Берёт из шаблона только связи, в которых участвует зона
    pub fn new(zone: ZoneId, template: &[ConnectionOptions]) -> Self {
        let connections = template
            .iter()
            .enumerate()
            .filter(|(_, c)| c.zone_a == zone || c.zone_b == zone)
            .map(|(i, c)| (i, c.clone()))
            .collect();
        Self {
            zone,
            connections,
            completed: Mutex::new(BTreeSet::new()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn outcomes(&self) -> Vec<ConnectionOutcome> {
        self.outcomes.lock().clone()
    }

    /// Связь уже проведена со стороны другой зоны
    pub fn other_side_connection(&self, index: usize) {
        self.completed.lock().insert(index);
    }

    fn other_zone(&self, connection: &ConnectionOptions) -> ZoneId {
        if connection.zone_a == self.zone {
            connection.zone_b
        } else {
            connection.zone_a
        }
    }

    /// Проход через общую границу двух сухопутных зон.
    ///
    /// Клетка прохода: ближайший к границе `possible`-тайл нашей зоны; к ней
    /// прокладываются пути из сетей обеих зон.
    fn direct_connection(&self, map: &RmgMap, zone: &Zone, other: &Zone) -> Option<Tile> {
        let border: Area = zone
            .area()
            .border_outside()
            .subarea(|t| map.zone_id(t) == Some(other.id()));

        let mut candidates = border;
        while let Some(border_pos) = candidates.first() {
            candidates.erase(border_pos);

            let ours = zone.area_possible();
            let Some(passage) = ours.nearest(border_pos) else {
                return None;
            };
            if map.nearest_object_distance(passage) < MIN_PASSAGE_DISTANCE {
                continue;
            }

            let mut our_path = {
                let areas = zone.lock_areas();
                let mut path = Path::new(&areas.possible + &areas.free);
                path.connect_area(&areas.free);
                path
            };
            our_path = our_path.search(&Area::single(passage), true);

            let mut their_path = {
                let areas = other.lock_areas();
                let mut search = &areas.possible + &areas.free;
                search.add(passage);
                let mut path = Path::new(search);
                path.connect_area(&areas.free);
                path
            };
            their_path = their_path.search(&Area::single(passage), true);

            if !our_path.valid() || !their_path.valid() {
                continue;
            }

            zone.connect_path(map, &our_path);
            other.connect_path(map, &their_path);
            return Some(passage);
        }
        None
    }

    fn water_connection(&self, map: &RmgMap, zone: &Zone, other: &Zone, c: &ConnectionOptions) -> bool {
        if !map.water_content().is_enabled() || zone.is_underground() != other.is_underground() {
            return false;
        }
        map.zones()
            .filter(|z| z.zone_type() == ZoneType::Water)
            .filter_map(|z| z.modificator::<WaterProxy>())
            .any(|proxy| proxy.water_keep_connection(c.zone_a, c.zone_b))
    }

    /// Пара порталов одного канала, по одному в каждой зоне
    fn monolith_connection(&self, map: &RmgMap, zone: &Zone, other: &Zone, index: usize, guard: u32) -> bool {
        let Some(instance) = map.objects().create(ObjectKind::Monolith, index as u32) else {
            error!(
                "No monolith channel {index} for connection {} - {}",
                zone.id(),
                other.id()
            );
            return false;
        };
        let (Some(ours), Some(theirs)) = (
            zone.modificator::<ObjectManager>(),
            other.modificator::<ObjectManager>(),
        ) else {
            return false;
        };
        ours.add_required_object(instance.clone(), guard);
        theirs.add_required_object(instance, guard);
        true
    }

    /// Закрывает внутреннюю границу с сухопутными соседями, кроме проходов
    fn create_border(&self, map: &RmgMap, zone: &Zone) {
        let area = zone.area();
        let outside = area.border_outside();
        let block = area.border_inside().subarea(|t| {
            outside.nearest(t).is_some_and(|n| {
                map.is_on_map(n)
                    && map
                        .zone_id(n)
                        .and_then(|id| map.zone(id))
                        .is_some_and(|z| z.zone_type() != ZoneType::Water)
            })
        });

        let mut areas = zone.lock_areas();
        for tile in &block {
            if map.is_possible(tile) {
                map.set_occupied(tile, Occupancy::Blocked);
                areas.possible.erase(tile);
            }
            for n in tile.direct_neighbours() {
                if map.is_possible(n) && map.zone_id(n) == Some(self.zone) {
                    map.set_occupied(n, Occupancy::Blocked);
                    areas.possible.erase(n);
                }
            }
        }
    }
}

impl Modificator for ConnectionsPlacer {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::ConnectionsPlacer
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, map: &RmgMap) -> StageDeps {
        let mut deps = StageDeps::default();
        deps.dependency(map, self.zone, ModificatorKind::TownPlacer);
        deps.dependency(map, self.zone, ModificatorKind::WaterAdopter);
        for zone in map.zones().filter(|z| z.zone_type() == ZoneType::Water) {
            deps.dependency(map, zone.id(), ModificatorKind::WaterProxy);
        }
        // предыдущая по id зона со стадией связей
        if let Some(prev) = map
            .zones()
            .map(|z| z.id())
            .filter(|&id| id < self.zone)
            .filter(|&id| map.zone(id).is_some_and(|z| z.modificator::<Self>().is_some()))
            .last()
        {
            deps.dependency(map, prev, ModificatorKind::ConnectionsPlacer);
        }

        deps.postfunction(map, self.zone, ModificatorKind::ObjectManager);
        for (_, connection) in &self.connections {
            deps.postfunction(map, self.other_zone(connection), ModificatorKind::ObjectManager);
        }
        deps
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let graph = ZoneGraph::build(map);
        let mut outcomes = Vec::new();

        for (index, connection) in &self.connections {
            if self.completed.lock().contains(index) {
                continue;
            }
            let other_id = self.other_zone(connection);
            let other = map.zone(other_id).ok_or(GenError::UnknownZone(other_id))?;

            let mut kinds = Vec::new();
            let mut passage = None;
            let both_land =
                zone.zone_type() != ZoneType::Water && other.zone_type() != ZoneType::Water;
            if both_land && graph.adjacent(self.zone, other_id) {
                passage = self.direct_connection(map, zone, other);
                if passage.is_some() {
                    kinds.push(ConnectionKind::Direct);
                }
            }
            if self.water_connection(map, zone, other, connection) {
                kinds.push(ConnectionKind::Water);
            }
            if kinds.is_empty() {
                if self.monolith_connection(map, zone, other, *index, connection.guard) {
                    kinds.push(ConnectionKind::Monolith);
                } else {
                    warn!("Connection {} - {} left unrealised", self.zone, other_id);
                }
            }

            debug!("Connection {} - {}: {kinds:?}", connection.zone_a, connection.zone_b);
            if let Some(placer) = other.modificator::<Self>() {
                placer.other_side_connection(*index);
            }
            self.completed.lock().insert(*index);
            outcomes.push(ConnectionOutcome {
                index: *index,
                zone_a: connection.zone_a,
                zone_b: connection.zone_b,
                kinds,
                passage,
            });
        }

        if zone.zone_type() != ZoneType::Water {
            self.create_border(map, zone);
        }
        self.outcomes.lock().extend(outcomes);
        Ok(())
    }
}
