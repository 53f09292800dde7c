// src/generator.rs
//! Сборка карты по шаблону и запуск всех стадий.
//!
//! [`MapGenerator::new`] раскладывает тайлы по зонам, создаёт зоны и
//! подключает к ним стадии. [`MapGenerator::generate`] один раз прогоняет
//! конвейер и собирает отчёт.

use crate::area::{Area, Tile};
use crate::config::{GeneratorConfig, zone_char_id};
use crate::error::{ConfigError, GenError};
use crate::map::graph::ZoneGraph;
use crate::map::png::MapImage;
use crate::map::{RmgMap, Terrain, ZoneId};
use crate::modificator::connections::ConnectionOutcome;
use crate::modificator::water_proxy::RouteInfo;
use crate::modificator::{
    ConnectionsPlacer, ObjectManager, Pipeline, TownPlacer, WaterAdopter, WaterProxy, WaterRoutes,
};
use crate::object::{Object, ObjectTypeRegistry};
use crate::zone::{Zone, ZoneType};
use log::info;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct ZoneReport {
    pub id: ZoneId,
    pub zone_type: ZoneType,
    pub terrain: Terrain,
    pub pos: Tile,
    pub tiles: usize,
    pub possible: usize,
    pub free: usize,
    pub neighbours: Vec<ZoneId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LakeReport {
    pub tiles: usize,
    /// Число слоёв карты расстояний
    pub depth: usize,
    /// Зона → число её тайлов на берегу озера
    pub neighbour_zones: BTreeMap<ZoneId, usize>,
    pub keep_connections: BTreeSet<ZoneId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedObject {
    pub zone: ZoneId,
    pub object: Object,
}

/// Итог генерации
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub levels: u32,
    pub zones: Vec<ZoneReport>,
    pub lakes: Vec<LakeReport>,
    pub routes: BTreeMap<ZoneId, RouteInfo>,
    pub connections: Vec<ConnectionOutcome>,
    pub objects: Vec<PlacedObject>,
}

pub struct MapGenerator {
    config: GeneratorConfig,
    map: RmgMap,
    pipeline: Pipeline,
    report: Option<GenerationReport>,
}

/// Якорь по умолчанию: тайл зоны, ближайший к её центру
fn default_anchor(area: &Area) -> Option<Tile> {
    let first = area.first()?;
    let level = area.subarea(|t| t.z == first.z);
    let n = level.len() as i64;
    let (sx, sy) = level
        .iter()
        .fold((0i64, 0i64), |(sx, sy), t| (sx + i64::from(t.x), sy + i64::from(t.y)));
    let center = Tile::new((sx / n) as i32, (sy / n) as i32, first.z);
    level.nearest(center)
}

impl MapGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenError> {
        Self::with_registry(config, ObjectTypeRegistry::default())
    }

    /// Как [`MapGenerator::new`], но с собственным реестром объектов
    pub fn with_registry(config: GeneratorConfig, objects: ObjectTypeRegistry) -> Result<Self, GenError> {
        let template = &config.template;
        template.validate()?;
        let (width, height, levels) = template.dimensions();
        let mut map = RmgMap::new(
            width,
            height,
            levels,
            config.water.clone(),
            config.water_content,
            objects,
        );

        let mut areas: BTreeMap<ZoneId, Area> = BTreeMap::new();
        for (z, level) in template.levels.iter().enumerate() {
            for (y, row) in level.zones.iter().enumerate() {
                for (x, c) in row.chars().enumerate() {
                    let id = zone_char_id(c).ok_or(ConfigError::UnknownZoneChar(c))?;
                    let options = template.zone(id).ok_or(ConfigError::UnknownZoneChar(c))?;
                    let tile = Tile::new(x as i32, y as i32, z as i32);
                    let terrain = level.terrain_at(x, y).unwrap_or(options.terrain);
                    map.set_zone_id(tile, id);
                    map.set_terrain(tile, terrain);
                    areas.entry(id).or_default().add(tile);
                }
            }
        }

        for options in &template.zones {
            let area = areas.remove(&options.id).unwrap_or_default();
            let pos = options
                .position
                .filter(|p| area.contains(*p))
                .or_else(|| default_anchor(&area))
                .unwrap_or(Tile::new(0, 0, 0));
            let zone = map.add_zone(
                Zone::new(options.id, options.zone_type, options.terrain, config.seed)
                    .with_towns(options.towns)
                    .with_area(area, pos),
            );
            zone.init_free_tiles(&map);
        }

        let water_enabled = config.water_content.is_enabled();
        for zone in map.zones() {
            let id = zone.id();
            zone.attach(TownPlacer::new(id));
            zone.attach(ConnectionsPlacer::new(id, &template.connections));
            zone.attach(ObjectManager::new(id));
            if !water_enabled {
                continue;
            }
            if zone.zone_type() == ZoneType::Water {
                zone.attach(WaterProxy::new(id));
                zone.attach(WaterRoutes::new(id));
            } else {
                zone.attach(WaterAdopter::new(id));
            }
        }

        let pipeline = Pipeline::build(&map)?;
        info!(
            "Map {width}x{height}x{levels}: {} zones, {} stages",
            template.zones.len(),
            pipeline.len()
        );
        Ok(Self {
            config,
            map,
            pipeline,
            report: None,
        })
    }

    pub fn map(&self) -> &RmgMap {
        &self.map
    }

    /// Прогоняет конвейер. Повторный вызов возвращает тот же отчёт.
    pub fn generate(&mut self) -> Result<&GenerationReport, GenError> {
        let report = match self.report.take() {
            Some(report) => report,
            None => {
                self.pipeline.run(&self.map)?;
                self.build_report()
            }
        };
        Ok(self.report.insert(report))
    }

    /// Размещённые объекты всех зон
    pub fn objects(&self) -> Vec<PlacedObject> {
        self.map
            .zones()
            .filter_map(|z| z.modificator::<ObjectManager>().map(|m| (z.id(), m)))
            .flat_map(|(zone, manager)| {
                manager
                    .placed_objects()
                    .into_iter()
                    .map(move |object| PlacedObject { zone, object })
            })
            .collect()
    }

    fn build_report(&self) -> GenerationReport {
        let graph = ZoneGraph::build(&self.map);
        let zones = self
            .map
            .zones()
            .map(|zone| {
                let areas = zone.lock_areas();
                ZoneReport {
                    id: zone.id(),
                    zone_type: zone.zone_type(),
                    terrain: zone.terrain(),
                    pos: zone.pos(),
                    tiles: areas.area.len(),
                    possible: areas.possible.len(),
                    free: areas.free.len(),
                    neighbours: graph.neighbours(zone.id()),
                }
            })
            .collect();

        let mut lakes = Vec::new();
        let mut routes = BTreeMap::new();
        let mut connections = Vec::new();
        for zone in self.map.zones() {
            if let Some(proxy) = zone.modificator::<WaterProxy>() {
                lakes.extend(proxy.lakes().into_iter().map(|lake| LakeReport {
                    tiles: lake.area.len(),
                    depth: lake.reverse_distance_map.len(),
                    neighbour_zones: lake
                        .neighbour_zones
                        .iter()
                        .map(|(&id, border)| (id, border.len()))
                        .collect(),
                    keep_connections: lake.keep_connections,
                }));
            }
            if let Some(water_routes) = zone.modificator::<WaterRoutes>() {
                routes.extend(water_routes.results());
            }
            if let Some(placer) = zone.modificator::<ConnectionsPlacer>() {
                connections.extend(placer.outcomes());
            }
        }
        connections.sort_by_key(|c: &ConnectionOutcome| c.index);

        GenerationReport {
            seed: self.config.seed,
            width: self.map.width(),
            height: self.map.height(),
            levels: self.map.levels(),
            zones,
            lakes,
            routes,
            connections,
            objects: self.objects(),
        }
    }

    /// Символ на тайл, уровни разделены пустой строкой. Символ берётся у
    /// первой стадии, которой есть что сказать о тайле; иначе id зоны.
    pub fn text_dump(&self) -> String {
        let stages: Vec<_> = self.map.zones().flat_map(|z| z.stages().all()).collect();
        let mut out = String::new();
        for z in 0..self.map.levels() as i32 {
            if z > 0 {
                out.push('\n');
            }
            for y in 0..self.map.height() as i32 {
                for x in 0..self.map.width() as i32 {
                    let tile = Tile::new(x, y, z);
                    let c = stages
                        .iter()
                        .map(|s| s.dump_char(&self.map, tile))
                        .find(|&c| c != ' ')
                        .or_else(|| {
                            self.map
                                .zone_id(tile)
                                .and_then(|id| char::from_digit(id, 36))
                        })
                        .unwrap_or(' ');
                    out.push(c);
                }
                out.push('\n');
            }
        }
        out
    }

    /// Отладочная картинка карты
    pub fn render(&self, scale: u32) -> MapImage {
        let objects: Vec<Object> = self.objects().into_iter().map(|p| p.object).collect();
        MapImage::render(&self.map, &objects, scale)
    }
}
