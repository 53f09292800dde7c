// src/modificator/mod.rs
//! Стадии генерации зоны (модификаторы).
//!
//! Каждая стадия принадлежит одной зоне. На этапе `init` стадия сообщает,
//! какие стадии должны отработать до неё (зависимости) и после неё
//! (постфункции). Планировщик в [`pipeline`] строит из этого граф и
//! запускает независимые стадии волнами.

pub mod connections;
pub mod object_manager;
pub mod pipeline;
pub mod town_placer;
pub mod water_adopter;
pub mod water_proxy;
pub mod water_routes;

pub use connections::ConnectionsPlacer;
pub use object_manager::ObjectManager;
pub use pipeline::Pipeline;
pub use town_placer::TownPlacer;
pub use water_adopter::WaterAdopter;
pub use water_proxy::WaterProxy;
pub use water_routes::WaterRoutes;

use crate::area::Tile;
use crate::error::GenError;
use crate::map::{RmgMap, ZoneId};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ModificatorKind {
    TownPlacer,
    WaterAdopter,
    WaterProxy,
    ConnectionsPlacer,
    WaterRoutes,
    ObjectManager,
}

/// Адрес стадии: зона и вид
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StageRef {
    pub zone: ZoneId,
    pub kind: ModificatorKind,
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.kind, self.zone)
    }
}

/// Порядковые ограничения стадии
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageDeps {
    /// Стадии, которые должны завершиться раньше
    pub dependencies: Vec<StageRef>,
    /// Стадии, которые должны начаться позже
    pub postfunctions: Vec<StageRef>,
}

impl StageDeps {
    /// Ссылки на отсутствующие стадии пропускаются
    pub fn dependency(&mut self, map: &RmgMap, zone: ZoneId, kind: ModificatorKind) {
        if has_stage(map, zone, kind) {
            self.dependencies.push(StageRef { zone, kind });
        }
    }

    pub fn postfunction(&mut self, map: &RmgMap, zone: ZoneId, kind: ModificatorKind) {
        if has_stage(map, zone, kind) {
            self.postfunctions.push(StageRef { zone, kind });
        }
    }
}

fn has_stage(map: &RmgMap, zone: ZoneId, kind: ModificatorKind) -> bool {
    map.zone(zone).is_some_and(|z| z.stages().get(kind).is_some())
}

pub trait Modificator: Send + Sync {
    fn kind(&self) -> ModificatorKind;

    fn zone_id(&self) -> ZoneId;

    fn stage_ref(&self) -> StageRef {
        StageRef {
            zone: self.zone_id(),
            kind: self.kind(),
        }
    }

    fn init(&self, map: &RmgMap) -> StageDeps;

    fn process(&self, map: &RmgMap) -> Result<(), GenError>;

    /// Символ тайла для текстового дампа; пробел, если стадии нечего сказать
    fn dump_char(&self, _map: &RmgMap, _tile: Tile) -> char {
        ' '
    }
}

/// Слоты стадий зоны, не больше одной стадии каждого вида
#[derive(Default)]
pub struct ZoneStages {
    town_placer: OnceLock<Arc<TownPlacer>>,
    water_adopter: OnceLock<Arc<WaterAdopter>>,
    water_proxy: OnceLock<Arc<WaterProxy>>,
    connections: OnceLock<Arc<ConnectionsPlacer>>,
    water_routes: OnceLock<Arc<WaterRoutes>>,
    object_manager: OnceLock<Arc<ObjectManager>>,
}

fn erase<T: Modificator + 'static>(slot: &OnceLock<Arc<T>>) -> Option<Arc<dyn Modificator>> {
    slot.get().map(|s| Arc::clone(s) as Arc<dyn Modificator>)
}

impl ZoneStages {
    pub fn get(&self, kind: ModificatorKind) -> Option<Arc<dyn Modificator>> {
        match kind {
            ModificatorKind::TownPlacer => erase(&self.town_placer),
            ModificatorKind::WaterAdopter => erase(&self.water_adopter),
            ModificatorKind::WaterProxy => erase(&self.water_proxy),
            ModificatorKind::ConnectionsPlacer => erase(&self.connections),
            ModificatorKind::WaterRoutes => erase(&self.water_routes),
            ModificatorKind::ObjectManager => erase(&self.object_manager),
        }
    }

    /// Подключённые стадии. Дамп берёт первый непробельный символ, поэтому
    /// маршруты идут раньше озёр.
    pub fn all(&self) -> Vec<Arc<dyn Modificator>> {
        [
            ModificatorKind::WaterRoutes,
            ModificatorKind::WaterProxy,
            ModificatorKind::TownPlacer,
            ModificatorKind::WaterAdopter,
            ModificatorKind::ConnectionsPlacer,
            ModificatorKind::ObjectManager,
        ]
        .into_iter()
        .filter_map(|kind| self.get(kind))
        .collect()
    }
}

/// Стадия с собственным слотом в [`ZoneStages`]
pub trait Stage: Modificator + Sized + 'static {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>>;
}

impl Stage for TownPlacer {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.town_placer
    }
}

impl Stage for WaterAdopter {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.water_adopter
    }
}

impl Stage for WaterProxy {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.water_proxy
    }
}

impl Stage for ConnectionsPlacer {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.connections
    }
}

impl Stage for WaterRoutes {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.water_routes
    }
}

impl Stage for ObjectManager {
    fn slot(stages: &ZoneStages) -> &OnceLock<Arc<Self>> {
        &stages.object_manager
    }
}
