use super::{Modificator, ModificatorKind, StageDeps, WaterProxy};
use super::water_proxy::RouteInfo;
use crate::area::Tile;
use crate::error::GenError;
use crate::map::{RmgMap, ZoneId};
use crate::zone::ZoneType;
use log::error;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Проводит морские маршруты от водной зоны ко всем сухопутным
pub struct WaterRoutes {
    zone: ZoneId,
    results: Mutex<BTreeMap<ZoneId, RouteInfo>>,
}

impl WaterRoutes {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            results: Mutex::new(BTreeMap::new()),
        }
    }

    /// Маршрут по каждой сухопутной зоне; пустой, если ничего не размещено
    pub fn results(&self) -> BTreeMap<ZoneId, RouteInfo> {
        self.results.lock().clone()
    }

    /// `B` посадка, `@` вход объекта, `#` объект, `+`/`-` место корабля
    /// в сети путей или вне её, `.` вода в сети путей, `~` прочая вода.
    pub fn dump(&self, map: &RmgMap, tile: Tile) -> char {
        for route in self.results.lock().values() {
            if route.boarding == Some(tile) {
                return 'B';
            }
            if route.visitable == Some(tile) {
                return '@';
            }
            if route.blocked.contains(tile) {
                return '#';
            }
            if route.water.contains(tile) {
                let free = map
                    .zone(self.zone)
                    .is_some_and(|z| z.lock_areas().free.contains(tile));
                return if free { '+' } else { '-' };
            }
        }

        let Some(zone) = map.zone(self.zone) else {
            return ' ';
        };
        let areas = zone.lock_areas();
        if areas.free.contains(tile) {
            '.'
        } else if areas.area.contains(tile) {
            '~'
        } else {
            ' '
        }
    }
}

impl Modificator for WaterRoutes {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::WaterRoutes
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, map: &RmgMap) -> StageDeps {
        let mut deps = StageDeps::default();
        deps.dependency(map, self.zone, ModificatorKind::WaterProxy);
        for zone in map.zones() {
            deps.dependency(map, zone.id(), ModificatorKind::ConnectionsPlacer);
            deps.postfunction(map, zone.id(), ModificatorKind::ObjectManager);
        }
        deps
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let Some(proxy) = zone.modificator::<WaterProxy>() else {
            error!("Water zone {} has no lakes to route", self.zone);
            return Ok(());
        };

        for land in map.zones().filter(|z| z.zone_type() != ZoneType::Water) {
            let route = proxy.water_route(map, land);
            self.results.lock().insert(land.id(), route);
        }
        Ok(())
    }

    fn dump_char(&self, map: &RmgMap, tile: Tile) -> char {
        self.dump(map, tile)
    }
}
