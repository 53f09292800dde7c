// src/modificator/water_adopter.rs
//! Побережье сухопутной зоны.
//!
//! Берегом считается тайл зоны, у которого есть сосед с водной поверхностью
//! или сосед из водной зоны. Сами водные тайлы зоны берегом не являются:
//! их позже заберёт водная зона.

use super::{Modificator, ModificatorKind, StageDeps};
use crate::area::{Area, Tile};
use crate::error::GenError;
use crate::map::{RmgMap, ZoneId};
use crate::zone::ZoneType;
use log::debug;
use parking_lot::Mutex;

pub struct WaterAdopter {
    zone: ZoneId,
    coast: Mutex<Area>,
}

impl WaterAdopter {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            coast: Mutex::new(Area::new()),
        }
    }

    pub fn coast_tiles(&self) -> Area {
        self.coast.lock().clone()
    }
}

impl Modificator for WaterAdopter {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::WaterAdopter
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, map: &RmgMap) -> StageDeps {
        let mut deps = StageDeps::default();
        deps.dependency(map, self.zone, ModificatorKind::TownPlacer);
        deps.postfunction(map, self.zone, ModificatorKind::ConnectionsPlacer);
        deps
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let is_water = |tile: Tile| {
            map.terrain(tile).is_some_and(|t| t.is_water())
                || map
                    .zone_id(tile)
                    .and_then(|id| map.zone(id))
                    .is_some_and(|z| z.zone_type() == ZoneType::Water)
        };

        let area = zone.area();
        let coast = area.subarea(|tile| !is_water(tile) && tile.neighbours().any(is_water));
        debug!("Zone {}: {} coast tiles", self.zone, coast.len());
        *self.coast.lock() = coast;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WaterContent, WaterSettings};
    use crate::map::Terrain;
    use crate::object::ObjectTypeRegistry;
    use crate::zone::Zone;

    #[test]
    fn coast_touches_water_terrain_or_water_zone() {
        let mut map = RmgMap::new(
            6,
            1,
            1,
            WaterSettings::default(),
            WaterContent::Normal,
            ObjectTypeRegistry::default(),
        );
        // 1 1 ~ 1 | 2 2, 2 это водная зона
        let land: Area = (0..4).map(|x| Tile::new(x, 0, 0)).collect();
        let water: Area = (4..6).map(|x| Tile::new(x, 0, 0)).collect();
        for t in &land {
            map.set_zone_id(t, 1);
        }
        for t in &water {
            map.set_zone_id(t, 2);
            map.set_terrain(t, Terrain::Water);
        }
        map.set_terrain(Tile::new(2, 0, 0), Terrain::Water);

        let zone = map.add_zone(
            Zone::new(1, ZoneType::Treasure, Terrain::Grass, 0).with_area(land, Tile::new(0, 0, 0)),
        );
        map.add_zone(
            Zone::new(2, ZoneType::Water, Terrain::Water, 0).with_area(water, Tile::new(5, 0, 0)),
        );
        let adopter = zone.attach(WaterAdopter::new(1));
        adopter.process(&map).unwrap();

        assert_eq!(
            adopter.coast_tiles().to_vec(),
            vec![Tile::new(1, 0, 0), Tile::new(3, 0, 0)]
        );
    }
}
