use super::{Modificator, ModificatorKind, StageDeps};
use crate::error::GenError;
use crate::map::{RmgMap, ZoneId};
use log::debug;
use std::sync::atomic::{AtomicU32, Ordering};

/// Подсчитывает города зоны: шаблонные плюс главный город стартовой зоны
pub struct TownPlacer {
    zone: ZoneId,
    total_towns: AtomicU32,
}

impl TownPlacer {
    pub fn new(zone: ZoneId) -> Self {
        Self {
            zone,
            total_towns: AtomicU32::new(0),
        }
    }

    /// До выполнения стадии всегда 0
    pub fn total_towns(&self) -> u32 {
        self.total_towns.load(Ordering::Acquire)
    }
}

impl Modificator for TownPlacer {
    fn kind(&self) -> ModificatorKind {
        ModificatorKind::TownPlacer
    }

    fn zone_id(&self) -> ZoneId {
        self.zone
    }

    fn init(&self, _map: &RmgMap) -> StageDeps {
        StageDeps::default()
    }

    fn process(&self, map: &RmgMap) -> Result<(), GenError> {
        let zone = map.zone(self.zone).ok_or(GenError::UnknownZone(self.zone))?;
        let main_town = u32::from(zone.zone_type().is_start());
        let total = zone.towns() + main_town;
        self.total_towns.store(total, Ordering::Release);
        debug!("Zone {}: {total} towns", self.zone);
        Ok(())
    }
}
