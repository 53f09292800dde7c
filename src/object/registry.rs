// src/object/registry.rs
//! Реестр типов объектов: какие подтипы существуют и как их создать.

use super::{Layer, ObjectInstance, ObjectKind, ObjectVariant, Offset, Owner};
use crate::map::Terrain;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Шаблон подтипа
#[derive(Debug, Clone)]
struct ObjectType {
    name: &'static str,
    footprint: Vec<Offset>,
    visitable: Offset,
    /// Поверхности, на которых подтип допустим; пустой список разрешает любые
    terrains: Vec<Terrain>,
    variant: ObjectVariant,
}

#[derive(Debug, Clone)]
pub struct ObjectTypeRegistry {
    types: BTreeMap<(ObjectKind, u32), ObjectType>,
}

const SHIPYARD_FOOTPRINT: [Offset; 6] = [(-2, -1), (-1, -1), (0, -1), (-2, 0), (-1, 0), (0, 0)];

/// Каналов порталов в реестре по умолчанию
pub const MONOLITH_CHANNELS: u32 = 32;

impl Default for ObjectTypeRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (subtype, name) in ["boat_necropolis", "boat_castle", "boat_fortress"].into_iter().enumerate() {
            registry.register(
                ObjectKind::Boat,
                subtype as u32,
                ObjectType {
                    name,
                    footprint: vec![(0, 0)],
                    visitable: (0, 0),
                    terrains: Vec::new(),
                    variant: ObjectVariant::Boat { layer: Layer::Sail },
                },
            );
        }
        registry.register(
            ObjectKind::Boat,
            3,
            ObjectType {
                name: "airship",
                footprint: vec![(0, 0)],
                visitable: (0, 0),
                terrains: Vec::new(),
                variant: ObjectVariant::Boat { layer: Layer::Air },
            },
        );

        registry.register(
            ObjectKind::Shipyard,
            0,
            ObjectType {
                name: "shipyard",
                footprint: SHIPYARD_FOOTPRINT.to_vec(),
                visitable: (-1, 0),
                terrains: Vec::new(),
                variant: ObjectVariant::Shipyard {
                    owner: Owner::Neutral,
                },
            },
        );
        registry.register(
            ObjectKind::Shipyard,
            1,
            ObjectType {
                name: "shipyard_snow",
                footprint: SHIPYARD_FOOTPRINT.to_vec(),
                visitable: (-1, 0),
                terrains: vec![Terrain::Snow],
                variant: ObjectVariant::Shipyard {
                    owner: Owner::Neutral,
                },
            },
        );

        for channel in 0..MONOLITH_CHANNELS {
            registry.register(
                ObjectKind::Monolith,
                channel,
                ObjectType {
                    name: "monolith_two_way",
                    footprint: vec![(0, 0)],
                    visitable: (0, 0),
                    terrains: Vec::new(),
                    variant: ObjectVariant::Monolith { channel },
                },
            );
        }
        registry
    }
}

impl ObjectTypeRegistry {
    /// Реестр без единого типа
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    fn register(&mut self, kind: ObjectKind, subtype: u32, object: ObjectType) {
        self.types.insert((kind, subtype), object);
    }

    /// Убирает все подтипы вида
    pub fn remove_kind(&mut self, kind: ObjectKind) {
        self.types.retain(|(k, _), _| *k != kind);
    }

    /// Известные подтипы вида по возрастанию
    #[must_use]
    pub fn known_subtypes(&self, kind: ObjectKind) -> Vec<u32> {
        self.types
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|&(_, subtype)| subtype)
            .collect()
    }

    #[must_use]
    pub fn create(&self, kind: ObjectKind, subtype: u32) -> Option<ObjectInstance> {
        let object = self.types.get(&(kind, subtype))?;
        Some(ObjectInstance {
            kind,
            subtype,
            name: object.name.to_string(),
            footprint: object.footprint.clone(),
            visitable: object.visitable,
            variant: object.variant.clone(),
        })
    }

    /// Случайный подтип вида, допустимый на поверхности `terrain`
    pub fn choose_random_appearance(
        &self,
        rng: &mut ChaCha8Rng,
        kind: ObjectKind,
        terrain: Terrain,
    ) -> Option<u32> {
        let candidates: Vec<u32> = self
            .types
            .iter()
            .filter(|((k, _), object)| {
                *k == kind && (object.terrains.is_empty() || object.terrains.contains(&terrain))
            })
            .map(|(&(_, subtype), _)| subtype)
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.gen_range(0..candidates.len())])
    }
}
