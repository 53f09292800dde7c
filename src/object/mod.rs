// src/object/mod.rs
//! Объекты карты: лодки, верфи и порталы.
//!
//! Экземпляр хранит форму (смещения занятых тайлов относительно позиции) и
//! посещаемую клетку. Свойства конкретного вида лежат в [`ObjectVariant`].

pub mod registry;

pub use registry::ObjectTypeRegistry;

use crate::area::{Area, Tile};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Boat,
    Shipyard,
    Monolith,
}

/// Слой передвижения лодки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Land,
    Sail,
    Water,
    Air,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    Neutral,
    Player(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ObjectVariant {
    Boat { layer: Layer },
    Shipyard { owner: Owner },
    /// Двусторонний портал; порталы одного канала связаны
    Monolith { channel: u32 },
}

pub type Offset = (i32, i32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInstance {
    pub kind: ObjectKind,
    pub subtype: u32,
    pub name: String,
    /// Занятые тайлы относительно позиции объекта
    pub footprint: Vec<Offset>,
    pub visitable: Offset,
    pub variant: ObjectVariant,
}

impl ObjectInstance {
    /// Лодка, которая ходит по воде
    #[must_use]
    pub fn is_sailing(&self) -> bool {
        matches!(self.variant, ObjectVariant::Boat { layer: Layer::Sail })
    }

    pub fn set_owner(&mut self, owner: Owner) {
        if let ObjectVariant::Shipyard { owner: current } = &mut self.variant {
            *current = owner;
        }
    }
}

/// Охрана объекта: стоит на соседней с входом клетке
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Guard {
    pub strength: u32,
    pub offset: Offset,
}

/// Объект с позицией на карте
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    pub instance: ObjectInstance,
    pub position: Tile,
    pub guard: Option<Guard>,
}

impl Object {
    #[must_use]
    pub fn new(instance: ObjectInstance) -> Self {
        Self {
            instance,
            position: Tile::new(0, 0, 0),
            guard: None,
        }
    }

    pub fn set_position(&mut self, position: Tile) {
        self.position = position;
    }

    pub fn set_guard(&mut self, guard: Option<Guard>) {
        self.guard = guard;
    }

    /// Тайлы самого объекта, без охраны
    #[must_use]
    pub fn base_area(&self) -> Area {
        self.instance
            .footprint
            .iter()
            .map(|&(dx, dy)| self.position.offset(dx, dy))
            .collect()
    }

    /// Тайлы объекта вместе с охраной
    #[must_use]
    pub fn area(&self) -> Area {
        let mut area = self.base_area();
        if let Some(guard) = self.guard_position() {
            area.add(guard);
        }
        area
    }

    #[must_use]
    pub fn visitable_position(&self) -> Tile {
        let (dx, dy) = self.instance.visitable;
        self.position.offset(dx, dy)
    }

    #[must_use]
    pub fn guard_position(&self) -> Option<Tile> {
        self.guard
            .map(|g| self.position.offset(g.offset.0, g.offset.1))
    }

    /// Клетки, с которых объект можно посетить.
    ///
    /// У охраняемого объекта проход идёт через охрану.
    #[must_use]
    pub fn accessible_area(&self, guarded: bool) -> Area {
        let from = match (guarded, self.guard_position()) {
            (true, Some(guard)) => guard,
            _ => self.visitable_position(),
        };
        let own = self.area();
        from.neighbours().filter(|t| !own.contains(*t)).collect()
    }

    /// Смещение клетки перед входом: предпочтительно снизу от посещаемой
    #[must_use]
    pub fn entrance_offset(&self) -> Offset {
        let (vx, vy) = self.instance.visitable;
        let footprint = &self.instance.footprint;
        [(0, 1), (-1, 1), (1, 1), (-1, 0), (1, 0), (0, -1), (-1, -1), (1, -1)]
            .into_iter()
            .map(|(dx, dy)| (vx + dx, vy + dy))
            .find(|offset| !footprint.contains(offset))
            .unwrap_or((vx, vy + 1))
    }
}
