// src/area/path.rs
//! Поиск пути внутри области.
//!
//! [`Path`] хранит область, по которой разрешено двигаться, и уже построенную
//! сеть проходов. Поиск идёт от целевого тайла к ближайшей точке сети.

use super::{Area, DIRS, DIRS4, Tile};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

const STRAIGHT_COST: u32 = 10;
const DIAGONAL_COST: u32 = 14;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    area: Area,
    path: Area,
}

impl Path {
    #[must_use]
    pub fn new(area: Area) -> Self {
        Self {
            area,
            path: Area::new(),
        }
    }

    /// Путь без сети проходов
    #[must_use]
    pub fn invalid() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn valid(&self) -> bool {
        !self.path.is_empty()
    }

    /// Тайлы сети проходов
    #[must_use]
    pub fn path_area(&self) -> &Area {
        &self.path
    }

    /// Область, по которой разрешён поиск
    #[must_use]
    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn connect(&mut self, other: &Path) {
        self.path.unite(&other.path);
    }

    pub fn connect_area(&mut self, area: &Area) {
        self.path.unite(area);
    }

    /// Прокладывает маршрут от `dst` до существующей сети.
    ///
    /// Старт с тайла `dst`, ближайшего к сети. Двигаться можно по области поиска
    /// и по самой сети. `straight` оставляет только прямые шаги.
    /// Результат: сеть, дополненная найденным маршрутом; если сеть пуста или
    /// маршрута нет, возвращается невалидный путь.
    #[must_use]
    pub fn search(&self, dst: &Area, straight: bool) -> Path {
        let mut result = Path::new(self.area.clone());
        let Some(src) = dst.nearest_to(&self.path) else {
            return result;
        };

        if self.path.contains(src) {
            result.connect_area(&self.path);
            return result;
        }

        let moves: Vec<(i32, i32, u32)> = if straight {
            DIRS4.iter().map(|&(dx, dy)| (dx, dy, STRAIGHT_COST)).collect()
        } else {
            DIRS.iter()
                .map(|&(dx, dy)| {
                    let cost = if dx != 0 && dy != 0 {
                        DIAGONAL_COST
                    } else {
                        STRAIGHT_COST
                    };
                    (dx, dy, cost)
                })
                .collect()
        };

        let mut best: BTreeMap<Tile, u32> = BTreeMap::new();
        let mut came_from: BTreeMap<Tile, Tile> = BTreeMap::new();
        let mut open = BinaryHeap::new();
        best.insert(src, 0);
        open.push(Reverse((0u32, src)));

        while let Some(Reverse((cost, tile))) = open.pop() {
            if best.get(&tile).is_some_and(|&known| cost > known) {
                continue;
            }

            if self.path.contains(tile) {
                result.connect_area(&self.path);
                let mut current = tile;
                result.path.add(current);
                while let Some(&prev) = came_from.get(&current) {
                    result.path.add(prev);
                    current = prev;
                }
                return result;
            }

            for &(dx, dy, step) in &moves {
                let next = tile.offset(dx, dy);
                if !self.area.contains(next) && !self.path.contains(next) {
                    continue;
                }
                let next_cost = cost + step;
                if best.get(&next).is_none_or(|&known| next_cost < known) {
                    best.insert(next, next_cost);
                    came_from.insert(next, tile);
                    open.push(Reverse((next_cost, next)));
                }
            }
        }

        result
    }
}
