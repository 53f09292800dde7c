// src/area/mod.rs
//! Алгебра областей
//!
//! [`Area`] это множество тайлов со всеми операциями, которые нужны генератору зон:
//! - объединение, пересечение, разность (методы и операторы `+`, `*`, `-` над `&Area`)
//! - внутренняя и внешняя граница (8-связное соседство)
//! - разбиение на связные компоненты ([`connected_areas`], [`Area::components`])
//! - послойная карта расстояний от внешней границы ([`Area::compute_distance_map`])
//!
//! ## Порядок обхода
//!
//! Тайлы хранятся в `BTreeSet` и упорядочены канонически: сначала уровень `z`,
//! затем строка `y`, затем столбец `x`. Любой перебор кандидатов в генераторе
//! идёт в этом порядке, поэтому при одинаковом сиде результат воспроизводим.

pub mod path;

pub use path::Path;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::ops;

/// Восемь направлений на плоскости уровня
pub const DIRS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Четыре прямых направления
pub const DIRS4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Координата тайла. `z` задаёт уровень карты (0 = поверхность, 1 = подземелье).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Tile {
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z)
    }

    /// Квадрат расстояния в плоскости уровня (уровень не учитывается)
    #[must_use]
    pub fn dist_sqr(self, other: Tile) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        dx * dx + dy * dy
    }

    #[must_use]
    pub fn dist(self, other: Tile) -> f32 {
        (self.dist_sqr(other) as f32).sqrt()
    }

    pub fn neighbours(self) -> impl Iterator<Item = Tile> {
        DIRS.iter().map(move |&(dx, dy)| self.offset(dx, dy))
    }

    pub fn direct_neighbours(self) -> impl Iterator<Item = Tile> {
        DIRS4.iter().map(move |&(dx, dy)| self.offset(dx, dy))
    }
}

impl Ord for Tile {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.z, self.y, self.x).cmp(&(other.z, other.y, other.x))
    }
}

impl PartialOrd for Tile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Множество тайлов
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Area {
    tiles: BTreeSet<Tile>,
}

impl Area {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(tile: Tile) -> Self {
        let mut area = Self::new();
        area.add(tile);
        area
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    /// Все тайлы `other` принадлежат этой области
    #[must_use]
    pub fn contains_all(&self, other: &Area) -> bool {
        other.tiles.is_subset(&self.tiles)
    }

    #[must_use]
    pub fn overlap(&self, other: &Area) -> bool {
        !self.tiles.is_disjoint(&other.tiles)
    }

    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        self.tiles.iter().copied()
    }

    /// Первый тайл в каноническом порядке
    #[must_use]
    pub fn first(&self) -> Option<Tile> {
        self.tiles.first().copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Tile> {
        self.iter().collect()
    }

    pub fn add(&mut self, tile: Tile) -> bool {
        self.tiles.insert(tile)
    }

    pub fn erase(&mut self, tile: Tile) -> bool {
        self.tiles.remove(&tile)
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn unite(&mut self, other: &Area) {
        self.tiles.extend(other.tiles.iter().copied());
    }

    pub fn intersect(&mut self, other: &Area) {
        self.tiles.retain(|t| other.tiles.contains(t));
    }

    pub fn subtract(&mut self, other: &Area) {
        if other.is_empty() {
            return;
        }
        self.tiles.retain(|t| !other.tiles.contains(t));
    }

    /// Тайлы области, у которых есть сосед вне области
    #[must_use]
    pub fn border_inside(&self) -> Area {
        self.tiles
            .iter()
            .copied()
            .filter(|t| t.neighbours().any(|n| !self.tiles.contains(&n)))
            .collect()
    }

    /// Тайлы вне области, соседние с ней. Могут лежать за краем карты,
    /// фильтрует вызывающая сторона.
    #[must_use]
    pub fn border_outside(&self) -> Area {
        let mut result = Area::new();
        for tile in &self.tiles {
            for n in tile.neighbours() {
                if !self.tiles.contains(&n) {
                    result.add(n);
                }
            }
        }
        result
    }

    /// Квадрат расстояния от `tile` до ближайшего тайла области
    #[must_use]
    pub fn distance_sqr(&self, tile: Tile) -> Option<i64> {
        self.tiles.iter().map(|t| t.dist_sqr(tile)).min()
    }

    /// Ближайший к `tile` тайл области; при равенстве первый по порядку
    #[must_use]
    pub fn nearest(&self, tile: Tile) -> Option<Tile> {
        self.tiles
            .iter()
            .copied()
            .min_by_key(|t| (t.dist_sqr(tile), *t))
    }

    /// Тайл этой области, ближайший к любому тайлу `other`
    #[must_use]
    pub fn nearest_to(&self, other: &Area) -> Option<Tile> {
        if other.is_empty() {
            return None;
        }
        self.tiles
            .iter()
            .copied()
            .min_by_key(|&t| (other.distance_sqr(t).unwrap_or(i64::MAX), t))
    }

    #[must_use]
    pub fn subarea(&self, filter: impl Fn(Tile) -> bool) -> Area {
        self.iter().filter(|&t| filter(t)).collect()
    }

    #[must_use]
    pub fn translate(&self, dx: i32, dy: i32, dz: i32) -> Area {
        self.iter()
            .map(|t| Tile::new(t.x + dx, t.y + dy, t.z + dz))
            .collect()
    }

    /// Максимальные связные компоненты. `diagonal` разрешает связь по диагонали.
    #[must_use]
    pub fn components(&self, diagonal: bool) -> Vec<Area> {
        let mut result = Vec::new();
        let mut visited: BTreeSet<Tile> = BTreeSet::new();

        for start in &self.tiles {
            if visited.contains(start) {
                continue;
            }

            let mut component = Area::new();
            let mut queue = VecDeque::new();
            queue.push_back(*start);
            visited.insert(*start);

            while let Some(tile) = queue.pop_front() {
                component.add(tile);
                let dirs: &[(i32, i32)] = if diagonal { &DIRS } else { &DIRS4 };
                for &(dx, dy) in dirs {
                    let n = tile.offset(dx, dy);
                    if self.tiles.contains(&n) && visited.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
            result.push(component);
        }
        result
    }

    /// Послойная карта расстояний от внешней границы.
    ///
    /// Слой 0 это внутренняя граница области, слой 1 внутренняя граница
    /// оставшегося после снятия слоя 0 и т.д. Возвращает прямую карту
    /// (тайл → слой) и обратную (слой → тайлы слоя).
    #[must_use]
    pub fn compute_distance_map(&self) -> (BTreeMap<Tile, u32>, BTreeMap<u32, Area>) {
        let mut distances = BTreeMap::new();
        let mut layers = BTreeMap::new();
        let mut rest = self.clone();
        let mut distance = 0;

        while !rest.is_empty() {
            let border = rest.border_inside();
            for tile in border.iter() {
                distances.insert(tile, distance);
            }
            rest.subtract(&border);
            layers.insert(distance, border);
            distance += 1;
        }
        (distances, layers)
    }
}

impl FromIterator<Tile> for Area {
    fn from_iter<I: IntoIterator<Item = Tile>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

impl Extend<Tile> for Area {
    fn extend<I: IntoIterator<Item = Tile>>(&mut self, iter: I) {
        self.tiles.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Area {
    type Item = Tile;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, Tile>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter().copied()
    }
}

impl ops::Add for &Area {
    type Output = Area;

    fn add(self, rhs: &Area) -> Area {
        let mut result = self.clone();
        result.unite(rhs);
        result
    }
}

impl ops::Sub for &Area {
    type Output = Area;

    fn sub(self, rhs: &Area) -> Area {
        let mut result = self.clone();
        result.subtract(rhs);
        result
    }
}

impl ops::Mul for &Area {
    type Output = Area;

    fn mul(self, rhs: &Area) -> Area {
        let mut result = self.clone();
        result.intersect(rhs);
        result
    }
}

/// Связная компонента с необязательной внешней границей
#[derive(Debug, Clone)]
pub struct ConnectedArea {
    pub area: Area,
    pub border_outside: Option<Area>,
}

/// Разбивает область на ортогонально связные компоненты.
///
/// Диагональное касание водоёмы не объединяет: по такому стыку корабль
/// не проходит между двумя берегами.
#[must_use]
pub fn connected_areas(area: &Area, compute_borders: bool) -> Vec<ConnectedArea> {
    area.components(false)
        .into_iter()
        .map(|component| {
            let border_outside = compute_borders.then(|| component.border_outside());
            ConnectedArea {
                area: component,
                border_outside,
            }
        })
        .collect()
}
