use serde::{Deserialize, Serialize};

/// Тип поверхности тайла
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Dirt,
    Sand,
    #[default]
    Grass,
    Snow,
    Swamp,
    Rough,
    Subterranean,
    Lava,
    Water,
    Rock,
}

impl Terrain {
    #[must_use]
    pub fn is_water(self) -> bool {
        self == Terrain::Water
    }

    #[must_use]
    pub fn is_passable(self) -> bool {
        self != Terrain::Rock
    }

    /// Символ переопределения поверхности в раскладке шаблона.
    /// `.` (поверхность зоны) обрабатывается вызывающей стороной.
    #[must_use]
    pub fn from_layout_char(c: char) -> Option<Self> {
        match c {
            '~' => Some(Terrain::Water),
            '#' => Some(Terrain::Rock),
            's' => Some(Terrain::Sand),
            'd' => Some(Terrain::Dirt),
            'g' => Some(Terrain::Grass),
            'w' => Some(Terrain::Snow),
            'm' => Some(Terrain::Swamp),
            'r' => Some(Terrain::Rough),
            'u' => Some(Terrain::Subterranean),
            'l' => Some(Terrain::Lava),
            _ => None,
        }
    }

    /// Цвет для отладочного рендера
    #[must_use]
    pub fn color(self) -> [u8; 3] {
        match self {
            Terrain::Dirt => [120, 90, 50],
            Terrain::Sand => [220, 200, 130],
            Terrain::Grass => [70, 150, 60],
            Terrain::Snow => [235, 240, 245],
            Terrain::Swamp => [70, 100, 80],
            Terrain::Rough => [150, 120, 80],
            Terrain::Subterranean => [90, 70, 60],
            Terrain::Lava => [110, 40, 30],
            Terrain::Water => [40, 90, 190],
            Terrain::Rock => [30, 30, 30],
        }
    }
}
