// src/map/png.rs
//! Отладочный рендер карты в PNG.
//!
//! Каждый тайл рисуется квадратом `scale × scale` пикселей цвета поверхности:
//! - свободные тайлы (сеть путей) светлее,
//! - заблокированные темнее,
//! - посещаемые клетки размещённых объектов отмечены кружком.
//!
//! Уровни карты выводятся друг под другом.

use crate::area::Tile;
use crate::error::GenError;
use crate::map::{Occupancy, RmgMap};
use crate::object::Object;
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;
use std::path::Path;

pub struct MapImage {
    pub width: u32,
    pub height: u32,
    image: RgbaImage,
}

fn shade(color: [u8; 3], occupancy: Occupancy) -> Rgba<u8> {
    let scale = |c: u8, k: f32| (f32::from(c) * k).clamp(0.0, 255.0) as u8;
    let k = match occupancy {
        Occupancy::Free => 1.35,
        Occupancy::Possible => 1.0,
        Occupancy::Blocked => 0.45,
    };
    Rgba([scale(color[0], k), scale(color[1], k), scale(color[2], k), 255])
}

impl MapImage {
    pub fn render(map: &RmgMap, objects: &[Object], scale: u32) -> Self {
        let scale = scale.max(1);
        let width = map.width() * scale;
        let height = map.height() * map.levels() * scale;
        let mut image: RgbaImage = ImageBuffer::from_pixel(width, height, Rgba([0, 0, 0, 255]));

        let origin = |tile: Tile| {
            let x = tile.x as u32 * scale;
            let y = (tile.z as u32 * map.height() + tile.y as u32) * scale;
            (x as i32, y as i32)
        };

        for tile in map.all_tiles() {
            let Some(info) = map.tile(tile) else {
                continue;
            };
            let (x, y) = origin(tile);
            draw_filled_rect_mut(
                &mut image,
                Rect::at(x, y).of_size(scale, scale),
                shade(info.terrain.color(), info.occupancy),
            );
        }

        let radius = (scale / 3).max(1) as i32;
        for object in objects {
            let (x, y) = origin(object.visitable_position());
            let half = (scale / 2) as i32;
            draw_filled_circle_mut(&mut image, (x + half, y + half), radius, Rgba([230, 40, 40, 255]));
            if let Some(guard) = object.guard_position() {
                let (gx, gy) = origin(guard);
                draw_filled_circle_mut(&mut image, (gx + half, gy + half), radius, Rgba([20, 20, 20, 255]));
            }
        }

        Self {
            width,
            height,
            image,
        }
    }

    pub fn save_as_png(&self, path: impl AsRef<Path>) -> Result<(), GenError> {
        self.image.save(path)?;
        Ok(())
    }
}
