//! Art-window cropping and tier resampling
//!
//! Every layout gets its own recipe for carving the art out of a
//! full-resolution scan, but they all standardize on a (560, 435) result.
//! Sideways layouts are rotated upright first; two-part layouts are cut apart
//! and recomposed. The pixel rectangles are tuned against real scans and are
//! not derived from anything.

use crate::printing::{Layout, Printing};
use crate::request::{SizeSlug, CROPPED_SIZE};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

// Type-line tags that override the layout-based dispatch
const BATTLE: &str = "Battle";
const ROOM: &str = "Room";
const SAGA: &str = "Saga";

/// PIL-style box: (left, top, right, bottom)
fn crop_box(image: &RgbaImage, (left, top, right, bottom): (u32, u32, u32, u32)) -> RgbaImage {
    imageops::crop_imm(image, left, top, right - left, bottom - top).to_image()
}

fn scale(image: &RgbaImage, (width, height): (u32, u32)) -> RgbaImage {
    imageops::resize(image, width, height, FilterType::Lanczos3)
}

/// Paste the left `width / n` columns of each image side by side onto a
/// transparent canvas
fn split_horizontal(width: u32, height: u32, images: &[RgbaImage]) -> RgbaImage {
    let offset = width / images.len() as u32;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for (index, image) in images.iter().enumerate() {
        let slice = crop_box(image, (0, 0, offset, height));
        imageops::replace(&mut canvas, &slice, i64::from(index as u32 * offset), 0);
    }
    canvas
}

fn crop_standard(image: &RgbaImage) -> RgbaImage {
    crop_box(image, (92, 120, 652, 555))
}

fn crop_split(image: &RgbaImage) -> RgbaImage {
    let halves: Vec<RgbaImage> = [(96, 82, 345, 454), (96, 582, 345, 954)]
        .into_iter()
        .map(|half| scale(&imageops::rotate90(&crop_box(image, half)), (650, 435)))
        .collect();
    split_horizontal(CROPPED_SIZE.0, CROPPED_SIZE.1, &halves)
}

fn crop_flip(image: &RgbaImage) -> RgbaImage {
    scale(&crop_box(image, (141, 325, 604, 685)), CROPPED_SIZE)
}

fn crop_aftermath(image: &RgbaImage) -> RgbaImage {
    let mut top = crop_box(image, (92, 120, 652, 332));
    let bottom = imageops::rotate270(&crop_box(image, (408, 590, 620, 950)));
    let paste_x = i64::from(top.width() / 2);
    imageops::replace(&mut top, &bottom, paste_x, 0);
    crop_box(&scale(&top, (1149, 435)), (294, 0, 854, 435))
}

// The sideways layouts (saga, room, class, battle) share a shape: carve the
// art column, rotate it upright, widen to 1052x435, keep the center.
fn upright_center(image: &RgbaImage, column: (u32, u32, u32, u32)) -> RgbaImage {
    let upright = imageops::rotate90(&crop_box(image, column));
    crop_box(&scale(&upright, (1052, 435)), (246, 0, 806, 435))
}

fn crop_saga(image: &RgbaImage) -> RgbaImage {
    upright_center(image, (373, 115, 686, 872))
}

fn crop_room(image: &RgbaImage) -> RgbaImage {
    upright_center(image, (105, 60, 390, 936))
}

fn crop_class(image: &RgbaImage) -> RgbaImage {
    upright_center(image, (58, 115, 371, 872))
}

fn crop_battle(image: &RgbaImage) -> RgbaImage {
    upright_center(image, (103, 115, 416, 872))
}

/// Crop a full-resolution scan down to its (560, 435) art window, dispatching
/// on the printing's layout and type line
///
/// Without a printing (the card back, named images) the standard recipe is
/// used.
pub fn crop_by_layout(image: &RgbaImage, printing: Option<&Printing>, back: bool) -> RgbaImage {
    let Some(printing) = printing else {
        return crop_standard(image);
    };

    let layout = printing.layout();
    let front_has = |tag: &str| printing.front_face().is_some_and(|face| face.has_type(tag));

    if layout == Layout::Standard {
        return crop_standard(image);
    }
    if front_has(BATTLE) && !back {
        return crop_battle(image);
    }
    if layout == Layout::Saga || front_has(SAGA) {
        return crop_saga(image);
    }
    if layout == Layout::Split && printing.front_faces().len() == 2 {
        return if front_has(ROOM) {
            crop_room(image)
        } else {
            crop_split(image)
        };
    }
    if layout == Layout::Flip {
        return crop_flip(image);
    }
    if layout == Layout::Aftermath && printing.front_faces().len() == 2 {
        return crop_aftermath(image);
    }
    if layout == Layout::Class {
        return crop_class(image);
    }
    crop_standard(image)
}

/// Resample an image to the concrete dimensions of `(size_slug, crop)`
pub fn resize_to(image: &RgbaImage, size_slug: SizeSlug, crop: bool) -> RgbaImage {
    scale(image, size_slug.size(crop))
}
