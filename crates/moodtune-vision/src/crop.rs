//! Face cropping and grayscale resampling.

use crate::types::{FaceBox, Region};
use moodtune_core::Frame;

/// Bilinear resize of a grayscale buffer to `new_w × new_h`.
pub fn resize_bilinear(src: &[u8], width: usize, height: usize, new_w: usize, new_h: usize) -> Vec<u8> {
    let mut out = vec![0u8; new_w * new_h];
    if width == 0 || height == 0 || src.len() < width * height {
        return out;
    }

    let sx = width as f32 / new_w as f32;
    let sy = height as f32 / new_h as f32;

    for y in 0..new_h {
        let src_y = ((y as f32 + 0.5) * sy - 0.5).max(0.0);
        let y0 = (src_y.floor() as usize).min(height - 1);
        let y1 = (y0 + 1).min(height - 1);
        let fy = src_y - y0 as f32;

        let row0 = &src[y0 * width..(y0 + 1) * width];
        let row1 = &src[y1 * width..(y1 + 1) * width];

        for x in 0..new_w {
            let src_x = ((x as f32 + 0.5) * sx - 0.5).max(0.0);
            let x0 = (src_x.floor() as usize).min(width - 1);
            let x1 = (x0 + 1).min(width - 1);
            let fx = src_x - x0 as f32;

            let top = row0[x0] as f32 * (1.0 - fx) + row0[x1] as f32 * fx;
            let bottom = row1[x0] as f32 * (1.0 - fx) + row1[x1] as f32 * fx;
            out[y * new_w + x] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// The whole frame as a region.
pub fn full_region(frame: &Frame) -> Region {
    Region { x: 0, y: 0, width: frame.width, height: frame.height }
}

/// Square region around a face, grown by `margin` (fraction of the longer
/// side) on every edge and clamped to the frame.
///
/// `None` when the box has non-finite coordinates or no positive size.
pub fn face_region(face: &FaceBox, frame_width: u32, frame_height: u32, margin: f32) -> Option<Region> {
    let side = face.width.max(face.height) * (1.0 + 2.0 * margin);
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;
    if !side.is_finite() || side <= 0.0 || !cx.is_finite() || !cy.is_finite() {
        return None;
    }

    let fw = frame_width as f32;
    let fh = frame_height as f32;
    let x0 = (cx - side / 2.0).clamp(0.0, fw - 1.0);
    let y0 = (cy - side / 2.0).clamp(0.0, fh - 1.0);
    let x1 = (cx + side / 2.0).clamp(x0 + 1.0, fw);
    let y1 = (cy + side / 2.0).clamp(y0 + 1.0, fh);

    Some(Region {
        x: x0 as u32,
        y: y0 as u32,
        width: ((x1 - x0).round() as u32).clamp(1, frame_width - x0 as u32),
        height: ((y1 - y0).round() as u32).clamp(1, frame_height - y0 as u32),
    })
}

/// Copy `region` out of `frame` and resample it to `size × size`.
pub fn crop_resized(frame: &Frame, region: Region, size: usize) -> Vec<u8> {
    let fw = frame.width as usize;
    let (rx, ry) = (region.x as usize, region.y as usize);
    let (rw, rh) = (region.width as usize, region.height as usize);

    let mut patch = Vec::with_capacity(rw * rh);
    for y in ry..ry + rh {
        patch.extend_from_slice(&frame.data[y * fw + rx..y * fw + rx + rw]);
    }

    resize_bilinear(&patch, rw, rh, size, size)
}
