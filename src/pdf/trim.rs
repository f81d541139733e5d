//! Whitespace trimming of rasterized pages

use super::error::DocumentError;
use super::types::{Margins, PageGeometry, RawBitmap};

/// Packed RGB pixels of the trimmed box plus its geometry
pub struct TrimmedBitmap {
    pub pixels: Vec<u8>,
    pub geometry: PageGeometry,
}

pub const BYTES_PER_PIXEL: usize = 3;

/// Scan inward from each edge for the first non-white scanline/column and
/// copy the enclosed box into a contiguous RGB buffer.
///
/// A page without any ink is kept whole with zero margins.
pub fn trim(bitmap: &RawBitmap, white_threshold: u8) -> Result<TrimmedBitmap, DocumentError> {
    let width = bitmap.width as usize;
    let height = bitmap.height as usize;
    let channels = usize::from(bitmap.channels);

    if width == 0 || height == 0 {
        return Err(DocumentError::render("empty raster"));
    }
    if channels < BYTES_PER_PIXEL {
        return Err(DocumentError::render(format!(
            "unsupported raster format: {channels} channels"
        )));
    }
    let row_bytes = width * channels;
    let needed = bitmap.stride.saturating_mul(height - 1) + row_bytes;
    if bitmap.stride < row_bytes || bitmap.pixels.len() < needed {
        return Err(DocumentError::render("raster buffer size mismatch"));
    }

    let row = |y: usize| &bitmap.pixels[y * bitmap.stride..y * bitmap.stride + row_bytes];
    let is_white = |px: &[u8]| {
        px[0] >= white_threshold && px[1] >= white_threshold && px[2] >= white_threshold
    };
    let row_blank = |y: usize| row(y).chunks_exact(channels).all(is_white);

    let Some(top) = (0..height).find(|&y| !row_blank(y)) else {
        return Ok(copy_box(bitmap, 0, 0, width, height, Margins::default()));
    };
    let bottom = (top..height).rev().find(|&y| !row_blank(y)).unwrap_or(top);

    let column_blank = |x: usize| {
        (top..=bottom).all(|y| {
            let start = y * bitmap.stride + x * channels;
            is_white(&bitmap.pixels[start..start + channels])
        })
    };
    let left = (0..width).find(|&x| !column_blank(x)).unwrap_or(0);
    let right = (left..width).rev().find(|&x| !column_blank(x)).unwrap_or(left);

    let margins = Margins {
        left: left as u32,
        right: (width - 1 - right) as u32,
        top: top as u32,
        bottom: (height - 1 - bottom) as u32,
    };

    Ok(copy_box(
        bitmap,
        left,
        top,
        right - left + 1,
        bottom - top + 1,
        margins,
    ))
}

fn copy_box(
    bitmap: &RawBitmap,
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
    margins: Margins,
) -> TrimmedBitmap {
    let channels = usize::from(bitmap.channels);
    let mut pixels = Vec::with_capacity(width * height * BYTES_PER_PIXEL);

    for y in y0..y0 + height {
        let start = y * bitmap.stride + x0 * channels;
        let row = &bitmap.pixels[start..start + width * channels];
        if channels == BYTES_PER_PIXEL {
            pixels.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(channels) {
                pixels.extend_from_slice(&px[..BYTES_PER_PIXEL]);
            }
        }
    }

    TrimmedBitmap {
        pixels,
        geometry: PageGeometry {
            width: width as u32,
            height: height as u32,
            margins,
        },
    }
}
