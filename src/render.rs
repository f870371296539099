use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};
use ndarray::prelude::*;
use plotters::prelude::*;
use tracing::instrument;

use crate::{
    colormap::Colormap,
    error::{Error, Result},
    row::{DepthRow, FRAME_WIDTH},
};

pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Stack rows top to bottom into a `(nrows, FRAME_WIDTH)` matrix.
pub fn frame_matrix(rows: &[DepthRow]) -> Result<Array2<f64>> {
    if rows.is_empty() {
        return Err(Error::EmptyRange);
    }
    let mut area = Array2::zeros((rows.len(), FRAME_WIDTH));
    for (mut line, row) in area.rows_mut().into_iter().zip(rows) {
        line.assign(&ArrayView1::from(row.data()));
    }
    Ok(area)
}

/// Colorize `rows` and encode them as a PNG, one pixel per value.
#[instrument(skip(rows), fields(nrows = rows.len()), err)]
pub fn render_png(rows: &[DepthRow], colormap: Colormap) -> Result<Vec<u8>> {
    let area = frame_matrix(rows)?;
    let (h, w) = area.dim();
    let buf = draw_area(area.view(), colormap)?;
    encode_png(&buf, w as u32, h as u32)
}

/// RGB8 pixel buffer of `area` normalized against its own min and max.
///
/// A flat area has no contrast to stretch, every value lands on `t = 0.5`.
pub fn draw_area(area: ArrayView2<f64>, colormap: Colormap) -> Result<Vec<u8>> {
    let (h, w) = area.dim();
    let (min, max) = area.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
        (min.min(v), max.max(v))
    });
    let delta = max - min;

    let mut buf = vec![0; h * w * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (w as u32, h as u32)).into_drawing_area();
        for ((y, x), &v) in area.indexed_iter() {
            let t = if delta > 0.0 { (v - min) / delta } else { 0.5 };
            let [r, g, b] = colormap.rgb(t);
            root.draw_pixel((x as i32, y as i32), &RGBColor(r, g, b))
                .map_err(Error::plot)?;
        }
        root.present().map_err(Error::plot)?;
    }
    Ok(buf)
}

pub fn encode_png(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(buf, width, height, ColorType::Rgb8)?;
    Ok(png)
}
