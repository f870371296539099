use ndarray::prelude::*;

use crate::{
    error::{Error, Result},
    row::{FRAME_WIDTH, RAW_WIDTH},
};

/// Linearly resample one raw row of [`RAW_WIDTH`] samples to [`FRAME_WIDTH`] samples.
///
/// Both rows span the same normalized axis, so the first and last outputs are
/// exactly the first and last inputs. `line` only feeds the error message.
pub fn resize_row(raw: ArrayView1<f64>, line: u64) -> Result<Array1<f64>> {
    if raw.len() != RAW_WIDTH {
        return Err(Error::malformed_row(
            line,
            format!("expected {RAW_WIDTH} values, got {}", raw.len()),
        ));
    }
    if let Some((i, v)) = raw.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(Error::malformed_row(
            line,
            format!("value {v} at col{} is not a number", i + 1),
        ));
    }

    Ok(Array1::from_shape_fn(FRAME_WIDTH, |i| {
        let pos = (i * (RAW_WIDTH - 1)) as f64 / (FRAME_WIDTH - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(RAW_WIDTH - 1);
        let frac = pos - lo as f64;
        let (v0, v1) = (raw[lo], raw[hi]);
        v0 + (v1 - v0) * frac
    }))
}
