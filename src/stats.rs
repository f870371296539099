use ndarray::prelude::*;
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub rows: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub median: f64,
}

/// Summary of every value in a frame. `None` for an empty frame.
pub fn frame_stats(area: ArrayView2<f64>) -> Option<FrameStats> {
    let mean = area.mean()?;
    let mut sorted: Vec<_> = area.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    Some(FrameStats {
        rows: area.nrows(),
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        std: area.std(0.0),
        median,
    })
}
