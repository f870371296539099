use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    #[default]
    Grayscale,
    /// matplotlib `hot`.
    Heatmap,
    Viridis,
    Plasma,
}

impl Colormap {
    pub const ALL: [Colormap; 4] = [
        Colormap::Grayscale,
        Colormap::Heatmap,
        Colormap::Viridis,
        Colormap::Plasma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Grayscale => "grayscale",
            Colormap::Heatmap => "heatmap",
            Colormap::Viridis => "viridis",
            Colormap::Plasma => "plasma",
        }
    }

    /// Map a normalized intensity to a color. Out of range inputs are clamped.
    pub fn rgb(self, t: f64) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Colormap::Grayscale => {
                let v = (t * 255.0).round() as u8;
                [v, v, v]
            }
            Colormap::Heatmap => piecewise(&HOT, t),
            Colormap::Viridis => uniform(&VIRIDIS, t),
            Colormap::Plasma => uniform(&PLASMA, t),
        }
    }
}

impl FromStr for Colormap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Colormap::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::UnknownColormap(s.to_owned()))
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn lerp(c0: [u8; 3], c1: [u8; 3], frac: f64) -> [u8; 3] {
    let mut out = [0; 3];
    for ((v, v0), v1) in out.iter_mut().zip(c0).zip(c1) {
        let (v0, v1) = (v0 as f64, v1 as f64);
        *v = (v0 + (v1 - v0) * frac).round() as u8;
    }
    out
}

/// Stops evenly spread over [0, 1].
fn uniform(stops: &[[u8; 3]], t: f64) -> [u8; 3] {
    let pos = t * (stops.len() - 1) as f64;
    let i0 = (pos.floor() as usize).min(stops.len() - 2);
    lerp(stops[i0], stops[i0 + 1], pos - i0 as f64)
}

/// Stops at explicit, increasing positions starting at 0 and ending at 1.
fn piecewise(stops: &[(f64, [u8; 3])], t: f64) -> [u8; 3] {
    let i1 = stops
        .iter()
        .skip(1)
        .position(|&(x, _)| t <= x)
        .map_or(stops.len() - 1, |i| i + 1);
    let ((x0, c0), (x1, c1)) = (stops[i1 - 1], stops[i1]);
    lerp(c0, c1, (t - x0) / (x1 - x0))
}

const HOT: [(f64, [u8; 3]); 4] = [
    (0.0, [0, 0, 0]),
    (0.365079, [255, 0, 0]),
    (0.746032, [255, 255, 0]),
    (1.0, [255, 255, 255]),
];

/// viridis from matplotlib, 16 samples.
const VIRIDIS: [[u8; 3]; 16] = [
    [68, 1, 84],
    [72, 26, 108],
    [71, 47, 125],
    [65, 68, 135],
    [57, 86, 140],
    [49, 104, 142],
    [42, 120, 142],
    [35, 136, 142],
    [31, 152, 139],
    [34, 168, 132],
    [53, 183, 121],
    [84, 197, 104],
    [122, 209, 81],
    [165, 219, 54],
    [210, 226, 27],
    [253, 231, 37],
];

/// plasma from matplotlib, 16 samples.
const PLASMA: [[u8; 3]; 16] = [
    [13, 8, 135],
    [51, 5, 151],
    [80, 2, 162],
    [106, 0, 168],
    [132, 5, 167],
    [156, 23, 158],
    [177, 42, 144],
    [195, 61, 128],
    [211, 81, 113],
    [225, 100, 98],
    [237, 121, 83],
    [246, 143, 68],
    [252, 166, 54],
    [254, 192, 41],
    [249, 220, 36],
    [240, 249, 33],
];
