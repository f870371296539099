use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of intensity columns in one CSV line.
pub const RAW_WIDTH: usize = 200;

/// Number of intensity columns kept after resampling, also the frame width.
pub const FRAME_WIDTH: usize = 150;

/// One stored record: a depth and its resampled intensities.
///
/// `data` always holds exactly [`FRAME_WIDTH`] finite values, so everything
/// downstream (store, renderer) can index it without checking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDepthRow")]
pub struct DepthRow {
    depth: f64,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawDepthRow {
    depth: f64,
    data: Vec<f64>,
}

impl TryFrom<RawDepthRow> for DepthRow {
    type Error = Error;

    fn try_from(RawDepthRow { depth, data }: RawDepthRow) -> Result<DepthRow> {
        DepthRow::new(depth, data)
    }
}

impl DepthRow {
    pub fn new(depth: f64, data: Vec<f64>) -> Result<DepthRow> {
        if !depth.is_finite() {
            return Err(Error::malformed_row(0, format!("depth {depth} is not finite")));
        }
        if data.len() != FRAME_WIDTH {
            return Err(Error::CorruptRow {
                depth,
                len: data.len(),
            });
        }
        if let Some(i) = data.iter().position(|v| !v.is_finite()) {
            return Err(Error::malformed_row(
                0,
                format!("value {} at column {i} is not finite", data[i]),
            ));
        }
        Ok(DepthRow { depth, data })
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_width() {
        assert!(DepthRow::new(1.0, vec![0.0; FRAME_WIDTH]).is_ok());
        assert!(matches!(
            DepthRow::new(1.0, vec![0.0; FRAME_WIDTH - 1]),
            Err(Error::CorruptRow { len: 149, .. })
        ));
    }

    #[test]
    fn test_new_rejects_non_finite() {
        let mut data = vec![1.0; FRAME_WIDTH];
        data[3] = f64::NAN;
        assert!(DepthRow::new(1.0, data).is_err());
        assert!(DepthRow::new(f64::INFINITY, vec![1.0; FRAME_WIDTH]).is_err());
    }

    #[test]
    fn test_deserialize_checks_width() {
        let short = r#"{"depth":1.0,"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<DepthRow>(short).is_err());

        let row = DepthRow::new(2.5, vec![0.5; FRAME_WIDTH]).unwrap();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(serde_json::from_str::<DepthRow>(&json).unwrap(), row);
    }
}
