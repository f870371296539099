use std::fmt::Display;

use thiserror::Error;

/// Everything that can go wrong between a CSV line and a rendered frame.
///
/// The first group is request/data scoped and never worth retrying. The second
/// group wraps the collaborators (SQLite, csv, png encoding) and keeps their
/// original error around for the log.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid colormap '{0}'. Available options: grayscale, heatmap, viridis, plasma")]
    UnknownColormap(String),

    #[error("Invalid depth range: [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    #[error("Depth values must be between {lower} and {upper}")]
    DepthOutOfBounds { lower: f64, upper: f64 },

    #[error("No data in specified depth range [{min}, {max}]")]
    NoDataInRange { min: f64, max: f64 },

    #[error("no rows to render")]
    EmptyRange,

    #[error("stored row at depth {depth} has {len} values")]
    CorruptRow { depth: f64, len: usize },

    #[error("row store failure: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("row payload encoding failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("png encoding failure: {0}")]
    Image(#[from] image::ImageError),

    #[error("drawing failure: {0}")]
    Plot(String),

    #[error("timestamp formatting failure: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed_row<R: Display>(line: u64, reason: R) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.to_string(),
        }
    }

    /// Attach the CSV line to a row error raised without one.
    pub fn at_line(self, line: u64) -> Self {
        match self {
            Self::MalformedRow { reason, .. } => Self::MalformedRow { line, reason },
            e => Self::malformed_row(line, e),
        }
    }

    pub fn plot<E: Display>(raw_err: E) -> Self {
        Self::Plot(raw_err.to_string())
    }

    /// The request asked for something that cannot be served as stated.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::UnknownColormap(_) | Self::InvalidRange { .. } | Self::DepthOutOfBounds { .. }
        )
    }

    /// The request was fine but the range holds nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NoDataInRange { .. } | Self::EmptyRange)
    }
}
