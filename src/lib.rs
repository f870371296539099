pub mod colormap;
pub mod config;
pub mod error;
pub mod ingest;
pub mod query;
pub mod render;
pub mod resize;
pub mod row;
pub mod stats;
pub mod store;
pub mod util;

pub use colormap::Colormap;
pub use config::{Config, DepthBounds};
pub use error::{Error, Result};
pub use ingest::{ingest_csv, ingest_reader, IngestReport};
pub use query::{QueryService, RenderRequest, RenderedFrame};
pub use row::{DepthRow, FRAME_WIDTH, RAW_WIDTH};
pub use stats::FrameStats;
pub use store::{InsertSummary, RowStore, SqliteRowStore};

/// Set up logging from `config`.
pub fn init(config: &Config) {
    util::log::init(&config.log_level);
}
