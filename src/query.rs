use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    colormap::Colormap,
    config::DepthBounds,
    error::{Error, Result},
    render::{self, PNG_CONTENT_TYPE},
    row::{DepthRow, FRAME_WIDTH},
    stats::{self, FrameStats},
    store::RowStore,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderRequest {
    pub depth_min: f64,
    pub depth_max: f64,
    #[serde(default)]
    pub colormap: Option<String>,
}

impl RenderRequest {
    pub fn new(depth_min: f64, depth_max: f64, colormap: Option<&str>) -> RenderRequest {
        RenderRequest {
            depth_min,
            depth_max,
            colormap: colormap.map(str::to_owned),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: usize,
    pub height: usize,
}

/// Validate, fetch, render.
#[derive(Debug)]
pub struct QueryService<S> {
    store: S,
    default_colormap: Colormap,
    bounds: DepthBounds,
}

impl<S: RowStore> QueryService<S> {
    pub fn new(store: S, default_colormap: Colormap, bounds: DepthBounds) -> Self {
        Self {
            store,
            default_colormap,
            bounds,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Checks that need no I/O, in the order clients see them.
    pub fn validate(&self, request: &RenderRequest) -> Result<Colormap> {
        let colormap = match &request.colormap {
            Some(name) => name.parse()?,
            None => self.default_colormap,
        };

        let RenderRequest {
            depth_min: min,
            depth_max: max,
            ..
        } = *request;
        if !(min <= max) {
            return Err(Error::InvalidRange { min, max });
        }

        let DepthBounds { min: lower, max: upper } = self.bounds;
        if min < lower || max > upper {
            return Err(Error::DepthOutOfBounds { lower, upper });
        }

        Ok(colormap)
    }

    #[instrument(skip(self), err)]
    pub fn render_frame(&self, request: &RenderRequest) -> Result<RenderedFrame> {
        let colormap = self.validate(request)?;
        let rows = self.fetch(request)?;
        let bytes = render::render_png(&rows, colormap)?;
        info!(nrows = rows.len(), %colormap, nbytes = bytes.len());

        Ok(RenderedFrame {
            bytes,
            content_type: PNG_CONTENT_TYPE,
            width: FRAME_WIDTH,
            height: rows.len(),
        })
    }

    #[instrument(skip(self), err)]
    pub fn frame_stats(&self, request: &RenderRequest) -> Result<FrameStats> {
        self.validate(request)?;
        let rows = self.fetch(request)?;
        let area = render::frame_matrix(&rows)?;
        stats::frame_stats(area.view()).ok_or(Error::EmptyRange)
    }

    fn fetch(&self, request: &RenderRequest) -> Result<Vec<DepthRow>> {
        let (min, max) = (request.depth_min, request.depth_max);
        let rows = self.store.find_by_depth_range(min, max)?;
        if rows.is_empty() {
            return Err(Error::NoDataInRange { min, max });
        }
        Ok(rows)
    }
}
