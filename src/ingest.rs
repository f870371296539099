use std::{io::Read, path::Path};

use csv::{ByteRecord, StringRecord};
use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::{Error, Result},
    resize::resize_row,
    row::{DepthRow, RAW_WIDTH},
    store::RowStore,
};

#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Data lines in the CSV, header excluded.
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// Where `depth` and `col1..=col200` sit in each record.
#[derive(Debug)]
struct ColumnLayout {
    ncols: usize,
    depth: usize,
    values: Vec<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Result<ColumnLayout> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let names: Vec<_> = std::iter::once("depth".to_owned())
            .chain((1..=RAW_WIDTH).map(|i| format!("col{i}")))
            .collect();

        let missing: Vec<_> = names
            .iter()
            .filter(|name| find(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns(missing));
        }

        let mut positions = names.iter().filter_map(|name| find(name));
        let depth = positions
            .next()
            .ok_or_else(|| Error::MissingColumns(vec!["depth".to_owned()]))?;
        Ok(ColumnLayout {
            ncols: headers.len(),
            depth,
            values: positions.collect(),
        })
    }

    fn parse(&self, record: &ByteRecord, line: u64) -> Result<(f64, Vec<f64>)> {
        if record.len() != self.ncols {
            return Err(Error::malformed_row(
                line,
                format!("expected {} columns, got {}", self.ncols, record.len()),
            ));
        }
        let field = |i: usize| -> Result<f64> {
            let raw = std::str::from_utf8(record.get(i).unwrap_or_default())
                .map_err(|e| Error::malformed_row(line, format!("col {i}: {e}")))?
                .trim();
            raw.parse()
                .map_err(|e| Error::malformed_row(line, format!("{raw:?}: {e}")))
        };
        let depth = field(self.depth)?;
        let values = self.values.iter().map(|&i| field(i)).collect::<Result<_>>()?;
        Ok((depth, values))
    }
}

/// Parse and resample every data line, sorted by depth.
///
/// Header problems abort the whole read. A bad data line is logged and
/// skipped, the second element counts those.
#[instrument(skip_all, err)]
pub fn read_rows<R: Read>(reader: R) -> Result<(Vec<DepthRow>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let layout = ColumnLayout::from_headers(rdr.headers()?)?;

    let mut raw_rows = Vec::new();
    let mut record = ByteRecord::new();
    loop {
        let line = rdr.position().line();
        match rdr.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                let line = record.position().map_or(line, |p| p.line());
                raw_rows.push((line, layout.parse(&record, line)));
            }
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => raw_rows.push((line, Err(Error::malformed_row(line, e)))),
        }
    }
    let rows_read = raw_rows.len();

    let resized: Vec<_> = raw_rows
        .into_par_iter()
        .map(|(line, parsed)| {
            let (depth, values) = parsed?;
            let data = resize_row(ArrayView1::from(values.as_slice()), line)?;
            DepthRow::new(depth, data.to_vec()).map_err(|e| e.at_line(line))
        })
        .collect();

    let mut rows = Vec::with_capacity(rows_read);
    for row in resized {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => warn!(%e, "skip row"),
        }
    }
    let skipped = rows_read - rows.len();
    rows.sort_by(|a, b| a.depth().total_cmp(&b.depth()));
    info!(rows_read, skipped);

    Ok((rows, skipped))
}

/// Load a CSV into `store`.
///
/// With `replace` the store is swapped to exactly the rows of this file in
/// one transaction, otherwise rows are upserted by depth.
#[instrument(skip(csv_path, store), fields(csv_path = ?csv_path.as_ref()), err)]
pub fn ingest_csv<P, S>(csv_path: P, store: &mut S, replace: bool) -> Result<IngestReport>
where
    P: AsRef<Path>,
    S: RowStore + ?Sized,
{
    let file = std::fs::File::open(csv_path.as_ref())?;
    ingest_reader(file, store, replace)
}

pub fn ingest_reader<R, S>(reader: R, store: &mut S, replace: bool) -> Result<IngestReport>
where
    R: Read,
    S: RowStore + ?Sized,
{
    let (rows, rows_skipped) = read_rows(reader)?;
    let summary = if replace {
        store.replace_all(&rows)?
    } else {
        store.insert_many(&rows)?
    };

    Ok(IngestReport {
        rows_read: rows.len() + rows_skipped,
        rows_skipped,
        inserted: summary.inserted,
        updated: summary.updated,
    })
}
