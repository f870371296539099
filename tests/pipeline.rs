use std::{
    io,
    sync::{Arc, Mutex},
};

use depthmap::{
    ingest_reader, Colormap, DepthBounds, DepthRow, Error, InsertSummary, QueryService,
    RenderRequest, RowStore, SqliteRowStore, FRAME_WIDTH, RAW_WIDTH,
};

fn csv(lines: &[(f64, Vec<f64>)]) -> String {
    let mut out = std::iter::once("depth".to_owned())
        .chain((1..=RAW_WIDTH).map(|i| format!("col{i}")))
        .collect::<Vec<_>>()
        .join(",");
    for (depth, values) in lines {
        out.push('\n');
        out.push_str(&depth.to_string());
        for v in values {
            out.push(',');
            out.push_str(&v.to_string());
        }
    }
    out.push('\n');
    out
}

fn ramp(offset: f64) -> Vec<f64> {
    (0..RAW_WIDTH).map(|i| i as f64 + offset).collect()
}

fn service(store: SqliteRowStore) -> QueryService<SqliteRowStore> {
    QueryService::new(store, Colormap::Grayscale, DepthBounds::default())
}

/// Log sink shared between the subscriber and the test body.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Fails the test if the query path reaches the store.
struct UnreachableStore;

impl RowStore for UnreachableStore {
    fn insert_many(&mut self, _: &[DepthRow]) -> depthmap::Result<InsertSummary> {
        unreachable!()
    }

    fn replace_all(&mut self, _: &[DepthRow]) -> depthmap::Result<InsertSummary> {
        unreachable!()
    }

    fn find_by_depth_range(&self, _: f64, _: f64) -> depthmap::Result<Vec<DepthRow>> {
        panic!("store touched before validation finished")
    }

    fn clear(&mut self) -> depthmap::Result<usize> {
        unreachable!()
    }

    fn count(&self) -> depthmap::Result<usize> {
        unreachable!()
    }
}

#[test]
fn ramp_rows_render_top_down() {
    let mut store = SqliteRowStore::open_in_memory().unwrap();
    let input = csv(&[(300.0, ramp(0.0)), (100.0, ramp(0.0)), (200.0, ramp(0.0))]);
    let report = ingest_reader(input.as_bytes(), &mut store, false).unwrap();
    assert_eq!((report.rows_read, report.inserted), (3, 3));

    let frame = service(store)
        .render_frame(&RenderRequest::new(100.0, 300.0, Some("grayscale")))
        .unwrap();
    assert_eq!((frame.width, frame.height), (FRAME_WIDTH, 3));

    let img = image::load_from_memory(&frame.bytes).unwrap().to_rgb8();
    assert_eq!(img.dimensions(), (150, 3));
    for y in 0..3 {
        assert_eq!(img.get_pixel(0, y).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(149, y).0, [255, 255, 255]);
        let top: Vec<_> = (0..150).map(|x| img.get_pixel(x, y).0[0]).collect();
        assert!(top.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn rows_are_ordered_by_depth() {
    let mut store = SqliteRowStore::open_in_memory().unwrap();
    let input = csv(&[
        (30.0, vec![2.0; RAW_WIDTH]),
        (10.0, vec![0.0; RAW_WIDTH]),
        (20.0, vec![1.0; RAW_WIDTH]),
    ]);
    ingest_reader(input.as_bytes(), &mut store, false).unwrap();

    let frame = service(store)
        .render_frame(&RenderRequest::new(0.0, 100.0, None))
        .unwrap();
    let img = image::load_from_memory(&frame.bytes).unwrap().to_rgb8();
    assert_eq!(img.get_pixel(10, 0).0, [0, 0, 0]);
    assert_eq!(img.get_pixel(10, 1).0, [128, 128, 128]);
    assert_eq!(img.get_pixel(10, 2).0, [255, 255, 255]);
}

#[test]
fn empty_range_is_not_found() {
    let mut store = SqliteRowStore::open_in_memory().unwrap();
    ingest_reader(csv(&[(100.0, ramp(0.0))]).as_bytes(), &mut store, false).unwrap();

    let err = service(store)
        .render_frame(&RenderRequest::new(500.0, 600.0, None))
        .unwrap_err();
    assert!(matches!(err, Error::NoDataInRange { .. }));
    assert!(err.is_not_found());
}

#[test]
fn unknown_colormap_never_reaches_store() {
    let service = QueryService::new(UnreachableStore, Colormap::Grayscale, DepthBounds::default());
    let err = service
        .render_frame(&RenderRequest::new(0.0, 10.0, Some("unknown")))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownColormap(_)));
    assert!(err.is_bad_request());
}

#[test]
fn short_row_is_skipped() {
    let mut store = SqliteRowStore::open_in_memory().unwrap();
    let mut short = ramp(0.0);
    short.pop();
    let input = csv(&[(1.0, ramp(0.0)), (2.0, short), (3.0, ramp(1.0))]);

    let logs = Captured::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer({
            let logs = logs.clone();
            move || logs.clone()
        })
        .finish();
    let report = tracing::subscriber::with_default(subscriber, || {
        ingest_reader(input.as_bytes(), &mut store, false)
    })
    .unwrap();
    let logs = logs.text();
    assert!(
        logs.contains("WARN") && logs.contains("malformed row at line 3"),
        "{logs}"
    );
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.inserted, 2);

    let depths: Vec<_> = store
        .find_by_depth_range(0.0, 10.0)
        .unwrap()
        .iter()
        .map(DepthRow::depth)
        .collect();
    assert_eq!(depths, [1.0, 3.0]);
}

#[test]
fn reprocessing_swaps_the_whole_set() {
    let mut store = SqliteRowStore::open_in_memory().unwrap();
    ingest_reader(csv(&[(1.0, ramp(0.0)), (2.0, ramp(0.0))]).as_bytes(), &mut store, false)
        .unwrap();
    let report =
        ingest_reader(csv(&[(5.0, ramp(0.0))]).as_bytes(), &mut store, true).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(store.count().unwrap(), 1);
}
