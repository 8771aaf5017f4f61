//! Opening recordings and querying their named columns.
//!
//! A recording is one or more `.rrd` files loaded into Rerun's dataframe
//! query engine. Queries are scoped to a single entity path and ordered
//! along one timeline; the resulting record batches expose the entity's
//! component columns under names of the form `<entity>:<Archetype>:<field>`
//! (e.g. `/tf:Transform3D:child_frame`).
//!
//! The accessors in this module are the only place that touches Arrow
//! layouts. Every component column is a list column (one component batch
//! per row); the `*_column` helpers unwrap that layout and fail hard on
//! anything unexpected.

use std::path::Path;

use rerun::dataframe::{
    ChunkStoreConfig, EntityPathFilter, QueryEngine, QueryExpression, SparseFillStrategy,
    StorageEngine,
};
use rerun::external::arrow::array::{
    Array, ArrayRef, BinaryArray, FixedSizeListArray, Float32Array, Float64Array, ListArray,
    RecordBatch, StringArray, TimestampNanosecondArray,
};
use tracing::debug;

use crate::error::{Error, Result};

/// One or more `.rrd` files combined into a single queryable dataset.
///
/// The underlying query engines hold the loaded stores for the lifetime of
/// this value; dropping the `Recording` releases them.
pub struct Recording {
    engines: Vec<QueryEngine<StorageEngine>>,
}

impl Recording {
    /// Opens a single recording file.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_all(std::slice::from_ref(&path))
    }

    /// Opens several recording files as one combined dataset.
    pub fn open_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut engines = Vec::new();
        for path in paths {
            let path = path.as_ref();
            let stores = QueryEngine::from_rrd_filepath(&ChunkStoreConfig::DEFAULT, path)
                .map_err(Error::recording)?;
            for (store_id, engine) in stores {
                // `.rrd` files can also carry blueprint stores; only the
                // recorded data is queryable here.
                if store_id.is_recording() {
                    engines.push(engine);
                }
            }
            debug!(path = %path.display(), "loaded recording file");
        }

        if engines.is_empty() {
            let names = paths
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Error::NoStore(names));
        }

        Ok(Self { engines })
    }

    /// Queries `entity` along `timeline`, returning record batches in index
    /// order. Rows are dense: every row carries the entity's data at that
    /// index value.
    ///
    /// An entity that exists in none of the loaded stores is a hard error;
    /// no modality is optional at read time.
    pub fn query(&self, entity: &str, timeline: &str) -> Result<Vec<RecordBatch>> {
        let filter =
            EntityPathFilter::parse_strict(entity).map_err(Error::recording)?;

        let mut batches = Vec::new();
        for engine in &self.engines {
            let query = QueryExpression {
                filtered_index: Some(timeline.into()),
                view_contents: Some(
                    engine
                        .iter_entity_paths_sorted(&filter)
                        .map(|entity_path| (entity_path, None))
                        .collect(),
                ),
                sparse_fill_strategy: SparseFillStrategy::LatestAtGlobal,
                ..Default::default()
            };
            batches.extend(engine.query(query).into_batch_iter());
        }

        if batches.is_empty() {
            return Err(Error::MissingColumn(entity.to_owned()));
        }
        Ok(batches)
    }
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::MissingColumn(name.to_owned()))
}

fn list_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ListArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<ListArray>()
        .ok_or_else(|| Error::column_type(name, "list"))
}

/// The row's component batch; a null row is a hard error.
fn row_value(list: &ListArray, row: usize, name: &str) -> Result<ArrayRef> {
    if list.is_null(row) {
        return Err(Error::EmptyRow(name.to_owned()));
    }
    Ok(list.value(row))
}

fn fixed_f32<const N: usize>(inner: &dyn Array, name: &str) -> Result<[f32; N]> {
    let floats = inner
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| Error::column_type(name, "float32"))?;
    if floats.len() != N {
        return Err(Error::column_type(name, "fixed-width float32"));
    }
    let mut value = [0.0; N];
    for (k, slot) in value.iter_mut().enumerate() {
        *slot = floats.value(k);
    }
    Ok(value)
}

/// The timeline index column: nanosecond timestamps, one per row.
pub fn timestamp_column(batches: &[RecordBatch], timeline: &str) -> Result<Vec<i64>> {
    let mut out = Vec::new();
    for batch in batches {
        let times = column(batch, timeline)?
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .ok_or_else(|| Error::column_type(timeline, "timestamp[ns]"))?;
        out.extend(times.values().iter().copied());
    }
    Ok(out)
}

/// A string column with exactly one value per row (frame names and the like).
pub fn utf8_column(batches: &[RecordBatch], name: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for batch in batches {
        let list = list_column(batch, name)?;
        for row in 0..list.len() {
            let sub = row_value(list, row, name)?;
            let strings = sub
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::column_type(name, "utf8"))?;
            if strings.is_empty() {
                return Err(Error::EmptyRow(name.to_owned()));
            }
            out.push(strings.value(0).to_owned());
        }
    }
    Ok(out)
}

/// A fixed-width `f32` column (vec3 translations, vec4 quaternions, flat
/// 3×3 matrices, 2-wide resolutions) with exactly one value per row.
pub fn fixed_f32_column<const N: usize>(
    batches: &[RecordBatch],
    name: &str,
) -> Result<Vec<[f32; N]>> {
    let mut out = Vec::new();
    for batch in batches {
        let list = list_column(batch, name)?;
        for row in 0..list.len() {
            let sub = row_value(list, row, name)?;
            let fixed = sub
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| Error::column_type(name, "fixed-size list"))?;
            if fixed.is_empty() {
                return Err(Error::EmptyRow(name.to_owned()));
            }
            out.push(fixed_f32::<N>(fixed.value(0).as_ref(), name)?);
        }
    }
    Ok(out)
}

/// A fixed-width `f64` column (geodetic lat/lon) with one value per row.
pub fn fixed_f64_column<const N: usize>(
    batches: &[RecordBatch],
    name: &str,
) -> Result<Vec<[f64; N]>> {
    let mut out = Vec::new();
    for batch in batches {
        let list = list_column(batch, name)?;
        for row in 0..list.len() {
            let sub = row_value(list, row, name)?;
            let fixed = sub
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| Error::column_type(name, "fixed-size list"))?;
            if fixed.is_empty() {
                return Err(Error::EmptyRow(name.to_owned()));
            }
            let inner = fixed.value(0);
            let floats = inner
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| Error::column_type(name, "float64"))?;
            if floats.len() != N {
                return Err(Error::column_type(name, "fixed-width float64"));
            }
            let mut value = [0.0; N];
            for (k, slot) in value.iter_mut().enumerate() {
                *slot = floats.value(k);
            }
            out.push(value);
        }
    }
    Ok(out)
}

/// An opaque byte-blob column (encoded images) with one blob per row.
pub fn blob_column(batches: &[RecordBatch], name: &str) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    for batch in batches {
        let list = list_column(batch, name)?;
        for row in 0..list.len() {
            let sub = row_value(list, row, name)?;
            let blobs = sub
                .as_any()
                .downcast_ref::<BinaryArray>()
                .ok_or_else(|| Error::column_type(name, "binary"))?;
            if blobs.is_empty() {
                return Err(Error::EmptyRow(name.to_owned()));
            }
            out.push(blobs.value(0).to_vec());
        }
    }
    Ok(out)
}

/// A variable-length 3D point column: every row holds an ordered point set.
/// Empty rows are allowed here (an empty cloud is valid data).
pub fn points_column(batches: &[RecordBatch], name: &str) -> Result<Vec<Vec<[f32; 3]>>> {
    let mut out = Vec::new();
    for batch in batches {
        let list = list_column(batch, name)?;
        for row in 0..list.len() {
            let sub = row_value(list, row, name)?;
            let fixed = sub
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| Error::column_type(name, "fixed-size list"))?;
            let mut points = Vec::with_capacity(fixed.len());
            for j in 0..fixed.len() {
                points.push(fixed_f32::<3>(fixed.value(j).as_ref(), name)?);
            }
            out.push(points);
        }
    }
    Ok(out)
}
