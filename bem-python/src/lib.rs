//! Python bindings for the binary event map builder.
//!
//! This module exposes `bem.BEM(width, height, events, event_size)` which
//! returns a fresh `bytearray`, and `bem.BEM_into(...)` which writes into a
//! caller-owned numpy array. Both validate the events here, at the boundary;
//! the core only ever sees well-formed six-field records.

use bem_core::{
    alloc_map, build_binary_event_map, codec, BemError, CodecError, EventRecord, Geometry,
};
use numpy::{PyReadonlyArray2, PyReadwriteArray1};
use pyo3::exceptions::{PyMemoryError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyByteArray;

fn build_err(err: BemError) -> PyErr {
    match err {
        BemError::OutOfMemory(e) => PyMemoryError::new_err(format!("BEM: {}", e)),
        other => PyValueError::new_err(format!("BEM: {}", other)),
    }
}

fn codec_err(err: CodecError) -> PyErr {
    PyValueError::new_err(format!("BEM: {}", err))
}

/// Converts the host `events` argument into records.
///
/// Accepts an `(N, >=6)` int32 numpy array or any sequence of integer
/// sequences. `event_size` must match the number of events supplied.
fn extract_events(events: &PyAny, event_size: i64) -> PyResult<Vec<EventRecord>> {
    let rows: Vec<Vec<i32>> = if let Ok(array) = events.extract::<PyReadonlyArray2<i32>>() {
        array.as_array().outer_iter().map(|row| row.to_vec()).collect()
    } else {
        events.extract()?
    };

    codec::check_declared_count(event_size, rows.len()).map_err(codec_err)?;
    codec::records_from_rows(&rows).map_err(codec_err)
}

/// Builds a binary event map and returns it as a new bytearray.
///
/// Args:
///     width: Frame width in pixels (> 0)
///     height: Frame height in pixels (> 0)
///     events: Sequence of [type, _, _, _, y, x] events (type 1 = ON, 0 = OFF)
///     event_size: Number of events in `events`
///
/// Returns:
///     bytearray: width * height cells, row-major, each 0 or 1
///
/// Example:
///     >>> import bem
///     >>> m = bem.BEM(4, 4, [[1, 0, 0, 0, 1, 2]], 1)
///     >>> m[1 * 4 + 2]
///     1
#[pyfunction]
#[pyo3(name = "BEM")]
fn build_map(
    py: Python<'_>,
    width: i32,
    height: i32,
    events: &PyAny,
    event_size: i64,
) -> PyResult<Py<PyByteArray>> {
    let geometry = Geometry::new(width, height).map_err(build_err)?;
    let records = extract_events(events, event_size)?;

    let mut map = alloc_map(geometry).map_err(build_err)?;
    build_binary_event_map(width, height, &records, &mut map).map_err(build_err)?;

    Ok(PyByteArray::new(py, &map).into())
}

/// Builds a binary event map into a caller-supplied uint8 numpy array.
///
/// `output` must be a contiguous, writable array of exactly width * height
/// elements. It is left untouched if the call raises.
#[pyfunction]
#[pyo3(name = "BEM_into")]
fn build_map_into(
    width: i32,
    height: i32,
    events: &PyAny,
    event_size: i64,
    mut output: PyReadwriteArray1<'_, u8>,
) -> PyResult<()> {
    let records = extract_events(events, event_size)?;
    let map = output
        .as_slice_mut()
        .map_err(|_| PyValueError::new_err("BEM: output array must be contiguous"))?;

    build_binary_event_map(width, height, &records, map).map_err(build_err)?;
    Ok(())
}

/// Binary event map module for Python.
#[pymodule]
fn bem(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(build_map, m)?)?;
    m.add_function(wrap_pyfunction!(build_map_into, m)?)?;
    Ok(())
}
