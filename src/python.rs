//! Python bindings using PyO3

use ndarray::{Array4, ArrayViewD};
use numpy::{IntoPyArray, PyArray4, PyReadonlyArray1, PyReadonlyArray4};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::{
    create_resize_bicubic_op, CoordinateTransformationMode, OpConstructContext, OpContext, OpInputs,
    ResizeBicubicOptions, ResizeError,
};

fn to_py_err(e: ResizeError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

// =============================================================================
// Build Info
// =============================================================================

/// Get build and runtime information
///
/// Returns a dictionary with:
/// - version: Package version
/// - parallel: Whether parallel processing is enabled
/// - num_threads: Worker threads used for resizing
/// - table_size: Resolution of the bicubic coefficient tables
#[pyfunction]
fn build_info(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let info = PyDict::new(py);

    info.set_item("version", env!("CARGO_PKG_VERSION"))?;

    #[cfg(feature = "parallel")]
    info.set_item("parallel", true)?;
    #[cfg(not(feature = "parallel"))]
    info.set_item("parallel", false)?;

    info.set_item("num_threads", crate::ThreadPool::global().num_threads())?;
    info.set_item("table_size", crate::TABLE_SIZE)?;

    Ok(info)
}

// =============================================================================
// Resize
// =============================================================================

/// Resize a float32 NCHW array with bicubic interpolation
///
/// Args:
///     input: 4D numpy array (batch, channels, height, width), float32
///     size: Optional (height, width) of the output
///     align_corners: Map corner pixels of input and output onto each other
///     coordinate_transformation_mode: 0 = scale only, 1 = half pixel
///         (TensorFlow), 2 = PyTorch half pixel
///     size_tensor: Optional int32 array [height, width], used when size is None
///
/// Returns:
///     Resized float32 array (batch, channels, out_height, out_width)
#[pyfunction]
#[pyo3(signature = (input, size=None, align_corners=false, coordinate_transformation_mode=0, size_tensor=None))]
fn resize_bicubic<'py>(
    py: Python<'py>,
    input: PyReadonlyArray4<'py, f32>,
    size: Option<(i64, i64)>,
    align_corners: bool,
    coordinate_transformation_mode: i32,
    size_tensor: Option<PyReadonlyArray1<'py, i32>>,
) -> PyResult<Bound<'py, PyArray4<f32>>> {
    let mode = CoordinateTransformationMode::try_from(coordinate_transformation_mode).map_err(to_py_err)?;
    let mut options = ResizeBicubicOptions::default()
        .with_align_corners(align_corners)
        .with_mode(mode);
    if let Some((height, width)) = size {
        options = options.with_size(height, width);
    }

    let input_view = input.as_array();
    let size_view = size_tensor.as_ref().map(|t| t.as_array());

    let output = py
        .allow_threads(|| -> Result<Array4<f32>, ResizeError> {
            let mut op = create_resize_bicubic_op(&OpConstructContext::cpu(), options, None)?;
            let mut inputs = OpInputs::new(input_view.into_dyn());
            if let Some(size_view) = size_view {
                let size_view: ArrayViewD<'_, i32> = size_view.into_dyn();
                inputs = inputs.with_size_tensor(size_view);
            }
            let mut output = Array4::zeros((0, 0, 0, 0));
            op.run(&OpContext::default(), &inputs, &mut output)?;
            Ok(output)
        })
        .map_err(to_py_err)?;

    Ok(output.into_pyarray(py))
}

// =============================================================================
// Module registration
// =============================================================================

/// Bicubic image resizing matching TensorFlow and PyTorch numerics
///
/// Main function:
/// - resize_bicubic(): Resize float32 NCHW arrays
#[pymodule]
fn resize_bicubic_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(resize_bicubic, m)?)?;
    m.add_function(wrap_pyfunction!(build_info, m)?)?;
    Ok(())
}
