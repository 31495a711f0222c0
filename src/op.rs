//! Resize operator: argument handling, output sizing and device dispatch
//!
//! The CPU variant runs [`resize_image`](crate::scalar::resize_image) on the
//! context's thread pool. The accelerator variant validates the same inputs
//! and hands the resolved output size to an injected [`ResizeKernel`].

use log::debug;
use ndarray::{Array4, ArrayView4, ArrayViewD, Ix4};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ResizeError, Result};
use crate::mode::{calculate_resize_scale, CoordinateTransformationMode};
use crate::parallel::ThreadPool;
use crate::scalar::resize_image;

// =============================================================================
// Configuration
// =============================================================================

/// Operator arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResizeBicubicOptions {
    pub align_corners: bool,
    pub coordinate_transformation_mode: CoordinateTransformationMode,
    /// Static `[height, width]`. Non-positive entries mean "read the size input".
    pub size: [i64; 2],
}

impl Default for ResizeBicubicOptions {
    fn default() -> Self {
        Self {
            align_corners: false,
            coordinate_transformation_mode: CoordinateTransformationMode::None,
            size: [-1, -1],
        }
    }
}

impl ResizeBicubicOptions {
    pub fn with_align_corners(mut self, align_corners: bool) -> Self {
        self.align_corners = align_corners;
        self
    }

    pub fn with_mode(mut self, mode: CoordinateTransformationMode) -> Self {
        self.coordinate_transformation_mode = mode;
        self
    }

    pub fn with_size(mut self, height: i64, width: i64) -> Self {
        self.size = [height, width];
        self
    }

    /// The static output size, if both components are positive
    pub fn static_size(&self) -> Option<(usize, usize)> {
        let [h, w] = self.size;
        if h > 0 && w > 0 {
            Some((h as usize, w as usize))
        } else {
            None
        }
    }
}

// =============================================================================
// Execution contexts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Cpu,
    Gpu,
}

/// Where an operator's tensors live on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryType {
    CpuBuffer,
    GpuBuffer,
    GpuImage,
}

/// Information available while constructing an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpConstructContext {
    pub device: DeviceType,
    pub memory_type: MemoryType,
}

impl OpConstructContext {
    pub fn cpu() -> Self {
        Self {
            device: DeviceType::Cpu,
            memory_type: MemoryType::CpuBuffer,
        }
    }

    pub fn gpu(memory_type: MemoryType) -> Self {
        Self {
            device: DeviceType::Gpu,
            memory_type,
        }
    }
}

/// Run-time context handed to every operator invocation
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    thread_pool: ThreadPool,
}

impl OpContext {
    pub fn new(thread_pool: ThreadPool) -> Self {
        Self { thread_pool }
    }

    #[inline]
    pub fn thread_pool(&self) -> &ThreadPool {
        &self.thread_pool
    }
}

/// Operator inputs: the image and an optional run-time `[height, width]` tensor
#[derive(Debug, Clone)]
pub struct OpInputs<'a> {
    pub input: ArrayViewD<'a, f32>,
    pub size: Option<ArrayViewD<'a, i32>>,
}

impl<'a> OpInputs<'a> {
    pub fn new(input: ArrayViewD<'a, f32>) -> Self {
        Self { input, size: None }
    }

    pub fn with_size_tensor(mut self, size: ArrayViewD<'a, i32>) -> Self {
        self.size = Some(size);
        self
    }

    /// The image as a 4D `[batch, channels, height, width]` view
    pub fn input_4d(&self) -> Result<ArrayView4<'a, f32>> {
        let rank = self.input.ndim();
        self.input
            .clone()
            .into_dimensionality::<Ix4>()
            .map_err(|_| ResizeError::InvalidRank(rank))
    }
}

// =============================================================================
// Operator interfaces
// =============================================================================

/// A constructed operator instance
pub trait Operation: Send {
    fn device_type(&self) -> DeviceType;

    /// Validate inputs, size `output` and fill it.
    fn run(&mut self, context: &OpContext, inputs: &OpInputs<'_>, output: &mut Array4<f32>) -> Result<()>;
}

/// Device kernel that performs the resize for the accelerator variant
pub trait ResizeKernel: Send {
    fn compute(
        &mut self,
        context: &OpContext,
        input: ArrayView4<'_, f32>,
        out_height: usize,
        out_width: usize,
        output: &mut Array4<f32>,
    ) -> Result<()>;
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Output `(height, width)` from the static size or the size input tensor.
pub fn resolve_output_size(
    options: &ResizeBicubicOptions,
    size_tensor: Option<&ArrayViewD<'_, i32>>,
) -> Result<(usize, usize)> {
    if let Some(size) = options.static_size() {
        return Ok(size);
    }

    let size_tensor = size_tensor.ok_or(ResizeError::MissingSizeInput)?;
    if size_tensor.ndim() != 1 || size_tensor.len() != 2 {
        return Err(ResizeError::InvalidSizeTensor(size_tensor.shape().to_vec()));
    }

    let mut values = size_tensor.iter().copied();
    let (height, width) = match (values.next(), values.next()) {
        (Some(h), Some(w)) => (h, w),
        _ => return Err(ResizeError::InvalidSizeTensor(size_tensor.shape().to_vec())),
    };
    if height <= 0 || width <= 0 {
        return Err(ResizeError::NonPositiveSize {
            height: height as i64,
            width: width as i64,
        });
    }

    Ok((height as usize, width as usize))
}

/// Replace `output` with a zeroed array of `shape`, reporting allocation failure.
pub fn resize_output(output: &mut Array4<f32>, shape: [usize; 4]) -> Result<()> {
    if output.shape() == shape && output.is_standard_layout() {
        return Ok(());
    }

    let elements = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(ResizeError::ShapeOverflow(shape))?;

    let mut data: Vec<f32> = Vec::new();
    data.try_reserve_exact(elements)
        .map_err(|_| ResizeError::Allocation { elements })?;
    data.resize(elements, 0.0);

    *output = Array4::from_shape_vec((shape[0], shape[1], shape[2], shape[3]), data)
        .map_err(|_| ResizeError::ShapeOverflow(shape))?;
    Ok(())
}

pub(crate) fn check_spatial(input: &ArrayView4<'_, f32>, out_height: usize, out_width: usize) -> Result<()> {
    let (batch, channels, in_height, in_width) = input.dim();
    let produces_output = [batch, channels, out_height, out_width].iter().all(|&d| d > 0);
    if produces_output && (in_height == 0 || in_width == 0) {
        return Err(ResizeError::EmptyInput {
            height: in_height,
            width: in_width,
        });
    }
    Ok(())
}

/// Resize `input` into `output` on the CPU. `output` is reshaped as needed.
pub(crate) fn resize_cpu(
    pool: &ThreadPool,
    options: &ResizeBicubicOptions,
    input: ArrayView4<'_, f32>,
    out_height: usize,
    out_width: usize,
    output: &mut Array4<f32>,
) -> Result<()> {
    let (batch, channels, _, _) = input.dim();
    check_spatial(&input, out_height, out_width)?;
    resize_output(output, [batch, channels, out_height, out_width])?;

    let output_data = output.as_slice_mut().expect("Output must be C-contiguous");
    resize_into_slice(pool, options, input, out_height, out_width, output_data);
    Ok(())
}

/// Fill a contiguous `[batch, channels, out_height, out_width]` buffer.
///
/// Inputs must already be validated; identical spatial sizes copy the input.
pub(crate) fn resize_into_slice(
    pool: &ThreadPool,
    options: &ResizeBicubicOptions,
    input: ArrayView4<'_, f32>,
    out_height: usize,
    out_width: usize,
    output_data: &mut [f32],
) {
    let (batch, channels, in_height, in_width) = input.dim();
    let input = input.as_standard_layout();
    let input_data = input.as_slice().expect("Input must be C-contiguous");

    if out_height == in_height && out_width == in_width {
        debug!("resize_bicubic: identity {batch}x{channels}x{in_height}x{in_width}, copying input");
        output_data.copy_from_slice(input_data);
        return;
    }

    let mode = options.coordinate_transformation_mode;
    let height_scale = calculate_resize_scale(in_height, out_height, options.align_corners);
    let width_scale = calculate_resize_scale(in_width, out_width, options.align_corners);
    debug!(
        "resize_bicubic: {batch}x{channels}x{in_height}x{in_width} -> {out_height}x{out_width}, \
         scale=({height_scale}, {width_scale}), mode={mode:?}, align_corners={}",
        options.align_corners
    );

    resize_image(
        pool,
        input_data,
        batch,
        in_height,
        in_width,
        out_height,
        out_width,
        channels,
        height_scale,
        width_scale,
        mode,
        output_data,
    );
}

// =============================================================================
// CPU operator
// =============================================================================

/// Bicubic resize on the host
#[derive(Debug, Clone, Default)]
pub struct CpuResizeBicubicOp {
    options: ResizeBicubicOptions,
}

impl CpuResizeBicubicOp {
    pub fn new(options: ResizeBicubicOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResizeBicubicOptions {
        &self.options
    }
}

impl Operation for CpuResizeBicubicOp {
    fn device_type(&self) -> DeviceType {
        DeviceType::Cpu
    }

    fn run(&mut self, context: &OpContext, inputs: &OpInputs<'_>, output: &mut Array4<f32>) -> Result<()> {
        let input = inputs.input_4d()?;
        let (out_height, out_width) = resolve_output_size(&self.options, inputs.size.as_ref())?;
        resize_cpu(context.thread_pool(), &self.options, input, out_height, out_width, output)
    }
}

/// [`ResizeKernel`] backed by the host implementation
#[derive(Debug, Clone, Default)]
pub struct CpuResizeKernel {
    options: ResizeBicubicOptions,
}

impl CpuResizeKernel {
    pub fn new(align_corners: bool, mode: CoordinateTransformationMode) -> Self {
        Self {
            options: ResizeBicubicOptions::default()
                .with_align_corners(align_corners)
                .with_mode(mode),
        }
    }
}

impl ResizeKernel for CpuResizeKernel {
    fn compute(
        &mut self,
        context: &OpContext,
        input: ArrayView4<'_, f32>,
        out_height: usize,
        out_width: usize,
        output: &mut Array4<f32>,
    ) -> Result<()> {
        resize_cpu(context.thread_pool(), &self.options, input, out_height, out_width, output)
    }
}

// =============================================================================
// Accelerator operator
// =============================================================================

/// Bicubic resize delegated to a device kernel
pub struct GpuResizeBicubicOp {
    size: [i64; 2],
    kernel: Box<dyn ResizeKernel>,
}

impl std::fmt::Debug for GpuResizeBicubicOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResizeBicubicOp").field("size", &self.size).finish_non_exhaustive()
    }
}

impl GpuResizeBicubicOp {
    /// Build the operator. Only image memory is supported; `make_kernel`
    /// is called with the align-corners flag and mode once that is checked.
    pub fn new<F>(construct: &OpConstructContext, options: ResizeBicubicOptions, make_kernel: F) -> Result<Self>
    where
        F: FnOnce(bool, CoordinateTransformationMode) -> Box<dyn ResizeKernel>,
    {
        if construct.memory_type != MemoryType::GpuImage {
            return Err(ResizeError::UnsupportedMemoryType(construct.memory_type));
        }

        let kernel = make_kernel(options.align_corners, options.coordinate_transformation_mode);
        Ok(Self {
            size: options.size,
            kernel,
        })
    }
}

impl Operation for GpuResizeBicubicOp {
    fn device_type(&self) -> DeviceType {
        DeviceType::Gpu
    }

    fn run(&mut self, context: &OpContext, inputs: &OpInputs<'_>, output: &mut Array4<f32>) -> Result<()> {
        let input = inputs.input_4d()?;
        let options = ResizeBicubicOptions::default().with_size(self.size[0], self.size[1]);
        let (out_height, out_width) = resolve_output_size(&options, inputs.size.as_ref())?;
        debug!("resize_bicubic: delegating {:?} -> {out_height}x{out_width} to device kernel", input.dim());
        self.kernel.compute(context, input, out_height, out_width, output)
    }
}

/// Factory producing the device kernel for the accelerator variant
pub type KernelFactory = Box<dyn FnOnce(bool, CoordinateTransformationMode) -> Box<dyn ResizeKernel>>;

/// Construct the operator variant for `construct.device`.
pub fn create_resize_bicubic_op(
    construct: &OpConstructContext,
    options: ResizeBicubicOptions,
    kernel_factory: Option<KernelFactory>,
) -> Result<Box<dyn Operation>> {
    match construct.device {
        DeviceType::Cpu => Ok(Box::new(CpuResizeBicubicOp::new(options))),
        DeviceType::Gpu => {
            let factory = kernel_factory.ok_or(ResizeError::MissingAcceleratorKernel)?;
            Ok(Box::new(GpuResizeBicubicOp::new(construct, options, factory)?))
        }
    }
}
