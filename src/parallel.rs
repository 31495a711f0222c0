//! Fork-join execution over `(batch, output row)` bands
//!
//! The output of a resize is laid out `[batch, channel, height, width]`, so
//! a range of rows for one batch item is scattered over `channels` planes.
//! [`ThreadPool::compute_2d`] carves the output into [`RowBand`]s, each owning
//! the rows `rows` of every channel plane of one batch item, and runs them to
//! completion before returning. Bands never overlap, so workers write without
//! synchronization.

use std::ops::Range;
#[cfg(feature = "parallel")]
use std::sync::Arc;

use log::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::ResizeError;

/// Contiguous row range of one batch item, across all channels
pub struct RowBand<'a> {
    batch: usize,
    rows: Range<usize>,
    width: usize,
    planes: Vec<&'a mut [f32]>,
}

impl<'a> RowBand<'a> {
    /// Batch index this band belongs to
    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Output rows covered by this band
    #[inline]
    pub fn rows(&self) -> Range<usize> {
        self.rows.clone()
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Output row `y` of `channel`. `y` is an absolute row index inside `rows()`.
    #[inline]
    pub fn row_mut(&mut self, channel: usize, y: usize) -> &mut [f32] {
        let start = (y - self.rows.start) * self.width;
        &mut self.planes[channel][start..start + self.width]
    }
}

/// Parallel execution context used by the resize driver.
///
/// Wraps either rayon's global pool or a dedicated pool. Cloning is cheap.
#[derive(Clone, Default)]
pub struct ThreadPool {
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads())
            .finish()
    }
}

impl ThreadPool {
    /// Run on rayon's global pool
    pub fn global() -> Self {
        Self::default()
    }

    /// Run on a dedicated pool with `num_threads` workers.
    ///
    /// Without the `parallel` feature the pool is always the calling thread.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        #[cfg(feature = "parallel")]
        {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .thread_name(|i| format!("resize-bicubic-{i}"))
                .build()
                .map_err(|e| ResizeError::ThreadPool(e.to_string()))?;
            Ok(Self {
                pool: Some(Arc::new(pool)),
            })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = num_threads;
            Ok(Self::default())
        }
    }

    pub fn num_threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        {
            match &self.pool {
                Some(pool) => pool.current_num_threads(),
                None => rayon::current_num_threads(),
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Run `f` once for every band of `output` and block until all are done.
    ///
    /// `output` must hold exactly `batch * channels * out_height * out_width`
    /// elements in row-major `[batch, channel, height, width]` order.
    pub fn compute_2d<F>(
        &self,
        output: &mut [f32],
        batch: usize,
        channels: usize,
        out_height: usize,
        out_width: usize,
        f: F,
    ) where
        F: Fn(&mut RowBand<'_>) + Send + Sync,
    {
        debug_assert_eq!(output.len(), batch * channels * out_height * out_width);
        if output.is_empty() {
            return;
        }

        let rows_per_band = rows_per_band(batch, out_height, self.num_threads());
        let bands = split_bands(output, channels, out_height, out_width, rows_per_band);
        trace!(
            "compute_2d: batch={batch}, out_height={out_height}, rows_per_band={rows_per_band}, bands={}",
            bands.len()
        );

        #[cfg(feature = "parallel")]
        {
            let run = move || {
                bands.into_par_iter().for_each(|mut band| f(&mut band));
            };
            match &self.pool {
                Some(pool) => pool.install(run),
                None => run(),
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            for mut band in bands {
                f(&mut band);
            }
        }
    }
}

/// Rows per band so that the `(batch, row)` space yields about one band per worker.
fn rows_per_band(batch: usize, out_height: usize, workers: usize) -> usize {
    let total_rows = batch * out_height;
    total_rows.div_ceil(workers.max(1)).clamp(1, out_height.max(1))
}

fn split_bands(
    output: &mut [f32],
    channels: usize,
    out_height: usize,
    out_width: usize,
    rows_per_band: usize,
) -> Vec<RowBand<'_>> {
    let plane_len = out_height * out_width;
    let bands_per_batch = out_height.div_ceil(rows_per_band);
    let mut bands = Vec::new();

    for (b, batch_block) in output.chunks_mut(channels * plane_len).enumerate() {
        let first = bands.len();
        for start in (0..out_height).step_by(rows_per_band) {
            let end = (start + rows_per_band).min(out_height);
            bands.push(RowBand {
                batch: b,
                rows: start..end,
                width: out_width,
                planes: Vec::with_capacity(channels),
            });
        }
        for plane in batch_block.chunks_mut(plane_len) {
            for (i, rows) in plane.chunks_mut(rows_per_band * out_width).enumerate() {
                bands[first + i].planes.push(rows);
            }
        }
        debug_assert_eq!(bands.len() - first, bands_per_batch);
    }

    bands
}
