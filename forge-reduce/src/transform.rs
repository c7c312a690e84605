//! Device-wide element-wise transform.
//!
//! `output[i] = op(input[i])` for every `i < size`, one tile per threadgroup.
//! Paired with [`ConstantInput`](forge_primitives::ConstantInput) this fills
//! an output with a computed value without materialising the input.

use forge_primitives::{BenchTimer, ComputeContext, GridSize, InputRange, OutputRange};

use crate::config::TransformConfig;
use crate::observer::{self, Pass, PassObserver, PassReport};
use crate::TransformError;

#[derive(Clone, Copy, Default)]
pub struct Transform<'o> {
    config: TransformConfig,
    observer: Option<&'o dyn PassObserver>,
    debug_synchronous: bool,
}

impl<'o> Transform<'o> {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            observer: None,
            debug_synchronous: false,
        }
    }

    pub fn with_observer(mut self, observer: &'o dyn PassObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn debug_synchronous(mut self, enabled: bool) -> Self {
        self.debug_synchronous = enabled;
        self
    }

    pub fn run<T, U, I, O, F>(
        &self,
        input: &I,
        output: &O,
        size: usize,
        op: F,
        ctx: &ComputeContext,
    ) -> Result<(), TransformError>
    where
        I: InputRange<T> + ?Sized,
        O: OutputRange<U> + ?Sized,
        F: Fn(T) -> U + Sync,
    {
        self.config.validate()?;
        if input.len() < size {
            return Err(TransformError::InputTooShort {
                size,
                provided: input.len(),
            });
        }
        if output.len() < size {
            return Err(TransformError::OutputTooSmall {
                size,
                provided: output.len(),
            });
        }
        if size == 0 {
            return Ok(());
        }

        let kernel = self.config.kernel;
        let items_per_block = kernel.items_per_block() as usize;
        let grid = GridSize::for_items(size, kernel.block_size as usize, kernel.items_per_thread as usize);

        let timer = BenchTimer::start();
        ctx.dispatch(Pass::Transform.kernel_name(), grid, |tg| {
            let start = tg.index * items_per_block;
            let end = (start + items_per_block).min(size);
            for i in start..end {
                // SAFETY: tiles are disjoint and end <= size <= output.len().
                unsafe { output.put(i, op(input.get(i))) };
            }
        })?;
        if self.debug_synchronous {
            ctx.synchronize()?;
        }

        if let Some(observer) = observer::select(self.observer, self.debug_synchronous) {
            observer.pass_complete(&PassReport {
                pass: Pass::Transform,
                items: size,
                elapsed_ms: timer.stop(),
            });
        }
        Ok(())
    }
}

/// [`Transform::run`] with the default configuration.
pub fn transform<T, U, I, O, F>(
    input: &I,
    output: &O,
    size: usize,
    op: F,
    ctx: &ComputeContext,
    debug_synchronous: bool,
) -> Result<(), TransformError>
where
    I: InputRange<T> + ?Sized,
    O: OutputRange<U> + ?Sized,
    F: Fn(T) -> U + Sync,
{
    Transform::default()
        .debug_synchronous(debug_synchronous)
        .run(input, output, size, op, ctx)
}
