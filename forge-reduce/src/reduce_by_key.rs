//! Device-wide reduce-by-key.
//!
//! Two-call protocol: a call with `temp_storage = None` only stores the
//! required scratch size in `temp_storage_bytes`. A call with a buffer of at
//! least that size runs the four passes. The run count is written to
//! `unique_count_out[0]`; `unique_out` and `aggregates_out` must hold that
//! many elements, so callers either allocate `size` slots or read the count
//! first with discarding outputs and call again.

use std::marker::PhantomData;

use forge_primitives::{
    BenchTimer, ComputeContext, DeviceBuffer, DiscardOutput, DispatchError, InputRange,
    OutputRange, SliceOutput,
};

use crate::config::ReduceByKeyConfig;
use crate::kernels::{self, Operands};
use crate::layout::{BatchPlan, ScratchLayout};
use crate::observer::{self, Pass, PassObserver, PassReport};
use crate::ReduceByKeyError;

/// Configured reduce-by-key launcher.
#[derive(Clone, Copy)]
pub struct ReduceByKey<'o> {
    config: ReduceByKeyConfig,
    observer: Option<&'o dyn PassObserver>,
    debug_synchronous: bool,
}

impl Default for ReduceByKey<'_> {
    fn default() -> Self {
        Self::new(ReduceByKeyConfig::default())
    }
}

impl<'o> ReduceByKey<'o> {
    pub fn new(config: ReduceByKeyConfig) -> Self {
        Self {
            config,
            observer: None,
            debug_synchronous: false,
        }
    }

    /// Report the plan and every pass to `observer`.
    pub fn with_observer(mut self, observer: &'o dyn PassObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Check the context status after every pass and report pass timings,
    /// to the installed observer or else to `tracing`.
    pub fn debug_synchronous(mut self, enabled: bool) -> Self {
        self.debug_synchronous = enabled;
        self
    }

    pub fn config(&self) -> &ReduceByKeyConfig {
        &self.config
    }

    /// Plan and scratch layout for `size` elements with values of type `V`.
    pub fn plan<V>(&self, size: usize) -> Result<(BatchPlan, ScratchLayout), ReduceByKeyError> {
        self.config.validate()?;
        let plan = BatchPlan::new(size, &self.config)?;
        let layout = ScratchLayout::new::<V>(&plan)?;
        Ok((plan, layout))
    }

    /// Scratch bytes required for `size` elements with values of type `V`.
    pub fn scratch_bytes<V>(&self, size: usize) -> Result<usize, ReduceByKeyError> {
        Ok(self.plan::<V>(size)?.1.total_bytes)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run<K, V, KI, VI, UO, AO, CO, R, E>(
        &self,
        temp_storage: Option<&mut DeviceBuffer>,
        temp_storage_bytes: &mut usize,
        keys: &KI,
        values: &VI,
        size: usize,
        unique_out: &UO,
        aggregates_out: &AO,
        unique_count_out: &CO,
        reduce_op: R,
        key_eq: E,
        ctx: &ComputeContext,
    ) -> Result<(), ReduceByKeyError>
    where
        K: Copy + Send + Sync,
        V: Copy + Send + Sync,
        KI: InputRange<K> + ?Sized,
        VI: InputRange<V> + ?Sized,
        UO: OutputRange<K> + ?Sized,
        AO: OutputRange<V> + ?Sized,
        CO: OutputRange<usize> + ?Sized,
        R: Fn(V, V) -> V + Sync,
        E: Fn(&K, &K) -> bool + Sync,
    {
        let (plan, layout) = self.plan::<V>(size)?;

        let Some(storage) = temp_storage else {
            *temp_storage_bytes = layout.total_bytes;
            return Ok(());
        };

        if storage.len() < layout.total_bytes {
            return Err(ReduceByKeyError::ScratchTooSmall {
                required: layout.total_bytes,
                provided: storage.len(),
            });
        }
        if keys.len() < size || values.len() < size {
            return Err(ReduceByKeyError::InputTooShort {
                size,
                keys: keys.len(),
                values: values.len(),
            });
        }
        check_output("unique_count_out", 1, unique_count_out.len())?;

        let observer = self.observer();
        if let Some(observer) = observer {
            observer.plan(&self.config, &plan, &layout);
        }

        if plan.is_empty() {
            // SAFETY: length checked above; nothing else runs.
            unsafe { unique_count_out.put(0, 0) };
            return Ok(());
        }

        let scratch = layout.bind::<V>(&plan, storage);
        let ops = Operands {
            keys,
            values,
            unique_out,
            aggregates_out,
            reduce_op: &reduce_op,
            key_eq: &key_eq,
            _marker: PhantomData,
        };

        // Dispatch 1: boundary counts per block
        self.pass(ctx, observer, Pass::CountBoundaries, size, || {
            kernels::count_boundaries::launch(ctx, &plan, self.config.reduce, keys, &key_eq, &scratch.offsets)
        })?;

        // Dispatch 2: block offsets + run count
        let runs = self.pass(ctx, observer, Pass::ScanOffsets, plan.blocks as usize, || {
            kernels::scan_offsets::launch(ctx, &plan, self.config.scan, &scratch.offsets, unique_count_out)
        })?;

        check_output("unique_out", runs, unique_out.len())?;
        check_output("aggregates_out", runs, aggregates_out.len())?;

        // Dispatch 3: per-batch run reduction
        self.pass(ctx, observer, Pass::ReduceRuns, size, || {
            kernels::reduce_runs::launch(ctx, &plan, self.config.reduce, &ops, &scratch, runs)
        })?;

        // Dispatch 4: carry-out fixup
        self.pass(ctx, observer, Pass::ScatterCarries, plan.batches as usize, || {
            kernels::scatter_carries::launch(ctx, &plan, self.config.scan, &reduce_op, aggregates_out, &scratch)
        })?;

        Ok(())
    }

    /// Reduce `keys`/`values` into freshly allocated vectors, sizing scratch
    /// and outputs internally.
    pub fn run_to_vec<K, V, R, E>(
        &self,
        keys: &[K],
        values: &[V],
        reduce_op: R,
        key_eq: E,
        ctx: &ComputeContext,
    ) -> Result<(Vec<K>, Vec<V>), ReduceByKeyError>
    where
        K: Copy + Send + Sync,
        V: Copy + Send + Sync,
        R: Fn(V, V) -> V + Sync,
        E: Fn(&K, &K) -> bool + Sync,
    {
        if keys.len() != values.len() {
            return Err(ReduceByKeyError::LengthMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let (Some(&first_key), Some(&first_value)) = (keys.first(), values.first()) else {
            return Ok((Vec::new(), Vec::new()));
        };
        let size = keys.len();

        let mut bytes = 0;
        self.run(
            None,
            &mut bytes,
            keys,
            values,
            size,
            &DiscardOutput,
            &DiscardOutput,
            &DiscardOutput,
            &reduce_op,
            &key_eq,
            ctx,
        )?;
        let mut storage = DeviceBuffer::alloc(bytes)?;

        let mut unique = vec![first_key; size];
        let mut aggregates = vec![first_value; size];
        let mut count = [0usize];
        self.run(
            Some(&mut storage),
            &mut bytes,
            keys,
            values,
            size,
            &SliceOutput::new(&mut unique),
            &SliceOutput::new(&mut aggregates),
            &SliceOutput::new(&mut count),
            &reduce_op,
            &key_eq,
            ctx,
        )?;

        unique.truncate(count[0]);
        aggregates.truncate(count[0]);
        Ok((unique, aggregates))
    }

    fn observer(&self) -> Option<&'o dyn PassObserver> {
        observer::select(self.observer, self.debug_synchronous)
    }

    fn pass<T>(
        &self,
        ctx: &ComputeContext,
        observer: Option<&dyn PassObserver>,
        pass: Pass,
        items: usize,
        launch: impl FnOnce() -> Result<T, DispatchError>,
    ) -> Result<T, DispatchError> {
        let timer = BenchTimer::start();
        let out = launch()?;
        if self.debug_synchronous {
            ctx.synchronize()?;
        }
        if let Some(observer) = observer {
            observer.pass_complete(&PassReport {
                pass,
                items,
                elapsed_ms: timer.stop(),
            });
        }
        Ok(out)
    }
}

fn check_output(output: &'static str, required: usize, provided: usize) -> Result<(), ReduceByKeyError> {
    if provided < required {
        return Err(ReduceByKeyError::OutputTooSmall {
            output,
            required,
            provided,
        });
    }
    Ok(())
}

/// Reduce every run of `key_eq`-equivalent adjacent keys with `reduce_op`.
///
/// Pass `temp_storage = None` to receive the scratch size in
/// `temp_storage_bytes`, then call again with a buffer of that size. With
/// `debug_synchronous` set, pass timings are reported through `tracing`.
#[allow(clippy::too_many_arguments)]
pub fn reduce_by_key<K, V, KI, VI, UO, AO, CO, R, E>(
    temp_storage: Option<&mut DeviceBuffer>,
    temp_storage_bytes: &mut usize,
    keys: &KI,
    values: &VI,
    size: usize,
    unique_out: &UO,
    aggregates_out: &AO,
    unique_count_out: &CO,
    reduce_op: R,
    key_eq: E,
    ctx: &ComputeContext,
    debug_synchronous: bool,
) -> Result<(), ReduceByKeyError>
where
    K: Copy + Send + Sync,
    V: Copy + Send + Sync,
    KI: InputRange<K> + ?Sized,
    VI: InputRange<V> + ?Sized,
    UO: OutputRange<K> + ?Sized,
    AO: OutputRange<V> + ?Sized,
    CO: OutputRange<usize> + ?Sized,
    R: Fn(V, V) -> V + Sync,
    E: Fn(&K, &K) -> bool + Sync,
{
    ReduceByKey::default()
        .debug_synchronous(debug_synchronous)
        .run(
            temp_storage,
            temp_storage_bytes,
            keys,
            values,
            size,
            unique_out,
            aggregates_out,
            unique_count_out,
            reduce_op,
            key_eq,
            ctx,
        )
}

/// [`ReduceByKey::run_to_vec`] with the default configuration.
pub fn reduce_by_key_to_vec<K, V, R, E>(
    keys: &[K],
    values: &[V],
    reduce_op: R,
    key_eq: E,
    ctx: &ComputeContext,
) -> Result<(Vec<K>, Vec<V>), ReduceByKeyError>
where
    K: Copy + Send + Sync,
    V: Copy + Send + Sync,
    R: Fn(V, V) -> V + Sync,
    E: Fn(&K, &K) -> bool + Sync,
{
    ReduceByKey::default().run_to_vec(keys, values, reduce_op, key_eq, ctx)
}
