use crate::error::EstimationError;
use crate::logging::LogHandle;
use std::thread;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, RefreshKind, System};

/// Source of CPU topology and load readings.
pub trait LoadSampler {
    /// Logical processing units (including hyperthreads).
    fn logical_units(&self) -> usize;

    /// Global utilization in percent, averaged over `window`.
    fn utilization(&self, window: Duration) -> Result<f32, EstimationError>;
}

/// Live readings from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSampler;

impl LoadSampler for SystemSampler {
    fn logical_units(&self) -> usize {
        num_cpus::get()
    }

    fn utilization(&self, window: Duration) -> Result<f32, EstimationError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(EstimationError::Unsupported);
        }

        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
        );
        sys.refresh_cpu_usage();
        // Two refreshes are needed for a delta; sysinfo ignores shorter gaps.
        thread::sleep(window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        sys.refresh_cpu_usage();

        Ok(sys.global_cpu_usage())
    }
}

/// Recommends how many workers the machine can take right now.
///
/// `available = max(1, floor(units * (1 - utilization)))`. The result is a hint;
/// callers cap it with the user's `--processes` value.
pub struct ResourceEstimator<S = SystemSampler> {
    sampler: S,
    window: Duration,
    log: LogHandle,
}

impl ResourceEstimator<SystemSampler> {
    pub fn new(window: Duration, log: LogHandle) -> Self {
        Self::with_sampler(SystemSampler, window, log)
    }
}

impl<S: LoadSampler> ResourceEstimator<S> {
    pub fn with_sampler(sampler: S, window: Duration, log: LogHandle) -> Self {
        Self {
            sampler,
            window,
            log,
        }
    }

    pub fn estimate(&self) -> usize {
        let units = self.sampler.logical_units().max(1);

        match self.sample(units) {
            Ok((utilization, available)) => {
                self.log.info(format!(
                    "Logical units: {units}, CPU load: {utilization:.1}%, available workers: {available}"
                ));
                available
            }
            Err(e) => {
                self.log.warn(format!(
                    "Load sampling failed ({e}), falling back to {units} logical units"
                ));
                units
            }
        }
    }

    fn sample(&self, units: usize) -> Result<(f32, usize), EstimationError> {
        let utilization = self.sampler.utilization(self.window)?;
        if !(0.0..=100.0).contains(&utilization) {
            return Err(EstimationError::InvalidReading(utilization));
        }

        let idle_fraction = f64::from(100.0 - utilization) / 100.0;
        let available = ((units as f64 * idle_fraction).floor() as usize).max(1);
        Ok((utilization, available))
    }
}

/// Worker budget for a run: the estimate, capped by the user's ceiling when given.
pub fn worker_budget(estimate: usize, cap: Option<usize>) -> usize {
    match cap {
        Some(cap) if cap > 0 => estimate.min(cap),
        _ => estimate,
    }
    .max(1)
}
