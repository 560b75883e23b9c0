#![allow(unused)]
use std::cell::RefCell;
use std::time::Duration;

#[derive(Default, Clone)]
pub struct TimingStats {
    pub pass_times: Vec<Duration>,
    pub halo_times: Vec<Duration>,
    pub total_time: Duration,
}

impl TimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(feature = "timing")]
    pub fn report(&self) {
        if self.pass_times.is_empty() {
            return;
        }

        let total_pass: Duration = self.pass_times.iter().sum();
        let total_halo: Duration = self.halo_times.iter().sum();
        let overhead = self.total_time.saturating_sub(total_pass + total_halo);

        log::info!("{}", "=".repeat(60));
        log::info!("{:^60}", "SOR TIMING SUMMARY");
        log::info!("{}", "=".repeat(60));
        log::info!(
            "Total solver time:             {:.3}s",
            self.total_time.as_secs_f64()
        );
        log::info!(
            "  Colour passes:             {:>9.3}ms  (avg: {:>9.3}ms)",
            total_pass.as_secs_f64() * 1000.0,
            total_pass.as_secs_f64() * 1000.0 / self.pass_times.len() as f64
        );
        if !self.halo_times.is_empty() {
            log::info!(
                "  Halo exchange:             {:>9.3}ms  (avg: {:>9.3}ms)",
                total_halo.as_secs_f64() * 1000.0,
                total_halo.as_secs_f64() * 1000.0 / self.halo_times.len() as f64
            );
        }
        log::info!(
            "Overhead/Other:                {:>9.3}ms",
            overhead.as_secs_f64() * 1000.0
        );
        log::info!(
            "Passes:                        {} colour, {} halo",
            self.pass_times.len(),
            self.halo_times.len()
        );
    }

    #[cfg(not(feature = "timing"))]
    pub fn report(&self) {}
}

#[cfg(feature = "timing")]
thread_local! {
    static TIMING_STATS: RefCell<TimingStats> = RefCell::new(TimingStats::new());
}

#[cfg(feature = "timing")]
pub fn reset_timing() {
    TIMING_STATS.with(|stats| {
        *stats.borrow_mut() = TimingStats::new();
    });
}

#[cfg(not(feature = "timing"))]
pub fn reset_timing() {}

#[cfg(feature = "timing")]
pub fn record_pass<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().pass_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_pass<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn record_halo<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let start = std::time::Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    TIMING_STATS.with(|stats| {
        stats.borrow_mut().halo_times.push(elapsed);
    });
    result
}

#[cfg(not(feature = "timing"))]
pub fn record_halo<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

#[cfg(feature = "timing")]
pub fn finalize_timing(total_time: Duration) -> TimingStats {
    TIMING_STATS.with(|stats| {
        let mut s = stats.borrow_mut();
        s.total_time = total_time;
        s.clone()
    })
}

#[cfg(not(feature = "timing"))]
pub fn finalize_timing(_total_time: Duration) -> TimingStats {
    TimingStats::new()
}

pub fn finalize_and_report(total_time: Duration) {
    finalize_timing(total_time).report();
}
