use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use indicatif::ProgressStyle;
use log::debug;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// 记录每个阶段的耗时
#[derive(Debug, Default)]
pub struct TimeMeasure(pub BTreeMap<&'static str, Duration>);

impl TimeMeasure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measure<F, R>(&mut self, key: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let r = f();
        let elapsed = start.elapsed();
        debug!("{key} 耗时 {:.3}s", elapsed.as_secs_f64());
        crate::metrics::observe_stage_duration(key, elapsed.as_secs_f64());
        *self.0.entry(key).or_default() += elapsed;
        r
    }

    pub fn total(&self) -> Duration {
        self.0.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_measure_accumulates() {
        let mut tm = TimeMeasure::new();
        assert_eq!(tm.measure("a", || 1 + 1), 2);
        tm.measure("a", || ());
        tm.measure("b", || ());
        assert_eq!(tm.0.len(), 2);
        assert!(tm.total() >= tm.0["a"]);
    }
}
