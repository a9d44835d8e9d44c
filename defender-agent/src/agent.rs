//! Periodic collect-and-publish loop.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use defender_metrics::{Collector, NetworkProbe};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::sink::{ReportSink, Topic};

/// Drives one collector against one probe, handing each report to a sink.
pub struct Agent<P, S> {
    collector: Collector,
    probe: P,
    sink: S,
    topic: Topic,
    interval: Duration,
    samples: u64,
    cycles: u64,
}

impl<P: NetworkProbe, S: ReportSink> Agent<P, S> {
    pub fn new(config: &AgentConfig, probe: P, sink: S) -> Self {
        Self {
            collector: Collector::new(config.short_names).with_max_list_size(config.max_list_size),
            probe,
            sink,
            topic: Topic::new(&config.thing_name(), config.format),
            interval: Duration::from_secs(config.interval_secs),
            samples: config.samples,
            cycles: 0,
        }
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether the configured sample count has been reached.
    pub fn is_done(&self) -> bool {
        self.samples > 0 && self.cycles >= self.samples
    }

    /// Collect one sample and deliver its report.
    ///
    /// Returns whether the report was delivered. Encoding and delivery
    /// failures are returned to the caller.
    pub fn run_cycle(&mut self) -> Result<bool> {
        let first = self.collector.baseline().is_none();
        let sample = self.collector.collect(&mut self.probe);
        self.cycles += 1;

        if first && !self.sink.publishes_first_sample() {
            info!("Initial sample collected, publishing starts next cycle");
            return Ok(false);
        }

        let report = sample.build_report();
        self.sink.deliver(&self.topic, &report)?;
        debug!(cycle = self.cycles, topic = self.topic.metrics(), "Report delivered");
        Ok(true)
    }

    /// Run cycles on the configured interval until the sample count is reached
    /// or the process is interrupted.
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Run cycles until the sample count is reached or `shutdown` completes.
    ///
    /// `shutdown` is polled before each tick, so a request raised while a
    /// cycle was running stops the loop before the next one.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            topic = self.topic.metrics(),
            interval_secs = self.interval.as_secs(),
            samples = self.samples,
            "Metrics loop started"
        );

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!(cycles = self.cycles, "Interrupted, stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle()?;
                    if self.is_done() {
                        info!(cycles = self.cycles, "Sample count reached, stopping");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
