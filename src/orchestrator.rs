//! The trial loop: invalidate, select, settle, capture, persist, repeat.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use rand::RngCore;

use crate::{
    capture::{filter::TrafficFilter, sink::CaptureSink, Sniffer},
    config::{FailurePolicy, RunConfiguration},
    environment::{ContentSource, Environment},
    failure::{Failure, FailureExt},
    persist::ArtifactWriter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Invalidating,
    Selecting,
    Settling,
    Capturing,
    Persisting,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    PoolExhausted,
    TooManyFailures,
    Interrupted,
}

#[derive(Debug)]
pub struct RunReport {
    pub collected: u32,
    pub failed: u32,
    pub artifacts: Vec<PathBuf>,
    pub stop: StopReason,
}

enum TrialOutcome {
    Saved(PathBuf),
    PoolExhausted,
    Interrupted,
}

pub struct TrialOrchestrator<'a> {
    config: &'a RunConfiguration,
    env: &'a mut dyn Environment,
    sniffer: &'a mut dyn Sniffer,
    writer: &'a ArtifactWriter,
    source: &'a ContentSource,
    rng: &'a mut dyn RngCore,
    stop: &'a AtomicBool,
    sink: CaptureSink,
    phase: Phase,
}

impl<'a> TrialOrchestrator<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        env: &'a mut dyn Environment,
        sniffer: &'a mut dyn Sniffer,
        writer: &'a ArtifactWriter,
        source: &'a ContentSource,
        rng: &'a mut dyn RngCore,
        stop: &'a AtomicBool,
    ) -> Self {
        TrialOrchestrator {
            config,
            env,
            sniffer,
            writer,
            source,
            rng,
            stop,
            sink: CaptureSink::new(TrafficFilter::new(config.include_ipv6)),
            phase: Phase::Idle,
        }
    }

    fn enter(&mut self, phase: Phase) {
        debug!("{:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn interrupted(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Runs until the target is met or something ends the run early. Playback is
    /// paused and the backend released on every path out, fatal ones included.
    pub fn run(mut self) -> anyhow::Result<RunReport> {
        let mut report = RunReport {
            collected: 0,
            failed: 0,
            artifacts: Vec::new(),
            stop: StopReason::Completed,
        };
        let mut skipped = 0u32;
        let mut consecutive_failures = 0u32;

        let result = loop {
            if report.collected + skipped >= self.config.samples {
                break Ok(StopReason::Completed);
            }
            if self.interrupted() {
                break Ok(StopReason::Interrupted);
            }

            let slot = report.collected + skipped + 1;
            info!("[{} {}/{}]", self.config.tag, slot, self.config.samples);

            match self.trial() {
                Ok(TrialOutcome::Saved(path)) => {
                    report.collected += 1;
                    report.artifacts.push(path);
                    consecutive_failures = 0;
                }
                Ok(TrialOutcome::PoolExhausted) => break Ok(StopReason::PoolExhausted),
                Ok(TrialOutcome::Interrupted) => break Ok(StopReason::Interrupted),
                Err(failure) if failure.is_fatal() => break Err(failure.into_inner()),
                Err(failure) => {
                    let e = failure.into_inner();
                    report.failed += 1;
                    consecutive_failures += 1;
                    warn!("trial {} failed: {:#}", slot, e);

                    if self.config.failure_policy == FailurePolicy::SkipSlot {
                        skipped += 1;
                    }
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        error!("{} trials failed in a row, giving up", consecutive_failures);
                        break Ok(StopReason::TooManyFailures);
                    }
                }
            }
        };

        self.enter(Phase::Terminal);
        self.env.pause();
        self.env.release();

        report.stop = result?;
        Ok(report)
    }

    fn trial(&mut self) -> Result<TrialOutcome, Failure> {
        self.enter(Phase::Invalidating);
        self.env.invalidate_cache()?;
        if self.interrupted() {
            return Ok(TrialOutcome::Interrupted);
        }

        self.enter(Phase::Selecting);
        if self.source.is_exhausted() {
            warn!("no content to play");
            return Ok(TrialOutcome::PoolExhausted);
        }
        if let Some(item) = self.env.advance_to_next_item(self.source, self.rng)? {
            info!("playing {}", item);
        }

        self.enter(Phase::Settling);
        self.env.settle(self.config.settle_duration);

        self.enter(Phase::Capturing);
        info!(
            "sniffing {:?} on {}",
            self.config.capture_duration, self.config.interface
        );
        self.sink.reset();
        let sink = &mut self.sink;
        self.sniffer
            .sniff(self.config.capture_duration, &mut |frame| {
                sink.record_if_accepted(&frame);
            })
            .recoverable()?;

        self.enter(Phase::Persisting);
        info!(
            "captured {} packets ({} frames seen), saving",
            self.sink.drain().len(),
            self.sink.seen()
        );
        let path = self.writer.write(self.sink.drain()).fatal()?;
        debug!("saved {}", path.display());

        Ok(TrialOutcome::Saved(path))
    }
}
