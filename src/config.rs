use std::{path::PathBuf, time::Duration};

use clap::{Args, ValueEnum};

use crate::persist::ArtifactFormat;

/// What happens to the sample slot when a capture window fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailurePolicy {
    /// Try the same slot again, the target count is still reached
    RetrySlot,
    /// Give up on the slot, the run may end with fewer artifacts
    SkipSlot,
}

/// What to do when an operator does not answer a checkpoint in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CheckpointFallback {
    Abort,
    Proceed,
}

/// Options shared by every source.
#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    /// Network interface to sniff on
    #[arg(long, default_value_t = String::from("en0"))]
    pub interface: String,

    /// Length of one capture window in seconds
    #[arg(long, default_value_t = 15)]
    pub capture_sec: u64,

    /// How many artifacts to collect [default depends on the source]
    #[arg(long)]
    pub samples: Option<u32>,

    /// Wait between starting playback and opening the capture window [default depends on the source]
    #[arg(long)]
    pub settle_sec: Option<u64>,

    /// Streaming quality label, used in the default output directory and tag
    /// [default: low, spotify: free]
    #[arg(long)]
    pub quality: Option<String>,

    /// Where to put the artifacts [default: under final_dataset/, named after source and quality]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Artifact file name prefix [default depends on the source]
    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long, value_enum, default_value_t = ArtifactFormat::Json)]
    pub format: ArtifactFormat,

    /// Also keep IPv6 frames (only IPv4 is recorded by default)
    #[arg(long, action)]
    pub include_ipv6: bool,

    #[arg(long, value_enum, default_value_t = FailurePolicy::RetrySlot)]
    pub on_capture_error: FailurePolicy,

    /// Stop the run after this many failed windows in a row
    #[arg(long, default_value_t = 10)]
    pub max_consecutive_failures: u32,

    /// How long to wait for the operator at a checkpoint, in seconds
    #[arg(long, default_value_t = 1800)]
    pub checkpoint_timeout_sec: u64,

    #[arg(long, value_enum, default_value_t = CheckpointFallback::Abort)]
    pub checkpoint_fallback: CheckpointFallback,

    /// Seed for the track draws, random when not given
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Per-source values used where the command line is silent.
pub struct SourceDefaults {
    pub samples: u32,
    pub settle: Duration,
    pub output_dir: PathBuf,
    pub tag: String,
}

/// Everything fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub interface: String,
    pub capture_duration: Duration,
    pub settle_duration: Duration,
    pub samples: u32,
    pub output_dir: PathBuf,
    pub tag: String,
    pub format: ArtifactFormat,
    pub include_ipv6: bool,
    pub failure_policy: FailurePolicy,
    pub max_consecutive_failures: u32,
    pub checkpoint_timeout: Duration,
    pub checkpoint_fallback: CheckpointFallback,
    pub seed: Option<u64>,
}

impl CaptureArgs {
    pub fn quality_or(&self, default: &str) -> String {
        self.quality.clone().unwrap_or_else(|| default.to_owned())
    }

    pub fn resolve(self, defaults: SourceDefaults) -> RunConfiguration {
        RunConfiguration {
            interface: self.interface,
            capture_duration: Duration::from_secs(self.capture_sec),
            settle_duration: self.settle_sec.map(Duration::from_secs).unwrap_or(defaults.settle),
            samples: self.samples.unwrap_or(defaults.samples),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            tag: self.tag.unwrap_or(defaults.tag),
            format: self.format,
            include_ipv6: self.include_ipv6,
            failure_policy: self.on_capture_error,
            max_consecutive_failures: self.max_consecutive_failures.max(1),
            checkpoint_timeout: Duration::from_secs(self.checkpoint_timeout_sec),
            checkpoint_fallback: self.checkpoint_fallback,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        capture: CaptureArgs,
    }

    fn defaults() -> SourceDefaults {
        SourceDefaults {
            samples: 20,
            settle: Duration::from_secs(3),
            output_dir: PathBuf::from("final_dataset/apple_desktop_low"),
            tag: String::from("apple_low"),
        }
    }

    #[test]
    fn source_defaults_fill_gaps() {
        let cli = Cli::parse_from(["streamcap"]);
        assert_eq!(cli.capture.quality_or("low"), "low");
        let cfg = cli.capture.resolve(defaults());
        assert_eq!(cfg.interface, "en0");
        assert_eq!(cfg.capture_duration, Duration::from_secs(15));
        assert_eq!(cfg.settle_duration, Duration::from_secs(3));
        assert_eq!(cfg.samples, 20);
        assert_eq!(cfg.tag, "apple_low");
        assert_eq!(cfg.format, ArtifactFormat::Json);
        assert_eq!(cfg.failure_policy, FailurePolicy::RetrySlot);
        assert_eq!(cfg.checkpoint_fallback, CheckpointFallback::Abort);
    }

    #[test]
    fn command_line_wins() {
        let cli = Cli::parse_from([
            "streamcap",
            "--interface",
            "eth1",
            "--samples",
            "3",
            "--settle-sec",
            "0",
            "--tag",
            "x",
            "--format",
            "csv",
            "--on-capture-error",
            "skip-slot",
            "--checkpoint-fallback",
            "proceed",
            "--max-consecutive-failures",
            "0",
            "--quality",
            "high",
        ]);
        assert_eq!(cli.capture.quality_or("low"), "high");
        let cfg = cli.capture.resolve(defaults());
        assert_eq!(cfg.interface, "eth1");
        assert_eq!(cfg.samples, 3);
        assert_eq!(cfg.settle_duration, Duration::ZERO);
        assert_eq!(cfg.tag, "x");
        assert_eq!(cfg.format, ArtifactFormat::Csv);
        assert_eq!(cfg.failure_policy, FailurePolicy::SkipSlot);
        assert_eq!(cfg.checkpoint_fallback, CheckpointFallback::Proceed);
        assert_eq!(cfg.max_consecutive_failures, 1);
    }
}
