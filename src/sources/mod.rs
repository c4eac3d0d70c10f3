use std::sync::{atomic::AtomicBool, Arc};

use clap::Args;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    capture::sniffer::InterfaceSniffer,
    config::RunConfiguration,
    environment::{browser::BrowserOptions, ContentSource, Environment},
    orchestrator::{RunReport, StopReason, TrialOrchestrator},
    persist::ArtifactWriter,
};

pub mod apple_music;
pub mod soundcloud;
pub mod spotify;

#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    /// Talk to this WebDriver server instead of starting chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// chromedriver binary to start
    #[arg(long, default_value_t = String::from("chromedriver"))]
    chromedriver: String,

    #[arg(long, default_value_t = 9515)]
    webdriver_port: u16,

    /// Seconds given to the operator to log in and adjust settings
    #[arg(long, default_value_t = 60)]
    login_wait_sec: u64,
}

impl BrowserArgs {
    pub fn options(&self) -> BrowserOptions {
        BrowserOptions {
            webdriver_url: self.webdriver_url.clone(),
            chromedriver: self.chromedriver.clone(),
            port: self.webdriver_port,
        }
    }
}

/// The pieces every source needs before it touches its player. Opened first so a
/// wrong interface or an unwritable directory fails before anything starts playing.
pub struct Session {
    pub sniffer: InterfaceSniffer,
    pub writer: ArtifactWriter,
    pub rng: StdRng,
    pub stop: Arc<AtomicBool>,
}

impl Session {
    pub fn open(config: &RunConfiguration, stop: Arc<AtomicBool>) -> anyhow::Result<Session> {
        let sniffer = InterfaceSniffer::open(&config.interface)?;
        let writer = ArtifactWriter::create(&config.output_dir, &config.tag, config.format)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!("saving to: {}", writer.dir().display());

        Ok(Session {
            sniffer,
            writer,
            rng,
            stop,
        })
    }

    pub fn collect(
        &mut self,
        config: &RunConfiguration,
        env: &mut dyn Environment,
        source: &ContentSource,
    ) -> anyhow::Result<RunReport> {
        let report = TrialOrchestrator::new(
            config,
            env,
            &mut self.sniffer,
            &self.writer,
            source,
            &mut self.rng,
            &self.stop,
        )
        .run()?;

        match report.stop {
            StopReason::Completed => info!("Done! {} samples collected.", report.collected),
            StopReason::PoolExhausted => warn!(
                "no tracks to play, stopped with {} of {} samples",
                report.collected, config.samples
            ),
            StopReason::TooManyFailures => error!(
                "stopped after repeated capture failures with {} of {} samples",
                report.collected, config.samples
            ),
            StopReason::Interrupted => info!(
                "interrupted, {} of {} samples collected",
                report.collected, config.samples
            ),
        }
        if let Some(last) = report.artifacts.last() {
            debug!("last artifact: {}", last.display());
        }
        if report.failed > 0 {
            warn!("{} capture window(s) failed", report.failed);
        }

        Ok(report)
    }
}
