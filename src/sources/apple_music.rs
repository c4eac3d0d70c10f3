//! Apple Music desktop app driven over AppleScript.
//!
//! The playlist has to be queued in the app before starting. Every trial pauses,
//! waits for the operator to clear the cache by hand and skips to the next track.
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use clap::Parser;

use super::Session;
use crate::{
    config::{CaptureArgs, SourceDefaults},
    environment::{
        desktop::{AppleScript, MusicApp},
        ContentSource,
    },
    utils::operator::ConsoleOperator,
};

#[derive(Parser, Debug)]
pub struct AppleMusicArgs {
    #[command(flatten)]
    capture: CaptureArgs,

    /// Application to control
    #[arg(long, default_value_t = String::from("Music"))]
    app: String,
}

fn defaults(quality: &str) -> SourceDefaults {
    SourceDefaults {
        samples: 20,
        // a local queue buffers quickly
        settle: Duration::from_secs(3),
        output_dir: PathBuf::from(format!("final_dataset/apple_desktop_{}", quality)),
        tag: format!("apple_{}", quality),
    }
}

pub fn run(args: AppleMusicArgs, stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let quality = args.capture.quality_or("low");
    let config = args.capture.resolve(defaults(&quality));
    let mut session = Session::open(&config, Arc::clone(&stop))?;

    info!("Connected to the {} app ({} quality).", args.app, quality);
    info!("(Make sure your playlist is queued in the {} app!)", args.app);

    let mut env = MusicApp::new(
        AppleScript::new(&args.app),
        Box::new(ConsoleOperator::new(stop)),
        config.checkpoint_timeout,
        config.checkpoint_fallback,
    );
    session.collect(&config, &mut env, &ContentSource::Queue)?;

    info!("Music paused.");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quality_picks_the_folder() {
        let d = defaults("high");
        assert_eq!(d.output_dir, PathBuf::from("final_dataset/apple_desktop_high"));
        assert_eq!(d.tag, "apple_high");
        assert_eq!(d.samples, 20);
    }
}
