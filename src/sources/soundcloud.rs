//! SoundCloud web player. Tracks come from several playlists and need a click to start.
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use clap::Parser;

use super::{BrowserArgs, Session};
use crate::{
    config::{CaptureArgs, SourceDefaults},
    environment::{
        browser::{BrowserEnvironment, PlayButton, Site},
        ContentSource,
    },
    utils::operator::ConsoleOperator,
};

const DEFAULT_PLAYLISTS: [&str; 4] = [
    "https://soundcloud.com/carles-piles/sets/the-nutcracker-suite",
    "https://soundcloud.com/user-886126588/sets/swan-lake-tchaikovsky",
    "https://soundcloud.com/hanangobran/sets/classic",
    "https://soundcloud.com/saratology-2/sets/tchaikovsky-mozart-haydn-bach",
];

#[derive(Parser, Debug)]
pub struct SoundcloudArgs {
    #[command(flatten)]
    capture: CaptureArgs,

    #[command(flatten)]
    browser: BrowserArgs,

    /// Playlist to draw tracks from, may be repeated
    #[arg(long = "playlist")]
    playlists: Vec<String>,
}

fn defaults(quality: &str) -> SourceDefaults {
    SourceDefaults {
        samples: 1,
        // 5s to load, click play, 5s to buffer
        settle: Duration::from_secs(10),
        output_dir: PathBuf::from(format!("final_dataset/soundcloud_{}", quality)),
        tag: format!("sc_{}", quality),
    }
}

fn site(playlists: Vec<String>, quality: &str, login_window: Duration) -> Site {
    let listings = if playlists.is_empty() {
        DEFAULT_PLAYLISTS.iter().map(|s| s.to_string()).collect()
    } else {
        playlists
    };

    Site {
        name: "SoundCloud",
        listings,
        link_selector: "a.trackItem__trackTitle",
        link_must_contain: Some("soundcloud.com"),
        listing_load_wait: Duration::from_secs(3),
        scroll_script: "window.scrollTo(0, 500);",
        scroll_repeats: 1,
        scroll_pause: Duration::from_secs(1),
        play_button: Some(PlayButton {
            status: ".playControl",
            playing_class: "playing",
            start: ".sc-button-play",
        }),
        setup_instructions: vec![
            format!("ACTION REQUIRED FOR {} QUALITY:", quality),
            String::from("1. Log in."),
            String::from("2. ACCEPT COOKIES."),
            String::from("3. Click the 3 dots (...) or Settings -> Streaming Quality."),
            format!("4. SELECT '{}' quality.", quality),
            format!("Waiting {} seconds for you...", login_window.as_secs()),
        ],
        login_window,
    }
}

pub fn run(args: SoundcloudArgs, stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let quality = args.capture.quality_or("low");
    let config = args.capture.resolve(defaults(&quality));
    let mut session = Session::open(&config, Arc::clone(&stop))?;

    let login_window = Duration::from_secs(args.browser.login_wait_sec);
    let mut env = BrowserEnvironment::launch(
        &args.browser.options(),
        site(args.playlists, &quality, login_window),
    )?;

    let mut operator = ConsoleOperator::new(stop);
    let pool = env.discover(&mut operator, &mut session.rng)?;

    session.collect(&config, &mut env, &ContentSource::Pool(pool))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scans_all_default_playlists() {
        let s = site(vec![], "low", Duration::from_secs(60));
        assert_eq!(s.listings.len(), 4);
        assert!(s.listings.iter().all(|l| l.starts_with("https://soundcloud.com/")));
        assert!(s.play_button.is_some());
        assert!(s.setup_instructions[0].contains("low"));
    }

    #[test]
    fn quality_picks_the_folder() {
        let d = defaults("high");
        assert_eq!(d.output_dir, PathBuf::from("final_dataset/soundcloud_high"));
        assert_eq!(d.tag, "sc_high");
        assert_eq!(d.settle, Duration::from_secs(10));
    }
}
