//! Spotify web player, free tier.
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
        browser::{BrowserEnvironment, Site},
        ContentSource,
    },
    utils::operator::ConsoleOperator,
};

const DEFAULT_PLAYLIST: &str =
    "https://open.spotify.com/playlist/2AIyLES2xJfPa6EOxmKySl?si=x73MEKZxREaqoFDePMhCjQ";

#[derive(Parser, Debug)]
pub struct SpotifyArgs {
    #[command(flatten)]
    capture: CaptureArgs,

    #[command(flatten)]
    browser: BrowserArgs,

    /// Playlist to draw tracks from, may be repeated
    #[arg(long = "playlist")]
    playlists: Vec<String>,
}

/// The account tier is the quality knob here, so the label defaults to `free`.
const DEFAULT_QUALITY: &str = "free";

fn defaults(quality: &str) -> SourceDefaults {
    SourceDefaults {
        samples: 50,
        // one page load, no clicks: the track page starts on its own
        settle: Duration::from_secs(9),
        output_dir: PathBuf::from(format!("final_dataset/{}_playlist", quality)),
        tag: quality.to_owned(),
    }
}

fn site(playlists: Vec<String>, login_window: Duration) -> Site {
    let listings = if playlists.is_empty() {
        vec![DEFAULT_PLAYLIST.to_owned()]
    } else {
        playlists
    };

    Site {
        name: "Spotify",
        listings,
        link_selector: r#"a[href*="/track/"]"#,
        link_must_contain: None,
        listing_load_wait: Duration::ZERO,
        scroll_script: "window.scrollTo(0, document.body.scrollHeight);",
        scroll_repeats: 3,
        scroll_pause: Duration::from_secs(1),
        play_button: None,
        setup_instructions: vec![format!(
            "PLEASE LOG IN MANUALLY WITHIN {} SECONDS...",
            login_window.as_secs()
        )],
        login_window,
    }
}

pub fn run(args: SpotifyArgs, stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let quality = args.capture.quality_or(DEFAULT_QUALITY);
    let config = args.capture.resolve(defaults(&quality));
    let mut session = Session::open(&config, Arc::clone(&stop))?;

    let login_window = Duration::from_secs(args.browser.login_wait_sec);
    let mut env = BrowserEnvironment::launch(&args.browser.options(), site(args.playlists, login_window))?;

    let mut operator = ConsoleOperator::new(stop);
    let pool = env.discover(&mut operator, &mut session.rng)?;

    session.collect(&config, &mut env, &ContentSource::Pool(pool))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn quality_picks_the_folder() {
        let d = defaults(DEFAULT_QUALITY);
        assert_eq!(d.output_dir, PathBuf::from("final_dataset/free_playlist"));
        assert_eq!(d.tag, "free");

        let d = defaults("premium");
        assert_eq!(d.output_dir, PathBuf::from("final_dataset/premium_playlist"));
        assert_eq!(d.tag, "premium");
    }

    #[test]
    fn quality_flag_reaches_the_tag() {
        let args = SpotifyArgs::parse_from(["spotify", "--quality", "premium"]);
        let quality = args.capture.quality_or(DEFAULT_QUALITY);
        assert_eq!(args.capture.resolve(defaults(&quality)).tag, "premium");

        let args = SpotifyArgs::parse_from(["spotify"]);
        let quality = args.capture.quality_or(DEFAULT_QUALITY);
        assert_eq!(args.capture.resolve(defaults(&quality)).tag, "free");
    }

    #[test]
    fn falls_back_to_the_default_playlist() {
        let s = site(vec![], Duration::from_secs(60));
        assert_eq!(s.listings, vec![DEFAULT_PLAYLIST.to_owned()]);
        assert!(s.play_button.is_none());

        let s = site(vec!["https://open.spotify.com/playlist/x".into()], Duration::ZERO);
        assert_eq!(s.listings.len(), 1);
        assert!(s.listings[0].ends_with("/x"));
    }
}
