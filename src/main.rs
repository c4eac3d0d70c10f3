#[macro_use]
extern crate log;

use clap::Parser;
use log::Level;

mod capture;
mod config;
mod environment;
mod failure;
mod orchestrator;
mod persist;
mod pool;
mod sources;
mod utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Debug logging, including every WebDriver request
    #[arg(short, long, action)]
    verbose: bool,

    /// Do not re-run under sudo when not root (capture rights granted some other way)
    #[arg(long, action)]
    no_elevate: bool,

    #[command(subcommand)]
    source: Sources,
}

#[derive(clap::Subcommand, Debug)]
enum Sources {
    /// Apple Music desktop app
    ///
    /// Controls the Music app over AppleScript. Queue a playlist first. Each trial
    /// pauses and waits for you to clear the cache, then skips to the next track.
    AppleMusic(sources::apple_music::AppleMusicArgs),

    /// Spotify web player
    ///
    /// Opens a playlist in Chrome, gives you time to log in, collects its track
    /// links and plays random tracks from it.
    Spotify(sources::spotify::SpotifyArgs),

    /// SoundCloud web player
    ///
    /// Like spotify, but merges several playlists and clicks play on every track page.
    /// Set the streaming quality during the login window.
    Soundcloud(sources::soundcloud::SoundcloudArgs),
}

fn main() -> anyhow::Result<()> {
    // parse command line arguments
    let args = Args::parse();

    // init logging
    let level = if args.verbose { Level::Debug } else { Level::Info };
    simple_logger::init_with_level(level)
        .map_err(|e| anyhow::anyhow!("failed to set up logging: {}", e))?;

    if !args.no_elevate {
        utils::external_prog::ensure_root()?;
    }

    let stop = utils::interrupt_flag()?;

    match args.source {
        Sources::AppleMusic(src) => sources::apple_music::run(src, stop)?,
        Sources::Spotify(src) => sources::spotify::run(src, stop)?,
        Sources::Soundcloud(src) => sources::soundcloud::run(src, stop)?,
    };

    Ok(())
}
