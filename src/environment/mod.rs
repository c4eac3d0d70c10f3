use std::{thread::sleep, time::Duration};

use rand::RngCore;

use crate::{failure::Failure, pool::ContentPool};

pub mod browser;
pub mod desktop;

/// Where the next track comes from.
pub enum ContentSource {
    /// The application plays whatever is queued next.
    Queue,
    /// Random draws from a pool discovered at start.
    Pool(ContentPool),
}

impl ContentSource {
    pub fn is_exhausted(&self) -> bool {
        match self {
            ContentSource::Queue => false,
            ContentSource::Pool(pool) => pool.is_empty(),
        }
    }
}

/// The player we are driving, a desktop app or a browser tab.
pub trait Environment {
    /// Best effort. Backend errors are logged and swallowed; only an aborted
    /// operator checkpoint comes back as a (fatal) failure.
    fn invalidate_cache(&mut self) -> Result<(), Failure>;

    /// Picks the next item and starts playing it. Returns the item, if it has a name.
    fn advance_to_next_item(
        &mut self,
        source: &ContentSource,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, Failure>;

    /// Lets the player buffer before the capture window opens.
    fn settle(&mut self, duration: Duration) {
        sleep(duration);
    }

    fn pause(&mut self);

    /// Gives back whatever the backend holds (sessions, helper processes).
    fn release(&mut self);
}
