use std::{thread::sleep, time::Duration};

use anyhow::{anyhow, Context};
use rand::RngCore;
use serde_json::{json, Value};

use super::{ContentSource, Environment};
use crate::{
    failure::{Failure, FailureExt},
    pool::ContentPool,
    utils::{
        external_prog::RunningProgram,
        operator::Operator,
        webdriver::{wait_until_ready, ElementId, WebDriver},
    },
};

const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Player control on a site that does not start playing by itself.
pub struct PlayButton {
    /// Persistent player bar, carries `playing_class` while audio runs.
    pub status: &'static str,
    pub playing_class: &'static str,
    /// Big play button on the track page.
    pub start: &'static str,
}

/// Everything that differs between streaming sites.
pub struct Site {
    pub name: &'static str,
    /// Pages listing tracks, scanned once at start. The first one is opened for login.
    pub listings: Vec<String>,
    pub link_selector: &'static str,
    /// Only keep links containing this.
    pub link_must_contain: Option<&'static str>,
    pub listing_load_wait: Duration,
    pub scroll_script: &'static str,
    pub scroll_repeats: u32,
    pub scroll_pause: Duration,
    pub play_button: Option<PlayButton>,
    pub setup_instructions: Vec<String>,
    pub login_window: Duration,
}

pub fn keep_link(href: &str, must_contain: Option<&str>) -> bool {
    !href.is_empty() && must_contain.map_or(true, |needle| href.contains(needle))
}

/// Chrome with the media caches shrunk to nothing and the automation banner hidden.
pub fn chrome_capabilities() -> Value {
    json!({
        "alwaysMatch": {
            "browserName": "chrome",
            "goog:chromeOptions": {
                "args": [
                    "--disk-cache-size=1",
                    "--media-cache-size=1",
                    "--disable-blink-features=AutomationControlled",
                ],
                "excludeSwitches": ["enable-automation"],
                "useAutomationExtension": false,
            }
        }
    })
}

/// The part of a WebDriver session the environment works with.
pub trait BrowserDriver {
    fn navigate(&self, url: &str) -> anyhow::Result<()>;
    fn execute(&self, script: &str) -> anyhow::Result<Value>;
    fn find_elements(&self, css: &str) -> anyhow::Result<Vec<ElementId>>;
    fn find_element(&self, css: &str) -> anyhow::Result<ElementId>;
    fn property(&self, el: &ElementId, name: &str) -> anyhow::Result<Option<String>>;
    fn click(&self, el: &ElementId) -> anyhow::Result<()>;
    fn cdp(&self, cmd: &str, params: Value) -> anyhow::Result<Value>;
    fn quit(self: Box<Self>) -> anyhow::Result<()>;
}

impl BrowserDriver for WebDriver {
    fn navigate(&self, url: &str) -> anyhow::Result<()> {
        WebDriver::navigate(self, url)
    }

    fn execute(&self, script: &str) -> anyhow::Result<Value> {
        WebDriver::execute(self, script)
    }

    fn find_elements(&self, css: &str) -> anyhow::Result<Vec<ElementId>> {
        WebDriver::find_elements(self, css)
    }

    fn find_element(&self, css: &str) -> anyhow::Result<ElementId> {
        WebDriver::find_element(self, css)
    }

    fn property(&self, el: &ElementId, name: &str) -> anyhow::Result<Option<String>> {
        WebDriver::property(self, el, name)
    }

    fn click(&self, el: &ElementId) -> anyhow::Result<()> {
        WebDriver::click(self, el)
    }

    fn cdp(&self, cmd: &str, params: Value) -> anyhow::Result<Value> {
        WebDriver::cdp(self, cmd, params)
    }

    fn quit(self: Box<Self>) -> anyhow::Result<()> {
        WebDriver::quit(*self)
    }
}

pub struct BrowserOptions {
    /// Use an already running driver instead of spawning one.
    pub webdriver_url: Option<String>,
    pub chromedriver: String,
    pub port: u16,
}

pub struct BrowserEnvironment {
    site: Site,
    driver: Option<Box<dyn BrowserDriver>>,
    chromedriver: Option<RunningProgram>,
}

impl BrowserEnvironment {
    pub fn launch(opts: &BrowserOptions, site: Site) -> anyhow::Result<Self> {
        info!("configuring Chrome for {}", site.name);

        let (base, chromedriver) = match &opts.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let port = format!("--port={}", opts.port);
                let prog = RunningProgram::spawn(&[opts.chromedriver.as_str(), port.as_str(), "--silent"])?;
                (format!("http://127.0.0.1:{}", opts.port), Some(prog))
            }
        };

        let driver = wait_until_ready(&base, DRIVER_STARTUP_TIMEOUT)
            .and_then(|_| WebDriver::new_session(&base, chrome_capabilities()))
            .and_then(|d| d.set_window_size(1280, 800).map(|_| d));

        match driver {
            Ok(driver) => Ok(BrowserEnvironment::new(site, Box::new(driver), chromedriver)),
            Err(e) => {
                if let Some(prog) = chromedriver {
                    _ = prog.stop();
                }
                Err(e)
            }
        }
    }

    pub fn new(site: Site, driver: Box<dyn BrowserDriver>, chromedriver: Option<RunningProgram>) -> Self {
        BrowserEnvironment {
            site,
            driver: Some(driver),
            chromedriver,
        }
    }

    fn driver(&self) -> anyhow::Result<&dyn BrowserDriver> {
        self.driver.as_deref().ok_or_else(|| anyhow!("browser session already closed"))
    }

    /// Login window, then a scan of every listing. Listings that fail are skipped.
    pub fn discover(&self, operator: &mut dyn Operator, rng: &mut dyn RngCore) -> anyhow::Result<ContentPool> {
        let driver = self.driver()?;
        let site = &self.site;
        let first = site.listings.first().context("no listing pages configured")?;

        info!("LOGIN STEP");
        driver.navigate(first)?;
        let instructions: Vec<&str> = site.setup_instructions.iter().map(String::as_str).collect();
        operator.announce(&instructions);
        if !operator.countdown(site.login_window) {
            info!("interrupted during login, nothing scanned");
            return Ok(ContentPool::default());
        }

        info!("scraping tracks from {} listing(s)", site.listings.len());
        let mut links = Vec::new();
        for listing in &site.listings {
            match scan_listing(driver, site, listing) {
                Ok(found) => {
                    info!("  found {} tracks on {}", found.len(), listing);
                    links.extend(found);
                }
                Err(e) => warn!("  failed to scan {}: {:#}", listing, e),
            }
        }

        let pool = ContentPool::build(links, rng);
        info!("total track pool: {} tracks", pool.len());
        for item in pool.items() {
            debug!("  {}", item);
        }
        Ok(pool)
    }

    fn attempt_play(&self, button: &PlayButton) {
        let Ok(driver) = self.driver() else { return };

        let via_start_button = || -> anyhow::Result<bool> {
            let status = driver.find_element(button.status)?;
            let class = driver.property(&status, "className")?.unwrap_or_default();
            if class.contains(button.playing_class) {
                return Ok(false);
            }
            driver.click(&driver.find_element(button.start)?)?;
            Ok(true)
        };

        match via_start_button() {
            Ok(true) => info!("clicked play"),
            Ok(false) => debug!("already playing"),
            Err(e) => {
                debug!("play button not usable: {:#}", e);
                match driver.find_element(button.status).and_then(|el| driver.click(&el)) {
                    Ok(()) => info!("clicked player bar play"),
                    Err(e) => info!("could not start playback: {:#}", e),
                }
            }
        }
    }
}

fn scan_listing(driver: &dyn BrowserDriver, site: &Site, listing: &str) -> anyhow::Result<Vec<String>> {
    driver.navigate(listing)?;
    sleep(site.listing_load_wait);
    for _ in 0..site.scroll_repeats {
        driver.execute(site.scroll_script)?;
        sleep(site.scroll_pause);
    }

    let mut found = Vec::new();
    for el in driver.find_elements(site.link_selector)? {
        if let Some(href) = driver.property(&el, "href")? {
            if keep_link(&href, site.link_must_contain) {
                found.push(href);
            }
        }
    }
    Ok(found)
}

impl Environment for BrowserEnvironment {
    fn invalidate_cache(&mut self) -> Result<(), Failure> {
        match self
            .driver()
            .and_then(|d| d.cdp("Network.clearBrowserCache", json!({})))
        {
            Ok(_) => info!("cache cleared"),
            Err(e) => info!("cache clear not possible: {:#}", e),
        }
        Ok(())
    }

    fn advance_to_next_item(
        &mut self,
        source: &ContentSource,
        rng: &mut dyn RngCore,
    ) -> Result<Option<String>, Failure> {
        let ContentSource::Pool(pool) = source else {
            return Err(anyhow!("{} needs a track pool", self.site.name)).fatal();
        };
        let url = pool
            .choose(rng)
            .ok_or_else(|| anyhow!("track pool is empty"))
            .recoverable()?
            .to_owned();

        self.driver().recoverable()?.navigate(&url).recoverable()?;
        Ok(Some(url))
    }

    fn settle(&mut self, duration: Duration) {
        match &self.site.play_button {
            Some(button) => {
                let first = duration / 2;
                sleep(first);
                self.attempt_play(button);
                sleep(duration - first);
            }
            None => sleep(duration),
        }
    }

    fn pause(&mut self) {
        if let Ok(driver) = self.driver() {
            _ = driver
                .execute("document.querySelectorAll('audio, video').forEach(m => m.pause());")
                .inspect_err(|e| warn!("failed to pause playback: {:#}", e));
        }
    }

    fn release(&mut self) {
        if let Some(driver) = self.driver.take() {
            _ = driver.quit().inspect_err(|e| warn!("failed to close the browser: {:#}", e));
        }
        if let Some(prog) = self.chromedriver.take() {
            _ = prog.stop().inspect_err(|e| warn!("failed to stop chromedriver: {:#}", e));
        }
    }
}

impl Drop for BrowserEnvironment {
    fn drop(&mut self) {
        self.release();
    }
}
