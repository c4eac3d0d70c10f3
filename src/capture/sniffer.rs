use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context};
use pnet::datalink::{self, interfaces, Channel, DataLinkReceiver, NetworkInterface};

use super::{Frame, Sniffer};

/// How often the receive loop wakes up to look at the clock when the link is quiet.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn find_interface(name: &str) -> Option<NetworkInterface> {
    interfaces().into_iter().find(|e| e.name == name)
}

/// Reads layer 2 frames from one network interface.
pub struct InterfaceSniffer {
    interface: NetworkInterface,
}

impl InterfaceSniffer {
    pub fn open(name: &str) -> anyhow::Result<Self> {
        let interface = find_interface(name).ok_or_else(|| {
            let known: Vec<String> = interfaces().into_iter().map(|i| i.name).collect();
            anyhow!("no network interface named '{}', available: {}", name, known.join(", "))
        })?;

        if !interface.is_up() {
            warn!("interface {} is not up", interface.name);
        }

        Ok(InterfaceSniffer { interface })
    }
}

impl Sniffer for InterfaceSniffer {
    fn sniff(&mut self, window: Duration, on_frame: &mut dyn FnMut(Frame)) -> anyhow::Result<()> {
        let config = datalink::Config {
            read_timeout: Some(POLL_INTERVAL),
            ..Default::default()
        };

        // a fresh channel per window, so nothing buffered between trials leaks in
        let mut rx = match datalink::channel(&self.interface, config)
            .with_context(|| format!("failed to open a capture channel on {}", self.interface.name))?
        {
            Channel::Ethernet(_, rx) => rx,
            _ => bail!("unhandled channel type on {}", self.interface.name),
        };

        read_window(rx.as_mut(), window, on_frame)
    }
}

/// Hands every frame to `on_frame` until `window` has passed. Quiet links and
/// signals landing mid-read do not end the window early.
fn read_window(
    rx: &mut dyn DataLinkReceiver,
    window: Duration,
    on_frame: &mut dyn FnMut(Frame),
) -> anyhow::Result<()> {
    let start = Instant::now();
    while start.elapsed() < window {
        match rx.next() {
            Ok(packet) => on_frame(Frame::parse(packet, start.elapsed().as_secs_f64())),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(e).context("error while reading from the capture channel"),
        }
    }

    Ok(())
}
