use super::{filter::TrafficFilter, CaptureRecord, Frame};

/// Collects the records of a single capture window.
pub struct CaptureSink {
    filter: TrafficFilter,
    records: Vec<CaptureRecord>,
    seen: usize,
}

impl CaptureSink {
    pub fn new(filter: TrafficFilter) -> Self {
        CaptureSink {
            filter,
            records: Vec::new(),
            seen: 0,
        }
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.seen = 0;
    }

    pub fn record_if_accepted(&mut self, frame: &Frame) -> bool {
        self.seen += 1;
        if !self.filter.accepts(frame) {
            return false;
        }

        self.records.push(CaptureRecord {
            timestamp: frame.captured_at,
            length: frame.length as u64,
        });
        true
    }

    /// Records in arrival order. Does not clear, call `reset` before the next window.
    pub fn drain(&self) -> &[CaptureRecord] {
        &self.records
    }

    /// Number of frames observed in this window, accepted or not.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::capture::{Network, Transport};

    fn tcp(ts: f64, length: usize) -> Frame {
        Frame {
            captured_at: ts,
            length,
            network: Some(Network::Ipv4),
            transport: Some(Transport::Tcp),
        }
    }

    #[test]
    fn keeps_accepted_frames_in_arrival_order() {
        let mut sink = CaptureSink::new(TrafficFilter::default());
        assert!(sink.record_if_accepted(&tcp(0.5, 1400)));
        assert!(!sink.record_if_accepted(&tcp(0.6, 54)));
        assert!(sink.record_if_accepted(&tcp(0.2, 800)));

        assert_eq!(
            sink.drain(),
            &[
                CaptureRecord { timestamp: 0.5, length: 1400 },
                CaptureRecord { timestamp: 0.2, length: 800 },
            ]
        );
        assert_eq!(sink.seen(), 3);
    }

    #[test]
    fn drain_does_not_clear() {
        let mut sink = CaptureSink::new(TrafficFilter::default());
        sink.record_if_accepted(&tcp(0.1, 100));
        assert_eq!(sink.drain().len(), 1);
        assert_eq!(sink.drain().len(), 1);
    }

    #[test]
    fn reset_isolates_windows() {
        let mut sink = CaptureSink::new(TrafficFilter::default());
        for i in 0..50 {
            sink.record_if_accepted(&tcp(i as f64, 500));
        }
        sink.reset();
        assert!(sink.drain().is_empty());
        assert_eq!(sink.seen(), 0);
    }

    #[test]
    fn empty_window_is_fine() {
        let sink = CaptureSink::new(TrafficFilter::default());
        assert!(sink.drain().is_empty());
    }
}
