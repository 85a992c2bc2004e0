//! The progress ticker (spec §4.10): wraps a reader with a byte counter and
//! reports `(total, delta)` snapshots on a channel every `interval`, for the
//! LFS handler to turn into `progress` responses (spec §4.9). `Ticker::spawn`
//! takes any `Sender<Update>`; the one caller (`handlers::lfs`) hands it an
//! unbounded channel since it drains the channel right after each transfer
//! rather than mid-copy, so there is no backpressure concern to bound
//! against here — spec §9's "bounded channel" framing is for a consumer that
//! reads concurrently with the copy.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Default)]
struct Counter {
    total: AtomicU64,
    delta: AtomicU64,
}

impl Counter {
    fn add(&self, n: u64) {
        self.total.fetch_add(n, Ordering::SeqCst);
        self.delta.fetch_add(n, Ordering::SeqCst);
    }

    /// Reads `(total, delta)` and resets `delta` to zero, atomically enough
    /// for a single-consumer ticker (the only consumer is this module's
    /// background thread).
    fn snapshot(&self) -> (u64, u64) {
        let total = self.total.load(Ordering::SeqCst);
        let delta = self.delta.swap(0, Ordering::SeqCst);
        (total, delta)
    }
}

/// A `(total_bytes, bytes_since_last)` sample sent to the ticker's consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Update {
    pub total: u64,
    pub delta: u64,
}

/// Wraps a reader, counting bytes as they're read through it.
pub struct CountingReader<R> {
    inner: R,
    counter: Arc<Counter>,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> (Self, Arc<dyn Fn() -> (u64, u64) + Send + Sync>) {
        let counter = Arc::new(Counter::default());
        let handle = counter.clone();
        (
            Self {
                inner,
                counter,
            },
            Arc::new(move || handle.snapshot()),
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.add(n as u64);
        Ok(n)
    }
}

/// A background task (spec §9: "producer/consumer pair with a bounded
/// channel") that wakes on `interval`, snapshots a counter, and forwards the
/// sample. If the receiving end is dropped (the copy has finished and its
/// caller moved on), the next `send` fails and the task exits.
pub struct Ticker {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl Ticker {
    /// `R` need not be `Send`: the background thread only ever touches the
    /// counter through the `Arc<dyn Fn + Send + Sync>` snapshot closure, the
    /// reader itself stays on the caller's thread.
    pub fn spawn<R: Read>(reader: R, interval: Duration, tx: Sender<Update>) -> (CountingReader<R>, Self) {
        let (reader, snapshot) = CountingReader::new(reader);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || loop {
            thread::sleep(interval);
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }
            let (total, delta) = snapshot();
            if tx.send(Update { total, delta }).is_err() {
                break;
            }
        });
        (
            reader,
            Self {
                handle: Some(handle),
                stop,
            },
        )
    }

    /// Signal the background task to stop and wait for it to drain.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    #[test]
    fn counting_reader_tracks_total_bytes() {
        let (mut reader, snapshot) = CountingReader::new(Cursor::new(vec![0u8; 100]));
        let mut buf = [0u8; 40];
        reader.read(&mut buf).unwrap();
        reader.read(&mut buf).unwrap();
        let (total, delta) = snapshot();
        assert_eq!(total, 80);
        assert_eq!(delta, 80);
        let (total2, delta2) = snapshot();
        assert_eq!(total2, 80);
        assert_eq!(delta2, 0);
    }

    #[test]
    fn ticker_emits_updates_until_stopped() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (mut reader, ticker) =
            Ticker::spawn(Cursor::new(vec![1u8; 10]), Duration::from_millis(10), tx);
        let mut buf = [0u8; 10];
        reader.read(&mut buf).unwrap();
        let update = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(update.total, 10);
        ticker.stop();
    }
}
