//! Replay-latest multicast subjects.
//!
//! A subject holds the most recently pushed value for one (key, kind)
//! pair. New subscribers receive that value immediately, then every
//! subsequent push, in push order.

use crate::error::{PrefsError, Result};
use crate::types::{typed_value, Kind, PrefValue, Value};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Max buffered values per subscriber before the subscriber is dropped.
const SUBSCRIBER_BUFFER_SIZE: usize = 256;

/// Type-erased subject state. Owned by the registry for its lifetime;
/// never destroyed once created.
pub(crate) struct RawSubject {
    key: String,
    kind: Kind,
    state: Mutex<SubjectState>,
}

struct SubjectState {
    latest: Value,
    subscribers: Vec<Sender<Value>>,
}

impl RawSubject {
    /// Create a subject seeded with the kind's canonical default. The
    /// registry pushes the real initial value before handing out a handle.
    pub(crate) fn new(key: &str, kind: Kind) -> Self {
        Self {
            key: key.to_string(),
            kind,
            state: Mutex::new(SubjectState {
                latest: kind.default_value(),
                subscribers: Vec::new(),
            }),
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    /// Replace the latest value and fan it out. Subscribers whose buffer
    /// is full or whose receiver is gone are dropped.
    pub(crate) fn push(&self, value: Value) {
        let mut state = self.state.lock();
        state.latest = value.clone();
        state.subscribers.retain(|tx| match tx.try_send(value.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub(crate) fn latest_value(&self) -> Value {
        self.state.lock().latest.clone()
    }

    /// Attach a subscriber; the latest value is delivered immediately.
    pub(crate) fn attach(&self) -> Receiver<Value> {
        let mut state = self.state.lock();
        let (tx, rx) = bounded(SUBSCRIBER_BUFFER_SIZE);
        let _ = tx.try_send(state.latest.clone());
        state.subscribers.push(tx);
        rx
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

/// Typed handle to a live subject.
///
/// Handles are cheap to clone and all refer to the same underlying
/// subject; the registry updates it in place as the backend changes, so a
/// handle never needs to be re-obtained to stay fresh.
pub struct Subject<T: PrefValue> {
    raw: Arc<RawSubject>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: PrefValue> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            raw: Arc::clone(&self.raw),
            _kind: PhantomData,
        }
    }
}

impl<T: PrefValue> Subject<T> {
    pub(crate) fn from_raw(raw: Arc<RawSubject>) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The key this subject observes.
    pub fn key(&self) -> &str {
        self.raw.key()
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Result<T> {
        typed_value(self.raw.key(), self.raw.latest_value())
    }

    /// Attach a new subscriber. It receives the latest value immediately,
    /// then every subsequent push in order.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            key: self.raw.key().to_string(),
            receiver: self.raw.attach(),
            _kind: PhantomData,
        }
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.raw.subscriber_count()
    }

    /// Whether two handles refer to the same underlying subject.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.raw, &other.raw)
    }
}

/// A single subscriber's end of a subject.
pub struct Subscription<T: PrefValue> {
    key: String,
    receiver: Receiver<Value>,
    _kind: PhantomData<fn() -> T>,
}

impl<T: PrefValue> Subscription<T> {
    /// Receive the next value (blocking).
    pub fn recv(&self) -> Result<T> {
        let value = self
            .receiver
            .recv()
            .map_err(|_| PrefsError::Disconnected)?;
        typed_value(&self.key, value)
    }

    /// Receive the next value if one is buffered.
    pub fn try_recv(&self) -> Result<Option<T>> {
        match self.receiver.try_recv() {
            Ok(value) => typed_value(&self.key, value).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PrefsError::Disconnected),
        }
    }

    /// Receive the next value, waiting up to `timeout`. Returns `None` on
    /// timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(value) => typed_value(&self.key, value).map(Some),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                Err(PrefsError::Disconnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_subject() -> (Arc<RawSubject>, Subject<i32>) {
        let raw = Arc::new(RawSubject::new("count", Kind::Int));
        let subject = Subject::<i32>::from_raw(Arc::clone(&raw));
        (raw, subject)
    }

    #[test]
    fn test_seeded_with_canonical_default() {
        let (_, subject) = int_subject();
        assert_eq!(subject.latest().unwrap(), -1);
    }

    #[test]
    fn test_subscriber_replays_latest() {
        let (raw, subject) = int_subject();
        raw.push(Value::Int(5));

        let sub = subject.subscribe();
        assert_eq!(sub.recv().unwrap(), 5);
        assert_eq!(sub.try_recv().unwrap(), None);
    }

    #[test]
    fn test_push_reaches_all_subscribers_in_order() {
        let (raw, subject) = int_subject();
        let a = subject.subscribe();
        let b = subject.subscribe();

        raw.push(Value::Int(1));
        raw.push(Value::Int(2));

        // Each subscriber sees the replayed seed, then both pushes, FIFO.
        for sub in [&a, &b] {
            assert_eq!(sub.recv().unwrap(), -1);
            assert_eq!(sub.recv().unwrap(), 1);
            assert_eq!(sub.recv().unwrap(), 2);
        }
        assert_eq!(subject.latest().unwrap(), 2);
    }

    #[test]
    fn test_slow_subscriber_dropped() {
        let (raw, subject) = int_subject();
        let _sub = subject.subscribe();
        assert_eq!(subject.subscriber_count(), 1);

        for i in 0..(SUBSCRIBER_BUFFER_SIZE + 8) {
            raw.push(Value::Int(i as i32));
        }

        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_detached_subscriber_removed_on_next_push() {
        let (raw, subject) = int_subject();
        let sub = subject.subscribe();
        drop(sub);

        raw.push(Value::Int(1));
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_handles_share_one_subject() {
        let (_, subject) = int_subject();
        let other = subject.clone();
        assert!(subject.ptr_eq(&other));
    }
}
