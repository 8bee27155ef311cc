//! Streamed map-reduce pipeline
//!
//! A stage is a *(map, reduce)* pair. The map function consumes a stream
//! of values and produces keyed values; the reduce function aggregates the
//! keyed stream into a new stream of values for the next stage. Streams
//! are bounded crossbeam channels, so a slow consumer backpressures its
//! producers, and closing a channel is the one and only end-of-stream
//! signal.
//!
//! Each map and reduce function runs on its own named thread and receives
//! its output sender *by value*: when the function returns, the sender
//! drops and the downstream receiver sees end-of-stream. There is no other
//! termination protocol.
//!
//! [`Stage`] erases the key type, so a [`pipeline`] can chain stages that
//! bucket the same value type by different keys (path, size, digest, ...).
//! The first stage of a pipeline receives an already-closed input; its map
//! function is a pure generator.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::thread;

/// Capacity of the channel linking two stages
pub const STAGE_CHANNEL_CAPACITY: usize = 256;

/// Map half of a stage: consume values, emit keyed values
pub type MapFn<K, V> = Box<dyn FnOnce(Sender<(K, V)>, Receiver<V>) + Send>;

/// Reduce half of a stage: aggregate keyed values, emit `W`s
///
/// `W` is usually `V` (so stages chain) but the terminal reducer of a
/// pipeline may emit a different record type.
pub type ReduceFn<K, V, W> = Box<dyn FnOnce(Sender<W>, Receiver<(K, V)>) + Send>;

/// Run a map function on its own thread, returning its keyed output stream
pub fn map<K, V>(input: Receiver<V>, map_fn: MapFn<K, V>) -> Receiver<(K, V)>
where
    K: Send + 'static,
    V: Send + 'static,
{
    let (tx, rx) = bounded(STAGE_CHANNEL_CAPACITY);
    spawn_stage("map-stage", move || map_fn(tx, input));
    rx
}

/// Run a reduce function on its own thread, returning its output stream
pub fn reduce<K, V, W>(input: Receiver<(K, V)>, reduce_fn: ReduceFn<K, V, W>) -> Receiver<W>
where
    K: Send + 'static,
    V: Send + 'static,
    W: Send + 'static,
{
    let (tx, rx) = bounded(STAGE_CHANNEL_CAPACITY);
    spawn_stage("reduce-stage", move || reduce_fn(tx, input));
    rx
}

fn spawn_stage<F: FnOnce() + Send + 'static>(name: &str, f: F) {
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .expect("failed to spawn pipeline stage thread");
}

/// A map/reduce pair with its key type erased, ready to chain
pub struct Stage<V> {
    run: Box<dyn FnOnce(Receiver<V>) -> Receiver<V> + Send>,
}

impl<V: Send + 'static> Stage<V> {
    /// Pair a map function with a reduce function under one key type
    pub fn new<K>(map_fn: MapFn<K, V>, reduce_fn: ReduceFn<K, V, V>) -> Self
    where
        K: Send + 'static,
    {
        Self {
            run: Box::new(move |input| reduce(map(input, map_fn), reduce_fn)),
        }
    }

    /// Attach this stage to an input stream
    pub fn run(self, input: Receiver<V>) -> Receiver<V> {
        (self.run)(input)
    }
}

/// Chain stages back to back; returns the terminal output stream
///
/// The first stage's map function sees a closed, empty input and acts as
/// the pipeline's generator.
pub fn pipeline<V: Send + 'static>(stages: Vec<Stage<V>>) -> Receiver<V> {
    let (source_tx, source_rx) = bounded::<V>(0);
    drop(source_tx);
    stages
        .into_iter()
        .fold(source_rx, |input, stage| stage.run(input))
}

/// Reducer that emits only the first value seen for each key
///
/// Memory is bounded by the number of distinct keys.
pub fn filter_duplicates<K, V>() -> ReduceFn<K, V, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    Box::new(|out, input| {
        let mut seen = HashSet::new();
        for (key, value) in input {
            if seen.insert(key) && out.send(value).is_err() {
                return; // downstream gone
            }
        }
    })
}

/// Reducer that emits only values whose key recurs
///
/// The first value per key is buffered; on the key's second occurrence
/// both the buffered value and the new one are emitted, and later
/// occurrences flow straight through. Keys seen once produce nothing.
pub fn filter_uniques<K, V>() -> ReduceFn<K, V, V>
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    Box::new(|out, input| {
        let mut first: HashMap<K, Option<V>> = HashMap::new();
        for (key, value) in input {
            match first.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(Some(value));
                }
                Entry::Occupied(mut slot) => {
                    if let Some(held) = slot.get_mut().take() {
                        if out.send(held).is_err() {
                            return;
                        }
                    }
                    if out.send(value).is_err() {
                        return;
                    }
                }
            }
        }
    })
}
