//! Stage spawners
//!
//! Stages borrow their state and configuration from outside the thread scope,
//! so coefficient tables and the like can be shared without reference
//! counting. A stage owns the `Sender` it was given and drops it on exit,
//! which disconnects the downstream edge.

use std::sync::Arc;
use std::thread::{Builder, Scope};

use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use crate::Sequencer;

/// Spawns a stage that processes items one at a time, in arrival order.
///
/// The closure may emit any number of items per input through the provided
/// sender, so aggregating (many-to-one) and fanning (one-to-many) stages are
/// expressed the same way as plain maps. State captured by the closure is
/// confined to the stage thread.
pub fn serial<'scope, I, O, F>(
    scope: &'scope Scope<'scope, '_>,
    name: &str,
    rx: Receiver<I>,
    tx: Sender<O>,
    mut f: F,
) where
    I: Send + 'scope,
    O: Send + 'scope,
    F: FnMut(I, &Sender<O>) + Send + 'scope,
{
    let label = name.to_owned();
    Builder::new()
        .name(label.clone())
        .spawn_scoped(scope, move || {
            for item in rx {
                f(item, &tx);
            }
            trace!(stage = %label, "serial stage drained");
        })
        .expect("failed to spawn serial stage");
}

/// Spawns a serial stage that additionally restores tag order.
///
/// Needed wherever a stateless concurrent stage feeds a stateful one: the
/// closure observes items in strictly increasing tag order regardless of
/// arrival order.
pub fn serial_tagged<'scope, I, O, K, F>(
    scope: &'scope Scope<'scope, '_>,
    name: &str,
    rx: Receiver<I>,
    tx: Sender<O>,
    key: K,
    mut f: F,
) where
    I: Send + 'scope,
    O: Send + 'scope,
    K: Fn(&I) -> usize + Send + 'scope,
    F: FnMut(I, &Sender<O>) + Send + 'scope,
{
    let label = name.to_owned();
    Builder::new()
        .name(label.clone())
        .spawn_scoped(scope, move || {
            let mut seq = Sequencer::new();
            for item in rx {
                seq.push(key(&item), item);
                while let Some(next) = seq.pop_ready() {
                    f(next, &tx);
                }
            }
            debug_assert!(seq.is_empty(), "input edge closed with tags missing");
            trace!(stage = %label, "ordered stage drained");
        })
        .expect("failed to spawn ordered stage");
}

/// Spawns a stateless map stage served by `workers` threads.
///
/// Workers share the input edge; items are claimed one at a time and results
/// are emitted as they complete, so downstream order is arbitrary. The
/// closure must not carry per-item state.
pub fn parallel<'scope, I, O, F>(
    scope: &'scope Scope<'scope, '_>,
    name: &str,
    workers: usize,
    rx: Receiver<I>,
    tx: Sender<O>,
    f: F,
) where
    I: Send + 'scope,
    O: Send + 'scope,
    F: Fn(I) -> O + Send + Sync + 'scope,
{
    debug_assert!(workers >= 1);
    let f = Arc::new(f);
    for n in 0..workers {
        let rx = rx.clone();
        let tx = tx.clone();
        let f = Arc::clone(&f);
        Builder::new()
            .name(format!("{name}-{n}"))
            .spawn_scoped(scope, move || {
                for item in rx {
                    if tx.send(f(item)).is_err() {
                        break;
                    }
                }
            })
            .expect("failed to spawn worker thread");
    }
}
