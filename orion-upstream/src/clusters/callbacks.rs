// SPDX-FileCopyrightText: © 2025 Huawei Cloud Computing Technologies Co., Ltd
// SPDX-License-Identifier: Apache-2.0
//
// Copyright 2025 Huawei Cloud Computing Technologies Co., Ltd
//
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
//

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;

use super::host::Host;

/// Receives the hosts added to and removed from a host set.
pub type MemberUpdateCb = dyn Fn(&[Arc<Host>], &[Arc<Host>]) + Send + Sync;

struct Entry {
    callback: Box<MemberUpdateCb>,
    removed: AtomicBool,
}

#[derive(Default)]
struct Registry {
    entries: Mutex<Vec<Arc<Entry>>>,
    running: AtomicUsize,
}

impl Registry {
    // Removed entries are only erased while no notification pass is running.
    fn sweep(&self) {
        if self.running.load(Ordering::Acquire) == 0 {
            self.entries.lock().retain(|entry| !entry.removed.load(Ordering::Acquire));
        }
    }
}

/// Marks a notification pass as running until dropped, including when a callback panics.
struct RunningPass<'a>(&'a Registry);

impl<'a> RunningPass<'a> {
    fn start(registry: &'a Registry) -> Self {
        registry.running.fetch_add(1, Ordering::AcqRel);
        Self(registry)
    }
}

impl Drop for RunningPass<'_> {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::AcqRel);
        self.0.sweep();
    }
}

/// The member update callbacks of a host set.
#[derive(Default)]
pub(crate) struct MemberUpdateCallbacks {
    registry: Arc<Registry>,
}

impl fmt::Debug for MemberUpdateCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberUpdateCallbacks").field("len", &self.len()).finish()
    }
}

impl MemberUpdateCallbacks {
    pub fn add(&self, callback: Box<MemberUpdateCb>) -> CallbackHandle {
        let entry = Arc::new(Entry { callback, removed: AtomicBool::new(false) });
        self.registry.entries.lock().push(Arc::clone(&entry));
        CallbackHandle { entry, registry: Arc::downgrade(&self.registry) }
    }

    /// Runs every registered callback. The registry lock is not held while callbacks run, so callbacks may
    /// register or remove callbacks. A callback removed during the pass is not invoked anymore; one added during
    /// the pass is first invoked on the next one.
    pub fn run(&self, added: &[Arc<Host>], removed: &[Arc<Host>]) {
        let _pass = RunningPass::start(&self.registry);
        let entries = self.registry.entries.lock().clone();
        for entry in entries {
            if !entry.removed.load(Ordering::Acquire) {
                (entry.callback)(added, removed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registry.entries.lock().iter().filter(|entry| !entry.removed.load(Ordering::Acquire)).count()
    }
}

/// Keeps a callback registered. Dropping the handle unregisters it.
#[must_use = "dropping the handle unregisters the callback"]
pub struct CallbackHandle {
    entry: Arc<Entry>,
    registry: Weak<Registry>,
}

impl fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandle").field("removed", &self.entry.removed.load(Ordering::Relaxed)).finish()
    }
}

impl CallbackHandle {
    pub fn remove(self) {}
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        self.entry.removed.store(true, Ordering::Release);
        if let Some(registry) = self.registry.upgrade() {
            registry.sweep();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Arc<AtomicUsize>, Box<MemberUpdateCb>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&calls);
        (calls, Box::new(move |_: &[Arc<Host>], _: &[Arc<Host>]| {
            inner.fetch_add(1, Ordering::Relaxed);
        }))
    }

    #[test]
    fn handle_drop_unregisters() {
        let callbacks = MemberUpdateCallbacks::default();
        let (calls, cb) = counter();
        let handle = callbacks.add(cb);
        callbacks.run(&[], &[]);
        assert_eq!(callbacks.len(), 1);
        handle.remove();
        callbacks.run(&[], &[]);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(callbacks.len(), 0);
        assert!(callbacks.registry.entries.lock().is_empty());
    }

    #[test]
    fn removal_during_pass() {
        let callbacks = MemberUpdateCallbacks::default();
        let victim_slot: Arc<Mutex<Option<CallbackHandle>>> = Arc::default();

        let slot = Arc::clone(&victim_slot);
        let _remover = callbacks.add(Box::new(move |_: &[Arc<Host>], _: &[Arc<Host>]| {
            slot.lock().take();
        }));
        let (victim_calls, victim) = counter();
        *victim_slot.lock() = Some(callbacks.add(victim));

        callbacks.run(&[], &[]);
        assert_eq!(victim_calls.load(Ordering::Relaxed), 0);
        callbacks.run(&[], &[]);
        assert_eq!(victim_calls.load(Ordering::Relaxed), 0);
        assert_eq!(callbacks.len(), 1);
    }

    #[test]
    fn tombstones_are_kept_during_pass() {
        let callbacks = Arc::new(MemberUpdateCallbacks::default());
        let seen = Arc::new(AtomicUsize::new(0));

        let inner_callbacks = Arc::downgrade(&callbacks);
        let inner_seen = Arc::clone(&seen);
        let _observer = callbacks.add(Box::new(move |_: &[Arc<Host>], _: &[Arc<Host>]| {
            if let Some(callbacks) = inner_callbacks.upgrade() {
                let (_, cb) = counter();
                // registered and dropped while the pass is running
                drop(callbacks.add(cb));
                inner_seen.store(callbacks.registry.entries.lock().len(), Ordering::Relaxed);
            }
        }));
        callbacks.run(&[], &[]);
        assert_eq!(seen.load(Ordering::Relaxed), 2);
        assert_eq!(callbacks.registry.entries.lock().len(), 1);
    }

    #[test]
    fn panicking_callback_leaves_registry_consistent() {
        let callbacks = MemberUpdateCallbacks::default();
        let failing = callbacks.add(Box::new(|_: &[Arc<Host>], _: &[Arc<Host>]| panic!("callback failed")));
        let (_, cb) = counter();
        let other = callbacks.add(cb);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callbacks.run(&[], &[])));
        assert!(outcome.is_err());
        assert_eq!(callbacks.registry.running.load(Ordering::Acquire), 0);

        failing.remove();
        other.remove();
        assert!(callbacks.registry.entries.lock().is_empty());
        assert_eq!(callbacks.len(), 0);
    }

    #[test]
    fn handle_outliving_registry() {
        let callbacks = MemberUpdateCallbacks::default();
        let (_, cb) = counter();
        let handle = callbacks.add(cb);
        drop(callbacks);
        handle.remove();
    }
}
