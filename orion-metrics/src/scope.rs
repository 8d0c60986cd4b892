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

use std::sync::Arc;

use ahash::RandomState;
use compact_str::{format_compact, CompactString};
use dashmap::DashMap;
use tracing::warn;

use crate::metrics::{Counter, Gauge, Stat, StatKind, Timer};

type StatStore = DashMap<CompactString, Stat, RandomState>;

/// A named view over a shared stat store.
///
/// Every stat created through a scope is stored under `<prefix><name>`. Child scopes share the same store, so
/// a stat created through `root.create_scope("cluster.a")` is visible from the root as `cluster.a.<name>`.
#[derive(Debug, Clone)]
pub struct Scope {
    prefix: CompactString,
    store: Arc<StatStore>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self { prefix: CompactString::default(), store: Arc::new(DashMap::with_hasher(RandomState::new())) }
    }

    /// Returns a child scope. A trailing `.` is appended to `name` if missing.
    pub fn create_scope(&self, name: &str) -> Scope {
        let prefix = if name.is_empty() || name.ends_with('.') {
            format_compact!("{}{}", self.prefix, name)
        } else {
            format_compact!("{}{}.", self.prefix, name)
        };
        Scope { prefix, store: Arc::clone(&self.store) }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full_name(&self, name: &str) -> CompactString {
        format_compact!("{}{}", self.prefix, name)
    }

    fn get_or_create(&self, name: &str, kind: StatKind) -> Option<Stat> {
        let full_name = self.full_name(name);
        let entry = self.store.entry(full_name.clone()).or_insert_with(|| match kind {
            StatKind::Counter => Stat::Counter(Counter::new()),
            StatKind::Gauge => Stat::Gauge(Gauge::new()),
            StatKind::Timer => Stat::Timer(Timer::new()),
        });
        if entry.kind() == kind {
            Some(entry.value().clone())
        } else {
            warn!("stat {full_name} already registered as {:?}, requested {kind:?}", entry.kind());
            None
        }
    }

    /// Returns the counter `name`, creating it on first use. A name already taken by another kind yields a
    /// detached counter that is never exported.
    pub fn counter(&self, name: &str) -> Counter {
        match self.get_or_create(name, StatKind::Counter) {
            Some(Stat::Counter(counter)) => counter,
            _ => Counter::new(),
        }
    }

    pub fn gauge(&self, name: &str) -> Gauge {
        match self.get_or_create(name, StatKind::Gauge) {
            Some(Stat::Gauge(gauge)) => gauge,
            _ => Gauge::new(),
        }
    }

    pub fn timer(&self, name: &str) -> Timer {
        match self.get_or_create(name, StatKind::Timer) {
            Some(Stat::Timer(timer)) => timer,
            _ => Timer::new(),
        }
    }

    /// Looks up an existing stat by its name relative to this scope.
    pub fn find(&self, name: &str) -> Option<Stat> {
        self.store.get(self.full_name(name).as_str()).map(|entry| entry.value().clone())
    }

    fn collect<T>(&self, mut pick: impl FnMut(&Stat) -> Option<T>) -> Vec<(CompactString, T)> {
        let mut stats: Vec<_> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(self.prefix.as_str()))
            .filter_map(|entry| pick(entry.value()).map(|stat| (entry.key().clone(), stat)))
            .collect();
        stats.sort_by(|(a, _), (b, _)| a.cmp(b));
        stats
    }

    /// All counters under this scope, with full names, sorted by name.
    pub fn counters(&self) -> Vec<(CompactString, Counter)> {
        self.collect(|stat| match stat {
            Stat::Counter(counter) => Some(counter.clone()),
            _ => None,
        })
    }

    pub fn gauges(&self) -> Vec<(CompactString, Gauge)> {
        self.collect(|stat| match stat {
            Stat::Gauge(gauge) => Some(gauge.clone()),
            _ => None,
        })
    }

    pub fn timers(&self) -> Vec<(CompactString, Timer)> {
        self.collect(|stat| match stat {
            Stat::Timer(timer) => Some(timer.clone()),
            _ => None,
        })
    }

    /// Drops every stat under this scope from the store. Handles already given out keep working but are no
    /// longer reachable through any scope.
    pub fn clear(&self) {
        self.store.retain(|name, _| !name.starts_with(self.prefix.as_str()));
    }

    pub fn len(&self) -> usize {
        self.store.iter().filter(|entry| entry.key().starts_with(self.prefix.as_str())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
