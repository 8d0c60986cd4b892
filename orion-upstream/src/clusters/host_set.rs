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

use std::{collections::HashSet, net::SocketAddr, sync::Arc};

use arc_swap::ArcSwap;
use orion_configuration::config::Locality;
use parking_lot::Mutex;
use tracing::debug;

use super::{
    callbacks::{CallbackHandle, MemberUpdateCallbacks},
    host::Host,
};

pub type HostVector = Vec<Arc<Host>>;
pub type HostList = Arc<HostVector>;
/// Hosts grouped by locality. Slot 0 holds the hosts of the local locality and is always present, possibly
/// empty. The other localities follow in ascending order.
pub type HostListsPerLocality = Arc<Vec<HostVector>>;

/// One published generation of a host set. All views belong to the same generation.
#[derive(Debug, Clone)]
pub struct HostSetSnapshot {
    generation: u64,
    hosts: HostList,
    healthy_hosts: HostList,
    hosts_per_locality: HostListsPerLocality,
    healthy_hosts_per_locality: HostListsPerLocality,
}

impl Default for HostSetSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            hosts: HostList::default(),
            healthy_hosts: HostList::default(),
            hosts_per_locality: Arc::new(vec![HostVector::new()]),
            healthy_hosts_per_locality: Arc::new(vec![HostVector::new()]),
        }
    }
}

impl HostSetSnapshot {
    fn build(generation: u64, hosts: HostVector, local_locality: Option<&Locality>) -> Self {
        let healthy_hosts: HostVector = hosts.iter().filter(|host| host.healthy()).cloned().collect();

        let mut remote: Vec<&Locality> =
            hosts.iter().map(|host| host.locality()).filter(|locality| Some(*locality) != local_locality).collect();
        remote.sort_unstable();
        remote.dedup();

        let slot = |host: &Arc<Host>| {
            let locality = host.locality();
            if Some(locality) == local_locality {
                0
            } else {
                match remote.binary_search(&locality) {
                    Ok(index) | Err(index) => index + 1,
                }
            }
        };
        let partition = |hosts: &[Arc<Host>]| {
            let mut slots = vec![HostVector::new(); remote.len() + 1];
            for host in hosts {
                if let Some(slot) = slots.get_mut(slot(host)) {
                    slot.push(Arc::clone(host));
                }
            }
            slots
        };
        let hosts_per_locality = partition(&hosts);
        let healthy_hosts_per_locality = partition(&healthy_hosts);

        Self {
            generation,
            hosts: Arc::new(hosts),
            healthy_hosts: Arc::new(healthy_hosts),
            hosts_per_locality: Arc::new(hosts_per_locality),
            healthy_hosts_per_locality: Arc::new(healthy_hosts_per_locality),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn hosts(&self) -> &HostList {
        &self.hosts
    }

    pub fn healthy_hosts(&self) -> &HostList {
        &self.healthy_hosts
    }

    pub fn hosts_per_locality(&self) -> &HostListsPerLocality {
        &self.hosts_per_locality
    }

    pub fn healthy_hosts_per_locality(&self) -> &HostListsPerLocality {
        &self.healthy_hosts_per_locality
    }
}

/// Hosts that joined and left a host set in one update, matched by address.
#[derive(Debug, Clone, Default)]
pub struct MembershipDiff {
    pub added: HostVector,
    pub removed: HostVector,
}

impl MembershipDiff {
    fn between(previous: &[Arc<Host>], current: &[Arc<Host>]) -> Self {
        let previous_addresses: HashSet<SocketAddr> = previous.iter().map(|host| host.address()).collect();
        let current_addresses: HashSet<SocketAddr> = current.iter().map(|host| host.address()).collect();
        Self {
            added: current.iter().filter(|host| !previous_addresses.contains(&host.address())).cloned().collect(),
            removed: previous.iter().filter(|host| !current_addresses.contains(&host.address())).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The membership of a cluster.
///
/// Readers get lock-free access to the current snapshot. Updates replace the whole snapshot at once, are
/// serialized among themselves and notify the member update callbacks after publishing, with no lock held.
#[derive(Debug)]
pub struct HostSet {
    local_locality: Option<Locality>,
    current: ArcSwap<HostSetSnapshot>,
    callbacks: MemberUpdateCallbacks,
    update_lock: Mutex<()>,
}

impl Default for HostSet {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HostSet {
    pub fn new(local_locality: Option<Locality>) -> Self {
        Self {
            local_locality,
            current: ArcSwap::from_pointee(HostSetSnapshot::default()),
            callbacks: MemberUpdateCallbacks::default(),
            update_lock: Mutex::new(()),
        }
    }

    pub fn local_locality(&self) -> Option<&Locality> {
        self.local_locality.as_ref()
    }

    /// The current snapshot. The host views are only reachable through a snapshot or a [`HostSetReader`], so
    /// views read one after the other always belong to the same generation.
    pub fn snapshot(&self) -> Arc<HostSetSnapshot> {
        self.current.load_full()
    }

    pub fn reader(&self) -> HostSetReader<'_> {
        HostSetReader { host_set: self, cached: self.snapshot() }
    }

    pub fn add_member_update_cb<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&[Arc<Host>], &[Arc<Host>]) + Send + Sync + 'static,
    {
        self.callbacks.add(Box::new(callback))
    }

    fn publish(&self, hosts: HostVector) -> (Arc<HostSetSnapshot>, Arc<HostSetSnapshot>) {
        let previous = self.current.load_full();
        let next = Arc::new(HostSetSnapshot::build(previous.generation + 1, hosts, self.local_locality.as_ref()));
        self.current.store(Arc::clone(&next));
        (previous, next)
    }

    /// Publishes `hosts` as the new membership and notifies the callbacks if hosts were added or removed.
    pub fn update_hosts(&self, hosts: HostVector) -> MembershipDiff {
        let (previous, next) = {
            let _guard = self.update_lock.lock();
            self.publish(hosts)
        };
        let diff = MembershipDiff::between(&previous.hosts, &next.hosts);
        debug!(
            "published host set generation {}: {} hosts, {} healthy, {} added, {} removed",
            next.generation,
            next.hosts.len(),
            next.healthy_hosts.len(),
            diff.added.len(),
            diff.removed.len()
        );
        if !diff.is_empty() {
            self.callbacks.run(&diff.added, &diff.removed);
        }
        diff
    }

    /// Like [`HostSet::update_hosts`], but hosts already present keep their identity, health and monitors. Only
    /// their weight is taken from the new host.
    pub fn update_dynamic_hosts(&self, hosts: HostVector) -> MembershipDiff {
        let current = self.current.load_full();
        let hosts = hosts
            .into_iter()
            .map(|host| match current.hosts.iter().find(|existing| existing.address() == host.address()) {
                Some(existing) => {
                    existing.take_weight_from(&host);
                    Arc::clone(existing)
                },
                None => host,
            })
            .collect();
        self.update_hosts(hosts)
    }

    /// Republishes the current hosts so the healthy views follow the current health flags. Membership does not
    /// change, so no callback runs.
    pub fn refresh_health(&self) -> Arc<HostSetSnapshot> {
        let _guard = self.update_lock.lock();
        let hosts = self.current.load().hosts.as_ref().clone();
        self.publish(hosts).1
    }
}

/// A per-worker view of a host set. Keeps using the snapshot it has until told to move to the latest one, so
/// consecutive reads through the same reader always see one generation.
#[derive(Debug)]
pub struct HostSetReader<'a> {
    host_set: &'a HostSet,
    cached: Arc<HostSetSnapshot>,
}

impl HostSetReader<'_> {
    pub fn cached(&self) -> &HostSetSnapshot {
        &self.cached
    }

    pub fn generation(&self) -> u64 {
        self.cached.generation
    }

    pub fn hosts(&self) -> &HostList {
        &self.cached.hosts
    }

    pub fn healthy_hosts(&self) -> &HostList {
        &self.cached.healthy_hosts
    }

    pub fn hosts_per_locality(&self) -> &HostListsPerLocality {
        &self.cached.hosts_per_locality
    }

    pub fn healthy_hosts_per_locality(&self) -> &HostListsPerLocality {
        &self.cached.healthy_hosts_per_locality
    }

    pub fn is_stale(&self) -> bool {
        self.host_set.current.load().generation != self.cached.generation
    }

    /// Moves to the latest snapshot. Returns true if it changed.
    pub fn refresh(&mut self) -> bool {
        if self.is_stale() {
            self.cached = self.host_set.snapshot();
            true
        } else {
            false
        }
    }

    pub fn cached_or_latest(&mut self) -> &HostSetSnapshot {
        self.refresh();
        &self.cached
    }
}
