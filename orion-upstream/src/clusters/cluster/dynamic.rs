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

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use compact_str::CompactString;
use orion_configuration::config::Locality;
use tracing::debug;

use super::{ClusterCore, ClusterOps, InitializePhase};
use crate::{
    clusters::{
        cluster_info::ClusterInfo,
        host_set::{HostVector, MembershipDiff},
    },
    Result,
};

/// A cluster whose membership is pushed by a discovery client. Initialization completes with the first
/// membership update, which may arrive before or after [`ClusterOps::initialize`] is called.
#[derive(Debug)]
pub struct DynamicCluster {
    core: ClusterCore,
    eds_cluster: Option<CompactString>,
    // set once discovery delivered a membership, health refreshes don't count
    membership_received: AtomicBool,
}

impl DynamicCluster {
    /// `eds_cluster` names the cluster membership is fetched through. Such clusters initialize in the
    /// secondary phase.
    pub fn new(info: Arc<ClusterInfo>, local_locality: Option<Locality>, eds_cluster: Option<CompactString>) -> Self {
        let phase = if eds_cluster.is_some() { InitializePhase::Secondary } else { InitializePhase::Primary };
        Self {
            core: ClusterCore::new(info, local_locality, phase),
            eds_cluster,
            membership_received: AtomicBool::new(false),
        }
    }

    pub fn eds_cluster(&self) -> Option<&str> {
        self.eds_cluster.as_deref()
    }

    pub fn on_update_attempt(&self) {
        self.core.info.stats().update_attempt.inc();
    }

    pub fn on_update_failure(&self) {
        self.core.info.stats().update_failure.inc();
        debug!("cluster {}: membership update failed", self.core.info.name());
    }

    /// Replaces the membership with `hosts`.
    pub fn update_hosts(&self, hosts: HostVector) -> MembershipDiff {
        self.on_update_success(hosts.is_empty());
        let diff = self.core.publish(|host_set| host_set.update_hosts(hosts));
        self.on_membership_received();
        diff
    }

    /// Replaces the membership with `hosts`, keeping the hosts already known by address.
    pub fn update_dynamic_hosts(&self, hosts: HostVector) -> MembershipDiff {
        self.on_update_success(hosts.is_empty());
        let diff = self.core.publish(|host_set| host_set.update_dynamic_hosts(hosts));
        self.on_membership_received();
        diff
    }

    fn on_membership_received(&self) {
        self.membership_received.store(true, Ordering::SeqCst);
        self.core.finish_initialize();
    }

    fn on_update_success(&self, empty: bool) {
        let stats = self.core.info.stats();
        stats.update_success.inc();
        if empty {
            stats.update_empty.inc();
        }
    }
}

impl ClusterOps for DynamicCluster {
    fn core(&self) -> &ClusterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ClusterCore {
        &mut self.core
    }

    fn initialize(&self) -> Result<()> {
        self.core.start_initialize()?;
        // membership pushed before initialization counts as the first update
        if self.membership_received.load(Ordering::SeqCst) {
            self.core.finish_initialize();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::{
        cluster::InitializationState,
        host::tests::{host_in, test_cluster},
    };
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn counting_cb(calls: &Arc<AtomicUsize>) -> Box<dyn FnOnce() + Send> {
        let calls = Arc::clone(calls);
        Box::new(move || {
            calls.fetch_add(1, Ordering::Relaxed);
        })
    }

    #[test]
    fn initializes_on_first_update() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info.clone(), None, Some("xds".into()));
        assert_eq!(cluster.initialize_phase(), InitializePhase::Secondary);
        assert_eq!(cluster.eds_cluster(), Some("xds"));

        let calls = Arc::new(AtomicUsize::new(0));
        cluster.set_initialized_cb(counting_cb(&calls));
        cluster.initialize().unwrap();
        assert_eq!(cluster.initialization_state(), InitializationState::Initializing);
        assert_eq!(calls.load(Ordering::Relaxed), 0);

        cluster.on_update_attempt();
        cluster.update_hosts(vec![Arc::new(host_in(&info, "10.0.0.1:80", Locality::default()))]);
        assert_eq!(cluster.initialization_state(), InitializationState::Initialized);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        cluster.on_update_attempt();
        cluster.update_hosts(Vec::new());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(info.stats().update_attempt.value(), 2);
        assert_eq!(info.stats().update_success.value(), 2);
        assert_eq!(info.stats().update_empty.value(), 1);
        assert_eq!(info.stats().membership_total.value(), 0);
        assert_eq!(info.stats().membership_change.value(), 2);
    }

    #[test]
    fn update_before_initialize() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info.clone(), None, None);
        assert_eq!(cluster.initialize_phase(), InitializePhase::Primary);
        cluster.update_hosts(vec![Arc::new(host_in(&info, "10.0.0.1:80", Locality::default()))]);
        assert_eq!(cluster.initialization_state(), InitializationState::Uninitialized);
        cluster.initialize().unwrap();
        assert_eq!(cluster.initialization_state(), InitializationState::Initialized);
    }

    #[test]
    fn health_refresh_does_not_complete_initialization() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info.clone(), None, None);
        let calls = Arc::new(AtomicUsize::new(0));
        cluster.set_initialized_cb(counting_cb(&calls));

        cluster.refresh_health();
        cluster.initialize().unwrap();
        assert_eq!(cluster.initialization_state(), InitializationState::Initializing);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(info.stats().update_success.value(), 0);

        cluster.refresh_health();
        assert_eq!(cluster.initialization_state(), InitializationState::Initializing);
        cluster.update_dynamic_hosts(vec![Arc::new(host_in(&info, "10.0.0.1:80", Locality::default()))]);
        assert_eq!(cluster.initialization_state(), InitializationState::Initialized);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn callback_registered_after_initialization_runs_once() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info.clone(), None, None);
        cluster.initialize().unwrap();
        cluster.update_hosts(Vec::new());

        let calls = Arc::new(AtomicUsize::new(0));
        cluster.set_initialized_cb(counting_cb(&calls));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        cluster.update_hosts(Vec::new());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn newer_pending_callback_replaces_older() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info, None, None);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        cluster.set_initialized_cb(counting_cb(&first));
        cluster.set_initialized_cb(counting_cb(&second));
        cluster.initialize().unwrap();
        cluster.update_hosts(Vec::new());
        assert_eq!(first.load(Ordering::Relaxed), 0);
        assert_eq!(second.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn update_failure_is_counted() {
        let info = test_cluster();
        let cluster = DynamicCluster::new(info.clone(), None, None);
        cluster.on_update_attempt();
        cluster.on_update_failure();
        assert_eq!(info.stats().update_failure.value(), 1);
        assert_eq!(info.stats().update_success.value(), 0);
    }
}
