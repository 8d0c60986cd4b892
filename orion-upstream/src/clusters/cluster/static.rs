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

use orion_configuration::config::Locality;

use super::{ClusterCore, ClusterOps, InitializePhase};
use crate::{
    clusters::{cluster_info::ClusterInfo, host::Host, host_set::HostVector},
    Result,
};

/// A cluster whose hosts are fixed by configuration. Initialization completes as soon as it starts.
#[derive(Debug)]
pub struct StaticCluster {
    core: ClusterCore,
    initial_hosts: HostVector,
}

impl StaticCluster {
    pub fn new(info: Arc<ClusterInfo>, local_locality: Option<Locality>, hosts: Vec<Host>) -> Self {
        Self {
            core: ClusterCore::new(info, local_locality, InitializePhase::Primary),
            initial_hosts: hosts.into_iter().map(Arc::new).collect(),
        }
    }

    /// The configured hosts that are not shared yet, for installing monitors before initialization.
    pub fn hosts_mut(&mut self) -> impl Iterator<Item = &mut Host> + '_ {
        self.initial_hosts.iter_mut().filter_map(Arc::get_mut)
    }
}

impl ClusterOps for StaticCluster {
    fn core(&self) -> &ClusterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ClusterCore {
        &mut self.core
    }

    fn initialize(&self) -> Result<()> {
        self.core.start_initialize()?;
        let hosts = self.initial_hosts.clone();
        self.core.publish(|host_set| host_set.update_hosts(hosts));
        self.core.finish_initialize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clusters::{
            cluster::InitializationState,
            health::{HealthCheckHostMonitor, HealthFlag},
            host::tests::{host_in, test_cluster},
        },
        Error, ErrorKind,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MarkUnhealthy(AtomicUsize);

    impl HealthCheckHostMonitor for MarkUnhealthy {
        fn set_unhealthy(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn initializes_immediately() {
        let info = test_cluster();
        let h1 = host_in(&info, "10.0.0.1:80", Locality::default());
        let h2 = host_in(&info, "10.0.0.2:80", Locality::default());
        h2.health_flag_set(HealthFlag::FAILED_ACTIVE_HC);
        let cluster = StaticCluster::new(Arc::clone(&info), None, vec![h1, h2]);
        assert_eq!(cluster.initialize_phase(), InitializePhase::Primary);
        assert_eq!(cluster.initialization_state(), InitializationState::Uninitialized);
        assert!(cluster.snapshot().hosts().is_empty());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cluster.set_initialized_cb(Box::new(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        }));
        cluster.initialize().unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(cluster.initialization_state(), InitializationState::Initialized);
        let snapshot = cluster.snapshot();
        assert_eq!(snapshot.hosts().len(), 2);
        assert_eq!(snapshot.healthy_hosts().len(), 1);
        assert_eq!(info.stats().membership_total.value(), 2);
        assert_eq!(info.stats().membership_healthy.value(), 1);
        assert_eq!(info.stats().membership_change.value(), 1);
        assert_eq!(info.stats().max_host_weight.value(), 1);

        let err = cluster.initialize().unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn monitors_installed_before_initialization() {
        let info = test_cluster();
        let mut cluster = StaticCluster::new(info.clone(), None, vec![host_in(&info, "10.0.0.1:80", Locality::default())]);
        let monitor = Arc::new(MarkUnhealthy(AtomicUsize::new(0)));
        for host in cluster.hosts_mut() {
            host.set_health_checker(monitor.clone());
        }
        cluster.initialize().unwrap();
        assert_eq!(cluster.hosts_mut().count(), 0);
        cluster.snapshot().hosts()[0].health_checker().unwrap().set_unhealthy();
        assert_eq!(monitor.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn refresh_health_updates_gauges() {
        let info = test_cluster();
        let cluster = StaticCluster::new(info.clone(), None, vec![host_in(&info, "10.0.0.1:80", Locality::default())]);
        cluster.initialize().unwrap();
        assert_eq!(info.stats().membership_healthy.value(), 1);
        cluster.snapshot().hosts()[0].health_flag_set(HealthFlag::FAILED_OUTLIER_CHECK);
        cluster.refresh_health();
        assert_eq!(info.stats().membership_healthy.value(), 0);
        assert!(cluster.snapshot().healthy_hosts().is_empty());
        assert_eq!(info.stats().membership_change.value(), 1);
    }
}
