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

mod dynamic;
mod r#static;

use std::{fmt, sync::Arc};

use enum_dispatch::enum_dispatch;
use orion_configuration::config::{
    cluster::{Cluster as ClusterConfig, ClusterDiscoveryType},
    Locality,
};
use orion_metrics::Scope;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{
    callbacks::{CallbackHandle, MemberUpdateCb},
    cluster_info::ClusterInfo,
    health::OutlierDetector,
    host_set::{HostSet, HostSetReader, HostSetSnapshot, MembershipDiff},
    load_assignment::ClusterLoadAssignmentBuilder,
};
use crate::{Error, Result};

pub use dynamic::DynamicCluster;
pub use r#static::StaticCluster;

/// When a cluster can be initialized relative to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializePhase {
    /// Does not depend on any other cluster.
    Primary,
    /// Needs primary clusters to be up first, for example because its membership is fetched through one.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationState {
    Uninitialized,
    Initializing,
    Initialized,
}

pub type InitializedCb = Box<dyn FnOnce() + Send>;

struct Lifecycle {
    state: InitializationState,
    initialized_cb: Option<InitializedCb>,
}

/// State shared by every kind of cluster: membership, configuration and the initialization lifecycle.
pub struct ClusterCore {
    info: Arc<ClusterInfo>,
    host_set: HostSet,
    initialize_phase: InitializePhase,
    lifecycle: Mutex<Lifecycle>,
    outlier_detector: Option<Arc<dyn OutlierDetector>>,
}

impl fmt::Debug for ClusterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCore")
            .field("info", &self.info)
            .field("host_set", &self.host_set)
            .field("initialize_phase", &self.initialize_phase)
            .field("state", &self.lifecycle.lock().state)
            .finish_non_exhaustive()
    }
}

impl ClusterCore {
    pub fn new(info: Arc<ClusterInfo>, local_locality: Option<Locality>, initialize_phase: InitializePhase) -> Self {
        Self {
            info,
            host_set: HostSet::new(local_locality),
            initialize_phase,
            lifecycle: Mutex::new(Lifecycle { state: InitializationState::Uninitialized, initialized_cb: None }),
            outlier_detector: None,
        }
    }

    fn start_initialize(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != InitializationState::Uninitialized {
            return Err(Error::AlreadyInitialized(self.info.name().into()));
        }
        lifecycle.state = InitializationState::Initializing;
        debug!("cluster {}: initializing ({:?} phase)", self.info.name(), self.initialize_phase);
        Ok(())
    }

    /// Completes initialization if it is in progress. The callback runs after the lock is released.
    fn finish_initialize(&self) {
        let callback = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != InitializationState::Initializing {
                return;
            }
            lifecycle.state = InitializationState::Initialized;
            lifecycle.initialized_cb.take()
        };
        info!("cluster {}: initialized with {} hosts", self.info.name(), self.host_set.snapshot().hosts().len());
        if let Some(callback) = callback {
            callback();
        }
    }

    fn state(&self) -> InitializationState {
        self.lifecycle.lock().state
    }

    fn set_initialized_cb(&self, callback: InitializedCb) {
        let run_now = {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state == InitializationState::Initialized {
                Some(callback)
            } else {
                if lifecycle.initialized_cb.replace(callback).is_some() {
                    warn!("cluster {}: replacing pending initialization callback", self.info.name());
                }
                None
            }
        };
        if let Some(callback) = run_now {
            callback();
        }
    }

    /// Publishes new membership through `update` and refreshes the membership stats.
    fn publish(&self, update: impl FnOnce(&HostSet) -> MembershipDiff) -> MembershipDiff {
        let diff = update(&self.host_set);
        let snapshot = self.host_set.snapshot();
        self.update_membership_stats(&snapshot);
        if !diff.is_empty() {
            self.info.stats().membership_change.inc();
        }
        diff
    }

    fn update_membership_stats(&self, snapshot: &HostSetSnapshot) {
        let stats = self.info.stats();
        stats.membership_total.set(snapshot.hosts().len() as u64);
        stats.membership_healthy.set(snapshot.healthy_hosts().len() as u64);
        stats.max_host_weight.set(snapshot.hosts().iter().map(|host| u64::from(host.weight())).max().unwrap_or(0));
    }
}

#[enum_dispatch]
pub trait ClusterOps {
    fn core(&self) -> &ClusterCore;
    fn core_mut(&mut self) -> &mut ClusterCore;

    /// Starts initialization. Must be called once; a second call fails with [`Error::AlreadyInitialized`].
    fn initialize(&self) -> Result<()>;

    fn name(&self) -> &str {
        self.core().info.name()
    }

    fn info(&self) -> &Arc<ClusterInfo> {
        &self.core().info
    }

    fn host_set(&self) -> &HostSet {
        &self.core().host_set
    }

    /// All host views of one generation.
    fn snapshot(&self) -> Arc<HostSetSnapshot> {
        self.core().host_set.snapshot()
    }

    /// A per-worker view that stays on one generation until refreshed.
    fn reader(&self) -> HostSetReader<'_> {
        self.core().host_set.reader()
    }

    fn add_member_update_cb(&self, callback: Box<MemberUpdateCb>) -> CallbackHandle {
        self.core().host_set.add_member_update_cb(callback)
    }

    /// Republishes the current hosts so the healthy views follow the health flags.
    fn refresh_health(&self) {
        let core = self.core();
        let snapshot = core.host_set.refresh_health();
        core.update_membership_stats(&snapshot);
    }

    fn initialize_phase(&self) -> InitializePhase {
        self.core().initialize_phase
    }

    fn initialization_state(&self) -> InitializationState {
        self.core().state()
    }

    /// Registers the callback run once the cluster is initialized. Runs right away, on the calling thread, if
    /// that already happened. Only one callback can be pending; a newer one replaces it.
    fn set_initialized_cb(&self, callback: InitializedCb) {
        self.core().set_initialized_cb(callback);
    }

    fn outlier_detector(&self) -> Option<&Arc<dyn OutlierDetector>> {
        self.core().outlier_detector.as_ref()
    }

    fn set_outlier_detector(&mut self, detector: Arc<dyn OutlierDetector>) {
        self.core_mut().outlier_detector = Some(detector);
    }
}

#[derive(Debug)]
#[enum_dispatch(ClusterOps)]
pub enum ClusterType {
    Static(StaticCluster),
    Dynamic(DynamicCluster),
}

impl ClusterType {
    pub fn as_dynamic(&self) -> Option<&DynamicCluster> {
        match self {
            ClusterType::Dynamic(cluster) => Some(cluster),
            ClusterType::Static(_) => None,
        }
    }
}

/// What a cluster is built with besides its own configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    pub local_locality: Option<&'a Locality>,
    pub scope: &'a Scope,
    pub added_via_api: bool,
}

impl TryFrom<(&ClusterConfig, &LoadContext<'_>)> for ClusterType {
    type Error = Error;
    fn try_from(value: (&ClusterConfig, &LoadContext<'_>)) -> Result<Self> {
        let (config, context) = value;
        let info = Arc::new(ClusterInfo::try_from_config(config, context.scope, context.added_via_api)?);
        let local_locality = context.local_locality.cloned();
        debug!("cluster {} type {:?}", config.name, config.discovery_settings);
        match &config.discovery_settings {
            ClusterDiscoveryType::Static(cla) => {
                let hosts = ClusterLoadAssignmentBuilder::builder()
                    .with_cluster(Arc::clone(&info))
                    .with_cla(cla.clone())
                    .prepare()
                    .build()?;
                Ok(ClusterType::Static(StaticCluster::new(info, local_locality, hosts)))
            },
            ClusterDiscoveryType::Eds(eds) => {
                Ok(ClusterType::Dynamic(DynamicCluster::new(info, local_locality, eds.eds_cluster.clone())))
            },
        }
    }
}
