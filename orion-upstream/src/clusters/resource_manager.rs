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

use std::sync::atomic::{AtomicU64, Ordering};

use orion_configuration::config::cluster::{CircuitBreakers, Thresholds};
pub use orion_configuration::config::cluster::RoutingPriority as ResourcePriority;

pub const DEFAULT_MAX_CONNECTIONS: u64 = 1024;
pub const DEFAULT_MAX_PENDING_REQUESTS: u64 = 1024;
pub const DEFAULT_MAX_REQUESTS: u64 = 1024;
pub const DEFAULT_MAX_RETRIES: u64 = 3;

/// A bounded counter of in-flight resources.
#[derive(Debug)]
pub struct Resource {
    count: AtomicU64,
    max: u64,
}

impl Resource {
    pub fn new(max: u64) -> Self {
        Self { count: AtomicU64::new(0), max }
    }

    pub fn can_create(&self) -> bool {
        self.count() < self.max
    }

    pub fn inc(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self.count.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |count| Some(count.saturating_sub(1)));
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

/// Circuit-breaking accumulators of one cluster at one priority.
#[derive(Debug)]
pub struct ResourceManager {
    connections: Resource,
    pending_requests: Resource,
    requests: Resource,
    retries: Resource,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResourceManager {
    pub fn new(thresholds: Option<&Thresholds>) -> Self {
        let max = |value: Option<u32>, default: u64| value.map_or(default, u64::from);
        let thresholds = thresholds.cloned().unwrap_or_default();
        Self {
            connections: Resource::new(max(thresholds.max_connections, DEFAULT_MAX_CONNECTIONS)),
            pending_requests: Resource::new(max(thresholds.max_pending_requests, DEFAULT_MAX_PENDING_REQUESTS)),
            requests: Resource::new(max(thresholds.max_requests, DEFAULT_MAX_REQUESTS)),
            retries: Resource::new(max(thresholds.max_retries, DEFAULT_MAX_RETRIES)),
        }
    }

    pub fn connections(&self) -> &Resource {
        &self.connections
    }

    pub fn pending_requests(&self) -> &Resource {
        &self.pending_requests
    }

    pub fn requests(&self) -> &Resource {
        &self.requests
    }

    pub fn retries(&self) -> &Resource {
        &self.retries
    }
}

#[derive(Debug, Default)]
pub(crate) struct ResourceManagers {
    default: ResourceManager,
    high: ResourceManager,
}

impl ResourceManagers {
    pub fn new(circuit_breakers: &CircuitBreakers) -> Self {
        Self {
            default: ResourceManager::new(circuit_breakers.thresholds(ResourcePriority::Default)),
            high: ResourceManager::new(circuit_breakers.thresholds(ResourcePriority::High)),
        }
    }

    pub fn get(&self, priority: ResourcePriority) -> &ResourceManager {
        match priority {
            ResourcePriority::Default => &self.default,
            ResourcePriority::High => &self.high,
        }
    }
}
