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

use std::{fmt, net::SocketAddr, sync::Arc, time::Duration};

use bitflags::bitflags;
use compact_str::{format_compact, CompactString};
use orion_configuration::config::cluster::{http_protocol_options::Http2ProtocolOptions, Cluster as ClusterConfig};
pub use orion_configuration::config::cluster::LbPolicy as LoadBalancerType;
use orion_metrics::Scope;
use rand::Rng;
use rustls::ClientConfig;
use tracing::debug;

use super::{
    resource_manager::{ResourceManager, ResourceManagers, ResourcePriority},
    stats::ClusterStats,
};
use crate::Result;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClusterFeatures: u64 {
        /// Upstream connections speak HTTP/2.
        const HTTP2 = 0x1;
    }
}

/// Configuration and stats shared by every host of a cluster. Immutable once built; only the stats and the
/// resource managers change, through atomics.
pub struct ClusterInfo {
    name: CompactString,
    added_via_api: bool,
    connect_timeout: Duration,
    per_connection_buffer_limit_bytes: u32,
    features: ClusterFeatures,
    http2_settings: Http2ProtocolOptions,
    lb_type: LoadBalancerType,
    maintenance_mode_percent: u32,
    max_requests_per_connection: u64,
    resource_managers: ResourceManagers,
    ssl_context: Option<Arc<ClientConfig>>,
    source_address: Option<SocketAddr>,
    stats_scope: Scope,
    stats: ClusterStats,
}

impl fmt::Debug for ClusterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterInfo")
            .field("name", &self.name)
            .field("added_via_api", &self.added_via_api)
            .field("connect_timeout", &self.connect_timeout)
            .field("lb_type", &self.lb_type)
            .field("features", &self.features)
            .field("tls", &self.ssl_context.is_some())
            .finish_non_exhaustive()
    }
}

impl ClusterInfo {
    pub fn try_from_config(config: &ClusterConfig, parent_scope: &Scope, added_via_api: bool) -> Result<Self> {
        let connect_timeout = config.connect_timeout();
        if connect_timeout.is_zero() {
            return Err(orion_configuration::Error::InvalidValue {
                field: "connect_timeout",
                reason: format_compact!("cluster {} has a zero connect timeout", config.name),
            }
            .into());
        }

        let features = if config.http_protocol_options.codec.is_http2() {
            ClusterFeatures::HTTP2
        } else {
            ClusterFeatures::empty()
        };

        let stats_scope = parent_scope.create_scope(&format_compact!("cluster.{}", config.name));
        let stats = ClusterStats::new(&stats_scope);
        orion_metrics::export_scope(&stats_scope);
        debug!("cluster {}: created stats under '{}'", config.name, stats_scope.prefix());

        Ok(Self {
            name: config.name.clone(),
            added_via_api,
            connect_timeout,
            per_connection_buffer_limit_bytes: config.per_connection_buffer_limit_bytes(),
            features,
            http2_settings: config.http_protocol_options.http2_options,
            lb_type: config.load_balancing_policy,
            maintenance_mode_percent: config.maintenance_mode_percent.value(),
            max_requests_per_connection: config.max_requests_per_connection,
            resource_managers: ResourceManagers::new(&config.circuit_breakers),
            ssl_context: None,
            source_address: config.source_address,
            stats_scope,
            stats,
        })
    }

    #[must_use]
    pub fn with_ssl_context(self, ssl_context: Arc<ClientConfig>) -> Self {
        Self { ssl_context: Some(ssl_context), ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if the cluster was created at runtime rather than from the static configuration.
    pub fn added_via_api(&self) -> bool {
        self.added_via_api
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn per_connection_buffer_limit_bytes(&self) -> u32 {
        self.per_connection_buffer_limit_bytes
    }

    pub fn features(&self) -> ClusterFeatures {
        self.features
    }

    pub fn http2_settings(&self) -> &Http2ProtocolOptions {
        &self.http2_settings
    }

    pub fn lb_type(&self) -> LoadBalancerType {
        self.lb_type
    }

    /// Whether this request should be rejected because the cluster is in maintenance. Evaluated freshly on
    /// every call.
    pub fn maintenance_mode(&self) -> bool {
        self.maintenance_mode_with(&mut rand::thread_rng())
    }

    pub fn maintenance_mode_with<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.maintenance_mode_percent > 0 && rng.gen_range(0..100) < self.maintenance_mode_percent
    }

    /// Zero means no limit.
    pub fn max_requests_per_connection(&self) -> u64 {
        self.max_requests_per_connection
    }

    pub fn resource_manager(&self, priority: ResourcePriority) -> &ResourceManager {
        self.resource_managers.get(priority)
    }

    pub fn ssl_context(&self) -> Option<&Arc<ClientConfig>> {
        self.ssl_context.as_ref()
    }

    pub fn source_address(&self) -> Option<SocketAddr> {
        self.source_address
    }

    pub fn stats(&self) -> &ClusterStats {
        &self.stats
    }

    pub fn stats_scope(&self) -> &Scope {
        &self.stats_scope
    }
}
