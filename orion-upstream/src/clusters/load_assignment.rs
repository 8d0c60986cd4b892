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

use compact_str::format_compact;
use orion_configuration::config::{
    cluster::{ClusterLoadAssignment as ClusterLoadAssignmentConfig, HealthStatus, LbEndpoint as LbEndpointConfig},
    Locality,
};
use tracing::debug;
use typed_builder::TypedBuilder;

use super::{cluster_info::ClusterInfo, health::HealthFlag, host::Host, host::HostBuilder};
use crate::{Error, Result};

/// Turns the endpoints of a static load assignment into hosts of `cluster`.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(build_method(name = prepare), field_defaults(setter(prefix = "with_")))]
pub struct ClusterLoadAssignmentBuilder {
    cluster: Arc<ClusterInfo>,
    cla: ClusterLoadAssignmentConfig,
}

impl ClusterLoadAssignmentBuilder {
    pub fn build(self) -> Result<Vec<Host>> {
        let cluster = self.cluster;
        let hosts = self
            .cla
            .endpoints
            .into_iter()
            .flat_map(|locality_endpoints| {
                let locality = locality_endpoints.locality;
                locality_endpoints.lb_endpoints.into_iter().map(move |endpoint| (locality.clone(), endpoint))
            })
            .map(|(locality, endpoint)| build_host(&cluster, locality, endpoint))
            .collect::<Result<Vec<_>>>()?;
        debug!("cluster {}: {} hosts in load assignment", cluster.name(), hosts.len());
        Ok(hosts)
    }
}

fn build_host(cluster: &Arc<ClusterInfo>, locality: Locality, endpoint: LbEndpointConfig) -> Result<Host> {
    let health_flags = match endpoint.health_status {
        HealthStatus::Healthy => HealthFlag::empty(),
        HealthStatus::Unhealthy => HealthFlag::FAILED_ACTIVE_HC,
    };
    let address = endpoint.address;
    HostBuilder::builder()
        .with_cluster(Arc::clone(cluster))
        .with_address(address)
        .with_hostname(endpoint.hostname.unwrap_or_default())
        .with_locality(locality)
        .with_weight(endpoint.load_balancing_weight.get())
        .with_health_flags(health_flags)
        .prepare()
        .build()
        .map_err(|err| match err {
            Error::InvalidWeight(weight) => orion_configuration::Error::InvalidValue {
                field: "load_balancing_weight",
                reason: format_compact!("endpoint {} has weight {weight}, expected 1..=100", address),
            }
            .into(),
            err => err,
        })
}
