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

pub mod http_protocol_options;
pub use http_protocol_options::HttpProtocolOptions;

use super::{
    common::{deser_through, is_default},
    core::Locality,
};

use compact_str::CompactString;
use serde::{Deserialize, Serialize, Serializer};
use std::{fmt::Display, net::SocketAddr, num::NonZeroU32, time::Duration};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PER_CONNECTION_BUFFER_LIMIT_BYTES: u32 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Cluster {
    pub name: CompactString,
    #[serde(flatten)]
    pub discovery_settings: ClusterDiscoveryType,
    #[serde(with = "humantime_serde")]
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub connect_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub per_connection_buffer_limit_bytes: Option<u32>,
    #[serde(skip_serializing_if = "is_default", default)]
    pub load_balancing_policy: LbPolicy,
    #[serde(skip_serializing_if = "is_default", default)]
    pub http_protocol_options: HttpProtocolOptions,
    /// Zero means no limit.
    #[serde(skip_serializing_if = "is_default", default)]
    pub max_requests_per_connection: u64,
    #[serde(skip_serializing_if = "is_default", default)]
    pub circuit_breakers: CircuitBreakers,
    #[serde(skip_serializing_if = "is_default", default)]
    pub maintenance_mode_percent: Percent,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub source_address: Option<SocketAddr>,
}

impl Cluster {
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn per_connection_buffer_limit_bytes(&self) -> u32 {
        self.per_connection_buffer_limit_bytes.unwrap_or(DEFAULT_PER_CONNECTION_BUFFER_LIMIT_BYTES)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "discovery", content = "discovery_settings")]
pub enum ClusterDiscoveryType {
    #[serde(rename = "static")]
    Static(ClusterLoadAssignment),
    #[serde(rename = "EDS")]
    Eds(EdsClusterConfig),
}

/// Membership of an EDS cluster is pushed at runtime. When `eds_cluster` is set, the endpoints are fetched
/// through that other cluster, which therefore has to be up first.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct EdsClusterConfig {
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub eds_cluster: Option<CompactString>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterLoadAssignment {
    #[serde(
        serialize_with = "simplify_locality_lb_endpoints",
        deserialize_with = "deser_through::<LocalityLbEndpointsDeser,_,_>"
    )]
    pub endpoints: Vec<LocalityLbEndpoints>,
}

fn simplify_locality_lb_endpoints<S: Serializer>(
    value: &Vec<LocalityLbEndpoints>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if value.len() == 1 && is_default(&value[0].locality) {
        simplify_lb_endpoints(&value[0].lb_endpoints, serializer)
    } else {
        value.serialize(serializer)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LocalityLbEndpointsDeser {
    LocalityLbEndpoints(Vec<LocalityLbEndpoints>),
    Simplified(LbEndpointVecDeser),
}

impl From<LocalityLbEndpointsDeser> for Vec<LocalityLbEndpoints> {
    fn from(value: LocalityLbEndpointsDeser) -> Self {
        match value {
            LocalityLbEndpointsDeser::Simplified(simple) => {
                vec![LocalityLbEndpoints { locality: Locality::default(), lb_endpoints: simple.into() }]
            },
            LocalityLbEndpointsDeser::LocalityLbEndpoints(vec) => vec,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalityLbEndpoints {
    #[serde(skip_serializing_if = "is_default", default)]
    pub locality: Locality,
    #[serde(serialize_with = "simplify_lb_endpoints", deserialize_with = "deser_through::<LbEndpointVecDeser,_,_>")]
    pub lb_endpoints: Vec<LbEndpoint>,
}

fn simplify_lb_endpoints<S: Serializer>(value: &Vec<LbEndpoint>, serializer: S) -> Result<S::Ok, S::Error> {
    if value.iter().all(|s| is_default(&s.health_status) && s.load_balancing_weight == NonZeroU32::MIN) {
        value.iter().map(|endpoint| endpoint.address).collect::<Vec<_>>().serialize(serializer)
    } else {
        value.serialize(serializer)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LbEndpointVecDeser {
    LbEndpoints(Vec<LbEndpoint>),
    Address(Vec<SocketAddr>),
}

impl From<LbEndpointVecDeser> for Vec<LbEndpoint> {
    fn from(value: LbEndpointVecDeser) -> Self {
        match value {
            LbEndpointVecDeser::Address(address) => address.into_iter().map(LbEndpoint::new).collect(),
            LbEndpointVecDeser::LbEndpoints(vec) => vec,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LbEndpoint {
    pub address: SocketAddr,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub hostname: Option<CompactString>,
    #[serde(skip_serializing_if = "is_default", default)]
    pub health_status: HealthStatus,
    #[serde(default = "default_weight")]
    pub load_balancing_weight: NonZeroU32,
}

fn default_weight() -> NonZeroU32 {
    NonZeroU32::MIN
}

impl LbEndpoint {
    pub fn new(address: SocketAddr) -> Self {
        Self { address, hostname: None, health_status: HealthStatus::default(), load_balancing_weight: default_weight() }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HealthStatus {
    #[default]
    Healthy,
    Unhealthy,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HealthStatus::Healthy => "Healthy",
                HealthStatus::Unhealthy => "Unhealthy",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    Random,
    LeastRequest,
    RingHash,
    Maglev,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPriority {
    #[default]
    Default,
    High,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct CircuitBreakers {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub thresholds: Vec<Thresholds>,
}

impl CircuitBreakers {
    /// The last entry configured for `priority` wins.
    pub fn thresholds(&self, priority: RoutingPriority) -> Option<&Thresholds> {
        self.thresholds.iter().rev().find(|thresholds| thresholds.priority == priority)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Thresholds {
    #[serde(skip_serializing_if = "is_default", default)]
    pub priority: RoutingPriority,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub max_pending_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub max_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub max_retries: Option<u32>,
}

/// An integer percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Percent(u32);

impl Percent {
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Percent {
    type Error = crate::Error;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 100 {
            Err(crate::Error::InvalidValue {
                field: "percent",
                reason: compact_str::format_compact!("{value} is larger than 100"),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl From<Percent> for u32 {
    fn from(value: Percent) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::deserialize_yaml_str;

    #[test]
    fn shorthand_endpoints() {
        let yaml = r#"
name: backend
discovery: static
discovery_settings:
  endpoints: ["127.0.0.1:8080", "127.0.0.1:8081"]
"#;
        let cluster: Cluster = deserialize_yaml_str(yaml).unwrap();
        let ClusterDiscoveryType::Static(assignment) = &cluster.discovery_settings else {
            panic!("expected a static cluster")
        };
        assert_eq!(assignment.endpoints.len(), 1);
        assert_eq!(assignment.endpoints[0].locality, Locality::default());
        let weights: Vec<_> = assignment.endpoints[0].lb_endpoints.iter().map(|e| e.load_balancing_weight.get()).collect();
        assert_eq!(weights, vec![1, 1]);
        assert_eq!(cluster.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(cluster.load_balancing_policy, LbPolicy::RoundRobin);
    }

    #[test]
    fn full_endpoints_with_locality() {
        let yaml = r#"
name: backend
discovery: static
discovery_settings:
  endpoints:
    - locality: { region: eu, zone: a }
      lb_endpoints:
        - address: "10.0.0.1:80"
          load_balancing_weight: 7
          health_status: Unhealthy
        - "10.0.0.2:80"
connect_timeout: 250ms
maintenance_mode_percent: 20
load_balancing_policy: least_request
"#;
        let cluster: Result<Cluster, _> = deserialize_yaml_str(yaml);
        // mixing the two endpoint forms in a single list is not accepted
        assert!(cluster.is_err());

        let yaml = yaml.replace(r#"        - "10.0.0.2:80""#, r#"        - address: "10.0.0.2:80""#);
        let cluster: Cluster = deserialize_yaml_str(&yaml).unwrap();
        let ClusterDiscoveryType::Static(assignment) = &cluster.discovery_settings else {
            panic!("expected a static cluster")
        };
        let endpoints = &assignment.endpoints[0];
        assert_eq!(endpoints.locality, Locality::new("eu", "a", ""));
        assert_eq!(endpoints.lb_endpoints[0].load_balancing_weight.get(), 7);
        assert_eq!(endpoints.lb_endpoints[0].health_status, HealthStatus::Unhealthy);
        assert_eq!(endpoints.lb_endpoints[1].health_status, HealthStatus::Healthy);
        assert_eq!(cluster.connect_timeout(), Duration::from_millis(250));
        assert_eq!(cluster.maintenance_mode_percent.value(), 20);
        assert_eq!(cluster.load_balancing_policy, LbPolicy::LeastRequest);
    }

    #[test]
    fn eds_cluster_reference() {
        let yaml = r#"
name: service
discovery: EDS
discovery_settings:
  eds_cluster: xds
circuit_breakers:
  thresholds:
    - max_connections: 10
    - priority: high
      max_retries: 9
"#;
        let cluster: Cluster = deserialize_yaml_str(yaml).unwrap();
        assert_eq!(
            cluster.discovery_settings,
            ClusterDiscoveryType::Eds(EdsClusterConfig { eds_cluster: Some("xds".into()) })
        );
        assert_eq!(cluster.circuit_breakers.thresholds(RoutingPriority::Default).unwrap().max_connections, Some(10));
        assert_eq!(cluster.circuit_breakers.thresholds(RoutingPriority::High).unwrap().max_retries, Some(9));
    }

    #[test]
    fn percent_out_of_range() {
        let yaml = r#"
name: backend
discovery: EDS
discovery_settings: {}
maintenance_mode_percent: 101
"#;
        assert!(deserialize_yaml_str::<Cluster>(yaml).is_err());
    }

    #[test]
    fn simplified_roundtrip() {
        let cluster = Cluster {
            name: "backend".into(),
            discovery_settings: ClusterDiscoveryType::Static(ClusterLoadAssignment {
                endpoints: vec![LocalityLbEndpoints {
                    locality: Locality::default(),
                    lb_endpoints: vec![LbEndpoint::new("127.0.0.1:9000".parse().unwrap())],
                }],
            }),
            connect_timeout: None,
            per_connection_buffer_limit_bytes: None,
            load_balancing_policy: LbPolicy::default(),
            http_protocol_options: HttpProtocolOptions::default(),
            max_requests_per_connection: 0,
            circuit_breakers: CircuitBreakers::default(),
            maintenance_mode_percent: Percent::default(),
            source_address: None,
        };
        let yaml = serde_yaml::to_string(&cluster).unwrap();
        let back: Cluster = deserialize_yaml_str(&yaml).unwrap();
        assert_eq!(back, cluster);
    }
}
