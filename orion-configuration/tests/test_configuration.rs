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

use orion_configuration::{
    config::{
        cluster::{ClusterDiscoveryType, HealthStatus, LbPolicy, RoutingPriority},
        deserialize_yaml, Config, Locality,
    },
    Error,
};
use std::{path::PathBuf, time::Duration};

#[test]
fn full_config() {
    let cfg = Config::new(&PathBuf::from("tests/clusters.yaml")).unwrap();
    assert_eq!(cfg.local_locality, Some(Locality::new("eu-west", "eu-west-1a", "")));
    assert_eq!(cfg.clusters.len(), 3);

    let xds = cfg.cluster("xds").unwrap();
    assert_eq!(xds.connect_timeout(), Duration::from_secs(1));
    assert!(xds.http_protocol_options.codec.is_http2());
    assert_eq!(xds.http_protocol_options.http2_options.max_concurrent_streams(), 100);

    let backend = cfg.cluster("backend").unwrap();
    assert_eq!(backend.load_balancing_policy, LbPolicy::LeastRequest);
    assert_eq!(backend.maintenance_mode_percent.value(), 5);
    assert_eq!(backend.max_requests_per_connection, 1000);
    assert_eq!(backend.source_address, Some("127.0.0.1:0".parse::<std::net::SocketAddr>().unwrap()));
    assert_eq!(backend.circuit_breakers.thresholds(RoutingPriority::High).unwrap().max_connections, Some(128));
    let ClusterDiscoveryType::Static(assignment) = &backend.discovery_settings else {
        panic!("backend should be static");
    };
    assert_eq!(assignment.endpoints.len(), 2);
    let first = &assignment.endpoints[0].lb_endpoints;
    assert_eq!(first[0].load_balancing_weight.get(), 3);
    assert_eq!(first[1].health_status, HealthStatus::Unhealthy);
    assert_eq!(assignment.endpoints[1].locality.zone.as_str(), "eu-west-1b");

    let service = cfg.cluster("service").unwrap();
    let ClusterDiscoveryType::Eds(eds) = &service.discovery_settings else {
        panic!("service should be EDS");
    };
    assert_eq!(eds.eds_cluster.as_deref(), Some("xds"));
}

#[test]
fn bad_config() {
    let r: Result<Config, _> = deserialize_yaml(&PathBuf::from("tests/config_bad.yaml"));
    assert!(matches!(r, Err(Error::Yaml { .. })));
}

#[test]
fn missing_file() {
    let r = Config::new(&PathBuf::from("tests/does-not-exist.yaml"));
    assert!(matches!(r, Err(Error::Io(_))));
}
