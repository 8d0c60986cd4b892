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

use std::{
    fmt,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc,
    },
};

use compact_str::{format_compact, CompactString};
use orion_configuration::config::Locality;
use orion_metrics::{Counter, Gauge, Scope};
use tracing::warn;
use typed_builder::TypedBuilder;

use super::{
    cluster_info::ClusterInfo,
    health::{DetectorHostMonitor, HealthCheckHostMonitor, HealthFlag, HealthFlags},
    stats::HostStats,
};
use crate::{
    transport::{ClientConnection, ConnectionFactory, Dispatcher, TcpConnectionFactory},
    Error, Result,
};

pub const MIN_WEIGHT: u32 = 1;
pub const MAX_WEIGHT: u32 = 100;

/// The immutable identity of an upstream endpoint.
#[derive(Clone)]
pub struct HostDescription {
    cluster: Arc<ClusterInfo>,
    address: SocketAddr,
    hostname: CompactString,
    locality: Locality,
    stats_scope: Scope,
    stats: HostStats,
}

impl fmt::Debug for HostDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostDescription")
            .field("cluster", &self.cluster.name())
            .field("address", &self.address)
            .field("hostname", &self.hostname)
            .field("locality", &self.locality)
            .finish()
    }
}

impl HostDescription {
    /// Host stats live under `host.<address>.` in the cluster scope. A host re-added at the same address picks
    /// up the stats of its predecessor.
    pub fn new(cluster: Arc<ClusterInfo>, address: SocketAddr, hostname: CompactString, locality: Locality) -> Self {
        let stats_scope = cluster.stats_scope().create_scope(&format_compact!("host.{address}"));
        let exported = stats_scope.find("cx_total").is_some();
        let stats = HostStats::new(&stats_scope);
        if !exported {
            orion_metrics::export_scope(&stats_scope);
        }
        Self { cluster, address, hostname, locality, stats_scope, stats }
    }

    /// A description of another endpoint standing in for this one. Stats are shared with `self`.
    pub fn with_address(&self, address: SocketAddr) -> Self {
        Self { address, ..self.clone() }
    }

    pub fn cluster(&self) -> &Arc<ClusterInfo> {
        &self.cluster
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn locality(&self) -> &Locality {
        &self.locality
    }

    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    pub fn stats_scope(&self) -> &Scope {
        &self.stats_scope
    }

    /// Stat names are relative to the host scope.
    pub fn counters(&self) -> Vec<(CompactString, Counter)> {
        self.relative(self.stats_scope.counters())
    }

    pub fn gauges(&self) -> Vec<(CompactString, Gauge)> {
        self.relative(self.stats_scope.gauges())
    }

    fn relative<T>(&self, stats: Vec<(CompactString, T)>) -> Vec<(CompactString, T)> {
        let prefix = self.stats_scope.prefix();
        stats
            .into_iter()
            .map(|(name, stat)| (name.strip_prefix(prefix).map(CompactString::from).unwrap_or(name), stat))
            .collect()
    }
}

/// What [`Host::create_connection`] hands back: the pending connection and the endpoint it actually goes to.
#[derive(Debug)]
pub struct CreateConnectionData {
    pub connection: ClientConnection,
    pub host_description: Arc<HostDescription>,
}

/// One upstream endpoint of a cluster.
///
/// Health, weight and the in-use mark can change at any time from any thread. Monitors can only be installed
/// while the host is still exclusively owned, that is before it gets published in a host set.
pub struct Host {
    description: Arc<HostDescription>,
    health_flags: HealthFlags,
    weight: AtomicU32,
    used: AtomicBool,
    connection_factory: Arc<dyn ConnectionFactory>,
    health_checker: Option<Arc<dyn HealthCheckHostMonitor>>,
    outlier_detector: Option<Arc<dyn DetectorHostMonitor>>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("address", &self.description.address)
            .field("locality", &self.description.locality)
            .field("health_flags", &self.health_flags.bits())
            .field("weight", &self.weight())
            .field("connection_factory", &self.connection_factory)
            .finish_non_exhaustive()
    }
}

fn default_connection_factory() -> Arc<dyn ConnectionFactory> {
    Arc::new(TcpConnectionFactory)
}

fn check_weight(weight: u32) -> Result<u32> {
    if (MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
        Ok(weight)
    } else {
        Err(Error::InvalidWeight(weight))
    }
}

#[derive(TypedBuilder)]
#[builder(build_method(name = prepare), field_defaults(setter(prefix = "with_")))]
pub struct HostBuilder {
    cluster: Arc<ClusterInfo>,
    address: SocketAddr,
    #[builder(default)]
    hostname: CompactString,
    #[builder(default)]
    locality: Locality,
    #[builder(default = MIN_WEIGHT)]
    weight: u32,
    #[builder(default)]
    health_flags: HealthFlag,
    #[builder(default = default_connection_factory())]
    connection_factory: Arc<dyn ConnectionFactory>,
}

impl HostBuilder {
    pub fn build(self) -> Result<Host> {
        let HostBuilder { cluster, address, hostname, locality, weight, health_flags, connection_factory } = self;
        let weight = check_weight(weight)?;
        Ok(Host {
            description: Arc::new(HostDescription::new(cluster, address, hostname, locality)),
            health_flags: HealthFlags::new(health_flags),
            weight: AtomicU32::new(weight),
            used: AtomicBool::new(false),
            connection_factory,
            health_checker: None,
            outlier_detector: None,
        })
    }
}

impl Host {
    /// Starts connecting to this host on `dispatcher`. Never blocks; failures show up on the returned connection.
    pub fn create_connection(&self, dispatcher: &Dispatcher) -> CreateConnectionData {
        self.connection_factory.create_connection(dispatcher, &self.description)
    }

    pub fn description(&self) -> &Arc<HostDescription> {
        &self.description
    }

    pub fn address(&self) -> SocketAddr {
        self.description.address
    }

    pub fn hostname(&self) -> &str {
        self.description.hostname()
    }

    pub fn locality(&self) -> &Locality {
        &self.description.locality
    }

    pub fn cluster(&self) -> &Arc<ClusterInfo> {
        &self.description.cluster
    }

    pub fn stats(&self) -> &HostStats {
        &self.description.stats
    }

    /// The host's counters, sorted by name.
    pub fn counters(&self) -> Vec<(CompactString, Counter)> {
        self.description.counters()
    }

    pub fn gauges(&self) -> Vec<(CompactString, Gauge)> {
        self.description.gauges()
    }

    pub fn health_flag_set(&self, flag: HealthFlag) {
        self.health_flags.set(flag);
    }

    pub fn health_flag_clear(&self, flag: HealthFlag) {
        self.health_flags.clear(flag);
    }

    pub fn health_flag_get(&self, flag: HealthFlag) -> bool {
        self.health_flags.get(flag)
    }

    pub fn healthy(&self) -> bool {
        self.health_flags.healthy()
    }

    pub fn weight(&self) -> u32 {
        self.weight.load(Ordering::Relaxed)
    }

    pub fn set_weight(&self, weight: u32) -> Result<()> {
        match check_weight(weight) {
            Ok(weight) => {
                self.weight.store(weight, Ordering::Relaxed);
                Ok(())
            },
            Err(err) => {
                warn!("host {} in cluster {}: rejected weight {weight}", self.address(), self.cluster().name());
                Err(err)
            },
        }
    }

    /// Adopts the weight of a host built from the same endpoint. Built hosts always carry a weight in range.
    pub(crate) fn take_weight_from(&self, other: &Host) {
        self.weight.store(other.weight(), Ordering::Relaxed);
    }

    pub fn used(&self) -> bool {
        self.used.load(Ordering::Relaxed)
    }

    pub fn set_used(&self, used: bool) {
        self.used.store(used, Ordering::Relaxed);
    }

    pub fn health_checker(&self) -> Option<&dyn HealthCheckHostMonitor> {
        self.health_checker.as_deref()
    }

    pub fn set_health_checker(&mut self, monitor: Arc<dyn HealthCheckHostMonitor>) {
        self.health_checker = Some(monitor);
    }

    pub fn outlier_detector(&self) -> Option<&dyn DetectorHostMonitor> {
        self.outlier_detector.as_deref()
    }

    pub fn set_outlier_detector(&mut self, monitor: Arc<dyn DetectorHostMonitor>) {
        self.outlier_detector = Some(monitor);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clusters::cluster_info::tests::cluster_info;
    use orion_metrics::Stat;
    use std::{
        sync::atomic::AtomicUsize,
        time::{Duration, Instant},
    };
    use tracing_test::traced_test;

    pub(crate) fn test_cluster() -> Arc<ClusterInfo> {
        Arc::new(cluster_info("{ name: test, discovery: EDS, discovery_settings: {} }"))
    }

    pub(crate) fn host_in(cluster: &Arc<ClusterInfo>, address: &str, locality: Locality) -> Host {
        HostBuilder::builder()
            .with_cluster(Arc::clone(cluster))
            .with_address(address.parse().unwrap())
            .with_locality(locality)
            .prepare()
            .build()
            .unwrap()
    }

    #[test]
    fn weight_bounds() {
        let host = host_in(&test_cluster(), "10.0.0.1:80", Locality::default());
        assert_eq!(host.weight(), 1);
        assert!(host.set_weight(100).is_ok());
        assert_eq!(host.weight(), 100);
        assert!(matches!(host.set_weight(0), Err(Error::InvalidWeight(0))));
        assert!(matches!(host.set_weight(101), Err(Error::InvalidWeight(101))));
        assert_eq!(host.weight(), 100);
        assert!(host.set_weight(1).is_ok());
        assert_eq!(host.weight(), 1);
    }

    #[test]
    #[traced_test]
    fn rejected_weight_is_logged() {
        let host = host_in(&test_cluster(), "10.0.0.1:80", Locality::default());
        let err = host.set_weight(0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        assert!(logs_contain("rejected weight 0"));
    }

    #[test]
    fn builder_rejects_bad_weight() {
        let result = HostBuilder::builder()
            .with_cluster(test_cluster())
            .with_address("10.0.0.1:80".parse().unwrap())
            .with_weight(0)
            .prepare()
            .build();
        assert!(matches!(result, Err(Error::InvalidWeight(0))));
    }

    #[test]
    fn health_follows_flags() {
        let host = HostBuilder::builder()
            .with_cluster(test_cluster())
            .with_address("10.0.0.1:80".parse().unwrap())
            .with_health_flags(HealthFlag::FAILED_ACTIVE_HC)
            .prepare()
            .build()
            .unwrap();
        assert!(!host.healthy());
        host.health_flag_set(HealthFlag::FAILED_OUTLIER_CHECK);
        host.health_flag_clear(HealthFlag::FAILED_ACTIVE_HC);
        assert!(!host.healthy());
        assert!(host.health_flag_get(HealthFlag::FAILED_OUTLIER_CHECK));
        host.health_flag_clear(HealthFlag::FAILED_OUTLIER_CHECK);
        assert!(host.healthy());
    }

    #[test]
    fn used_mark() {
        let host = host_in(&test_cluster(), "10.0.0.1:80", Locality::default());
        assert!(!host.used());
        host.set_used(true);
        assert!(host.used());
    }

    #[derive(Default)]
    struct CountingChecker(AtomicUsize);

    impl HealthCheckHostMonitor for CountingChecker {
        fn set_unhealthy(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct FixedDetector(Instant);

    impl DetectorHostMonitor for FixedDetector {
        fn num_ejections(&self) -> u32 {
            2
        }
        fn put_http_response_code(&self, _code: u16) {}
        fn put_response_time(&self, _time: Duration) {}
        fn last_ejection_time(&self) -> Option<Instant> {
            Some(self.0)
        }
    }

    #[test]
    fn monitors() {
        let mut host = host_in(&test_cluster(), "10.0.0.1:80", Locality::default());
        assert!(host.health_checker().is_none());
        assert!(host.outlier_detector().is_none());

        let checker = Arc::new(CountingChecker::default());
        host.set_health_checker(checker.clone());
        let ejected_at = Instant::now();
        host.set_outlier_detector(Arc::new(FixedDetector(ejected_at)));

        let host = Arc::new(host);
        host.health_checker().unwrap().set_unhealthy();
        assert_eq!(checker.0.load(Ordering::Relaxed), 1);
        let detector = host.outlier_detector().unwrap();
        assert_eq!(detector.num_ejections(), 2);
        assert_eq!(detector.last_ejection_time(), Some(ejected_at));
    }

    #[test]
    fn stats_are_sorted() {
        let host = host_in(&test_cluster(), "10.0.0.1:80", Locality::default());
        host.stats().rq_total.inc();
        let counters: Vec<(String, u64)> =
            host.counters().into_iter().map(|(name, c)| (name.to_string(), c.value())).collect();
        let expected: Vec<(String, u64)> = [("cx_connect_fail", 0), ("cx_total", 0), ("rq_timeout", 0), ("rq_total", 1)]
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value))
            .collect();
        assert_eq!(counters, expected);
        let gauges: Vec<_> = host.gauges().into_iter().map(|(name, _)| name.to_string()).collect();
        assert_eq!(gauges, vec!["cx_active", "rq_active"]);
    }

    #[test]
    fn stats_are_registered_under_cluster_scope() {
        let cluster = test_cluster();
        let host = host_in(&cluster, "10.0.0.1:80", Locality::default());
        host.stats().cx_total.inc();
        assert_eq!(host.description().stats_scope().prefix(), "cluster.test.host.10.0.0.1:80.");
        let Some(Stat::Counter(counter)) = cluster.stats_scope().find("host.10.0.0.1:80.cx_total") else {
            panic!("host counter missing from cluster scope");
        };
        assert_eq!(counter.value(), 1);

        let readded = host_in(&cluster, "10.0.0.1:80", Locality::default());
        assert_eq!(readded.stats().cx_total.value(), 1);
        let other = host_in(&cluster, "10.0.0.2:80", Locality::default());
        assert_eq!(other.stats().cx_total.value(), 0);
    }

    #[test]
    fn weight_is_taken_from_rebuilt_host() {
        let cluster = test_cluster();
        let host = host_in(&cluster, "10.0.0.1:80", Locality::default());
        let rebuilt = HostBuilder::builder()
            .with_cluster(Arc::clone(&cluster))
            .with_address("10.0.0.1:80".parse().unwrap())
            .with_weight(7)
            .prepare()
            .build()
            .unwrap();
        host.take_weight_from(&rebuilt);
        assert_eq!(host.weight(), 7);
    }

    #[test]
    fn alternate_address_shares_stats() {
        let host = host_in(&test_cluster(), "10.0.0.1:80", Locality::new("r", "z", ""));
        let other = host.description().with_address("10.0.0.2:80".parse().unwrap());
        other.stats().cx_total.inc();
        assert_eq!(other.address(), "10.0.0.2:80".parse::<SocketAddr>().unwrap());
        assert_eq!(other.locality(), host.locality());
        assert_eq!(host.stats().cx_total.value(), 1);
    }
}
