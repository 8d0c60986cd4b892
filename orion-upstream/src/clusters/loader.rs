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

use std::collections::{HashMap, HashSet};

use compact_str::CompactString;
use orion_configuration::config::{
    cluster::{Cluster as ClusterConfig, ClusterDiscoveryType},
    Config,
};
use orion_metrics::Scope;
use tracing::{debug, info};

use super::cluster::{ClusterType, LoadContext};
use crate::{Error, Result};

/// Builds every configured cluster. Nothing is initialized yet; the caller drives `initialize` for the
/// primary clusters first and the secondary ones after.
pub fn load_clusters(config: &Config, scope: &Scope) -> Result<Vec<ClusterType>> {
    check_references(&config.clusters)?;
    let context = LoadContext { local_locality: config.local_locality.as_ref(), scope, added_via_api: false };
    let clusters = config
        .clusters
        .iter()
        .map(|cluster| ClusterType::try_from((cluster, &context)))
        .collect::<Result<Vec<_>>>()?;
    info!("loaded {} clusters", clusters.len());
    Ok(clusters)
}

fn eds_cluster(config: &ClusterConfig) -> Option<&CompactString> {
    match &config.discovery_settings {
        ClusterDiscoveryType::Eds(eds) => eds.eds_cluster.as_ref(),
        ClusterDiscoveryType::Static(_) => None,
    }
}

/// Rejects duplicate names and membership sources that are unknown or can't be up before their users.
fn check_references(clusters: &[ClusterConfig]) -> Result<()> {
    let mut seen = HashSet::with_capacity(clusters.len());
    for cluster in clusters {
        if !seen.insert(cluster.name.as_str()) {
            return Err(Error::DuplicateCluster(cluster.name.clone()));
        }
    }

    let primary: HashMap<&str, bool> =
        clusters.iter().map(|cluster| (cluster.name.as_str(), eds_cluster(cluster).is_none())).collect();
    for cluster in clusters {
        let Some(referenced) = eds_cluster(cluster) else {
            continue;
        };
        if primary.get(referenced.as_str()).copied() != Some(true) {
            return Err(Error::UnknownCluster { cluster: cluster.name.clone(), referenced: referenced.clone() });
        }
        debug!("cluster {} gets its membership through {referenced}", cluster.name);
    }
    Ok(())
}
