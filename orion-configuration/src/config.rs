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

pub mod cluster;
pub use cluster::Cluster;
pub mod common;
pub mod core;
pub use core::Locality;

pub use crate::config::common::*;
use crate::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs::File, path::Path};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Locality of this proxy instance. Hosts in the same locality are kept in the first slot of every
    /// per-locality host list.
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub local_locality: Option<Locality>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub clusters: Vec<Cluster>,
}

impl Config {
    pub fn new(path: &Path) -> Result<Self> {
        let config: Self = deserialize_yaml(path)?;
        tracing::debug!(clusters = config.clusters.len(), "loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        deserialize_yaml_str(yaml)
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }
}

pub fn deserialize_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    serde_path_to_error::deserialize(serde_yaml::Deserializer::from_reader(&file)).map_err(crate::Error::from)
}

pub fn deserialize_yaml_str<T: DeserializeOwned>(yaml: &str) -> Result<T> {
    serde_path_to_error::deserialize(serde_yaml::Deserializer::from_str(yaml)).map_err(crate::Error::from)
}
