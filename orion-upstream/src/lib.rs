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

pub mod clusters;
pub mod transport;

use compact_str::CompactString;

pub use clusters::{
    cluster::{ClusterOps, ClusterType, InitializePhase, InitializationState},
    cluster_info::{ClusterFeatures, ClusterInfo},
    health::{HealthFlag, HealthFlags},
    host::{CreateConnectionData, Host, HostBuilder, HostDescription},
    host_set::{HostSet, HostSetReader, HostSetSnapshot},
    loader::load_clusters,
};
pub use transport::Dispatcher;

pub type Result<T> = ::core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The configuration can never work as written. Never worth retrying.
    Configuration,
    InvalidArgument,
    /// The operation is not allowed in the current lifecycle state.
    InvalidState,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cluster \"{cluster}\" references unknown or non-primary cluster \"{referenced}\"")]
    UnknownCluster { cluster: CompactString, referenced: CompactString },
    #[error("cluster \"{0}\" is defined more than once")]
    DuplicateCluster(CompactString),
    #[error("host weight {0} is outside of 1..=100")]
    InvalidWeight(u32),
    #[error("cluster \"{0}\" has already been initialized")]
    AlreadyInitialized(CompactString),
    #[error(transparent)]
    Config(#[from] orion_configuration::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownCluster { .. } | Self::DuplicateCluster(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::InvalidWeight(_) => ErrorKind::InvalidArgument,
            Self::AlreadyInitialized(_) => ErrorKind::InvalidState,
        }
    }
}
