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
    fmt::Debug,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;

use super::{ClientConnection, Dispatcher};
use crate::clusters::host::{CreateConnectionData, HostDescription};

/// Opens connections on behalf of a host.
pub trait ConnectionFactory: Send + Sync + Debug {
    /// Starts connecting to the endpoint behind `host` and returns immediately. The returned description is the
    /// endpoint actually used, which may differ from `host`.
    fn create_connection(&self, dispatcher: &Dispatcher, host: &Arc<HostDescription>) -> CreateConnectionData;
}

/// Connects straight to the host's address.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnectionFactory;

impl ConnectionFactory for TcpConnectionFactory {
    fn create_connection(&self, dispatcher: &Dispatcher, host: &Arc<HostDescription>) -> CreateConnectionData {
        CreateConnectionData {
            connection: ClientConnection::connect(dispatcher, Arc::clone(host)),
            host_description: Arc::clone(host),
        }
    }
}

/// Connects to whatever addresses the name behind a logical host currently resolves to, rotating through
/// them on every connection.
#[derive(Debug)]
pub struct LogicalConnectionFactory {
    addresses: ArcSwap<Vec<SocketAddr>>,
    next: AtomicUsize,
}

impl LogicalConnectionFactory {
    pub fn new(addresses: Vec<SocketAddr>) -> Self {
        Self { addresses: ArcSwap::from_pointee(addresses), next: AtomicUsize::new(0) }
    }

    /// Replaces the resolved addresses. Connections already started are not affected.
    pub fn set_addresses(&self, addresses: Vec<SocketAddr>) {
        self.addresses.store(Arc::new(addresses));
    }

    pub fn addresses(&self) -> Arc<Vec<SocketAddr>> {
        self.addresses.load_full()
    }

    fn next_address(&self) -> Option<SocketAddr> {
        let addresses = self.addresses.load();
        if addresses.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % addresses.len();
        addresses.get(index).copied()
    }
}

impl ConnectionFactory for LogicalConnectionFactory {
    fn create_connection(&self, dispatcher: &Dispatcher, host: &Arc<HostDescription>) -> CreateConnectionData {
        let host_description = match self.next_address() {
            Some(address) if address != host.address() => Arc::new(host.with_address(address)),
            // nothing resolved yet, fall back to the address the host was created with
            _ => Arc::clone(host),
        };
        CreateConnectionData {
            connection: ClientConnection::connect(dispatcher, Arc::clone(&host_description)),
            host_description,
        }
    }
}
