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

mod monitor;

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

pub use monitor::{ChangeStateCb, DetectorHostMonitor, HealthCheckHostMonitor, OutlierDetector};

bitflags! {
    /// Reasons for a host to be considered unhealthy. A host is healthy when no flag is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HealthFlag: u32 {
        /// The host failed active health checking.
        const FAILED_ACTIVE_HC = 0x1;
        /// The host was ejected by outlier detection.
        const FAILED_OUTLIER_CHECK = 0x2;
    }
}

/// Lock-free health bitmask shared between the health checker, the outlier detector and readers.
#[derive(Debug, Default)]
pub struct HealthFlags(AtomicU32);

impl HealthFlags {
    pub fn new(initial: HealthFlag) -> Self {
        Self(AtomicU32::new(initial.bits()))
    }

    pub fn set(&self, flag: HealthFlag) {
        self.0.fetch_or(flag.bits(), Ordering::AcqRel);
    }

    pub fn clear(&self, flag: HealthFlag) {
        self.0.fetch_and(!flag.bits(), Ordering::AcqRel);
    }

    pub fn get(&self, flag: HealthFlag) -> bool {
        self.bits().contains(flag)
    }

    pub fn bits(&self) -> HealthFlag {
        HealthFlag::from_bits_retain(self.0.load(Ordering::Acquire))
    }

    pub fn healthy(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }
}
