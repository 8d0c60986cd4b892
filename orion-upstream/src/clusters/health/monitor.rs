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
    sync::Arc,
    time::{Duration, Instant},
};

use crate::clusters::host::Host;

/// Per-host handle of an active health checker.
pub trait HealthCheckHostMonitor: Send + Sync {
    /// Marks the host unhealthy. The checker may apply the change asynchronously.
    fn set_unhealthy(&self);
}

/// Per-host handle of an outlier detector, fed with the results of requests sent to the host.
pub trait DetectorHostMonitor: Send + Sync {
    fn num_ejections(&self) -> u32;
    fn put_http_response_code(&self, code: u16);
    fn put_response_time(&self, time: Duration);
    /// `None` if the host was never ejected.
    fn last_ejection_time(&self) -> Option<Instant>;
}

pub type ChangeStateCb = Box<dyn Fn(&Arc<Host>) + Send + Sync>;

/// Cluster-wide outlier detector.
pub trait OutlierDetector: Send + Sync {
    /// Registers a callback invoked whenever a host is ejected or brought back.
    fn add_changed_state_cb(&self, cb: ChangeStateCb);
    fn success_rate_average(&self) -> f64;
    fn success_rate_ejection_threshold(&self) -> f64;
}
