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

//! OpenTelemetry bridge. Stats stay in the [`Scope`] store; exporting only registers observable instruments
//! reading them on collection.

use crate::Scope;

pub const METER_NAME: &str = "orion.cluster";

#[cfg(feature = "metrics")]
pub fn export_scope(scope: &Scope) {
    use opentelemetry::global;
    use tracing::debug;

    let meter = global::meter(METER_NAME);
    for (name, counter) in scope.counters() {
        _ = meter
            .u64_observable_counter(name.to_string())
            .with_callback(move |observer| observer.observe(counter.value(), &[]))
            .build();
    }
    for (name, gauge) in scope.gauges() {
        _ = meter
            .u64_observable_gauge(name.to_string())
            .with_callback(move |observer| observer.observe(gauge.value(), &[]))
            .build();
    }
    for (name, timer) in scope.timers() {
        _ = meter
            .u64_observable_counter(format!("{name}.count"))
            .with_callback(move |observer| observer.observe(timer.count(), &[]))
            .build();
    }
    debug!("exported stats under scope '{}'", scope.prefix());
}

#[cfg(not(feature = "metrics"))]
pub fn export_scope(_scope: &Scope) {}
