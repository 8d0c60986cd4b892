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

#[doc(hidden)]
#[macro_export]
macro_rules! __stat_type {
    (counter) => {
        $crate::Counter
    };
    (gauge) => {
        $crate::Gauge
    };
    (timer) => {
        $crate::Timer
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __stat_kind {
    (counter) => {
        $crate::StatKind::Counter
    };
    (gauge) => {
        $crate::StatKind::Gauge
    };
    (timer) => {
        $crate::StatKind::Timer
    };
}

/// Declares a stats table together with the struct holding its live handles.
///
/// ```ignore
/// stats_struct! {
///     pub struct ListenerStats, ALL_LISTENER_STATS {
///         counter downstream_cx_total,
///         gauge downstream_cx_active,
///         timer downstream_cx_length_ms,
///     }
/// }
/// ```
///
/// expands to `pub struct ListenerStats` with one public field per entry, a `pub const ALL_LISTENER_STATS:
/// &[StatDescriptor]` listing the names and kinds in declaration order, and `ListenerStats::new(&Scope)`
/// which creates (or looks up) every stat in the given scope.
#[macro_export]
macro_rules! stats_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident, $table:ident {
            $($kind:ident $stat:ident),* $(,)?
        }
    ) => {
        pub const $table: &[$crate::StatDescriptor] = &[
            $($crate::StatDescriptor::new(stringify!($stat), $crate::__stat_kind!($kind))),*
        ];

        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $(pub $stat: $crate::__stat_type!($kind)),*
        }

        impl $name {
            pub fn new(scope: &$crate::Scope) -> Self {
                Self { $($stat: scope.$kind(stringify!($stat))),* }
            }
        }
    };
}
