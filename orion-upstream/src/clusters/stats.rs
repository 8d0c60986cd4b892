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

//! Stats emitted per cluster and per host. The names are part of the monitoring surface and must not change.

use orion_metrics::stats_struct;

stats_struct! {
    /// Stats of one cluster, created under the `cluster.<name>.` scope.
    pub struct ClusterStats, ALL_CLUSTER_STATS {
        counter lb_healthy_panic,
        counter lb_local_cluster_not_ok,
        counter lb_recalculate_zone_structures,
        counter lb_zone_cluster_too_small,
        counter lb_zone_no_capacity_left,
        counter lb_zone_number_differs,
        counter lb_zone_routing_all_directly,
        counter lb_zone_routing_sampled,
        counter lb_zone_routing_cross_zone,
        counter upstream_cx_total,
        gauge upstream_cx_active,
        counter upstream_cx_http1_total,
        counter upstream_cx_http2_total,
        counter upstream_cx_connect_fail,
        counter upstream_cx_connect_timeout,
        counter upstream_cx_overflow,
        timer upstream_cx_connect_ms,
        timer upstream_cx_length_ms,
        counter upstream_cx_destroy,
        counter upstream_cx_destroy_local,
        counter upstream_cx_destroy_remote,
        counter upstream_cx_destroy_with_active_rq,
        counter upstream_cx_destroy_local_with_active_rq,
        counter upstream_cx_destroy_remote_with_active_rq,
        counter upstream_cx_close_notify,
        counter upstream_cx_rx_bytes_total,
        gauge upstream_cx_rx_bytes_buffered,
        counter upstream_cx_tx_bytes_total,
        gauge upstream_cx_tx_bytes_buffered,
        counter upstream_cx_protocol_error,
        counter upstream_cx_max_requests,
        counter upstream_cx_none_healthy,
        counter upstream_rq_total,
        gauge upstream_rq_active,
        counter upstream_rq_pending_total,
        counter upstream_rq_pending_overflow,
        counter upstream_rq_pending_failure_eject,
        gauge upstream_rq_pending_active,
        counter upstream_rq_cancelled,
        counter upstream_rq_maintenance_mode,
        counter upstream_rq_timeout,
        counter upstream_rq_per_try_timeout,
        counter upstream_rq_rx_reset,
        counter upstream_rq_tx_reset,
        counter upstream_rq_retry,
        counter upstream_rq_retry_success,
        counter upstream_rq_retry_overflow,
        counter upstream_flow_control_paused_reading_total,
        counter upstream_flow_control_resumed_reading_total,
        counter upstream_flow_control_backed_up_total,
        counter upstream_flow_control_drained_total,
        counter bind_errors,
        gauge max_host_weight,
        counter membership_change,
        gauge membership_healthy,
        gauge membership_total,
        counter retry_or_shadow_abandoned,
        counter update_attempt,
        counter update_success,
        counter update_failure,
        counter update_empty,
    }
}

stats_struct! {
    /// Stats of one host.
    pub struct HostStats, ALL_HOST_STATS {
        counter cx_total,
        gauge cx_active,
        counter cx_connect_fail,
        counter rq_total,
        counter rq_timeout,
        gauge rq_active,
    }
}
