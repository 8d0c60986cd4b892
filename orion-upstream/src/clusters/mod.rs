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

pub(crate) mod callbacks;
pub mod cluster;
pub mod cluster_info;
pub mod health;
pub mod host;
pub mod host_set;
pub(crate) mod load_assignment;
pub mod loader;
pub mod resource_manager;
pub mod stats;

pub use callbacks::{CallbackHandle, MemberUpdateCb};
pub use load_assignment::ClusterLoadAssignmentBuilder;
