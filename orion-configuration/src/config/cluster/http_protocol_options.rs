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

use crate::config::common::is_default;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Codec {
    #[default]
    Http1,
    Http2,
}

impl Codec {
    pub fn is_http1(&self) -> bool {
        matches!(self, Self::Http1)
    }
    pub fn is_http2(&self) -> bool {
        matches!(self, Self::Http2)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct HttpProtocolOptions {
    #[serde(skip_serializing_if = "is_default", default)]
    pub codec: Codec,
    #[serde(skip_serializing_if = "is_default", default)]
    pub http2_options: Http2ProtocolOptions,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Http2ProtocolOptions {
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub hpack_table_size: Option<u32>,
    // h2 says 0 is valid, upstream connections need at least one stream
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub max_concurrent_streams: Option<NonZeroU32>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub initial_stream_window_size: Option<NonZeroU32>,
    #[serde(skip_serializing_if = "Option::is_none", default = "Default::default")]
    pub initial_connection_window_size: Option<NonZeroU32>,
}

impl Http2ProtocolOptions {
    pub const DEFAULT_HPACK_TABLE_SIZE: u32 = 4096;
    pub const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 2_147_483_647;
    pub const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 268_435_456;

    pub fn hpack_table_size(&self) -> u32 {
        self.hpack_table_size.unwrap_or(Self::DEFAULT_HPACK_TABLE_SIZE)
    }
    pub fn max_concurrent_streams(&self) -> u32 {
        self.max_concurrent_streams.map_or(Self::DEFAULT_MAX_CONCURRENT_STREAMS, u32::from)
    }
    pub fn initial_stream_window_size(&self) -> u32 {
        self.initial_stream_window_size.map_or(Self::DEFAULT_INITIAL_WINDOW_SIZE, u32::from)
    }
    pub fn initial_connection_window_size(&self) -> u32 {
        self.initial_connection_window_size.map_or(Self::DEFAULT_INITIAL_WINDOW_SIZE, u32::from)
    }
}
