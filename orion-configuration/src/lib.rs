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

pub mod config;

use compact_str::CompactString;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read configuration")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize field \"{path}\"")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid value for \"{field}\": {reason}")]
    InvalidValue { field: &'static str, reason: CompactString },
}

impl From<serde_path_to_error::Error<serde_yaml::Error>> for Error {
    fn from(value: serde_path_to_error::Error<serde_yaml::Error>) -> Self {
        let path = value.path().to_string();
        Self::Yaml { path, source: value.into_inner() }
    }
}
