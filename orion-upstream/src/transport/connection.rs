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
    io,
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use pingora_timeout::fast_timeout::fast_timeout;
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::{TcpSocket, TcpStream},
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use super::Dispatcher;
use crate::clusters::host::HostDescription;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    ConnectFailure,
    ConnectTimeout,
    /// The socket could not be bound to the cluster's source address.
    BindError,
    LocalClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Closed(CloseReason),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to bind to source address {address}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connection closed before it was established")]
    Closed,
}

impl ConnectError {
    pub fn close_reason(&self) -> CloseReason {
        match self {
            Self::Io(_) => CloseReason::ConnectFailure,
            Self::Timeout(_) => CloseReason::ConnectTimeout,
            Self::Bind { .. } => CloseReason::BindError,
            Self::Closed => CloseReason::LocalClose,
        }
    }
}

/// Handle to a connection being established in the background.
///
/// Creating the handle never blocks and never fails. The outcome is reported through [`ClientConnection::state`]
/// and [`ClientConnection::into_stream`].
#[derive(Debug)]
pub struct ClientConnection {
    id: u64,
    host: Arc<HostDescription>,
    state: watch::Receiver<ConnectionState>,
    stream: oneshot::Receiver<Result<UpstreamStream, ConnectError>>,
    task: JoinHandle<()>,
}

impl ClientConnection {
    pub(crate) fn connect(dispatcher: &Dispatcher, host: Arc<HostDescription>) -> Self {
        let id = dispatcher.next_connection_id();
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let (stream_tx, stream) = oneshot::channel();
        host.cluster().stats().upstream_cx_total.inc();
        host.stats().cx_total.inc();
        debug!("connection {id}: connecting to {} in cluster {}", host.address(), host.cluster().name());
        let task = dispatcher.spawn(connect_task(id, Arc::clone(&host), state_tx, stream_tx));
        Self { id, host, state, stream, task }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The endpoint this connection goes to.
    pub fn host(&self) -> &Arc<HostDescription> {
        &self.host
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Waits until the connection leaves [`ConnectionState::Connecting`].
    pub async fn wait_for_state_change(&mut self) -> ConnectionState {
        match self.state.wait_for(|state| *state != ConnectionState::Connecting).await {
            Ok(state) => *state,
            Err(_) => ConnectionState::Closed(CloseReason::LocalClose),
        }
    }

    pub async fn into_stream(self) -> Result<UpstreamStream, ConnectError> {
        self.stream.await.unwrap_or(Err(ConnectError::Closed))
    }

    /// Abandons the connection attempt.
    pub fn close(self) {
        debug!("connection {}: closed locally", self.id);
        self.task.abort();
    }
}

async fn connect_task(
    id: u64,
    host: Arc<HostDescription>,
    state_tx: watch::Sender<ConnectionState>,
    stream_tx: oneshot::Sender<Result<UpstreamStream, ConnectError>>,
) {
    let started = Instant::now();
    let cluster = Arc::clone(host.cluster());
    let result = match open_stream(&host).await {
        Ok(stream) => {
            cluster.stats().upstream_cx_connect_ms.record(started.elapsed());
            debug!("connection {id}: connected to {}", host.address());
            let stream = UpstreamStream::new(stream, host);
            let _ = state_tx.send(ConnectionState::Connected);
            Ok(stream)
        },
        Err(err) => {
            let reason = err.close_reason();
            match reason {
                CloseReason::ConnectTimeout => cluster.stats().upstream_cx_connect_timeout.inc(),
                CloseReason::BindError => cluster.stats().bind_errors.inc(),
                CloseReason::ConnectFailure | CloseReason::LocalClose => cluster.stats().upstream_cx_connect_fail.inc(),
            }
            host.stats().cx_connect_fail.inc();
            warn!("connection {id}: failed to connect to {} in cluster {}: {err}", host.address(), cluster.name());
            let _ = state_tx.send(ConnectionState::Closed(reason));
            Err(err)
        },
    };
    // the handle may be gone already, in which case the stream is dropped here
    let _ = stream_tx.send(result);
}

async fn open_stream(host: &HostDescription) -> Result<TcpStream, ConnectError> {
    let address = host.address();
    let cluster = host.cluster();
    let socket = if address.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    if let Some(source_address) = cluster.source_address() {
        socket.bind(source_address).map_err(|source| ConnectError::Bind { address: source_address, source })?;
    }
    let timeout = cluster.connect_timeout();
    let stream = fast_timeout(timeout, socket.connect(address)).await.map_err(|_| ConnectError::Timeout(timeout))??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// An established upstream connection. Keeps the connection gauges of its host and cluster up to date and
/// accounts the bytes going through it.
#[derive(Debug)]
pub struct UpstreamStream {
    stream: TcpStream,
    host: Arc<HostDescription>,
    established: Instant,
    remote_closed: bool,
}

impl UpstreamStream {
    fn new(stream: TcpStream, host: Arc<HostDescription>) -> Self {
        host.cluster().stats().upstream_cx_active.inc();
        host.stats().cx_active.inc();
        Self { stream, host, established: Instant::now(), remote_closed: false }
    }

    pub fn host(&self) -> &Arc<HostDescription> {
        &self.host
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }
}

impl Drop for UpstreamStream {
    fn drop(&mut self) {
        let stats = self.host.cluster().stats();
        stats.upstream_cx_active.dec();
        stats.upstream_cx_destroy.inc();
        if self.remote_closed {
            stats.upstream_cx_destroy_remote.inc();
        } else {
            stats.upstream_cx_destroy_local.inc();
        }
        stats.upstream_cx_length_ms.record(self.established.elapsed());
        self.host.stats().cx_active.dec();
    }
}

impl AsyncRead for UpstreamStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let filled = buf.filled().len();
        let poll = Pin::new(&mut this.stream).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - filled;
            if read == 0 && buf.remaining() > 0 {
                this.remote_closed = true;
            }
            this.host.cluster().stats().upstream_cx_rx_bytes_total.add(read as u64);
        }
        poll
    }
}

impl AsyncWrite for UpstreamStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.stream).poll_write(cx, buf);
        if let Poll::Ready(Ok(written)) = &poll {
            this.host.cluster().stats().upstream_cx_tx_bytes_total.add(*written as u64);
        }
        poll
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}
