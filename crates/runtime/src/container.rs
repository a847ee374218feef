// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The container runtime: owns the media-info dictionary, the current
//! track, a per-stream array of handles (each carrying a reorder buffer),
//! and the main I/O handle.

use crate::control;
use crate::error::{Result, RuntimeError};
use crate::handshake;
use crate::media_info::MediaInfo;
use gavf_codec::{chunk, read_dictionary, write_dictionary};
use gavf_core::message::names;
use gavf_core::{Dictionary, Message, StreamDescriptor, TrackDescriptor, Value};
use gavf_io::chunked::{self, PendingChunk};
use gavf_io::handle::IoHandle;
use gavf_pipeline::{ReorderBuffer, ReorderConfig};
use tokio::net::{UnixListener, UnixStream};

const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Negotiate one UNIX-domain socket per stream after `SELECT_TRACK`
    /// rather than multiplexing every stream over the main transport.
    pub separate_streams: bool,
    pub reorder: ReorderConfig,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self { separate_streams: false, reorder: ReorderConfig::default() }
    }
}

/// A single stream within the current track: its descriptor (enriched
/// with implicit metadata), its reorder buffer, and — in `SEPARATE_STREAMS`
/// mode — its own transport.
pub struct StreamHandle {
    pub id: i32,
    pub descriptor: StreamDescriptor,
    pub buffer: ReorderBuffer,
    pub io: Option<IoHandle>,
}

/// Minimal implicit-metadata lookup: mime type and human-readable codec
/// name derived from a compression codec id. Not a decoder registry —
/// just enough for a reader to render a label without one.
fn implicit_metadata_for(stream_type: gavf_core::StreamType, codec_id: Option<&str>) -> (Option<&'static str>, Option<&'static str>) {
    use gavf_core::StreamType as T;
    match (stream_type, codec_id) {
        (T::Video, Some("h264")) => (Some("video/h264"), Some("H.264/AVC")),
        (T::Video, Some("hevc")) => (Some("video/hevc"), Some("H.265/HEVC")),
        (T::Video, Some("vp9")) => (Some("video/vp9"), Some("VP9")),
        (T::Audio, Some("aac")) => (Some("audio/aac"), Some("MPEG-4 AAC")),
        (T::Audio, Some("opus")) => (Some("audio/opus"), Some("Opus")),
        (T::Audio, Some("mp3")) => (Some("audio/mpeg"), Some("MPEG-1 Layer III")),
        (T::Video, Some("none") | None) => (Some("video/x-raw"), Some("Raw video")),
        (T::Audio, Some("none") | None) => (Some("audio/x-raw"), Some("Raw audio (PCM)")),
        _ => (None, None),
    }
}

/// Raw PCM/video streams carry the host's byte order since they have no
/// container-level endian marker.
const fn host_endian() -> &'static str {
    if cfg!(target_endian = "big") {
        "big"
    } else {
        "little"
    }
}

fn inject_implicit_metadata(sd: &mut StreamDescriptor) {
    let Some(stream_type) = sd.stream_type() else { return };
    let ci = sd.compression();
    let (mime, long_name) = implicit_metadata_for(stream_type, ci.codec_id.as_deref());
    let is_raw = ci.codec_id.as_deref().is_none_or(|id| id == "none");
    let endian = is_raw.then(host_endian);
    sd.inject_implicit_metadata(mime, long_name, endian);
}

fn tmp_dir() -> String {
    std::env::var("TMPDIR")
        .or_else(|_| std::env::var("TEMP"))
        .or_else(|_| std::env::var("TMP"))
        .unwrap_or_else(|_| "/tmp".to_string())
}

fn stream_socket_path(stream_id: i32) -> String {
    format!("{}/streamkit-stream-{}-{}.sock", tmp_dir(), std::process::id(), stream_id)
}

pub struct ContainerRuntime {
    io: Option<IoHandle>,
    config: ContainerConfig,
    media_info: MediaInfo,
    current_track: Option<TrackDescriptor>,
    streams: Vec<StreamHandle>,
    pending_listeners: Vec<(i32, UnixListener)>,
}

impl ContainerRuntime {
    #[must_use]
    pub const fn media_info(&self) -> &MediaInfo {
        &self.media_info
    }

    #[must_use]
    pub const fn current_track(&self) -> Option<&TrackDescriptor> {
        self.current_track.as_ref()
    }

    #[must_use]
    pub fn streams(&self) -> &[StreamHandle] {
        &self.streams
    }

    pub fn stream_mut(&mut self, id: i32) -> Result<&mut StreamHandle> {
        self.streams.iter_mut().find(|s| s.id == id).ok_or(RuntimeError::UnknownStream(id))
    }

    /// Open a container for reading.
    ///
    /// - Disk: read the `GAVFPHDR` chunk directly.
    /// - Pipe/stdin: if the first thing on the wire is a `REDIRECT` request
    ///   line, close the pipe and recurse into the target URI.
    /// - Socket: issue `GET /path PROTO-GAVF/VERSION`, expect 200.
    pub async fn open_read(uri: &str, config: ContainerConfig) -> Result<Self> {
        let mut io = gavf_io::open_read(uri).await?;
        let caps = io.capabilities();

        if caps.is_pipe {
            let (method, path) = handshake::server_accept(&mut io).await?;
            if method != "REDIRECT" {
                return Err(RuntimeError::ExpectedRedirect);
            }
            io.close().await?;
            return Box::pin(Self::open_read(&path, config)).await;
        }

        let media_info = if caps.is_socket {
            let status = handshake::client_request(&mut io, "GET", "/", PROTOCOL_VERSION).await?;
            if status != 200 {
                return Err(RuntimeError::Handshake(format!("GET rejected with status {status}")));
            }
            let msg = control::skip_to_message(&mut io).await?;
            media_info_from_message(&msg)?
        } else {
            read_program_header(&mut io).await?
        };

        Ok(Self {
            io: Some(io),
            config,
            media_info,
            current_track: None,
            streams: Vec::new(),
            pending_listeners: Vec::new(),
        })
    }

    /// Open a container for writing; symmetric to `open_read` (`PUT`
    /// expects `100`, pipe writers send the `REDIRECT`).
    pub async fn open_write(uri: &str, media_info: MediaInfo, config: ContainerConfig) -> Result<Self> {
        let mut io = gavf_io::open_write(uri).await?;
        let caps = io.capabilities();

        let io = if caps.is_pipe {
            let socket_path = stream_socket_path(0);
            let redirect_uri = format!("gavf-unix://{socket_path}");
            handshake::send_redirect(&mut io, &redirect_uri, PROTOCOL_VERSION).await?;
            io.close().await?;
            gavf_io::open_write(&format!("gavf-unixserv://{socket_path}")).await?
        } else {
            io
        };

        let caps = io.capabilities();
        let mut io = if caps.is_socket {
            let status = handshake::client_request(&mut io, "PUT", "/", PROTOCOL_VERSION).await?;
            if status != 100 && status != 200 {
                return Err(RuntimeError::Handshake(format!("PUT rejected with status {status}")));
            }
            io
        } else {
            io
        };

        if io.capabilities().is_socket || io.capabilities().is_pipe {
            control::send_message(&mut io, &Message::media_info(media_info.dictionary().clone())).await?;
        } else {
            write_program_header(&mut io, &media_info).await?;
        }

        Ok(Self { io: Some(io), config, media_info, current_track: None, streams: Vec::new(), pending_listeners: Vec::new() })
    }

    /// Reader-driven track switch (`SRC.SELECT_TRACK`): send the request,
    /// wait for the writer's `GAVF.SELECT_TRACK` response, then initialise
    /// streams (and connect per-stream sockets if negotiated).
    pub async fn select_track(&mut self, index: i32) -> Result<()> {
        let io = self.io.as_mut().ok_or(RuntimeError::MissingMediaInfo)?;
        control::send_message(io, &Message::select_track(index)).await?;
        let resp = control::skip_to_message(io).await?;
        let expected = format!("{}.{}", names::GAVF_SELECT_TRACK.0, names::GAVF_SELECT_TRACK.1);
        if resp.full_name() != expected {
            return Err(RuntimeError::Handshake(format!("expected GAVF.SELECT_TRACK, got {}", resp.full_name())));
        }
        let track = track_from_message(&resp)?;
        self.init_streams(track.clone());
        self.current_track = Some(track);

        if self.config.separate_streams {
            self.connect_stream_sockets().await?;
        }
        Ok(())
    }

    /// Writer-driven handling of an incoming `SRC.SELECT_TRACK`: stop
    /// playback (no-op here — playback itself is an external
    /// collaborator), copy the selected track, re-initialise streams,
    /// open per-stream sockets if negotiated, answer with the resolved
    /// track, then accept the per-stream connections.
    pub async fn handle_select_track(&mut self, index: i32) -> Result<()> {
        let track = self.media_info.track(index)?;
        self.init_streams(track.clone());
        self.current_track = Some(track.clone());

        if self.config.separate_streams {
            self.open_stream_sockets();
        }

        let io = self.io.as_mut().ok_or(RuntimeError::MissingMediaInfo)?;
        let resp = Message::new("GAVF", "SELECT_TRACK").with_args(vec![Value::Dictionary(track.dictionary().clone())]);
        control::send_message(io, &resp).await?;

        if self.config.separate_streams {
            self.accept_stream_sockets().await?;
        }
        Ok(())
    }

    /// Process exactly one control message addressed to the writer
    /// (`gavf_read_writer_command`'s Rust counterpart).
    pub async fn process_writer_command(&mut self) -> Result<()> {
        let io = self.io.as_mut().ok_or(RuntimeError::MissingMediaInfo)?;
        let msg = control::skip_to_message(io).await?;
        let select_track = format!("{}.{}", names::SRC_SELECT_TRACK.0, names::SRC_SELECT_TRACK.1);
        match msg.full_name() {
            name if name == select_track => {
                let index = msg.args.first().and_then(Value::as_int).ok_or_else(|| RuntimeError::Handshake("SELECT_TRACK missing track index".into()))?;
                self.handle_select_track(index).await?;
            }
            // SEEK/START/PAUSE/RESUME drive an external playback engine;
            // the runtime only demultiplexes them here.
            _ => tracing::debug!(message = %msg.full_name(), "unhandled writer command"),
        }
        Ok(())
    }

    fn init_streams(&mut self, track: TrackDescriptor) {
        self.streams = track
            .streams()
            .into_iter()
            .map(|mut sd| {
                inject_implicit_metadata(&mut sd);
                let id = sd.id().unwrap_or(gavf_core::track::FIRST_STREAM_ID);
                let buffer = ReorderBuffer::new(sd.clone(), self.config.reorder.clone());
                StreamHandle { id, descriptor: sd, buffer, io: None }
            })
            .collect();
    }

    /// Bind (but don't yet accept) one UNIX listener per stream, stamping
    /// its socket path into the stream's metadata so the response carries
    /// it to the reader.
    fn open_stream_sockets(&mut self) {
        self.pending_listeners.clear();
        for handle in &mut self.streams {
            let path = stream_socket_path(handle.id);
            let listener = match UnixListener::bind(&path) {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(stream = handle.id, error = %e, "failed to bind per-stream socket");
                    continue;
                }
            };
            let mut md = handle.descriptor.metadata();
            md.set_string("uri", format!("gavf-unix://{path}"));
            handle.descriptor.set_metadata(md);
            self.pending_listeners.push((handle.id, listener));
        }
    }

    async fn accept_stream_sockets(&mut self) -> Result<()> {
        let listeners = std::mem::take(&mut self.pending_listeners);
        for (id, listener) in listeners {
            let (stream, _addr) = listener.accept().await.map_err(gavf_io::IoError::Transport)?;
            if let Ok(handle) = self.stream_mut(id) {
                handle.io = Some(io_handle_from_unix_stream(stream));
            }
        }
        Ok(())
    }

    async fn connect_stream_sockets(&mut self) -> Result<()> {
        let paths: Vec<(i32, String)> =
            self.streams.iter().filter_map(|h| h.descriptor.metadata().get_string("uri").map(|u| (h.id, u.to_string()))).collect();
        for (id, uri) in paths {
            let path = uri.strip_prefix("gavf-unix://").unwrap_or(&uri);
            let stream = UnixStream::connect(path).await.map_err(gavf_io::IoError::Transport)?;
            if let Ok(handle) = self.stream_mut(id) {
                handle.io = Some(io_handle_from_unix_stream(stream));
            }
        }
        Ok(())
    }
}

fn io_handle_from_unix_stream(stream: UnixStream) -> IoHandle {
    IoHandle::new(Box::new(gavf_io::transport::unix::UnixIo::new(stream)), Dictionary::new())
}

async fn read_program_header(io: &mut IoHandle) -> Result<MediaInfo> {
    let header = chunked::read_chunk_header(io).await?;
    chunked::expect_tag(&header, chunk::TAG_PHDR)?;
    let payload = chunked::read_chunk_payload(io, &header).await?;
    let (dict, _) = read_dictionary(&payload)?;
    Ok(MediaInfo::from_dictionary(dict))
}

async fn write_program_header(io: &mut IoHandle, media_info: &MediaInfo) -> Result<()> {
    let mut pending = PendingChunk::new(chunk::TAG_PHDR);
    write_dictionary(pending.payload_mut(), media_info.dictionary());
    pending.commit(io).await?;
    io.flush().await?;
    Ok(())
}

fn media_info_from_message(msg: &Message) -> Result<MediaInfo> {
    let dict = msg.args.first().and_then(Value::as_dictionary).ok_or(RuntimeError::MissingMediaInfo)?;
    Ok(MediaInfo::from_dictionary(dict.clone()))
}

fn track_from_message(msg: &Message) -> Result<TrackDescriptor> {
    let dict = msg.args.first().and_then(Value::as_dictionary).ok_or_else(|| RuntimeError::Handshake("SELECT_TRACK response missing track dictionary".into()))?;
    Ok(TrackDescriptor::from_dictionary(dict.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavf_core::StreamType;

    #[tokio::test]
    async fn open_read_and_write_round_trip_a_disk_program_header() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gavf-runtime-test-{}.gavf", std::process::id()));
        let path_str = path.to_string_lossy().to_string();

        let mut mi = MediaInfo::new();
        let mut track = TrackDescriptor::new();
        track.add_stream(StreamDescriptor::new(StreamType::Audio, 0));
        mi.add_track(track);

        let runtime = ContainerRuntime::open_write(&path_str, mi, ContainerConfig::default()).await.unwrap();
        drop(runtime);

        let reader = ContainerRuntime::open_read(&path_str, ContainerConfig::default()).await.unwrap();
        assert_eq!(reader.media_info().num_tracks(), 1);
        assert_eq!(reader.media_info().track(0).unwrap().streams().len(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
