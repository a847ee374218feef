// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Transport URI parsing and dispatch.

use crate::error::{IoError, Result};
use crate::handle::{descriptor_keys, IoHandle};
use crate::transport::{file, pipe, stdio, tcp, unix};
use gavf_core::Dictionary;

/// A parsed transport URI, before a connection/open attempt has been made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportUri {
    TcpClient { host: String, port: u16, path: String },
    TcpServer { host: String, port: u16, path: String },
    UnixClient { path: String },
    UnixServer { path: String },
    /// `|command args`
    PipeWrite { command: String, args: Vec<String> },
    /// `<command args`
    PipeRead { command: String, args: Vec<String> },
    Stdio,
    File { path: String },
}

fn split_command(rest: &str) -> (String, Vec<String>) {
    let mut parts = rest.split_whitespace();
    let command = parts.next().unwrap_or_default().to_string();
    let args = parts.map(str::to_string).collect();
    (command, args)
}

fn split_host_port_path(rest: &str) -> Result<(String, u16, String)> {
    let (authority, path) = rest.split_once('/').map_or((rest, ""), |(a, p)| (a, p));
    let (host, port) = authority
        .rsplit_once(':')
        .ok_or_else(|| IoError::UnsupportedUri(format!("missing port in {rest:?}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| IoError::UnsupportedUri(format!("invalid port in {rest:?}")))?;
    Ok((host.to_string(), port, format!("/{path}")))
}

impl TransportUri {
    /// Parse a URI into its transport kind and connection parameters.
    pub fn parse(uri: &str) -> Result<Self> {
        if uri == "-" {
            return Ok(Self::Stdio);
        }
        if let Some(rest) = uri.strip_prefix('|') {
            let (command, args) = split_command(rest.trim());
            return Ok(Self::PipeWrite { command, args });
        }
        if let Some(rest) = uri.strip_prefix('<') {
            let (command, args) = split_command(rest.trim());
            return Ok(Self::PipeRead { command, args });
        }
        if let Some(rest) = uri.strip_prefix("gavf-tcpserv://") {
            let (host, port, path) = split_host_port_path(rest)?;
            return Ok(Self::TcpServer { host, port, path });
        }
        if let Some(rest) = uri.strip_prefix("gavf-unixserv://") {
            return Ok(Self::UnixServer { path: rest.to_string() });
        }
        if let Some(rest) = uri.strip_prefix("gavf-unix://") {
            return Ok(Self::UnixClient { path: rest.to_string() });
        }
        if let Some(rest) = uri.strip_prefix("gavf://") {
            let (host, port, path) = split_host_port_path(rest)?;
            return Ok(Self::TcpClient { host, port, path });
        }
        Ok(Self::File { path: uri.to_string() })
    }
}

fn descriptor_for(uri: &str) -> Dictionary {
    let mut d = Dictionary::new();
    d.set_string(descriptor_keys::URI, uri);
    d
}

/// Open `uri` for reading.
pub async fn open_read(uri: &str) -> Result<IoHandle> {
    let parsed = TransportUri::parse(uri)?;
    let descriptor = descriptor_for(uri);
    match parsed {
        TransportUri::File { path } => {
            let f = tokio::fs::File::open(&path).await?;
            Ok(IoHandle::new(Box::new(file::FileIo::new(f)), descriptor))
        }
        TransportUri::Stdio => Ok(IoHandle::new(Box::new(stdio::StdinIo::new()), descriptor)),
        TransportUri::TcpClient { host, port, .. } => {
            let io = tcp::TcpIo::connect(&host, port).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::TcpServer { host, port, .. } => {
            let io = tcp::TcpIo::accept_once(&host, port).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::UnixClient { path } => {
            let io = unix::UnixIo::connect(&path).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::UnixServer { path } => {
            let io = unix::UnixIo::accept_once(&path).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::PipeRead { command, args } => {
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let io = pipe::PipeReadIo::spawn(&command, &arg_refs)?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::PipeWrite { .. } => Err(IoError::UnsupportedUri(format!("{uri} is a write-direction transport"))),
    }
}

/// Open `uri` for writing.
pub async fn open_write(uri: &str) -> Result<IoHandle> {
    let parsed = TransportUri::parse(uri)?;
    let descriptor = descriptor_for(uri);
    match parsed {
        TransportUri::File { path } => {
            let f = tokio::fs::File::create(&path).await?;
            Ok(IoHandle::new(Box::new(file::FileIo::new(f)), descriptor))
        }
        TransportUri::Stdio => Ok(IoHandle::new(Box::new(stdio::StdoutIo::new()?), descriptor)),
        TransportUri::TcpClient { host, port, .. } => {
            let io = tcp::TcpIo::connect(&host, port).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::TcpServer { host, port, .. } => {
            let io = tcp::TcpIo::accept_once(&host, port).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::UnixClient { path } => {
            let io = unix::UnixIo::connect(&path).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::UnixServer { path } => {
            let io = unix::UnixIo::accept_once(&path).await?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::PipeWrite { command, args } => {
            let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
            let io = pipe::PipeWriteIo::spawn(&command, &arg_refs)?;
            Ok(IoHandle::new(Box::new(io), descriptor))
        }
        TransportUri::PipeRead { .. } => Err(IoError::UnsupportedUri(format!("{uri} is a read-direction transport"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_client() {
        let u = TransportUri::parse("gavf://example.com:9010/live").unwrap();
        assert_eq!(u, TransportUri::TcpClient { host: "example.com".into(), port: 9010, path: "/live".into() });
    }

    #[test]
    fn parses_unix_server() {
        let u = TransportUri::parse("gavf-unixserv:///tmp/gavf.sock").unwrap();
        assert_eq!(u, TransportUri::UnixServer { path: "/tmp/gavf.sock".into() });
    }

    #[test]
    fn parses_pipe_forms() {
        assert_eq!(
            TransportUri::parse("|ffmpeg -i -").unwrap(),
            TransportUri::PipeWrite { command: "ffmpeg".into(), args: vec!["-i".into(), "-".into()] }
        );
        assert_eq!(
            TransportUri::parse("<ffmpeg -i in.mp4").unwrap(),
            TransportUri::PipeRead { command: "ffmpeg".into(), args: vec!["-i".into(), "in.mp4".into()] }
        );
    }

    #[test]
    fn parses_stdio_and_plain_path() {
        assert_eq!(TransportUri::parse("-").unwrap(), TransportUri::Stdio);
        assert_eq!(TransportUri::parse("/tmp/out.gavf").unwrap(), TransportUri::File { path: "/tmp/out.gavf".into() });
    }

    #[test]
    fn rejects_missing_port() {
        assert!(TransportUri::parse("gavf://example.com/live").is_err());
    }
}
