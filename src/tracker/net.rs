//! Network Device Link
//!
//! Blocking TCP implementation of [`TrackerLink`] speaking the line-oriented
//! dialect of the tracker host bridge: one request line out, one `ok`/`err`
//! response line back. File retrieval switches to a length-prefixed byte
//! stream, and the interactive setup routine inverts control: the host sends
//! `target`/`clear` lines that are rendered through the
//! [`CalibrationRenderer`] capability until it reports `done`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info};

use super::link::{LinkError, Result, TrackerLink};
use crate::graphics::CalibrationRenderer;

/// Default command port of the tracker host software
pub const DEFAULT_LINK_PORT: u16 = 589;

/// Timeout for establishing the connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a single command round-trip
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP link to a physical tracker host
pub struct NetLink {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    closed: bool,
}

impl NetLink {
    /// Connect to the tracker host
    ///
    /// `host` is an IP address or hostname, optionally with a `:port`
    /// suffix; the default port is [`DEFAULT_LINK_PORT`].
    pub fn connect(host: &str) -> Result<Self> {
        let authority = if host.contains(':') {
            host.to_string()
        } else {
            format!("{}:{}", host, DEFAULT_LINK_PORT)
        };

        let addrs: Vec<_> = authority
            .to_socket_addrs()
            .map_err(|e| LinkError::ConnectionFailed(format!("{}: {}", authority, e)))?
            .collect();
        let addr = addrs
            .first()
            .ok_or_else(|| LinkError::ConnectionFailed(format!("{}: no address", authority)))?;

        info!("Connecting to tracker host at {}", addr);
        let stream = TcpStream::connect_timeout(addr, CONNECT_TIMEOUT)
            .map_err(|e| LinkError::ConnectionFailed(format!("{}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(COMMAND_TIMEOUT))?;
        stream.set_write_timeout(Some(COMMAND_TIMEOUT))?;

        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            stream,
            reader,
            closed: false,
        })
    }

    fn ensure_live(&self) -> Result<()> {
        if self.closed {
            Err(LinkError::NotConnected)
        } else {
            Ok(())
        }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(LinkError::Protocol("connection closed by host".into()));
        }
        Ok(line.trim_end().to_string())
    }

    /// One request/response round-trip; returns the `ok` payload if any
    fn request(&mut self, line: &str) -> Result<String> {
        self.ensure_live()?;
        debug!("link <- {}", line);
        self.stream.write_all(line.as_bytes())?;
        self.stream.write_all(b"\n")?;
        self.stream.flush()?;

        let response = self.read_line()?;
        debug!("link -> {}", response);
        if response == "ok" {
            Ok(String::new())
        } else if let Some(payload) = response.strip_prefix("ok ") {
            Ok(payload.to_string())
        } else if let Some(reason) = response.strip_prefix("err ") {
            Err(LinkError::CommandRejected {
                command: line.to_string(),
                reason: reason.to_string(),
            })
        } else {
            Err(LinkError::Protocol(format!(
                "unexpected response '{}'",
                response
            )))
        }
    }
}

impl TrackerLink for NetLink {
    fn send_command(&mut self, command: &str) -> Result<()> {
        self.request(command).map(|_| ())
    }

    fn send_message(&mut self, message: &str) -> Result<()> {
        self.request(&format!("message {}", message)).map(|_| ())
    }

    fn open_data_file(&mut self, name: &str) -> Result<()> {
        self.request(&format!("open_file {}", name))
            .map(|_| ())
            .map_err(|e| LinkError::FileOpenFailed(format!("{}: {}", name, e)))
    }

    fn close_data_file(&mut self) -> Result<()> {
        self.request("close_file").map(|_| ())
    }

    fn set_offline_mode(&mut self) -> Result<()> {
        self.request("offline").map(|_| ())
    }

    fn version_string(&mut self) -> Result<String> {
        let payload = self.request("version")?;
        if payload.is_empty() {
            return Err(LinkError::Protocol("empty version response".into()));
        }
        Ok(payload)
    }

    fn start_recording(
        &mut self,
        file_samples: bool,
        file_events: bool,
        link_samples: bool,
        link_events: bool,
    ) -> Result<()> {
        let flag = |b: bool| if b { 1 } else { 0 };
        self.request(&format!(
            "start_recording {} {} {} {}",
            flag(file_samples),
            flag(file_events),
            flag(link_samples),
            flag(link_events)
        ))
        .map(|_| ())
    }

    fn stop_recording(&mut self) -> Result<()> {
        self.request("stop_recording").map(|_| ())
    }

    fn run_setup(&mut self, renderer: &mut dyn CalibrationRenderer) -> Result<()> {
        self.request("start_setup")?;

        // The setup loop is operator-paced; suspend the command timeout
        // until the host reports completion.
        self.stream.set_read_timeout(None)?;
        let outcome = self.setup_loop(renderer);
        self.stream.set_read_timeout(Some(COMMAND_TIMEOUT))?;
        outcome
    }

    fn abort_setup(&mut self) -> Result<()> {
        self.request("exit_setup").map(|_| ())
    }

    fn receive_data_file(&mut self, remote_name: &str, local_path: &Path) -> Result<()> {
        self.ensure_live()?;
        debug!("link <- receive_file {}", remote_name);
        self.stream
            .write_all(format!("receive_file {}\n", remote_name).as_bytes())?;
        self.stream.flush()?;

        let header = self.read_line()?;
        let size: u64 = header
            .strip_prefix("size ")
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| LinkError::FileTransferFailed(header.clone()))?;

        // Transfers can take well beyond the command timeout.
        self.stream.set_read_timeout(None)?;
        let mut payload = Vec::with_capacity(size as usize);
        let result = (&mut self.reader)
            .take(size)
            .read_to_end(&mut payload)
            .map_err(LinkError::Io);
        self.stream.set_read_timeout(Some(COMMAND_TIMEOUT))?;
        result?;

        if payload.len() as u64 != size {
            return Err(LinkError::FileTransferFailed(format!(
                "short transfer: {} of {} bytes",
                payload.len(),
                size
            )));
        }

        std::fs::write(local_path, payload)
            .map_err(|e| LinkError::FileTransferFailed(format!("{}: {}", local_path.display(), e)))?;
        info!(
            "Received {} bytes into {}",
            size,
            local_path.display()
        );
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!("Shutting down tracker link");
            let _ = self.stream.shutdown(Shutdown::Both);
            self.closed = true;
        }
        Ok(())
    }
}

impl NetLink {
    fn setup_loop(&mut self, renderer: &mut dyn CalibrationRenderer) -> Result<()> {
        renderer
            .setup_cal_display()
            .map_err(|e| LinkError::CalibrationFailed(e.to_string()))?;

        loop {
            let line = self.read_line()?;
            debug!("setup -> {}", line);
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("target") => {
                    let x: u32 = parts
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| LinkError::Protocol(line.clone()))?;
                    let y: u32 = parts
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| LinkError::Protocol(line.clone()))?;
                    renderer
                        .draw_cal_target(x, y)
                        .map_err(|e| LinkError::CalibrationFailed(e.to_string()))?;
                }
                Some("clear") => {
                    renderer
                        .erase_cal_target()
                        .map_err(|e| LinkError::CalibrationFailed(e.to_string()))?;
                }
                Some("done") => break,
                Some("err") => {
                    let reason = line.trim_start_matches("err").trim().to_string();
                    return Err(LinkError::CalibrationFailed(reason));
                }
                _ => return Err(LinkError::Protocol(line)),
            }
        }

        renderer
            .exit_cal_display()
            .map_err(|e| LinkError::CalibrationFailed(e.to_string()))
    }
}
