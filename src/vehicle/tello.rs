//! # Tello SDK Link
//!
//! Talks to a Tello-class drone using its plain-text UDP command protocol.
//!
//! ## Protocol
//!
//! | Command | Reply | Use |
//! |---------|-------|-----|
//! | `command` | `ok` | Enter SDK mode (handshake) |
//! | `streamon` / `streamoff` | `ok` | Start/stop the video stream on UDP 11111 |
//! | `rc a b c d` | none | Velocity, each value -100..100 |
//! | `takeoff` / `land` | `ok` or `error...` | Sent when the manoeuvre finishes |
//! | `battery?` | `0`..`100` | Battery percentage |
//!
//! Queries (anything expecting a reply) are serialized by an async mutex so a
//! reply is always matched to the request that caused it. A reply of the
//! wrong kind (a number while waiting for `ok`, or the reverse) is a late
//! answer to a timed-out request and is skipped. `rc` commands skip the
//! mutex and never wait.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::Vehicle;
use crate::config::VehicleConfig;
use crate::dispatch::command::VelocityCommand;
use crate::error::{HudError, Result};

/// Largest reply the drone sends
const REPLY_BUFFER_SIZE: usize = 1024;

/// Tello command link
pub struct TelloLink {
    socket: UdpSocket,
    address: SocketAddr,
    query_lock: Mutex<()>,
    command_timeout: Duration,
    motion_timeout: Duration,
}

impl std::fmt::Debug for TelloLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelloLink")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TelloLink {
    /// Bind the local socket, enter SDK mode and turn the video stream on.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid, the socket cannot be bound,
    /// or the drone does not acknowledge the handshake in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drone_hud::config::VehicleConfig;
    /// use drone_hud::vehicle::tello::TelloLink;
    ///
    /// # #[tokio::main] async fn main() -> drone_hud::error::Result<()> {
    /// let link = TelloLink::connect(&VehicleConfig::default()).await?;
    /// println!("Connected to {}", link.address());
    /// # Ok(()) }
    /// ```
    pub async fn connect(config: &VehicleConfig) -> Result<Self> {
        let address: SocketAddr = config
            .address
            .parse()
            .map_err(|e| HudError::Vehicle(format!("Invalid vehicle address '{}': {}", config.address, e)))?;

        let socket = UdpSocket::bind(&config.bind_address).await?;
        socket.connect(address).await?;
        debug!("Bound {} for vehicle at {}", socket.local_addr()?, address);

        let link = Self {
            socket,
            address,
            query_lock: Mutex::new(()),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            motion_timeout: Duration::from_millis(config.motion_timeout_ms),
        };

        link.command("command", link.command_timeout).await?;
        info!("Vehicle at {} entered SDK mode", address);
        link.command("streamon", link.command_timeout).await?;
        info!("Vehicle video stream on");

        Ok(link)
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Stop the video stream. Called once at shutdown.
    pub async fn close(&self) -> Result<()> {
        self.command("streamoff", self.command_timeout).await?;
        info!("Vehicle video stream off");
        Ok(())
    }

    /// Send a request and wait for a reply that `fits` it.
    ///
    /// Replies that do not fit are late answers to earlier requests and are
    /// dropped; the wait continues until `timeout` from the send.
    async fn query(&self, request: &str, timeout: Duration, fits: fn(&str) -> bool) -> Result<String> {
        let _guard = self.query_lock.lock().await;
        self.discard_stale_replies();

        self.socket
            .send(request.as_bytes())
            .await
            .map_err(|e| HudError::Vehicle(format!("Failed to send '{}': {}", request, e)))?;

        let reply = tokio::time::timeout(timeout, self.receive_fitting(request, fits))
            .await
            .map_err(|_| HudError::VehicleTimeout(request.to_string()))??;

        debug!("'{}' -> '{}'", request, reply);
        Ok(reply)
    }

    async fn receive_fitting(&self, request: &str, fits: fn(&str) -> bool) -> Result<String> {
        let mut buf = [0u8; REPLY_BUFFER_SIZE];
        loop {
            let len = self
                .socket
                .recv(&mut buf)
                .await
                .map_err(|e| HudError::Vehicle(format!("Failed to receive reply to '{}': {}", request, e)))?;

            let reply = String::from_utf8_lossy(&buf[..len]).trim().to_string();
            if fits(&reply) {
                return Ok(reply);
            }
            warn!("Discarding reply '{}' that does not answer '{}'", reply, request);
        }
    }

    /// Send a request that must be answered with `ok`.
    async fn command(&self, request: &str, timeout: Duration) -> Result<()> {
        let reply = self.query(request, timeout, is_acknowledgement).await?;
        if reply.eq_ignore_ascii_case("ok") {
            Ok(())
        } else {
            Err(HudError::Vehicle(format!("'{}' rejected: {}", request, reply)))
        }
    }

    /// Late replies to timed-out requests would otherwise answer the next one.
    fn discard_stale_replies(&self) {
        let mut buf = [0u8; REPLY_BUFFER_SIZE];
        while let Ok(len) = self.socket.try_recv(&mut buf) {
            warn!("Discarding stale vehicle reply: {}", String::from_utf8_lossy(&buf[..len]).trim());
        }
    }
}

#[async_trait]
impl Vehicle for TelloLink {
    async fn send_velocity(&self, command: VelocityCommand) -> Result<()> {
        let text = format_rc(command);
        self.socket
            .send(text.as_bytes())
            .await
            .map_err(|e| HudError::Vehicle(format!("Failed to send '{}': {}", text, e)))?;
        Ok(())
    }

    async fn takeoff(&self) -> Result<()> {
        self.command("takeoff", self.motion_timeout).await
    }

    async fn land(&self) -> Result<()> {
        self.command("land", self.motion_timeout).await
    }

    async fn read_battery(&self) -> Result<u8> {
        let reply = self.query("battery?", self.command_timeout, is_battery_reply).await?;
        parse_battery(&reply)
    }
}

/// Text form of a velocity command: `rc <lateral> <forward_back> <vertical> <yaw>`.
pub fn format_rc(command: VelocityCommand) -> String {
    format!(
        "rc {} {} {} {}",
        command.lateral(),
        command.forward_back(),
        command.vertical(),
        command.yaw()
    )
}

/// `ok` or an `error...` message, the answers to a command.
pub fn is_acknowledgement(reply: &str) -> bool {
    reply.eq_ignore_ascii_case("ok") || is_error_reply(reply)
}

/// A number or an `error...` message, the answers to `battery?`.
pub fn is_battery_reply(reply: &str) -> bool {
    reply.parse::<u16>().is_ok() || is_error_reply(reply)
}

fn is_error_reply(reply: &str) -> bool {
    reply
        .get(..5)
        .map(|prefix| prefix.eq_ignore_ascii_case("error"))
        .unwrap_or(false)
}

/// Parse a `battery?` reply, clamping to 100.
pub fn parse_battery(reply: &str) -> Result<u8> {
    reply
        .trim()
        .parse::<u16>()
        .map(|value| value.min(100) as u8)
        .map_err(|_| HudError::Vehicle(format!("Unexpected battery reply: '{}'", reply)))
}
