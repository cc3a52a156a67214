//! # Production Collaborators
//!
//! [`HttpPlugClient`] speaks the control protocol to one plug at a
//! time over short-lived TCP connections. [`SsdpDiscovery`] finds
//! plugs by multicast search. Both are behind the seams in
//! `plugscout_common::control`, so the engine never depends on them
//! directly.

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

use plugscout_common::config::HubConfig;
use plugscout_common::debug;
use plugscout_common::control::{BroadcastDiscovery, DeviceControl, PlugCommand};
use plugscout_common::device::{DeviceIdentity, PowerState};
use plugscout_protocols::setup::DeviceDescription;
use plugscout_protocols::{http, setup, soap, ssdp};

#[derive(Debug, Clone)]
pub struct HttpPlugClient {
    port: u16,
    timeout: Duration,
}

impl HttpPlugClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    pub fn from_config(cfg: &HubConfig) -> Self {
        Self::new(cfg.control_port, cfg.status_timeout)
    }

    /// One request, one connection, full response.
    async fn exchange(&self, addr: Ipv4Addr, request: &str) -> Result<http::Response> {
        let mut stream = timeout(self.timeout, TcpStream::connect((addr, self.port)))
            .await
            .with_context(|| format!("connect to {addr}:{} timed out", self.port))?
            .with_context(|| format!("cannot connect to {addr}:{}", self.port))?;

        timeout(self.timeout, stream.write_all(request.as_bytes()))
            .await
            .context("request write timed out")??;

        let mut raw = Vec::new();
        timeout(self.timeout, stream.read_to_end(&mut raw))
            .await
            .context("response read timed out")??;

        http::parse_response(&raw)
    }

    async fn fetch_description(&self, addr: Ipv4Addr) -> Result<DeviceDescription> {
        let request = http::get_request(&format!("{addr}:{}", self.port), setup::SETUP_PATH);
        let response = self.exchange(addr, &request).await?;
        if !response.is_success() {
            anyhow::bail!("description request failed with status {}", response.status);
        }
        if !setup::is_plug_description(&response.body) {
            anyhow::bail!("{addr} answered with a non-plug description");
        }
        setup::parse_description(&response.body)
    }

    async fn soap_call(&self, addr: Ipv4Addr, action: &str, body: &str) -> Result<http::Response> {
        let action_header = soap::soap_action(action);
        let request = http::post_request(
            &format!("{addr}:{}", self.port),
            soap::CONTROL_PATH,
            &[("SOAPACTION", &action_header)],
            "text/xml; charset=\"utf-8\"",
            body,
        );
        let response = self.exchange(addr, &request).await?;
        if !response.is_success() {
            anyhow::bail!("{action} failed with status {}", response.status);
        }
        Ok(response)
    }

    async fn set_state(&self, addr: Ipv4Addr, on: bool) -> Result<PowerState> {
        let response = self
            .soap_call(addr, "SetBinaryState", &soap::set_state_body(on))
            .await?;
        // Some firmwares echo the new state, others answer with an
        // error element when the relay was already there; read back
        // when the echo is unhelpful.
        match soap::parse_binary_state(&response.body) {
            Ok(PowerState::Unknown) | Err(_) => self.query_state(addr).await,
            Ok(state) => Ok(state),
        }
    }
}

#[async_trait]
impl DeviceControl for HttpPlugClient {
    async fn identify(&self, addr: Ipv4Addr) -> Result<DeviceIdentity> {
        let description = self.fetch_description(addr).await?;
        Ok(description.into_identity(addr))
    }

    async fn query_state(&self, addr: Ipv4Addr) -> Result<PowerState> {
        let response = self
            .soap_call(addr, "GetBinaryState", &soap::get_state_body())
            .await?;
        soap::parse_binary_state(&response.body)
    }

    async fn invoke(&self, addr: Ipv4Addr, command: PlugCommand) -> Result<PowerState> {
        match command {
            PlugCommand::TurnOn => self.set_state(addr, true).await,
            PlugCommand::TurnOff => self.set_state(addr, false).await,
            PlugCommand::Toggle => {
                let current = self.query_state(addr).await?;
                // An unknown current state toggles to on.
                self.set_state(addr, current != PowerState::On).await
            }
        }
    }
}

/// Multicast search over the standard SSDP group.
#[derive(Debug, Clone)]
pub struct SsdpDiscovery {
    mx_secs: u8,
}

impl SsdpDiscovery {
    pub fn new(mx_secs: u8) -> Self {
        Self { mx_secs }
    }
}

impl Default for SsdpDiscovery {
    fn default() -> Self {
        Self { mx_secs: 2 }
    }
}

#[async_trait]
impl BroadcastDiscovery for SsdpDiscovery {
    async fn discover(&self, window: Duration) -> Result<Vec<Ipv4Addr>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("cannot bind search socket")?;
        let query = ssdp::msearch(self.mx_secs);
        socket
            .send_to(query.as_bytes(), ssdp::MULTICAST_GROUP)
            .await
            .context("cannot send search query")?;

        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        let mut answers: Vec<Ipv4Addr> = Vec::new();
        let mut buffer = [0u8; 2048];
        loop {
            tokio::select! {
                () = &mut deadline => break,
                received = socket.recv_from(&mut buffer) => {
                    let (len, peer) = received.context("search socket failed")?;
                    let addr = match ssdp::parse_answer(&buffer[..len]) {
                        Ok(answer) if answer.matches_service() => {
                            answer.location_addr().or_else(|| match peer {
                                std::net::SocketAddr::V4(v4) => Some(*v4.ip()),
                                std::net::SocketAddr::V6(_) => None,
                            })
                        }
                        Ok(_) => None,
                        Err(e) => {
                            debug!("Ignoring datagram from {peer}: {e}");
                            None
                        }
                    };
                    if let Some(addr) = addr {
                        if !answers.contains(&addr) {
                            answers.push(addr);
                        }
                    }
                }
            }
        }
        Ok(answers)
    }
}
