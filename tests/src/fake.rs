//! Loopback stand-ins for real plugs. [`FakePlug`] serves the
//! description document and the basicevent SOAP calls over plain TCP;
//! [`BlackHole`] accepts connections and never answers, which is what
//! a wedged device looks like from the outside.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use plugscout_common::config::HubConfig;

pub struct FakePlug {
    pub addr: Ipv4Addr,
    pub port: u16,
    pub udn: String,
    relay: Arc<AtomicBool>,
    server: JoinHandle<()>,
}

impl FakePlug {
    /// Bind a plug at `addr:port`; port 0 picks a free one. Siblings
    /// on other loopback addresses can then reuse the chosen port.
    pub async fn spawn(
        addr: Ipv4Addr,
        port: u16,
        udn: &str,
        name: &str,
        on: bool,
    ) -> Result<Self> {
        let listener = TcpListener::bind((addr, port)).await?;
        let port = listener.local_addr()?.port();
        let relay = Arc::new(AtomicBool::new(on));
        let document = description(udn, name);

        let state = Arc::clone(&relay);
        let server = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&state);
                let document = document.clone();
                tokio::spawn(async move {
                    let _ = handle(stream, &document, &state).await;
                });
            }
        });

        Ok(Self {
            addr,
            port,
            udn: udn.to_string(),
            relay,
            server,
        })
    }

    pub fn is_on(&self) -> bool {
        self.relay.load(Ordering::SeqCst)
    }

    /// Take the listener down; later connections are refused.
    pub fn stop(&self) {
        self.server.abort();
    }
}

impl Drop for FakePlug {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Accepts connections and keeps them open without ever writing.
pub struct BlackHole {
    pub addr: Ipv4Addr,
    pub port: u16,
    server: JoinHandle<()>,
}

impl BlackHole {
    pub async fn spawn(addr: Ipv4Addr, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((addr, port)).await?;
        let port = listener.local_addr()?.port();
        let server = tokio::spawn(async move {
            let mut held: Vec<TcpStream> = Vec::new();
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                held.push(stream);
            }
        });
        Ok(Self { addr, port, server })
    }
}

impl Drop for BlackHole {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Engine configuration pointed at the fakes: their port, short
/// timeouts and a per-test alias file under the temp directory.
pub fn test_config(tag: &str, port: u16) -> HubConfig {
    HubConfig {
        control_port: port,
        probe_timeout: Duration::from_millis(300),
        scan_concurrency: 32,
        status_timeout: Duration::from_millis(500),
        status_deadline: Duration::from_secs(5),
        alias_path: std::env::temp_dir().join(format!(
            "plugscout-itest-{}-{tag}.json",
            std::process::id()
        )),
        ..HubConfig::default()
    }
}

pub fn drop_alias_file(cfg: &HubConfig) {
    let _ = std::fs::remove_file(&cfg.alias_path);
}

async fn handle(mut stream: TcpStream, document: &str, relay: &AtomicBool) -> Result<()> {
    let request = read_request(&mut stream).await?;

    let (status, body) = if request.starts_with("GET /setup.xml") {
        ("200 OK", document.to_string())
    } else if request.starts_with("POST /upnp/control/basicevent1") {
        if request.contains("SetBinaryState") {
            let on = requested_state(&request);
            relay.store(on, Ordering::SeqCst);
            ("200 OK", soap_response("SetBinaryState", on))
        } else {
            let on = relay.load(Ordering::SeqCst);
            ("200 OK", soap_response("GetBinaryState", on))
        }
    } else {
        ("404 Not Found", String::new())
    };

    let response = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: text/xml\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Read headers plus a Content-Length body, like the plugs' embedded
/// server does.
async fn read_request(stream: &mut TcpStream) -> Result<String> {
    let mut raw: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some(split) = text.find("\r\n\r\n") {
            let body_len = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if raw.len() >= split + 4 + body_len {
                break;
            }
        }
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn requested_state(request: &str) -> bool {
    request
        .split("<BinaryState>")
        .nth(1)
        .and_then(|rest| rest.split('<').next())
        .map(str::trim)
        == Some("1")
}

fn description(udn: &str, name: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\
         <root xmlns=\"urn:Belkin:device-1-0\">\
         <device>\
         <deviceType>urn:Belkin:device:controllee:1</deviceType>\
         <friendlyName>{name}</friendlyName>\
         <modelName>Socket</modelName>\
         <serialNumber>221517K0101769</serialNumber>\
         <UDN>{udn}</UDN>\
         </device>\
         </root>"
    )
}

fn soap_response(action: &str, on: bool) -> String {
    format!(
        "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <s:Body>\
         <u:{action}Response xmlns:u=\"urn:Belkin:service:basicevent:1\">\
         <BinaryState>{}</BinaryState>\
         </u:{action}Response>\
         </s:Body></s:Envelope>",
        u8::from(on)
    )
}
