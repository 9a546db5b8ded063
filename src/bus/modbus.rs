//! Modbus TCP/RTU sessions
//!
//! Thin adapter over `tokio-modbus`: resolves the configured endpoint, opens a
//! client context for the meter's unit id, and wraps every request in the
//! configured timeout so a silent device shows up as a read failure instead
//! of a hung scrape.

use crate::bus::session::{BusSession, Connector};
use crate::config::MeterConfig;
use crate::error::{BusError, ExporterError, Result};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, info};

const DEFAULT_MODBUS_PORT: u16 = 502;

/// Where the meter is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Modbus TCP, `host:port`
    Tcp(String),
    /// Modbus RTU over a serial device
    Serial { path: String, baud_rate: u32 },
}

impl Endpoint {
    /// Parse an endpoint string.
    ///
    /// Device paths (`/dev/...`, `COMn`) select RTU; anything else is a TCP
    /// host, with port 502 assumed when none is given. IPv6 literals need
    /// brackets: `[fe80::1]:502`.
    pub fn parse(value: &str, baud_rate: u32) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ExporterError::Config(
                "meter endpoint is empty (set POWERMETER_CONN)".to_string(),
            ));
        }

        if value.starts_with('/') || is_com_port(value) {
            return Ok(Endpoint::Serial {
                path: value.to_string(),
                baud_rate,
            });
        }

        let (host, port) = match value.strip_prefix('[') {
            // IPv6 literal, `[addr]` or `[addr]:port`
            Some(rest) => {
                let (addr, tail) = rest.split_once(']').ok_or_else(|| {
                    ExporterError::Config(format!("unterminated '[' in endpoint '{}'", value))
                })?;
                if addr.is_empty() {
                    return Err(missing_host(value));
                }
                let port = match tail {
                    "" | ":" => None,
                    tail => Some(tail.strip_prefix(':').ok_or_else(|| {
                        ExporterError::Config(format!(
                            "unexpected '{}' in endpoint '{}'",
                            tail, value
                        ))
                    })?),
                };
                (format!("[{}]", addr), port)
            }
            None => {
                if value.matches(':').count() > 1 {
                    return Err(ExporterError::Config(format!(
                        "IPv6 endpoint '{}' must be written as [addr]:port",
                        value
                    )));
                }
                match value.split_once(':') {
                    Some((host, port)) => {
                        (host.to_string(), Some(port).filter(|p| !p.is_empty()))
                    }
                    None => (value.to_string(), None),
                }
            }
        };

        if host.is_empty() {
            return Err(missing_host(value));
        }

        let port = match port {
            Some(port) => port.parse::<u16>().map_err(|e| {
                ExporterError::Config(format!("invalid port in endpoint '{}': {}", value, e))
            })?,
            None => DEFAULT_MODBUS_PORT,
        };

        Ok(Endpoint::Tcp(format!("{}:{}", host, port)))
    }
}

fn missing_host(value: &str) -> ExporterError {
    ExporterError::Config(format!("missing host in endpoint '{}'", value))
}

fn is_com_port(value: &str) -> bool {
    match (value.get(..3), value.get(3..)) {
        (Some(prefix), Some(number)) => {
            prefix.eq_ignore_ascii_case("com")
                && !number.is_empty()
                && number.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Serial { path, baud_rate } => write!(f, "rtu://{}@{}", path, baud_rate),
        }
    }
}

/// Opens Modbus sessions to a single meter
#[derive(Debug, Clone)]
pub struct ModbusConnector {
    endpoint: Endpoint,
    unit_id: u8,
    timeout: Duration,
}

impl ModbusConnector {
    pub fn new(endpoint: Endpoint, unit_id: u8, timeout: Duration) -> Self {
        Self {
            endpoint,
            unit_id,
            timeout,
        }
    }

    pub fn from_config(config: &MeterConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint, config.baud_rate)?;
        Ok(Self::new(
            endpoint,
            config.unit_id,
            Duration::from_secs(config.timeout_seconds),
        ))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn connect_tcp(&self, addr: &str) -> Result<Context> {
        let socket_addr = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| ExporterError::Connection(format!("cannot resolve {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| ExporterError::Connection(format!("no address for {}", addr)))?;

        debug!("Connecting to Modbus TCP {}", socket_addr);

        timeout(
            self.timeout,
            tcp::connect_slave(socket_addr, Slave(self.unit_id)),
        )
        .await
        .map_err(|_| {
            ExporterError::Connection(format!(
                "connection to {} timed out after {:?}",
                addr, self.timeout
            ))
        })?
        .map_err(|e| ExporterError::Connection(format!("{}: {}", addr, e)))
    }

    fn connect_serial(&self, path: &str, baud_rate: u32) -> Result<Context> {
        debug!("Opening Modbus RTU {} at {} baud", path, baud_rate);

        let builder = tokio_serial::new(path, baud_rate);
        let serial = tokio_serial::SerialStream::open(&builder)
            .map_err(|e| ExporterError::Connection(format!("serial open {}: {}", path, e)))?;

        Ok(rtu::attach_slave(serial, Slave(self.unit_id)))
    }
}

impl Connector for ModbusConnector {
    type Session = ModbusSession;

    async fn connect(&self) -> Result<ModbusSession> {
        let ctx = match &self.endpoint {
            Endpoint::Tcp(addr) => self.connect_tcp(addr).await?,
            Endpoint::Serial { path, baud_rate } => self.connect_serial(path, *baud_rate)?,
        };

        info!("Connected to power meter at {}", self.endpoint);

        Ok(ModbusSession {
            ctx,
            timeout: self.timeout,
        })
    }
}

/// An open Modbus client context
pub struct ModbusSession {
    ctx: Context,
    timeout: Duration,
}

impl BusSession for ModbusSession {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, BusError> {
        timeout(self.timeout, self.ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| BusError::Timeout(self.timeout))?
            .map_err(|e| BusError::Transport(e.to_string()))?
            .map_err(|e| BusError::Exception(format!("{:?}", e)))
    }

    async fn close(mut self) {
        if let Err(e) = self.ctx.disconnect().await {
            debug!("Error while closing Modbus session: {}", e);
        }
    }
}
