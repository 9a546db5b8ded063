//! Power Meter Prometheus Exporter
//!
//! Polls a power meter's holding registers over Modbus (TCP or RTU) and
//! republishes the readings as Prometheus gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    Modbus TCP/RTU    ┌──────────────┐
//! │   Power     │ ◄─────────────────►  │   Exporter   │
//! │   Meter     │  holding registers   │              │
//! └─────────────┘                      │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                      │  │ Poller │  │ ◄────────────► │ Prometheus │
//!                                      │  └────────┘  │   /metrics     └────────────┘
//!                                      │  ┌────────┐  │
//!                                      │  │Metrics │  │
//!                                      │  └────────┘  │
//!                                      └──────────────┘
//! ```
//!
//! Register values are fixed-point integers. Each is read as one or two
//! 16-bit words, decoded big-endian and multiplied by its scale factor.
//!
//! # Modules
//!
//! - [`registers`] - Register map and scale factors
//! - [`meter`] - Decoding and the poll step
//! - [`metrics`] - Prometheus metric sink
//! - [`poller`] - Poll-and-publish cycle for both trigger modes
//! - [`bus`] - Bus session traits and the Modbus client
//! - [`server`] - HTTP server
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use powermeter_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod meter;
pub mod metrics;
pub mod poller;
pub mod registers;
pub mod server;
