//! Bus session abstraction
//!
//! The poll cycle only needs two things from the field bus: a way to open a
//! session and a way to read holding registers on it. Both are traits so the
//! cycle can run against the Modbus client in production and an in-memory
//! meter in tests.

use crate::error::{BusError, Result};
use std::future::Future;

/// An open request/response session with the meter.
pub trait BusSession: Send {
    /// Read `count` consecutive holding registers starting at `address`.
    ///
    /// Each returned word is one 16-bit register. Implementations must bound
    /// the request with a timeout and report it as [`BusError::Timeout`].
    fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = std::result::Result<Vec<u16>, BusError>> + Send;

    /// Release the session. Errors are not reported; the session is gone
    /// either way.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async {}
    }
}

/// Opens bus sessions against a fixed endpoint.
pub trait Connector: Send + Sync + 'static {
    type Session: BusSession + 'static;

    /// Establish a new session. Failures are [`crate::error::ExporterError::Connection`].
    fn connect(&self) -> impl Future<Output = Result<Self::Session>> + Send;
}
