pub mod modbus;
pub mod session;

pub use modbus::{Endpoint, ModbusConnector, ModbusSession};
pub use session::{BusSession, Connector};
