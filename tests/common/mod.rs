//! In-memory power meter used by the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use powermeter_exporter::bus::{BusSession, Connector};
use powermeter_exporter::error::{BusError, ExporterError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared register contents and fault injection for [`FakeSession`]s
#[derive(Clone, Default)]
pub struct FakeMeter {
    registers: Arc<Mutex<HashMap<u16, Vec<u16>>>>,
    failing: Arc<Mutex<Option<u16>>>,
    refuse_connections: Arc<AtomicBool>,
    pub connects: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl FakeMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register contents for the standard map, in map order:
    /// frequency, voltage, current, active, reactive, apparent, power factor, energy
    pub fn with_raw(raw: [u32; 8]) -> Self {
        let meter = Self::new();
        meter.load(raw);
        meter
    }

    pub fn load(&self, raw: [u32; 8]) {
        let [freq, volt, current, active, reactive, apparent, pf, energy] = raw;
        self.set_u16(0x0130, freq as u16);
        self.set_u16(0x0131, volt as u16);
        self.set_u32(0x0139, current);
        self.set_u32(0x0140, active);
        self.set_u32(0x0148, reactive);
        self.set_u32(0x0150, apparent);
        self.set_u16(0x0158, pf as u16);
        self.set_u32(0xA000, energy);
    }

    pub fn set_u16(&self, address: u16, value: u16) {
        self.registers.lock().insert(address, vec![value]);
    }

    pub fn set_u32(&self, address: u16, value: u32) {
        self.registers
            .lock()
            .insert(address, vec![(value >> 16) as u16, value as u16]);
    }

    /// Store an arbitrary response for `address`, regardless of requested count
    pub fn set_words(&self, address: u16, words: Vec<u16>) {
        self.registers.lock().insert(address, words);
    }

    /// Make reads at `address` fail with a device exception
    pub fn fail_at(&self, address: Option<u16>) {
        *self.failing.lock() = address;
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            meter: self.clone(),
        }
    }

    pub fn session(&self) -> FakeSession {
        FakeSession {
            meter: self.clone(),
        }
    }
}

pub struct FakeConnector {
    pub meter: FakeMeter,
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self) -> Result<FakeSession> {
        if self.meter.refuse_connections.load(Ordering::SeqCst) {
            return Err(ExporterError::Connection(
                "connection refused".to_string(),
            ));
        }
        self.meter.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.meter.session())
    }
}

pub struct FakeSession {
    meter: FakeMeter,
}

impl BusSession for FakeSession {
    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, BusError> {
        self.meter.reads.fetch_add(1, Ordering::SeqCst);

        if *self.meter.failing.lock() == Some(address) {
            return Err(BusError::Exception("IllegalDataAddress".to_string()));
        }

        match self.meter.registers.lock().get(&address) {
            Some(words) => Ok(words.clone()),
            None => Ok(vec![0; usize::from(count)]),
        }
    }

    async fn close(self) {
        self.meter.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Raw values used across tests and their scaled counterparts (centi-kWh energy)
pub const RAW: [u32; 8] = [5014, 23045, 62_500, 1_450, 320, 1_500, 967, 1_234_567];
pub const SCALED: [f64; 8] = [50.14, 230.45, 62.5, 1450.0, 320.0, 1500.0, 0.967, 12345.67];

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
