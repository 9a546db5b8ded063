//! Register Map
//!
//! Static table describing where each physical quantity lives in the meter's
//! holding-register space and how its fixed-point value converts to a
//! physical unit.
//!
//! # Standard Map
//!
//! | quantity | address | words | scale |
//! |---|---|---|---|
//! | frequency | `0x0130` | 1 | 0.01 Hz |
//! | voltage L1 | `0x0131` | 1 | 0.01 V |
//! | current L1 | `0x0139` | 2 | 0.001 A |
//! | active power L1 | `0x0140` | 2 | 1 |
//! | reactive power L1 | `0x0148` | 2 | 1 |
//! | apparent power L1 | `0x0150` | 2 | 1 |
//! | power factor L1 | `0x0158` | 1 | 0.001 |
//! | total energy | `0xA000` | 2 | [`EnergyScale`] |
//!
//! The energy scale has no default. Deployments of this meter have been seen
//! with both 0.01 and 0.001 kWh per count, so configuration must name one.

use serde::Deserialize;
use std::fmt;

pub const FREQUENCY_SCALE: f64 = 0.01;
pub const VOLTAGE_SCALE: f64 = 0.01;
pub const CURRENT_SCALE: f64 = 0.001;
pub const POWER_SCALE: f64 = 1.0;
pub const POWER_FACTOR_SCALE: f64 = 0.001;

/// Total energy counter in hundredths of a kWh.
pub const ENERGY_SCALE_CENTI_KWH: f64 = 0.01;
/// Total energy counter in thousandths of a kWh.
pub const ENERGY_SCALE_MILLI_KWH: f64 = 0.001;

/// A physical quantity exposed by the meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Frequency,
    VoltageL1,
    CurrentL1,
    ActivePowerL1,
    ReactivePowerL1,
    ApparentPowerL1,
    PowerFactorL1,
    EnergyTotal,
}

impl Quantity {
    pub const ALL: [Quantity; 8] = [
        Quantity::Frequency,
        Quantity::VoltageL1,
        Quantity::CurrentL1,
        Quantity::ActivePowerL1,
        Quantity::ReactivePowerL1,
        Quantity::ApparentPowerL1,
        Quantity::PowerFactorL1,
        Quantity::EnergyTotal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Quantity::Frequency => "frequency",
            Quantity::VoltageL1 => "voltage_l1",
            Quantity::CurrentL1 => "current_l1",
            Quantity::ActivePowerL1 => "active_power_l1",
            Quantity::ReactivePowerL1 => "reactive_power_l1",
            Quantity::ApparentPowerL1 => "apparent_power_l1",
            Quantity::PowerFactorL1 => "power_factor_l1",
            Quantity::EnergyTotal => "energy_total",
        }
    }

    /// Metric name without namespace, e.g. `voltage_l1_v`
    pub fn metric_name(self, power_unit: PowerUnit) -> String {
        match self {
            Quantity::Frequency => "frequency_hz".to_string(),
            Quantity::VoltageL1 => "voltage_l1_v".to_string(),
            Quantity::CurrentL1 => "current_l1_a".to_string(),
            Quantity::ActivePowerL1 => format!("power_active_{}", power_unit.suffix("w")),
            Quantity::ReactivePowerL1 => format!("power_reactive_{}", power_unit.suffix("var")),
            Quantity::ApparentPowerL1 => format!("power_apparent_{}", power_unit.suffix("va")),
            Quantity::PowerFactorL1 => "power_factor".to_string(),
            Quantity::EnergyTotal => "energy_total_kwh".to_string(),
        }
    }

    pub fn help(self, power_unit: PowerUnit) -> String {
        let prefix = match power_unit {
            PowerUnit::Watt => "",
            PowerUnit::Kilowatt => "k",
        };
        match self {
            Quantity::Frequency => "Grid frequency in Hz".to_string(),
            Quantity::VoltageL1 => "Voltage of phase L1 in V".to_string(),
            Quantity::CurrentL1 => "Current of phase L1 in A".to_string(),
            Quantity::ActivePowerL1 => format!("Active power of phase L1 in {}W", prefix),
            Quantity::ReactivePowerL1 => format!("Reactive power of phase L1 in {}var", prefix),
            Quantity::ApparentPowerL1 => format!("Apparent power of phase L1 in {}VA", prefix),
            Quantity::PowerFactorL1 => "Power factor of phase L1".to_string(),
            Quantity::EnergyTotal => "Total energy in kWh".to_string(),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of consecutive 16-bit registers a value spans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    One,
    Two,
}

impl WordCount {
    pub fn count(self) -> u16 {
        match self {
            WordCount::One => 1,
            WordCount::Two => 2,
        }
    }
}

/// Fixed-point resolution of the total energy counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyScale {
    CentiKwh,
    MilliKwh,
}

impl EnergyScale {
    pub fn factor(self) -> f64 {
        match self {
            EnergyScale::CentiKwh => ENERGY_SCALE_CENTI_KWH,
            EnergyScale::MilliKwh => ENERGY_SCALE_MILLI_KWH,
        }
    }
}

/// Unit the meter reports power in. Only affects metric naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUnit {
    #[default]
    Watt,
    Kilowatt,
}

impl PowerUnit {
    fn suffix(self, base: &str) -> String {
        match self {
            PowerUnit::Watt => base.to_string(),
            PowerUnit::Kilowatt => format!("k{}", base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterSpec {
    pub quantity: Quantity,
    pub address: u16,
    pub width: WordCount,
    pub scale: f64,
}

impl RegisterSpec {
    pub const fn new(quantity: Quantity, address: u16, width: WordCount, scale: f64) -> Self {
        Self {
            quantity,
            address,
            width,
            scale,
        }
    }

    /// Convert a raw register value to its physical value
    pub fn apply_scale(&self, raw: u32) -> f64 {
        f64::from(raw) * self.scale
    }
}

/// Ordered set of register specs, read in table order on every poll
#[derive(Debug, Clone)]
pub struct RegisterMap {
    specs: Vec<RegisterSpec>,
}

impl RegisterMap {
    pub fn new(specs: Vec<RegisterSpec>) -> Self {
        Self { specs }
    }

    /// The meter's documented register layout.
    pub fn standard(energy_scale: EnergyScale) -> Self {
        use Quantity::*;
        use WordCount::*;

        Self::new(vec![
            RegisterSpec::new(Frequency, 0x0130, One, FREQUENCY_SCALE),
            RegisterSpec::new(VoltageL1, 0x0131, One, VOLTAGE_SCALE),
            RegisterSpec::new(CurrentL1, 0x0139, Two, CURRENT_SCALE),
            RegisterSpec::new(ActivePowerL1, 0x0140, Two, POWER_SCALE),
            RegisterSpec::new(ReactivePowerL1, 0x0148, Two, POWER_SCALE),
            RegisterSpec::new(ApparentPowerL1, 0x0150, Two, POWER_SCALE),
            RegisterSpec::new(PowerFactorL1, 0x0158, One, POWER_FACTOR_SCALE),
            RegisterSpec::new(EnergyTotal, 0xA000, Two, energy_scale.factor()),
        ])
    }

    pub fn get(&self, quantity: Quantity) -> Option<&RegisterSpec> {
        self.specs.iter().find(|spec| spec.quantity == quantity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
