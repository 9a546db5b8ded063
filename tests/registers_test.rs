//! Register map tests
//!
//! Verify the standard table against the meter's documented layout.

use powermeter_exporter::registers::*;

#[test]
fn test_standard_map_contains_every_quantity_once() {
    let map = RegisterMap::standard(EnergyScale::CentiKwh);

    assert_eq!(map.len(), Quantity::ALL.len());
    for quantity in Quantity::ALL {
        assert_eq!(
            map.iter().filter(|spec| spec.quantity == quantity).count(),
            1,
            "{} should appear exactly once",
            quantity
        );
    }
}

#[test]
fn test_standard_map_layout() {
    let map = RegisterMap::standard(EnergyScale::CentiKwh);

    let expected = [
        (Quantity::Frequency, 0x0130, WordCount::One, 0.01),
        (Quantity::VoltageL1, 0x0131, WordCount::One, 0.01),
        (Quantity::CurrentL1, 0x0139, WordCount::Two, 0.001),
        (Quantity::ActivePowerL1, 0x0140, WordCount::Two, 1.0),
        (Quantity::ReactivePowerL1, 0x0148, WordCount::Two, 1.0),
        (Quantity::ApparentPowerL1, 0x0150, WordCount::Two, 1.0),
        (Quantity::PowerFactorL1, 0x0158, WordCount::One, 0.001),
        (Quantity::EnergyTotal, 0xA000, WordCount::Two, 0.01),
    ];

    for (spec, (quantity, address, width, scale)) in map.iter().zip(expected) {
        assert_eq!(spec.quantity, quantity);
        assert_eq!(spec.address, address, "address of {}", quantity);
        assert_eq!(spec.width, width, "width of {}", quantity);
        assert_eq!(spec.scale, scale, "scale of {}", quantity);
    }
}

#[test]
fn test_energy_scale_constants_are_distinct() {
    // The two meter variants in the field disagree by a factor of ten
    assert_eq!(ENERGY_SCALE_CENTI_KWH, 0.01);
    assert_eq!(ENERGY_SCALE_MILLI_KWH, 0.001);
    assert_eq!(EnergyScale::CentiKwh.factor(), ENERGY_SCALE_CENTI_KWH);
    assert_eq!(EnergyScale::MilliKwh.factor(), ENERGY_SCALE_MILLI_KWH);
}

#[test]
fn test_energy_scale_selects_energy_entry_only() {
    let centi = RegisterMap::standard(EnergyScale::CentiKwh);
    let milli = RegisterMap::standard(EnergyScale::MilliKwh);

    assert_eq!(centi.get(Quantity::EnergyTotal).unwrap().scale, 0.01);
    assert_eq!(milli.get(Quantity::EnergyTotal).unwrap().scale, 0.001);

    for quantity in Quantity::ALL {
        if quantity != Quantity::EnergyTotal {
            assert_eq!(centi.get(quantity), milli.get(quantity));
        }
    }
}

#[test]
fn test_word_count() {
    assert_eq!(WordCount::One.count(), 1);
    assert_eq!(WordCount::Two.count(), 2);
}

#[test]
fn test_apply_scale() {
    let frequency = RegisterSpec::new(Quantity::Frequency, 0x0130, WordCount::One, 0.01);
    assert!((frequency.apply_scale(0x1396) - 50.14).abs() < 1e-9);

    let current = RegisterSpec::new(Quantity::CurrentL1, 0x0139, WordCount::Two, 0.001);
    assert!((current.apply_scale(0x0000_F424) - 62.5).abs() < 1e-9);
}

#[test]
fn test_lookup_missing_quantity() {
    let map = RegisterMap::new(vec![RegisterSpec::new(
        Quantity::Frequency,
        0x0130,
        WordCount::One,
        0.01,
    )]);

    assert!(map.get(Quantity::Frequency).is_some());
    assert!(map.get(Quantity::EnergyTotal).is_none());
    assert!(!map.is_empty());
    assert!(RegisterMap::new(Vec::new()).is_empty());
}

#[test]
fn test_metric_names_follow_power_unit() {
    assert_eq!(
        Quantity::ActivePowerL1.metric_name(PowerUnit::Watt),
        "power_active_w"
    );
    assert_eq!(
        Quantity::ActivePowerL1.metric_name(PowerUnit::Kilowatt),
        "power_active_kw"
    );
    assert_eq!(
        Quantity::ReactivePowerL1.metric_name(PowerUnit::Kilowatt),
        "power_reactive_kvar"
    );
    assert_eq!(
        Quantity::ApparentPowerL1.metric_name(PowerUnit::Kilowatt),
        "power_apparent_kva"
    );
    assert_eq!(
        Quantity::VoltageL1.metric_name(PowerUnit::Kilowatt),
        "voltage_l1_v"
    );
    assert!(Quantity::ActivePowerL1
        .help(PowerUnit::Kilowatt)
        .contains("kW"));
}

#[test]
fn test_quantity_display_uses_name() {
    assert_eq!(Quantity::PowerFactorL1.to_string(), "power_factor_l1");
    assert_eq!(format!("{}", Quantity::EnergyTotal), "energy_total");
}
