// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The Watchdog's routine four-byte heartbeat.

use super::CustomPayload;
use crate::packet::PacketKind;
use crate::prebuilt;
use crate::utils::despan;
use crate::utils::BitReader;
use crate::Context;
use crate::Error;
use iris_messages::Value;

/// Full-scale battery charge.
const CHARGE_MAX_MAH: f64 = 3500.0;

/// A heartbeat body: `charge:7 heater:1 current:7 voltage_ok:1 temp:8`, least
/// significant bit first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Heartbeat {
    pub charge_raw: u8,
    pub heater_on: bool,
    pub current_raw: u8,
    pub battery_voltage_ok: bool,
    pub batt_adc_temp_raw: u8,
}

impl Heartbeat {
    pub fn charge_mah(&self) -> f64 {
        despan(u64::from(self.charge_raw), 7, 29.1, CHARGE_MAX_MAH, 0, Some(120))
    }

    pub fn charge_percent(&self) -> f64 {
        self.charge_mah() / CHARGE_MAX_MAH * 100.0
    }

    pub fn current_milliamps(&self) -> f64 {
        despan(u64::from(self.current_raw), 7, 0.0, 600.0, 0, Some(120))
    }

    pub fn batt_adc_temp_kelvin(&self) -> f64 {
        despan(u64::from(self.batt_adc_temp_raw), 8, 75.0, -12.31, 0, Some(233))
    }
}

impl CustomPayload for Heartbeat {
    const KIND: PacketKind = PacketKind::WatchdogHeartbeat;
    const START_FLAG: u8 = 0xFF;
    const LENGTH: usize = 4;
    const MODULE: &'static str = prebuilt::WATCHDOG_HEARTBEAT;

    fn unpack(_ctx: &Context, body: &[u8]) -> Result<Self, Error> {
        let mut bits = BitReader::new(body);
        // Widths are all at most eight bits.
        Ok(Self {
            charge_raw: bits.take(7)? as u8,
            heater_on: bits.take(1)? == 1,
            current_raw: bits.take(7)? as u8,
            battery_voltage_ok: bits.take(1)? == 1,
            batt_adc_temp_raw: bits.take(8)? as u8,
        })
    }

    fn channel(&self, name: &str) -> Option<Value> {
        let value = match name {
            "BattAdcTempRaw" => Value::from(self.batt_adc_temp_raw),
            "BattAdcTempKelvin" => Value::from(self.batt_adc_temp_kelvin()),
            "ChargeRaw" => Value::from(self.charge_raw),
            "ChargeMah" => Value::from(self.charge_mah()),
            "ChargePercent" => Value::from(self.charge_percent()),
            "BatteryVoltageOk" => Value::from(self.battery_voltage_ok),
            "CurrentRaw" => Value::from(self.current_raw),
            "CurrentMilliamps" => Value::from(self.current_milliamps()),
            "HeaterStatus" => Value::from(self.heater_on),
            _ => return None,
        };
        Some(value)
    }
}

impl core::fmt::Display for Heartbeat {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "[HEAT]: {} \t\t [BATT]: Voltage: {}, Charge: {:4.0}mAh = {:5.1}%, Temp: {:5.1}K]",
            if self.heater_on { " ON" } else { "OFF" },
            if self.battery_voltage_ok { "GOOD" } else { "BAD" },
            self.charge_mah(),
            self.charge_percent(),
            self.batt_adc_temp_kelvin(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Heartbeat;
    use crate::classifier::classify;
    use crate::packet::Packet;
    use crate::packet::PacketKind;
    use crate::test_support;
    use iris_messages::Value;

    fn decode(data: &[u8]) -> Packet {
        let ctx = test_support::ctx();
        classify(&ctx, data)
    }

    fn sample(packet: &Packet, channel: &str) -> Value {
        test_support::sample(packet.payloads(), &format!("WatchdogHeartbeat.{channel}")).unwrap()
    }

    #[test]
    fn test_heartbeat_fields() {
        let packet = decode(&[0xFF, 0x5A, 0x30, 0x81]);
        assert_eq!(packet.kind(), PacketKind::WatchdogHeartbeat);
        let Packet::WatchdogHeartbeat(p) = &packet else {
            panic!("not a heartbeat: {packet:?}");
        };
        assert_eq!(
            p.custom(),
            &Heartbeat {
                charge_raw: 90,
                heater_on: false,
                current_raw: 48,
                battery_voltage_ok: false,
                batt_adc_temp_raw: 129,
            }
        );
    }

    #[test]
    fn test_heartbeat_telemetry() {
        let packet = decode(&[0xFF, 0xDA, 0x30, 0x81]);
        assert_eq!(packet.payloads().all_payloads_count(), 9);
        assert_eq!(sample(&packet, "ChargeRaw"), Value::from(90u8));
        assert_eq!(sample(&packet, "HeaterStatus"), Value::from(1u8));
        assert_eq!(sample(&packet, "CurrentRaw"), Value::from(48u8));
        assert_eq!(sample(&packet, "BatteryVoltageOk"), Value::from(0u8));
        assert_eq!(sample(&packet, "BattAdcTempRaw"), Value::from(129u8));
        assert!(packet.payloads().telemetry().all(|t| t.timestamp() == 0));
    }

    #[test]
    fn test_heartbeat_conversions() {
        let hb = Heartbeat {
            charge_raw: 90,
            heater_on: true,
            current_raw: 48,
            battery_voltage_ok: true,
            batt_adc_temp_raw: 129,
        };
        assert!((hb.charge_mah() - 2632.275).abs() < 1e-9);
        assert!((hb.charge_percent() - 75.2078571).abs() < 1e-6);
        assert!((hb.current_milliamps() - 240.0).abs() < 1e-9);
        assert!((hb.batt_adc_temp_kelvin() - 26.6609871).abs() < 1e-6);
        // Raw values past the calibrated span saturate.
        let pegged = Heartbeat {
            charge_raw: 127,
            ..hb
        };
        assert_eq!(pegged.charge_mah(), 3500.0);
        assert_eq!(
            hb.to_string(),
            "[HEAT]:  ON \t\t [BATT]: Voltage: GOOD, Charge: 2632mAh =  75.2%, Temp:  26.7K]"
        );
    }
}
