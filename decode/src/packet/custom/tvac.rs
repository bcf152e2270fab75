// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The extended heartbeat the Watchdog sends during thermal-vacuum testing.

use super::enum_label;
use super::CustomPayload;
use crate::packet::PacketKind;
use crate::prebuilt;
use crate::utils::interp_descending;
use crate::Context;
use crate::Error;
use iris_messages::Value;

/// Thermistor curve for the battery ADC: degrees Celsius against ADC counts.
const THERMISTOR_DEG_C: [f64; 35] = [
    -15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0,
    60.0, 65.0, 70.0, 75.0, 80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0, 125.0,
    130.0, 135.0, 140.0, 145.0, 150.0, 155.0,
];
const THERMISTOR_VADC: [f64; 35] = [
    4242.0, 3970.0, 3670.0, 3352.0, 3023.0, 2695.0, 2378.0, 2077.0, 1801.0, 1552.0, 1330.0,
    1137.0, 969.0, 825.0, 702.0, 598.0, 510.0, 435.0, 372.0, 319.0, 274.0, 237.0, 204.0, 177.0,
    154.0, 134.0, 117.0, 103.0, 90.0, 79.0, 70.0, 62.0, 55.0, 49.0, 44.0,
];

fn adc_to_celsius(adc: f64) -> f64 {
    interp_descending(adc, &THERMISTOR_VADC, &THERMISTOR_DEG_C)
}

fn adc_to_kelvin(adc: f64) -> f64 {
    adc_to_celsius(adc) + 273.15
}

/// A thermal-vacuum heartbeat body: nine `u16`s, three `u8`s, and a final
/// `u16`, all little-endian except the four fuel-gauge words, which are
/// big-endian.
#[derive(Clone, Debug, PartialEq)]
pub struct TvacHeartbeat {
    pub adc_temp_raw: u16,
    pub charge_raw: u16,
    pub voltage_raw: u16,
    pub current_raw: u16,
    pub fuel_temp_raw: u16,
    pub kp_heater: u16,
    pub heater_setpoint: u16,
    pub heater_window: u16,
    pub heater_pwm_limit: u16,
    pub watchdog_mode: u8,
    pub heater_status: u8,
    pub heating_control_enabled: u8,
    pub heater_pwm_duty_cycle: u16,
    watchdog_mode_name: String,
}

impl TvacHeartbeat {
    pub fn adc_temp_kelvin(&self) -> f64 {
        adc_to_kelvin(f64::from(self.adc_temp_raw))
    }

    /// The fuel-gauge charge conversion is not known for these frames.
    pub fn charge_mah(&self) -> f64 {
        0.0
    }

    // TODO: calibrate the fuel-gauge voltage, current, and temperature
    // scales against flight hardware.
    pub fn voltage(&self) -> f64 {
        f64::from(self.voltage_raw) * 0.00108033875
    }

    pub fn current_amps(&self) -> f64 {
        0.0000390636921 * (f64::from(self.current_raw) - 32767.0)
    }

    pub fn fuel_temp_kelvin(&self) -> f64 {
        0.00778210117 * f64::from(self.fuel_temp_raw)
    }

    pub fn heater_setpoint_kelvin(&self) -> f64 {
        adc_to_kelvin(f64::from(self.heater_setpoint))
    }

    /// Half the width of the heater's hysteresis band.
    pub fn heater_window_kelvin(&self) -> f64 {
        let setpoint = f64::from(self.heater_setpoint);
        let window = f64::from(self.heater_window);
        let upper = adc_to_celsius(setpoint - window);
        let lower = adc_to_celsius(setpoint + window);
        (upper - lower).abs() / 2.0
    }

    pub fn watchdog_mode_name(&self) -> &str {
        &self.watchdog_mode_name
    }
}

fn le16(body: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([body[at], body[at + 1]])
}

fn be16(body: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([body[at], body[at + 1]])
}

impl CustomPayload for TvacHeartbeat {
    const KIND: PacketKind = PacketKind::WatchdogHeartbeatTvac;
    const START_FLAG: u8 = 0xFF;
    const LENGTH: usize = 24;
    const MODULE: &'static str = prebuilt::WATCHDOG_HEARTBEAT_TVAC;

    fn unpack(ctx: &Context, body: &[u8]) -> Result<Self, Error> {
        if body.len() != Self::LENGTH - 1 {
            return Err(Error::decode(body, "thermal-vacuum heartbeat body must be 23 bytes"));
        }
        let module = ctx.standards.prebuilt(Self::MODULE)?;
        let watchdog_mode = body[18];
        Ok(Self {
            adc_temp_raw: le16(body, 0),
            charge_raw: be16(body, 2),
            voltage_raw: be16(body, 4),
            current_raw: be16(body, 6),
            fuel_temp_raw: be16(body, 8),
            kp_heater: le16(body, 10),
            heater_setpoint: le16(body, 12),
            heater_window: le16(body, 14),
            heater_pwm_limit: le16(body, 16),
            watchdog_mode,
            heater_status: body[19],
            heating_control_enabled: body[20],
            heater_pwm_duty_cycle: le16(body, 21),
            watchdog_mode_name: enum_label(module, "WatchdogMode", i64::from(watchdog_mode)),
        })
    }

    fn channel(&self, name: &str) -> Option<Value> {
        let value = match name {
            "AdcTempRaw" => Value::from(self.adc_temp_raw),
            "AdcTempKelvin" => Value::from(self.adc_temp_kelvin()),
            "ChargeRaw" => Value::from(self.charge_raw),
            "ChargeMah" => Value::from(self.charge_mah()),
            "VoltageRaw" => Value::from(self.voltage_raw),
            "Voltage" => Value::from(self.voltage()),
            "CurrentRaw" => Value::from(self.current_raw),
            "CurrentAmps" => Value::from(self.current_amps()),
            "FuelTempRaw" => Value::from(self.fuel_temp_raw),
            "FuelTempKelvin" => Value::from(self.fuel_temp_kelvin()),
            "KpHeater" => Value::from(self.kp_heater),
            "HeaterSetpoint" => Value::from(self.heater_setpoint),
            "HeaterSetpointKelvin" => Value::from(self.heater_setpoint_kelvin()),
            "HeaterWindow" => Value::from(self.heater_window),
            "HeaterWindowKelvin" => Value::from(self.heater_window_kelvin()),
            "HeaterPwmLimit" => Value::from(self.heater_pwm_limit),
            "WatchdogMode" => Value::from(self.watchdog_mode),
            "HeaterStatus" => Value::from(self.heater_status),
            "HeatingControlEnabled" => Value::from(self.heating_control_enabled),
            "HeaterPwmDutyCycle" => Value::from(self.heater_pwm_duty_cycle),
            _ => return None,
        };
        Some(value)
    }
}

fn on_off(x: u8) -> &'static str {
    if x != 0 {
        "ON"
    } else {
        "OFF"
    }
}

impl core::fmt::Display for TvacHeartbeat {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "{}:\t[Heat: {}, Ctrl: {}] \t{:.1}K -> {:.1}K +- {:.2}K \tKp = {} @ Duty Cycle: {}/{}",
            self.watchdog_mode_name,
            on_off(self.heater_status),
            on_off(self.heating_control_enabled),
            self.adc_temp_kelvin(),
            self.heater_setpoint_kelvin(),
            self.heater_window_kelvin(),
            self.kp_heater,
            self.heater_pwm_duty_cycle,
            u16::MAX,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::adc_to_kelvin;
    use crate::classifier::classify;
    use crate::packet::Packet;
    use crate::packet::PacketKind;
    use crate::test_support;
    use iris_messages::Value;

    fn frame() -> Vec<u8> {
        let mut data = vec![0xFF];
        data.extend(1801u16.to_le_bytes()); // AdcTempRaw: 25C
        data.extend(0x1234u16.to_be_bytes()); // ChargeRaw
        data.extend(3700u16.to_be_bytes()); // VoltageRaw
        data.extend(32767u16.to_be_bytes()); // CurrentRaw
        data.extend(38000u16.to_be_bytes()); // FuelTempRaw
        data.extend(500u16.to_le_bytes()); // KpHeater
        data.extend(2077u16.to_le_bytes()); // HeaterSetpoint: 20C
        data.extend(10u16.to_le_bytes()); // HeaterWindow
        data.extend(0x8000u16.to_le_bytes()); // HeaterPwmLimit
        data.extend([16, 1, 0]); // MISSION, heating, no control
        data.extend(0x0100u16.to_le_bytes());
        data
    }

    #[test]
    fn test_tvac_fields() {
        let ctx = test_support::ctx();
        let data = frame();
        assert_eq!(data.len(), 24);
        let packet = classify(&ctx, &data);
        assert_eq!(packet.kind(), PacketKind::WatchdogHeartbeatTvac);
        let Packet::WatchdogHeartbeatTvac(p) = &packet else {
            panic!("not a thermal-vacuum heartbeat: {packet:?}");
        };
        let hb = p.custom();
        assert_eq!(hb.charge_raw, 0x1234);
        assert_eq!(hb.voltage_raw, 3700);
        assert_eq!(hb.fuel_temp_raw, 38000);
        assert_eq!(hb.heater_pwm_duty_cycle, 256);
        assert_eq!(hb.watchdog_mode_name(), "MISSION");
        assert!((hb.adc_temp_kelvin() - 298.15).abs() < 1e-9);
        assert!((hb.heater_setpoint_kelvin() - 293.15).abs() < 1e-9);
        assert!(hb.current_amps().abs() < 1e-12);
        assert!((hb.voltage() - 3.997253375).abs() < 1e-9);
        assert_eq!(
            hb.to_string(),
            concat!(
                "MISSION:\t[Heat: ON, Ctrl: OFF] \t298.1K -> 293.1K +- 0.17K ",
                "\tKp = 500 @ Duty Cycle: 256/65535"
            )
        );

        let payloads = packet.payloads();
        assert_eq!(payloads.all_payloads_count(), 20);
        assert_eq!(
            test_support::sample(payloads, "WatchdogHeartbeatTvac.WatchdogMode"),
            Some(Value::from("MISSION"))
        );
        assert_eq!(
            test_support::sample(payloads, "WatchdogHeartbeatTvac.ChargeMah"),
            Some(Value::from(0.0))
        );
    }

    #[test]
    fn test_unknown_mode_drops_only_that_sample() {
        let ctx = test_support::ctx();
        let mut data = frame();
        data[19] = 0x77;
        let packet = classify(&ctx, &data);
        assert_eq!(packet.kind(), PacketKind::WatchdogHeartbeatTvac);
        assert_eq!(packet.payloads().all_payloads_count(), 19);
        assert!(packet.to_string().starts_with("UNKNOWN (119):"));
    }

    #[test]
    fn test_thermistor_curve_plateaus() {
        assert_eq!(adc_to_kelvin(5000.0), -15.0 + 273.15);
        assert_eq!(adc_to_kelvin(10.0), 155.0 + 273.15);
        assert!((adc_to_kelvin(1676.5) - 300.65).abs() < 1e-9);
    }
}
