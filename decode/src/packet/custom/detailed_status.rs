// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The Watchdog's detailed status report.
//!
//! The body is a single 368-bit little-endian bit field. Most ADC readings are
//! truncated to their upper bits before sending and are shifted back out to
//! twelve bits here; every derived channel is computed from the widened
//! values.

use super::enum_label;
use super::CustomPayload;
use crate::packet::PacketKind;
use crate::prebuilt;
use crate::standards::Bitfields;
use crate::standards::Module;
use crate::utils::flip_endianness;
use crate::utils::interp_descending;
use crate::utils::BitReader;
use crate::Context;
use crate::Error;
use iris_messages::Value;
use std::collections::BTreeMap;

const BODY_LEN: usize = 46;
const ADC_BITS: u8 = 12;

/// One field of the packed body.
#[derive(Clone, Copy, Debug)]
struct Field {
    name: &'static str,
    bits: u8,
    /// For ADC readings, how many of the twelve bits were sent, counted from
    /// the most significant.
    adc_upper: Option<u8>,
}

const fn plain(name: &'static str, bits: u8) -> Field {
    Field {
        name,
        bits,
        adc_upper: None,
    }
}

const fn adc(name: &'static str, bits: u8, upper: u8) -> Field {
    Field {
        name,
        bits,
        adc_upper: Some(upper),
    }
}

/// The body layout, least-significant bit first.
const FIELDS: [Field; 40] = [
    plain("Io_ChargingStatus1", 1),
    plain("Io_ChargingStatus2", 1),
    plain("Io_BatteryConnectionStatus", 1),
    plain("Io_BatteryLatchStatus", 1),
    plain("Io_1V2PowerGood", 1),
    plain("Io_1V8PowerGood", 1),
    plain("Io_3V3PowerGood", 1),
    plain("Io_5V0PowerGood", 1),
    plain("Watchdog_State", 8),
    plain("Watchdog_DeploymentStatus", 2),
    plain("Watchdog_Uart0State", 1),
    plain("Watchdog_Uart1State", 1),
    adc("Adc_BatteryTempRaw", 12, ADC_BITS),
    plain("Watchdog_DetailedHeartbeatSequenceNumber", 8),
    plain("Watchdog_DigitalOutputStates", 32),
    plain("Watchdog_ResetLogs", 40),
    adc("Adc_LanderVoltageRaw", 7, 7),
    adc("Adc_BatteryChargingTempRaw", 9, 9),
    adc("Adc_FullSystemVoltageRaw", 5, 5),
    // The bottom nine bits: full scale, saturating early.
    adc("Adc_FullSystemCurrentRaw", 9, ADC_BITS),
    adc("Adc_SwitchedBatteryVoltageRaw", 9, 9),
    adc("Adc_Vcc24VoltageRaw", 7, 7),
    plain("Heater_ControlEnabled", 1),
    plain("Heater_IsHeating", 1),
    adc("Adc_2V5VoltageRaw", 5, 5),
    adc("Adc_2V8VoltageRaw", 5, 5),
    adc("Adc_Vcc28VoltageRaw", 6, 6),
    plain("Heater_Kp", 16),
    plain("Heater_PwmLimit_DutyCycleCounter", 16),
    plain("Heater_SetpointValue", 16),
    plain("Heater_OnValue", 16),
    plain("Heater_OffValue", 16),
    plain("Heater_DutyCyclePeriodCycles", 16),
    plain("Heater_DutyCycleCounter", 16),
    plain("I2C_BatteryChargeRaw", 16),
    plain("I2C_BatteryVoltageRaw", 16),
    plain("I2C_BatteryCurrentRaw", 16),
    plain("I2C_FuelGaugeTempRaw", 16),
    plain("I2C_BatteryChargeTelemRaw", 8),
    plain("I2C_BatteryCurrentTelemRaw", 8),
];

const fn total_bits(fields: &[Field]) -> usize {
    let mut i = 0;
    let mut n = 0;
    while i < fields.len() {
        n += fields[i].bits as usize;
        i += 1;
    }
    n
}

static_assertions::const_assert_eq!(total_bits(&FIELDS), BODY_LEN * 8);

/// Fuel-gauge registers, which are big-endian on the wire.
const BIG_ENDIAN_WORDS: [&str; 4] = [
    "I2C_BatteryChargeRaw",
    "I2C_BatteryVoltageRaw",
    "I2C_BatteryCurrentRaw",
    "I2C_FuelGaugeTempRaw",
];

/// Channels shown by name in the summary.
const LABELLED: [&str; 12] = [
    "Io_ChargerState",
    "Io_BatteryState",
    "Io_1V2PowerGood",
    "Io_1V8PowerGood",
    "Io_3V3PowerGood",
    "Io_5V0PowerGood",
    "Watchdog_State",
    "Watchdog_DeploymentStatus",
    "Watchdog_Uart0State",
    "Watchdog_Uart1State",
    "Heater_ControlEnabled",
    "Heater_IsHeating",
];

/// 5k battery thermistor: degrees Celsius against 12-bit ADC counts.
const BATT_5K_DEG_C: [f64; 43] = [
    -55.0, -50.0, -45.0, -40.0, -35.0, -30.0, -25.0, -20.0, -15.0, -10.0, -5.0, 0.0, 5.0, 10.0,
    15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0, 80.0, 85.0,
    90.0, 95.0, 100.0, 105.0, 110.0, 115.0, 120.0, 125.0, 130.0, 135.0, 140.0, 145.0, 150.0,
    155.0,
];
const BATT_5K_ADC: [f64; 43] = [
    4012.0, 3977.0, 3929.0, 3866.0, 3784.0, 3680.0, 3551.0, 3395.0, 3214.0, 3008.0, 2781.0,
    2540.0, 2291.0, 2042.0, 1801.0, 1574.0, 1365.0, 1176.0, 1008.0, 861.0, 734.0, 625.0, 532.0,
    453.0, 386.0, 329.0, 282.0, 242.0, 208.0, 179.0, 155.0, 134.0, 116.0, 102.0, 89.0, 78.0,
    68.0, 60.0, 53.0, 47.0, 42.0, 37.0, 33.0,
];

/// 10k charger thermistor: resistance relative to 25C, over the same
/// temperatures as [`BATT_5K_DEG_C`].
const CHRG_10K_RTH_R25: [f64; 43] = [
    96.3, 67.01, 47.17, 33.65, 24.26, 17.7, 13.04, 9.707, 7.293, 5.533, 4.232, 3.265, 2.539,
    1.99, 1.571, 1.249, 1.0, 0.8057, 0.6531, 0.5327, 0.4369, 0.3603, 0.2986, 0.2488, 0.2083,
    0.1752, 0.1481, 0.1258, 0.1072, 0.09177, 0.07885, 0.068, 0.05886, 0.05112, 0.04454,
    0.03893, 0.03417, 0.03009, 0.02654, 0.02348, 0.02083, 0.01853, 0.01653,
];

// Flight-model ADC corrections.
const VCC28_CORRECTION: f64 = 3136.0 / 2944.0;
const VL_CORRECTION: f64 = 3616.0 / 3104.0;
const VSA_CORRECTION: f64 = 3584.0 / 2944.0;
const VBS_CORRECTION: f64 = 3560.0 / 2928.0;

/// Highest lander voltage allowed.
const V_LANDER_MAX: f64 = 1.10 * 28.0;
/// Heater resistance, in ohms.
const R_HEATER: f64 = 628.245;
const PWM_CLOCK_HZ: f64 = 8e6;

fn adc_volts(raw: u64) -> f64 {
    raw as f64 / 4095.0 * 3.3
}

fn battery_adc_to_kelvin(adc: u64) -> f64 {
    interp_descending(adc as f64, &BATT_5K_ADC, &BATT_5K_DEG_C) + 273.15
}

fn percent(counter: u64, period: u64) -> f64 {
    if period == 0 {
        f64::INFINITY
    } else {
        100.0 * counter as f64 / period as f64
    }
}

/// A decoded detailed-status body.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedStatus {
    raw: BTreeMap<&'static str, u64>,
    combined_digital_states: u64,
    reset_events: Vec<String>,
    labels: BTreeMap<&'static str, String>,
}

impl DetailedStatus {
    /// A field as extracted from the body, with ADC readings widened to
    /// twelve bits and fuel-gauge words byte-swapped.
    pub fn field(&self, name: &str) -> Option<u64> {
        self.raw.get(name).copied()
    }

    fn get(&self, name: &str) -> u64 {
        self.field(name).unwrap_or(0)
    }

    fn label(&self, name: &str) -> &str {
        self.labels.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn charger_state(&self) -> u64 {
        self.get("Io_ChargingStatus1") << 1 | self.get("Io_ChargingStatus2")
    }

    pub fn battery_state(&self) -> u64 {
        self.get("Io_BatteryConnectionStatus") << 1 | self.get("Io_BatteryLatchStatus")
    }

    /// Pin states with tri-state pins resolved: 0 low, 1 high, 2 input.
    pub fn combined_digital_states(&self) -> u64 {
        self.combined_digital_states
    }

    /// Reset actions the Watchdog reports having taken, without their
    /// `RABI__` prefix.
    pub fn reset_events(&self) -> &[String] {
        &self.reset_events
    }

    pub fn lander_voltage(&self) -> f64 {
        VL_CORRECTION * adc_volts(self.get("Adc_LanderVoltageRaw")) * (232.0 + 2000.0) / 232.0
    }

    pub fn battery_charging_temp_kelvin(&self) -> f64 {
        const R25: f64 = 10e3;
        const RT1: f64 = 4320.0;
        const RT2: f64 = 19100.0;
        let raw = self.get("Adc_BatteryChargingTempRaw");
        if raw == 0 {
            return 0.0;
        }
        let v = adc_volts(raw);
        let r_th = 1.0 / ((3.3 - v) / (v * RT1) - 1.0 / RT2);
        interp_descending(r_th / R25, &CHRG_10K_RTH_R25, &BATT_5K_DEG_C) + 273.15
    }

    pub fn battery_temp_kelvin(&self) -> f64 {
        battery_adc_to_kelvin(self.get("Adc_BatteryTempRaw"))
    }

    pub fn full_system_voltage(&self) -> f64 {
        VSA_CORRECTION * adc_volts(self.get("Adc_FullSystemVoltageRaw")) * (232.0 + 2000.0) / 232.0
    }

    /// In amps.
    pub fn full_system_current(&self) -> f64 {
        adc_volts(self.get("Adc_FullSystemCurrentRaw")) * 4600.0 / 1000.0
    }

    pub fn switched_battery_voltage(&self) -> f64 {
        VBS_CORRECTION * adc_volts(self.get("Adc_SwitchedBatteryVoltageRaw")) * (274.0 + 2000.0)
            / 274.0
    }

    pub fn voltage_2v5(&self) -> f64 {
        adc_volts(self.get("Adc_2V5VoltageRaw"))
    }

    pub fn voltage_2v8(&self) -> f64 {
        adc_volts(self.get("Adc_2V8VoltageRaw"))
    }

    pub fn vcc28_voltage(&self) -> f64 {
        VCC28_CORRECTION * adc_volts(self.get("Adc_Vcc28VoltageRaw")) * (47.0 + 470.0) / 47.0
    }

    pub fn vcc24_voltage(&self) -> f64 {
        adc_volts(self.get("Adc_Vcc24VoltageRaw")) * (47.0 + 330.0) / 47.0
    }

    /// The lander voltage estimated from both sensors that measure it,
    /// weighted by their uncertainties.
    ///
    /// When they disagree by more than half, a reading far above the highest
    /// allowed lander voltage is discarded; otherwise the larger is used.
    pub fn fused_lander_voltage(&self) -> f64 {
        const D_LANDER: f64 = 0.25;
        const D_VCC28: f64 = 0.5;
        let lander = self.lander_voltage();
        let vcc28 = self.vcc28_voltage();
        let largest = lander.abs().max(vcc28.abs());
        if largest == 0.0 {
            return 0.0;
        }
        if (vcc28 - lander).abs() / largest > 0.5 {
            let ceiling = 1.5 * V_LANDER_MAX;
            if lander > ceiling && vcc28 <= ceiling {
                return vcc28;
            }
            if vcc28 > ceiling && lander <= ceiling {
                return lander;
            }
            return lander.max(vcc28);
        }
        let total = D_LANDER + D_VCC28;
        lander * (1.0 - D_LANDER / total) + vcc28 * (1.0 - D_VCC28 / total)
    }

    pub fn pwm_limit_duty_cycle_percent(&self) -> f64 {
        percent(
            self.get("Heater_PwmLimit_DutyCycleCounter"),
            self.get("Heater_DutyCyclePeriodCycles"),
        )
    }

    pub fn effective_power_limit(&self) -> f64 {
        let v = self.fused_lander_voltage() * self.pwm_limit_duty_cycle_percent() / 100.0;
        v.powi(2) / R_HEATER
    }

    pub fn max_possible_power(&self) -> f64 {
        self.fused_lander_voltage().powi(2) / R_HEATER
    }

    pub fn setpoint_kelvin(&self) -> f64 {
        battery_adc_to_kelvin(self.get("Heater_SetpointValue"))
    }

    pub fn on_temp_kelvin(&self) -> f64 {
        battery_adc_to_kelvin(self.get("Heater_OnValue"))
    }

    pub fn off_temp_kelvin(&self) -> f64 {
        battery_adc_to_kelvin(self.get("Heater_OffValue"))
    }

    pub fn duty_cycle_period_ms(&self) -> f64 {
        1000.0 * self.get("Heater_DutyCyclePeriodCycles") as f64 / PWM_CLOCK_HZ
    }

    pub fn duty_cycle_percent(&self) -> f64 {
        percent(
            self.get("Heater_DutyCycleCounter"),
            self.get("Heater_DutyCyclePeriodCycles"),
        )
    }

    pub fn effective_voltage(&self) -> f64 {
        self.fused_lander_voltage() * self.duty_cycle_percent() / 100.0
    }

    pub fn effective_power(&self) -> f64 {
        self.effective_voltage().powi(2) / R_HEATER
    }

    // TODO: calibrate the fuel-gauge voltage, current, and temperature
    // scales against flight hardware.
    pub fn i2c_battery_voltage(&self) -> f64 {
        self.get("I2C_BatteryVoltageRaw") as f64 * 0.00108033875
    }

    /// In amps.
    pub fn i2c_battery_current(&self) -> f64 {
        0.0000390636921 * self.get("I2C_BatteryCurrentRaw") as f64
    }

    pub fn i2c_fuel_gauge_temp_kelvin(&self) -> f64 {
        0.00778210117 * self.get("I2C_FuelGaugeTempRaw") as f64
    }
}

fn bitfields<'a>(module: &'a Module, channel: &str) -> Result<&'a Bitfields, Error> {
    module.channel(channel)?.field.bitfields.as_ref().ok_or_else(|| {
        Error::Implementation(format!("{}.{channel} has no bitfield layout", module.name))
    })
}

/// Resolve tri-state pins from the raw output states.
fn combine_digital_states(module: &Module, outputs: u64) -> Result<u64, Error> {
    let pins: BTreeMap<String, u64> = bitfields(module, "Watchdog_DigitalOutputStates")?
        .unpack(outputs)
        .into_iter()
        .collect();
    let pin = |name: &str| pins.get(&format!("OPSBI__{name}")).copied().unwrap_or(0);
    let tri_state = |name: &str, input: &str| if pin(input) != 0 { 2 } else { pin(name) };

    let combined = bitfields(module, "Watchdog_CombinedDigitalStates")?;
    let mut states = Vec::with_capacity(combined.fields.len());
    for (name, _) in combined.fields.iter() {
        let state = match name.as_str() {
            "CHRG_EN" => {
                if pin("CHRG_EN_FORCE_HIGH") != 0 {
                    1
                } else {
                    pin("CHRG_EN") * 2
                }
            }
            "V_SYS_ALL_EN" => {
                if pin("V_SYS_ALL_EN_FORCE_LOW") != 0 {
                    0
                } else if pin("V_SYS_ALL_EN") != 0 {
                    1
                } else {
                    2
                }
            }
            "RADIO_N_RST" => tri_state("RADIO_N_RST", "RADIO_N_RESET_IS_INPUT"),
            n @ ("HERCULES_N_RST" | "HERCULES_N_PORRST" | "FPGA_N_RST" | "LATCH_SET"
            | "LATCH_RESET" | "BATT_STAT") => tri_state(n, &format!("{n}_IS_INPUT")),
            n => pin(n),
        };
        states.push((name.as_str(), state));
    }
    combined.pack(&states)
}

impl CustomPayload for DetailedStatus {
    const KIND: PacketKind = PacketKind::WatchdogDetailedStatus;
    const START_FLAG: u8 = 0xD5;
    const LENGTH: usize = BODY_LEN + 1;
    const MODULE: &'static str = prebuilt::WATCHDOG_DETAILED_STATUS;

    fn unpack(ctx: &Context, body: &[u8]) -> Result<Self, Error> {
        let module = ctx.standards.prebuilt(Self::MODULE)?;
        let mut bits = BitReader::new(body);
        let mut raw = BTreeMap::new();
        for field in FIELDS.iter() {
            let mut value = bits.take(usize::from(field.bits))?;
            if let Some(upper) = field.adc_upper {
                value <<= ADC_BITS - upper;
            }
            raw.insert(field.name, value);
        }
        for name in BIG_ENDIAN_WORDS {
            if let Some(v) = raw.get_mut(name) {
                *v = flip_endianness(*v, 2);
            }
        }

        let outputs = raw.get("Watchdog_DigitalOutputStates").copied().unwrap_or(0);
        let combined_digital_states = combine_digital_states(module, outputs)?;
        let reset_logs = raw.get("Watchdog_ResetLogs").copied().unwrap_or(0);
        let reset_events = bitfields(module, "Watchdog_ResetLogs")?
            .unpack(reset_logs)
            .into_iter()
            .filter(|(_, v)| *v != 0)
            .map(|(name, _)| name.trim_start_matches("RABI__").to_string())
            .collect();

        let mut status = Self {
            raw,
            combined_digital_states,
            reset_events,
            labels: BTreeMap::new(),
        };
        for name in LABELLED {
            let value = status.channel(name).and_then(|v| v.as_integer());
            let value = value.and_then(|v| i64::try_from(v).ok()).unwrap_or(-1);
            status.labels.insert(name, enum_label(module, name, value));
        }
        Ok(status)
    }

    fn channel(&self, name: &str) -> Option<Value> {
        let value = match name {
            "Io_ChargerState" => Value::from(self.charger_state()),
            "Io_BatteryState" => Value::from(self.battery_state()),
            "Watchdog_CombinedDigitalStates" => Value::from(self.combined_digital_states),
            "Adc_LanderVoltage" => Value::from(self.lander_voltage()),
            "Adc_BatteryChargingTempKelvin" => Value::from(self.battery_charging_temp_kelvin()),
            "Adc_BatteryChargingTempUncertaintyKelvin" => Value::from(0.0),
            "Adc_BatteryTempKelvin" => Value::from(self.battery_temp_kelvin()),
            "Adc_BatteryTempUncertaintyKelvin" => Value::from(0.0),
            "Adc_FullSystemVoltage" => Value::from(self.full_system_voltage()),
            "Adc_FullSystemCurrent" => Value::from(self.full_system_current()),
            "Adc_SwitchedBatteryVoltage" => Value::from(self.switched_battery_voltage()),
            "Adc_2V5Voltage" => Value::from(self.voltage_2v5()),
            "Adc_2V8Voltage" => Value::from(self.voltage_2v8()),
            "Adc_Vcc28Voltage" => Value::from(self.vcc28_voltage()),
            "Adc_Vcc24Voltage" => Value::from(self.vcc24_voltage()),
            "Heater_PwmLimit_DutyCyclePercent" => {
                Value::from(self.pwm_limit_duty_cycle_percent())
            }
            "Heater_EffectivePowerLimit" => Value::from(self.effective_power_limit()),
            "Heater_SetpointKelvin" => Value::from(self.setpoint_kelvin()),
            "Heater_OnTempKelvin" => Value::from(self.on_temp_kelvin()),
            "Heater_OffTempKelvin" => Value::from(self.off_temp_kelvin()),
            "Heater_DutyCyclePeriodMs" => Value::from(self.duty_cycle_period_ms()),
            "Heater_DutyCyclePercent" => Value::from(self.duty_cycle_percent()),
            "Heater_EffectiveVoltage" => Value::from(self.effective_voltage()),
            "Heater_EffectivePower" => Value::from(self.effective_power()),
            "I2C_BatteryChargeMah" => Value::from(0.0),
            "I2C_BatteryVoltage" => Value::from(self.i2c_battery_voltage()),
            "I2C_BatteryCurrent" => Value::from(self.i2c_battery_current()),
            "I2C_FuelGaugeTempKelvin" => Value::from(self.i2c_fuel_gauge_temp_kelvin()),
            "I2C_BatteryChargeTelemMah" => Value::from(0.0),
            "I2C_BatteryCurrentTelemAmps" => Value::from(0.0),
            n => Value::from(self.field(n)?),
        };
        Some(value)
    }
}

impl core::fmt::Display for DetailedStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        writeln!(
            f,
            "#{} [{} + {}] \tCHARGER: {} \tBATTERIES: {} \tHerc-UART0: {} \tLander-UART1: {}",
            self.get("Watchdog_DetailedHeartbeatSequenceNumber"),
            self.label("Watchdog_State"),
            self.label("Watchdog_DeploymentStatus"),
            self.label("Io_ChargerState"),
            self.label("Io_BatteryState"),
            self.label("Watchdog_Uart0State"),
            self.label("Watchdog_Uart1State"),
        )?;
        writeln!(
            f,
            "1V2: {} \t1V8: {} \t2V5: {:.1} \t2V8: {:.1} \t3V3: {} \t5V0: {} \t24V: {:.2}",
            self.label("Io_1V2PowerGood"),
            self.label("Io_1V8PowerGood"),
            self.voltage_2v5(),
            self.voltage_2v8(),
            self.label("Io_3V3PowerGood"),
            self.label("Io_5V0PowerGood"),
            self.vcc24_voltage(),
        )?;
        writeln!(
            f,
            "VBm: {:.2}V \tVL: {:.2}V \tVcc28: {:.2}V \tVSA: {:.2}V \tISA: {:.1}mA",
            self.switched_battery_voltage(),
            self.lander_voltage(),
            self.vcc28_voltage(),
            self.full_system_voltage(),
            self.full_system_current() * 1000.0,
        )?;
        writeln!(
            f,
            concat!(
                "HEATER [↑{:.0}K ({}) | ↓{:.0}K ({})] \t is {}, Control: {} ",
                "\t@ {:.3}W / {:.3}W \tPeriod: {:.2}ms"
            ),
            self.on_temp_kelvin(),
            self.get("Heater_OnValue"),
            self.off_temp_kelvin(),
            self.get("Heater_OffValue"),
            self.label("Heater_IsHeating"),
            self.label("Heater_ControlEnabled"),
            self.effective_power(),
            self.max_possible_power(),
            self.duty_cycle_period_ms(),
        )?;
        writeln!(
            f,
            "Tbatt: {:.1}K ± 0K \tTchrg: {:.1}K ± 0K \tTblimp: {:.1}K",
            self.battery_temp_kelvin(),
            self.battery_charging_temp_kelvin(),
            self.i2c_fuel_gauge_temp_kelvin(),
        )?;
        writeln!(
            f,
            "BATTERY MONITOR: {:.2}V \t{:.1}mA \t0mAh",
            self.i2c_battery_voltage(),
            self.i2c_battery_current() * 1000.0,
        )?;
        write!(f, "Reset/Flag Events: [{}]", self.reset_events.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::battery_adc_to_kelvin;
    use super::DetailedStatus;
    use super::BODY_LEN;
    use super::FIELDS;
    use crate::classifier::classify;
    use crate::packet::Packet;
    use crate::packet::PacketKind;
    use crate::prebuilt;
    use crate::test_support;
    use iris_messages::Value;

    /// Pack wire values into a frame, least-significant bit first.
    fn frame(values: &[(&str, u64)]) -> Vec<u8> {
        let mut body = vec![0u8; BODY_LEN];
        let mut pos = 0;
        for field in FIELDS.iter() {
            let v = values
                .iter()
                .find(|(n, _)| *n == field.name)
                .map(|(_, v)| *v)
                .unwrap_or(0);
            for k in 0..usize::from(field.bits) {
                if (v >> k) & 1 == 1 {
                    body[(pos + k) / 8] |= 1 << ((pos + k) % 8);
                }
            }
            pos += usize::from(field.bits);
        }
        let mut data = vec![0xD5];
        data.extend(body);
        data
    }

    fn typical() -> Vec<u8> {
        frame(&[
            ("Io_ChargingStatus1", 1),
            ("Io_BatteryConnectionStatus", 1),
            ("Io_BatteryLatchStatus", 1),
            ("Io_1V2PowerGood", 1),
            ("Io_1V8PowerGood", 1),
            ("Io_3V3PowerGood", 1),
            ("Io_5V0PowerGood", 1),
            ("Watchdog_State", 16),
            ("Watchdog_DeploymentStatus", 2),
            ("Watchdog_Uart0State", 1),
            ("Adc_BatteryTempRaw", 1365),
            ("Watchdog_DetailedHeartbeatSequenceNumber", 42),
            // HEATER, CHRG_EN, V_SYS_ALL_EN, RADIO_N_RESET_IS_INPUT
            ("Watchdog_DigitalOutputStates", 1 << 1 | 1 << 9 | 1 << 12 | 1 << 23),
            // HERCULES_RESET, RADIO_RESET
            ("Watchdog_ResetLogs", 1 << 1 | 1 << 5),
            ("Adc_LanderVoltageRaw", 100),
            ("Adc_Vcc28VoltageRaw", 50),
            ("Heater_IsHeating", 1),
            ("Heater_ControlEnabled", 1),
            ("Heater_OnValue", 1574),
            ("Heater_OffValue", 1365),
            ("Heater_DutyCyclePeriodCycles", 4000),
            ("Heater_DutyCycleCounter", 1000),
            ("I2C_BatteryVoltageRaw", 0x740E),
        ])
    }

    fn decode(data: &[u8]) -> (Packet, DetailedStatus) {
        let ctx = test_support::ctx();
        let packet = classify(&ctx, data);
        let Packet::WatchdogDetailedStatus(p) = &packet else {
            panic!("not a detailed status: {packet:?}");
        };
        let status = p.custom().clone();
        (packet, status)
    }

    #[test]
    fn test_fields_are_widened_and_swapped() {
        let data = typical();
        assert_eq!(data.len(), 47);
        let (packet, status) = decode(&data);
        assert_eq!(packet.kind(), PacketKind::WatchdogDetailedStatus);
        assert_eq!(status.field("Adc_LanderVoltageRaw"), Some(100 << 5));
        assert_eq!(status.field("Adc_Vcc28VoltageRaw"), Some(50 << 6));
        assert_eq!(status.field("Adc_BatteryTempRaw"), Some(1365));
        assert_eq!(status.field("I2C_BatteryVoltageRaw"), Some(3700));
        assert_eq!(status.field("Heater_OnValue"), Some(1574));
        assert_eq!(status.charger_state(), 2);
        assert_eq!(status.battery_state(), 3);
    }

    #[test]
    fn test_combined_states_and_reset_events() {
        let (_, status) = decode(&typical());
        // HEATER high, CHRG_EN floating, V_SYS_ALL_EN high, RADIO_N_RST input.
        assert_eq!(
            status.combined_digital_states(),
            1 << 1 | 2 << 9 | 1 << 12 | 2 << 20
        );
        assert_eq!(status.reset_events(), &["HERCULES_RESET", "RADIO_RESET"]);
    }

    #[test]
    fn test_derived_values() {
        let (_, status) = decode(&typical());
        assert!((status.battery_temp_kelvin() - 298.15).abs() < 1e-9);
        assert!((status.on_temp_kelvin() - 293.15).abs() < 1e-9);
        assert!((status.lander_voltage() - 28.90166925).abs() < 1e-6);
        assert!((status.vcc28_voltage() - 30.21627648).abs() < 1e-6);
        assert!((status.fused_lander_voltage() - 29.33987166).abs() < 1e-6);
        assert_eq!(status.duty_cycle_percent(), 25.0);
        assert!((status.effective_power() - 0.0856381735).abs() < 1e-9);
        assert_eq!(status.duty_cycle_period_ms(), 0.5);
        assert!((status.i2c_battery_voltage() - 3.997253375).abs() < 1e-9);
        assert_eq!(status.battery_charging_temp_kelvin(), 0.0);
        assert_eq!(status.pwm_limit_duty_cycle_percent(), 0.0);
        assert_eq!(status.effective_power_limit(), 0.0);
    }

    #[test]
    fn test_fused_voltage_discards_failed_sensor() {
        // The lander sensor reads zero; the other one wins.
        let (_, status) = decode(&frame(&[("Adc_Vcc28VoltageRaw", 50)]));
        assert_eq!(status.fused_lander_voltage(), status.vcc28_voltage());
        let (_, status) = decode(&frame(&[]));
        assert_eq!(status.fused_lander_voltage(), 0.0);
        assert_eq!(status.duty_cycle_percent(), f64::INFINITY);
    }

    #[test]
    fn test_telemetry_covers_module() {
        let ctx = test_support::ctx();
        let (packet, _) = decode(&typical());
        let module = ctx
            .standards
            .prebuilt(prebuilt::WATCHDOG_DETAILED_STATUS)
            .unwrap();
        let payloads = packet.payloads();
        assert_eq!(payloads.all_payloads_count(), module.telemetry.len());
        assert_eq!(
            test_support::sample(payloads, "WatchdogDetailedStatus.Watchdog_State"),
            Some(Value::from("RS_MISSION"))
        );
        assert_eq!(
            test_support::sample(payloads, "WatchdogDetailedStatus.Io_BatteryState"),
            Some(Value::from("LATCHED_CONNECTED"))
        );
        assert_eq!(
            test_support::sample(payloads, "WatchdogDetailedStatus.Adc_LanderVoltageRaw"),
            Some(Value::Unsigned(3200))
        );
    }

    #[test]
    fn test_summary() {
        let (packet, _) = decode(&typical());
        let text = packet.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(
            lines[0],
            "#42 [RS_MISSION + DEPLOYED] \tCHARGER: DONE_CHARGING \tBATTERIES: \
             LATCHED_CONNECTED \tHerc-UART0: INITIALIZED_&_ACTIVE \tLander-UART1: OFF"
        );
        assert!(lines[3].starts_with("HEATER [↑293K (1574) | ↓298K (1365)] \t is HEATING"));
        assert_eq!(lines[6], "Reset/Flag Events: [HERCULES_RESET, RADIO_RESET]");
    }

    #[test]
    fn test_battery_curve_endpoints() {
        assert_eq!(battery_adc_to_kelvin(4095), -55.0 + 273.15);
        assert_eq!(battery_adc_to_kelvin(0), 155.0 + 273.15);
    }
}
