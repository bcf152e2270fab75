// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! Modules the packet decoders depend on by name.
//!
//! Packets that do not carry opcodes of their own (heartbeats, detailed
//! status, radio-ground messages, and so on) are expressed as telemetry and
//! events against these modules. They must be present in whatever registry a
//! decoder is given.

use crate::standards::Argument;
use crate::standards::Bitfields;
use crate::standards::Command;
use crate::standards::EnumItem;
use crate::standards::Event;
use crate::standards::Module;
use crate::standards::Severity;
use crate::standards::TelemetryChannel;
use crate::Error;
use iris_messages::FswDataType;
use iris_messages::FswDataType::*;

pub const WATCHDOG_HEARTBEAT: &str = "WatchdogHeartbeat";
pub const WATCHDOG_HEARTBEAT_TVAC: &str = "WatchdogHeartbeatTvac";
pub const WATCHDOG_DETAILED_STATUS: &str = "WatchdogDetailedStatus";
pub const WATCHDOG_COMMAND_RESPONSE: &str = "WatchdogCommandResponse";
pub const GDS_PACKETS: &str = "GdsPackets";
pub const RADIO_GROUND: &str = "RadioGround";

/// The flight-defined Watchdog command module. It is not prebuilt, but
/// command responses and reset acknowledgements name its commands when it is
/// present.
pub const WATCHDOG_INTERFACE: &str = "WatchDogInterface";

/// Every prebuilt module, in the order they are checked at startup.
pub const ALL: [&str; 6] = [
    WATCHDOG_HEARTBEAT,
    WATCHDOG_HEARTBEAT_TVAC,
    WATCHDOG_DETAILED_STATUS,
    WATCHDOG_COMMAND_RESPONSE,
    GDS_PACKETS,
    RADIO_GROUND,
];

/// The single argument of every `GdsPackets` event.
pub const GDS_MESSAGE_ARG: &str = "msg";

/// The events raised just by receiving a packet of a given kind, in id order.
pub const GDS_PACKET_EVENTS: [(&str, Severity); 13] = [
    ("RadioBgApiPacket", Severity::ActivityLo),
    ("RadioDirectMessagePacket", Severity::ActivityHi),
    ("RadioUartBytePacket", Severity::Diagnostic),
    ("UnsupportedPacket", Severity::Diagnostic),
    ("WatchdogCommandResponsePacket", Severity::Command),
    ("WatchdogDebugPacket", Severity::ActivityLo),
    ("WatchdogDebugImportantPacket", Severity::ActivityHi),
    ("WatchdogHelloPacket", Severity::Command),
    ("WatchdogRadioDebugPacket", Severity::ActivityHi),
    ("WatchdogResetSpecificAckPacket", Severity::Command),
    ("RadioDownlinkFlushPacket", Severity::Diagnostic),
    ("HerculesRadioUplinkAckPacket", Severity::ActivityLo),
    ("WatchdogSafetyTimerPacket", Severity::ActivityHi),
];

/// Build all six prebuilt modules.
pub fn modules() -> Result<Vec<Module>, Error> {
    Ok(vec![
        watchdog_heartbeat()?,
        watchdog_heartbeat_tvac()?,
        watchdog_detailed_status()?,
        watchdog_command_response()?,
        gds_packets()?,
        radio_ground()?,
    ])
}

fn tlm(id: u8, name: &str, datatype: FswDataType) -> TelemetryChannel {
    TelemetryChannel::new(id, name, datatype)
}

fn enum_tlm(id: u8, name: &str, values: &[(&str, i64)]) -> TelemetryChannel {
    tlm(id, name, Enum).with_enum(items(values))
}

fn items(values: &[(&str, i64)]) -> Vec<EnumItem> {
    values.iter().map(|(n, v)| EnumItem::new(*n, *v)).collect()
}

fn arg(name: &str, datatype: FswDataType) -> Argument {
    Argument::new(name, datatype)
}

fn enum_arg(name: &str, values: &[(&str, i64)]) -> Argument {
    Argument::new(name, Enum).with_enum(items(values))
}

const ROVER_MODES: [(&str, i64); 9] = [
    ("INIT", 0),
    ("ENTERING_KEEP_ALIVE", 7),
    ("KEEP_ALIVE", 8),
    ("ENTERING_SERVICE", 3),
    ("SERVICE", 4),
    ("ENTERING_MISSION", 15),
    ("MISSION", 16),
    ("ENTERING_STASIS", 31),
    ("STASIS", 32),
];

pub fn watchdog_heartbeat() -> Result<Module, Error> {
    Module::new(
        0xFB,
        WATCHDOG_HEARTBEAT,
        vec![],
        vec![
            tlm(0x00, "BattAdcTempRaw", U8),
            tlm(0x01, "BattAdcTempKelvin", F64),
            tlm(0x10, "ChargeRaw", U8),
            tlm(0x11, "ChargeMah", F64),
            tlm(0x12, "ChargePercent", F64),
            tlm(0x22, "BatteryVoltageOk", U8),
            tlm(0x30, "CurrentRaw", U8),
            tlm(0x31, "CurrentMilliamps", F64),
            tlm(0x57, "HeaterStatus", U8),
        ],
        vec![],
    )
}

pub fn watchdog_heartbeat_tvac() -> Result<Module, Error> {
    Module::new(
        0xFA,
        WATCHDOG_HEARTBEAT_TVAC,
        vec![],
        vec![
            tlm(0x00, "AdcTempRaw", U16),
            tlm(0x01, "AdcTempKelvin", F64),
            tlm(0x10, "ChargeRaw", U16),
            tlm(0x11, "ChargeMah", F64),
            tlm(0x20, "VoltageRaw", U16),
            tlm(0x21, "Voltage", F64),
            tlm(0x30, "CurrentRaw", U16),
            tlm(0x31, "CurrentAmps", F64),
            tlm(0x40, "FuelTempRaw", U16),
            tlm(0x41, "FuelTempKelvin", F64),
            tlm(0x50, "KpHeater", U16),
            tlm(0x51, "HeaterSetpoint", U16),
            tlm(0x52, "HeaterSetpointKelvin", F64),
            tlm(0x53, "HeaterWindow", U16),
            tlm(0x54, "HeaterWindowKelvin", F64),
            tlm(0x55, "HeaterPwmLimit", U16),
            enum_tlm(0x56, "WatchdogMode", &ROVER_MODES),
            tlm(0x57, "HeaterStatus", U8),
            tlm(0x58, "HeatingControlEnabled", U8),
            tlm(0x59, "HeaterPwmDutyCycle", U16),
        ],
        vec![],
    )
}

/// Raw output pin states, one bit each, in wire order.
pub const DIGITAL_OUTPUT_FLAGS: [&str; 30] = [
    "OPSBI__V_LANDER_REG_EN",
    "OPSBI__HEATER",
    "OPSBI__DEPLOYMENT",
    "OPSBI__FPGA_KICK_AKA_CAM_SELECT",
    "OPSBI__LATCH_BATT",
    "OPSBI__3V3_EN",
    "OPSBI__HERCULES_ON",
    "OPSBI__FPGA_ON",
    "OPSBI__MOTOR_ON",
    "OPSBI__CHRG_EN",
    "OPSBI__CHRG_EN_FORCE_HIGH",
    "OPSBI__BATTERY_EN",
    "OPSBI__V_SYS_ALL_EN",
    "OPSBI__V_SYS_ALL_EN_FORCE_LOW",
    "OPSBI__HERCULES_N_RST",
    "OPSBI__HERCULES_N_PORRST",
    "OPSBI__FPGA_N_RST",
    "OPSBI__RADIO_N_RST",
    "OPSBI__RADIO_ON",
    "OPSBI__BMS_BOOT",
    "OPSBI__LATCH_SET",
    "OPSBI__LATCH_RESET",
    "OPSBI__BATT_STAT",
    "OPSBI__RADIO_N_RESET_IS_INPUT",
    "OPSBI__HERCULES_N_RST_IS_INPUT",
    "OPSBI__HERCULES_N_PORRST_IS_INPUT",
    "OPSBI__FPGA_N_RST_IS_INPUT",
    "OPSBI__LATCH_SET_IS_INPUT",
    "OPSBI__LATCH_RESET_IS_INPUT",
    "OPSBI__BATT_STAT_IS_INPUT",
];

/// Combined pin states. Two-bit fields are tri-state: 0 low, 1 high, 2
/// high-impedance input.
pub const COMBINED_DIGITAL_STATES: [(&str, u8); 21] = [
    ("V_LANDER_REG_EN", 1),
    ("HEATER", 1),
    ("DEPLOYMENT", 1),
    ("FPGA_KICK_AKA_CAM_SELECT", 1),
    ("LATCH_BATT", 1),
    ("3V3_EN", 1),
    ("HERCULES_ON", 1),
    ("FPGA_ON", 1),
    ("MOTOR_ON", 1),
    ("CHRG_EN", 2),
    ("BATTERY_EN", 1),
    ("V_SYS_ALL_EN", 2),
    ("HERCULES_N_RST", 2),
    ("HERCULES_N_PORRST", 2),
    ("FPGA_N_RST", 2),
    ("RADIO_N_RST", 2),
    ("RADIO_ON", 1),
    ("BMS_BOOT", 1),
    ("LATCH_SET", 2),
    ("LATCH_RESET", 2),
    ("BATT_STAT", 2),
];

/// Reset actions the Watchdog has taken, one bit each, in wire order.
pub const RESET_LOG_FLAGS: [&str; 38] = [
    "RABI__NO_RESET",
    "RABI__HERCULES_RESET",
    "RABI__HERCULES_UNRESET",
    "RABI__HERCULES_POWER_ON",
    "RABI__HERCULES_POWER_OFF",
    "RABI__RADIO_RESET",
    "RABI__RADIO_UNRESET",
    "RABI__RADIO_POWER_ON",
    "RABI__RADIO_POWER_OFF",
    "RABI__CAM_FPGA_RESET",
    "RABI__CAM_FPGA_UNRESET",
    "RABI__CAM_FPGA_POWER_ON",
    "RABI__CAM_FPGA_POWER_OFF",
    "RABI__ALL_MOTORS_POWER_ON",
    "RABI__ALL_MOTORS_POWER_OFF",
    "RABI__3V3_EN_RESET",
    "RABI__3V3_EN_UNRESET",
    "RABI__3V3_EN_POWER_ON",
    "RABI__3V3_EN_POWER_OFF",
    "RABI__V_SYS_ALL_OFF__RESET",
    "RABI__V_SYS_ALL_ON__UNRESET",
    "RABI__V_SYS_ALL_POWER_ON",
    "RABI__V_SYS_ALL_POWER_OFF",
    "RABI__HDRM_DEPLOY_SIGNAL_POWER_OFF",
    "RABI__FPGA_CAM_0_SELECT",
    "RABI__FPGA_CAM_1_SELECT",
    "RABI__BATTERY_CHARGE_START",
    "RABI__BATTERY_CHARGE_STOP",
    "RABI__RS422_UART_ENABLE",
    "RABI__RS422_UART_DISABLE",
    "RABI__AUTO_HEATER_CONTROLLER_ENABLE",
    "RABI__AUTO_HEATER_CONTROLLER_DISABLE",
    "RABI__HERCULES_WATCHDOG_ENABLE",
    "RABI__HERCULES_WATCHDOG_DISABLE",
    "RABI__BATTERIES_ENABLE",
    "RABI__BATTERIES_DISABLE",
    "RABI__HDRM_DEPLOY_SIGNAL_POWER_ON",
    "RABI__HERCULES_WATCHDOG_RESET",
];

pub fn watchdog_detailed_status() -> Result<Module, Error> {
    const POWER_GOOD: [(&str, i64); 2] = [("BAD", 0), ("GOOD", 1)];
    const UART: [(&str, i64); 2] = [("OFF", 0), ("INITIALIZED_&_ACTIVE", 1)];
    let states: Vec<(String, i64)> = ROVER_MODES
        .iter()
        .map(|(n, v)| (format!("RS_{n}"), *v))
        .collect();
    let states: Vec<(&str, i64)> = states.iter().map(|(n, v)| (n.as_str(), *v)).collect();
    let combined = Bitfields::new(
        COMBINED_DIGITAL_STATES
            .iter()
            .map(|(n, w)| (n.to_string(), *w))
            .collect(),
        2,
    );

    Module::new(
        0xFC,
        WATCHDOG_DETAILED_STATUS,
        vec![],
        vec![
            tlm(0x00, "Io_ChargingStatus1", U8),
            tlm(0x01, "Io_ChargingStatus2", U8),
            enum_tlm(
                0x02,
                "Io_ChargerState",
                &[("OFF", 0), ("CHARGING", 1), ("DONE_CHARGING", 2), ("FAULT", 3)],
            ),
            enum_tlm(
                0x03,
                "Io_BatteryConnectionStatus",
                &[("DISCONNECTED", 0), ("CONNECTED", 1)],
            ),
            enum_tlm(
                0x04,
                "Io_BatteryLatchStatus",
                &[("NOT_LATCHED", 0), ("LATCHED", 1)],
            ),
            enum_tlm(
                0x05,
                "Io_BatteryState",
                &[
                    ("DISCONNECTED", 0),
                    ("OR_GATE__FAULT", 1),
                    ("TEMP_CONNECTED", 2),
                    ("LATCHED_CONNECTED", 3),
                ],
            ),
            enum_tlm(0x06, "Io_1V2PowerGood", &POWER_GOOD),
            enum_tlm(0x07, "Io_1V8PowerGood", &POWER_GOOD),
            enum_tlm(0x08, "Io_3V3PowerGood", &POWER_GOOD),
            enum_tlm(0x09, "Io_5V0PowerGood", &POWER_GOOD),
            enum_tlm(0x10, "Watchdog_State", &states),
            enum_tlm(
                0x11,
                "Watchdog_DeploymentStatus",
                &[("NOT_DEPLOYED", 0), ("DEPLOYING", 1), ("DEPLOYED", 2)],
            ),
            enum_tlm(0x12, "Watchdog_Uart0State", &UART),
            enum_tlm(0x13, "Watchdog_Uart1State", &UART),
            tlm(0x14, "Watchdog_DetailedHeartbeatSequenceNumber", U8),
            tlm(0x15, "Watchdog_DigitalOutputStates", U32)
                .with_bitfields(Bitfields::flags(&DIGITAL_OUTPUT_FLAGS, 2)),
            tlm(0x17, "Watchdog_CombinedDigitalStates", U32).with_bitfields(combined),
            tlm(0x18, "Watchdog_ResetLogs", U64)
                .with_bitfields(Bitfields::flags(&RESET_LOG_FLAGS, 26)),
            tlm(0x20, "Adc_LanderVoltageRaw", U16),
            tlm(0x21, "Adc_LanderVoltage", F64),
            tlm(0x22, "Adc_BatteryChargingTempRaw", U16),
            tlm(0x23, "Adc_BatteryChargingTempKelvin", F64),
            tlm(0x24, "Adc_BatteryChargingTempUncertaintyKelvin", F64),
            tlm(0x25, "Adc_BatteryTempRaw", U16),
            tlm(0x26, "Adc_BatteryTempKelvin", F64),
            tlm(0x27, "Adc_BatteryTempUncertaintyKelvin", F64),
            tlm(0x28, "Adc_FullSystemVoltageRaw", U16),
            tlm(0x29, "Adc_FullSystemVoltage", F64),
            tlm(0x2A, "Adc_FullSystemCurrentRaw", U16),
            tlm(0x2B, "Adc_FullSystemCurrent", F64),
            tlm(0x2C, "Adc_SwitchedBatteryVoltageRaw", U16),
            tlm(0x2D, "Adc_SwitchedBatteryVoltage", F64),
            tlm(0x30, "Adc_2V5VoltageRaw", U16),
            tlm(0x31, "Adc_2V5Voltage", F64),
            tlm(0x32, "Adc_2V8VoltageRaw", U16),
            tlm(0x33, "Adc_2V8Voltage", F64),
            tlm(0x34, "Adc_Vcc28VoltageRaw", U16),
            tlm(0x35, "Adc_Vcc28Voltage", F64),
            tlm(0x36, "Adc_Vcc24VoltageRaw", U16),
            tlm(0x37, "Adc_Vcc24Voltage", F64),
            tlm(0x40, "Heater_Kp", U16),
            tlm(0x41, "Heater_PwmLimit_DutyCycleCounter", U16),
            tlm(0x42, "Heater_PwmLimit_DutyCyclePercent", F64),
            tlm(0x43, "Heater_EffectivePowerLimit", F64),
            tlm(0x44, "Heater_SetpointValue", U16),
            tlm(0x45, "Heater_SetpointKelvin", F64),
            tlm(0x46, "Heater_OnValue", U16),
            tlm(0x47, "Heater_OnTempKelvin", F64),
            tlm(0x48, "Heater_OffValue", U16),
            tlm(0x49, "Heater_OffTempKelvin", F64),
            enum_tlm(
                0x4A,
                "Heater_ControlEnabled",
                &[("DISABLED", 0), ("ENABLED", 1)],
            ),
            enum_tlm(
                0x4B,
                "Heater_IsHeating",
                &[("NOT_HEATING", 0), ("HEATING", 1)],
            ),
            tlm(0x4C, "Heater_DutyCyclePeriodCycles", U16),
            tlm(0x4D, "Heater_DutyCyclePeriodMs", F64),
            tlm(0x4E, "Heater_DutyCycleCounter", U16),
            tlm(0x4F, "Heater_DutyCyclePercent", F64),
            tlm(0x50, "Heater_EffectiveVoltage", F64),
            tlm(0x51, "Heater_EffectivePower", F64),
            tlm(0x60, "I2C_BatteryChargeRaw", U16),
            tlm(0x61, "I2C_BatteryChargeMah", F64),
            tlm(0x62, "I2C_BatteryVoltageRaw", U16),
            tlm(0x63, "I2C_BatteryVoltage", F64),
            tlm(0x64, "I2C_BatteryCurrentRaw", U16),
            tlm(0x65, "I2C_BatteryCurrent", F64),
            tlm(0x66, "I2C_FuelGaugeTempRaw", U16),
            tlm(0x67, "I2C_FuelGaugeTempKelvin", F64),
            tlm(0x68, "I2C_BatteryChargeTelemRaw", U16),
            tlm(0x69, "I2C_BatteryChargeTelemMah", F64),
            tlm(0x6A, "I2C_BatteryCurrentTelemRaw", U8),
            tlm(0x6B, "I2C_BatteryCurrentTelemAmps", F64),
        ],
        vec![],
    )
}

pub fn watchdog_command_response() -> Result<Module, Error> {
    let flags = vec![
        EnumItem::new("NO_ERROR", 0x00).with_comment("Command processed correctly."),
        EnumItem::new("BAD_PACKET_LENGTH", 0x01).with_comment(
            "Given packet length doesn't match the actual length of the data. \
             Note: associated reply command ID may be wrong.",
        ),
        EnumItem::new("CHECKSUM_FAILED", 0x02).with_comment(
            "Checksum of data doesn't match given checksum. Possible packet \
             corruption. Note: associated reply command ID may be wrong.",
        ),
        EnumItem::new("BAD_MODULE_ID", 0x03).with_comment(
            "Incorrect Module ID received (not the watchdog ID). \
             Note: associated reply command ID may be wrong.",
        ),
        EnumItem::new("BAD_COMMAND_ID", 0x04).with_comment(
            "Command ID received doesn't match any known command. \
             Note: associated reply command ID may be wrong.",
        ),
        EnumItem::new("BAD_COMMAND_PARAMETER", 0x05).with_comment(
            "Command parameter isn't formatted correctly or doesn't match an \
             expected value.",
        ),
        EnumItem::new("BAD_COMMAND_SEND_ORDER", 0x06)
            .with_comment("Command received in the wrong order."),
        EnumItem::new("DEPLOYMENT_SIGNAL_SENT", 96)
            .with_comment("Watchdog deployment interlock released."),
    ];
    Module::new(
        0xFD,
        WATCHDOG_COMMAND_RESPONSE,
        vec![],
        vec![
            tlm(0x00, "CommandId", U8),
            tlm(0x01, "ErrorFlag", Enum).with_enum(flags),
        ],
        vec![],
    )
}

pub fn gds_packets() -> Result<Module, Error> {
    let events = GDS_PACKET_EVENTS
        .iter()
        .zip(0u8..)
        .map(|((name, severity), id)| {
            Event::new(
                id,
                *name,
                *severity,
                "%s",
                vec![arg(GDS_MESSAGE_ARG, VarString10k)],
            )
        })
        .collect();
    Module::new(0xCF, GDS_PACKETS, vec![], vec![], events)
}

pub const RADIO_STATE_ABBRS: [(&str, i64); 6] = [
    ("BOOT", 0),
    ("INIT", 1),
    ("WFON", 2),
    ("CONN", 3),
    ("UDPC", 4),
    ("CRPT", 0xFF),
];

const RADIO_COMMAND_IDS: [(&str, i64); 7] = [
    ("ECHO", 0x00),
    ("RESET_RADIO", 0xBB),
    ("ENTER_STASIS", 0xE5),
    ("EXIT_STASIS", 0x5E),
    ("WRITE_UART", 0xDB),
    ("HERCULES_DM", 0xDD),
    ("CORRUPTED", 0xFF),
];

const BGAPI_ERRORS: [(&str, i64); 54] = [
    ("NO_ERROR", 0x0000),
    ("INVALID_PARAMETER", 0x0180),
    ("DEVICE_WRONG_STATE", 0x0181),
    ("OUT_OF_MEMORY", 0x0182),
    ("FEATURE_NOT_IMPLEMENTED", 0x0183),
    ("COMMAND_NOT_RECOGNIZED", 0x0184),
    ("TIMEOUT", 0x0185),
    ("UNSPECIFIED_ERROR", 0x0186),
    ("HARDWARE_FAILURE", 0x0187),
    ("INTERNAL_BUFFER_FULL", 0x0188),
    ("DISCONNECTED", 0x0189),
    ("TOO_MANY_REQUEST", 0x018A),
    ("ACCESS_POINT_NOT_IN_SCANLIST", 0x018B),
    ("INVALID_PASSWORD", 0x018C),
    ("AUTHENTICATION_FAILURE", 0x018D),
    ("OVERFLOW", 0x018E),
    ("MULTIPLE_PBC_SESSIONS", 0x018F),
    ("ETHERNET_NOT_CONNECTED", 0x0190),
    ("ETHERNET_ROUTE_NOT_SET", 0x0191),
    ("WRONG_OPERATING_MODE", 0x0192),
    ("WIFI_NOT_FOUND", 0x0193),
    ("WIFI_NOT_ALREADY_EXIST", 0x0194),
    ("WIFI_INVALID_CONFIGURATION", 0x0195),
    ("WIFI_ACCESS_POINT_LOST", 0x0196),
    ("PS_STORE_FULL", 0x0301),
    ("PS_KEY_NOT_FOUND", 0x0302),
    ("I2C_WRITE_ALREADY_IN_PROGRESS", 0x0303),
    ("I2C_ACK_MISSING", 0x0304),
    ("FILE_NOT_OPENED", 0x0305),
    ("FILE_NOT_FOUND", 0x0306),
    ("DISK_ERROR", 0x0307),
    ("FLASH_WRITE_FAILED", 0x0308),
    ("TCP_IP_SUCCESS", 0x0200),
    ("TCP_IP_OUT_OF_MEMORY", 0x0201),
    ("TCP_IP_BUFFER_ERROR", 0x0202),
    ("TCP_IP_TIMEOUT", 0x0203),
    ("TCP_IP_ROUTING", 0x0204),
    ("TCP_IP_IN_PROGRESS", 0x0205),
    ("TCP_IP_ILLEGAL_VALUE", 0x0206),
    ("TCP_IP_WOULD_BLOCK", 0x0207),
    ("TCP_IP_ADDRESS_IN_USE", 0x0208),
    ("TCP_IP_ALREADY_CONNECTED", 0x0209),
    ("TCP_IP_CONNECTION_ABORTED", 0x020A),
    ("TCP_IP_CONNECTION_RESET", 0x020B),
    ("TCP_IP_CONNECTION_CLOSED", 0x020C),
    ("TCP_IP_NOT_CONNECTED", 0x020D),
    ("TCP_IP_ILLEGAL_ARGUMENT", 0x020E),
    ("TCP_IP_INTERFACE_LEVEL_ERROR", 0x020F),
    ("TCP_IP_SERVICE_NOT_RUNNING", 0x0210),
    ("TCP_IP_SERVICE_RUNNING", 0x0211),
    ("TCP_IP_HOSTNAME_NOT_SET", 0x0212),
    ("TCP_IP_HOSTNAME_CONFLICT", 0x0213),
    ("TCP_IP_UNKNOWN_HOST", 0x0280),
    ("OTHER__UNEXPECTED", 0xFFFF),
];

pub fn radio_ground() -> Result<Module, Error> {
    let command_args = || {
        vec![
            enum_arg("command", &RADIO_COMMAND_IDS),
            arg("string_of_command_data", VarString255),
        ]
    };
    let commands = vec![
        Command::new(
            0x00,
            "RadioGround_Echo",
            vec![arg("text_to_echo", VarString255)],
        )
        .with_mnemonic("Echo"),
        Command::new(
            0xBB,
            "RadioGround_ResetRadio",
            vec![arg("confirm_by_typing_RESET", String5)],
        )
        .with_mnemonic("ResetRadio"),
        Command::new(
            0xE5,
            "RadioGround_EnterStasis",
            vec![arg("confirm_by_typing_STASIS", String6)],
        )
        .with_mnemonic("EnterStasis"),
        Command::new(
            0x5E,
            "RadioGround_ExitStasis",
            vec![arg("confirm_by_typing_STASIS", String6)],
        )
        .with_mnemonic("ExitStasis"),
        Command::new(
            0xDB,
            "RadioGround_WriteUart",
            vec![arg("text_to_echo", VarString255)],
        )
        .with_mnemonic("WriteUart"),
        Command::new(
            0xDD,
            "RadioGround_HerculesDm",
            vec![arg("text_to_echo", VarString255)],
        )
        .with_mnemonic("HerculesDm"),
    ];
    let events = vec![
        Event::new(
            0x00,
            "Heartbeat",
            Severity::ActivityLo,
            "Radio Heartbeat: %s with %d RSSI at %s.",
            vec![
                enum_arg("state_abbr", &RADIO_STATE_ABBRS),
                arg("rssi", I16),
                arg("uptime_str", VarString255),
            ],
        ),
        Event::new(
            0x01,
            "Connected",
            Severity::ActivityHi,
            "Radio (Re)Connected: %s",
            vec![arg("message", String39)],
        ),
        Event::new(
            0x02,
            "Echo",
            Severity::Command,
            "Radio Echoed: '%s'.",
            vec![arg("echoed_text", VarString255)],
        ),
        Event::new(
            0x10,
            "GotCommand",
            Severity::Command,
            "Radio got command '%s' with data: `%s`.",
            command_args(),
        ),
        Event::new(
            0x11,
            "DidCommand",
            Severity::Command,
            "Radio successfully executed command '%s' with data: `%s`.",
            command_args(),
        ),
        Event::new(
            0x1F,
            "BadCommand",
            Severity::Command,
            "Radio failed to execute a command '%s' with data: `%s`.",
            command_args(),
        ),
        Event::new(
            0xF0,
            "BadHerculesPacket",
            Severity::WarningLo,
            "Radio received a bad packet from Hercules. Issue: %s.",
            vec![enum_arg("issue", &BGAPI_ERRORS)],
        ),
        Event::new(
            0xF1,
            "BadEndpointData",
            Severity::WarningLo,
            "One of the Radio's routing endpoints experienced an issue. \
             Endpoint: %d, Issue: %s.",
            vec![arg("endpoint", U8), enum_arg("issue", &BGAPI_ERRORS)],
        ),
        Event::new(
            0xF2,
            "BadUdp",
            Severity::WarningHi,
            "Radio received %s in UDP packet with IP=%s, Port=%d.",
            vec![
                enum_arg(
                    "issue",
                    &[
                        ("NOTHING__THIS_SHOULD_NOT_HAPPEN", 0),
                        ("BAD_IP", 1),
                        ("BAD_PORT", 2),
                        ("BAD_IP_AND_PORT", 3),
                    ],
                ),
                arg("ip", String15),
                arg("port", U16),
            ],
        ),
        Event::new(
            0xF3,
            "CriticalReset",
            Severity::Fatal,
            "Radio had to reset itself due to a critical (unrecoverable) issue \
             it discovered during self-monitoring: %s.",
            vec![enum_arg("issue", &BGAPI_ERRORS)],
        ),
        Event::new(
            0xF4,
            "CriticalResetDueToSoftwareException",
            Severity::Fatal,
            "Radio had to reset itself due to a critical software exception. \
             The exception occurred at memory address: 0x%04X and has \
             numerical type: %d.",
            vec![arg("memory_address", U32), arg("exception_type", U8)],
        ),
    ];
    let telemetry = vec![
        tlm(0x00, "Rssi", I16),
        enum_tlm(0x01, "StateAbbr", &RADIO_STATE_ABBRS),
        tlm(0x02, "UptimeTicks", U32),
        tlm(0x03, "UptimeMs", U32),
        tlm(0x04, "UdpRxPacketCount", U32),
        tlm(0x05, "BadHercPacketCount", U32),
        tlm(0x06, "HerculesUdpInterlockCountingSemaphore", U8),
    ];
    Module::new(0xEF, RADIO_GROUND, commands, telemetry, events)
}

#[cfg(test)]
mod tests {
    use super::modules;
    use super::radio_ground;
    use super::watchdog_detailed_status;
    use super::ALL;
    use super::COMBINED_DIGITAL_STATES;
    use super::GDS_PACKET_EVENTS;
    use iris_messages::FswDataType;

    #[test]
    fn test_prebuilt_names_match() {
        let built = modules().unwrap();
        let names: Vec<_> = built.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ALL.to_vec());
    }

    #[test]
    fn test_gds_events_are_numbered_in_order() {
        let gds = super::gds_packets().unwrap();
        for (id, (name, _)) in GDS_PACKET_EVENTS.iter().enumerate() {
            let event = gds.event(name).unwrap();
            assert_eq!(usize::from(event.id), id);
            assert_eq!(event.args[0].datatype, FswDataType::VarString10k);
        }
    }

    #[test]
    fn test_detailed_status_bitfields_fill_their_words() {
        let module = watchdog_detailed_status().unwrap();
        let outputs = module.channel("Watchdog_DigitalOutputStates").unwrap();
        assert_eq!(outputs.field.bitfields.as_ref().unwrap().total_bits(), 32);
        let combined = module.channel("Watchdog_CombinedDigitalStates").unwrap();
        assert_eq!(combined.field.bitfields.as_ref().unwrap().total_bits(), 32);
        let resets = module.channel("Watchdog_ResetLogs").unwrap();
        assert_eq!(resets.field.bitfields.as_ref().unwrap().total_bits(), 64);
        assert_eq!(COMBINED_DIGITAL_STATES.len(), 21);
        let state = module.channel("Watchdog_State").unwrap();
        assert_eq!(state.field.enum_name(16), Some("RS_MISSION"));
    }

    #[test]
    fn test_radio_ground_tables() {
        let module = radio_ground().unwrap();
        assert_eq!(module.id, 0xEF);
        let echo = module.commands.by_id(0x00).unwrap();
        assert_eq!(echo.mnemonic, "Echo");
        let event = module.event("BadHerculesPacket").unwrap();
        assert_eq!(event.args[0].enum_name(0x0189), Some("DISCONNECTED"));
        assert_eq!(event.args[0].enum_name(0x0280), Some("TCP_IP_UNKNOWN_HOST"));
        assert_eq!(module.channel("StateAbbr").unwrap().field.enum_value("UDPC"), Some(4));
    }
}
