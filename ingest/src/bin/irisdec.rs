// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

use anyhow::Context as _;
use clap::Parser;
use clap::Subcommand;
use iris_decode::payload::CommandKind;
use iris_decode::DataStandards;
use iris_decode::Packet;
use iris_ingest::ingest::split_assignment;
use iris_ingest::ConfigBuilder;
use iris_ingest::Ingestor;
use iris_messages::DataSource;
use iris_messages::Endianness;
use iris_messages::Pathway;
use iris_messages::MTU_HERCULES;
use itertools::Itertools;
use slog::Level;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::Table;
use tabled::Tabled;

fn parse_log_level(s: &str) -> Result<Level, String> {
    s.parse().map_err(|_| String::from("invalid log level"))
}

/// Decode and encode Iris lunar rover packets.
///
/// Buffers are given as hex. Only the prebuilt ground modules are loaded, so
/// packets that reference flight-software modules decode as unsupported.
#[derive(Parser)]
#[command(version, about, long_about)]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,

    /// Byte order of numeric fields.
    #[arg(short, long, value_enum, default_value_t = Endianness::Little)]
    endianness: Endianness,

    /// The pathway to stamp on decoded payloads.
    #[arg(short, long, value_enum, default_value_t = Pathway::None)]
    pathway: Pathway,

    /// The data source to stamp on decoded payloads.
    #[arg(short, long, value_enum, default_value_t = DataSource::None)]
    source: DataSource,

    /// Buffers longer than this many bytes are rejected.
    #[arg(short, long, default_value_t = MTU_HERCULES)]
    max_packet_size: usize,

    /// The log-level.
    #[arg(
        short,
        long,
        default_value_t = Level::Info,
        value_parser = parse_log_level
    )]
    log_level: Level,
}

#[derive(Subcommand)]
enum Cmd {
    /// Decode one or more hex buffers.
    Decode {
        /// Each buffer, as hex.
        #[arg(required = true)]
        hex: Vec<String>,

        /// Print each packet's serialized form as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Decode a file holding one hex buffer per line.
    DecodeFile {
        path: PathBuf,

        /// Print each packet's serialized form as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build a command and print the common packet carrying it, as hex.
    EncodeCommand {
        /// The name of the module that owns the command.
        #[arg(long)]
        module: String,

        /// The full name of the command.
        #[arg(long)]
        command: String,

        /// The packet sequence number.
        #[arg(long, default_value_t = 0)]
        seq: u8,

        /// Encode enum arguments one byte wide, as the Watchdog expects.
        #[arg(long)]
        watchdog: bool,

        /// Arguments, as NAME=VALUE.
        args: Vec<String>,
    },

    /// List the loaded modules.
    Standards,
}

#[derive(Tabled)]
struct TelemetryRow {
    #[tabled(rename = "Channel")]
    channel: String,
    #[tabled(rename = "Time (ms)")]
    timestamp: u32,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ModuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Module")]
    name: String,
    #[tabled(rename = "Commands")]
    commands: usize,
    #[tabled(rename = "Telemetry")]
    telemetry: usize,
    #[tabled(rename = "Events")]
    events: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ConfigBuilder::new()
        .endianness(args.endianness)
        .pathway(args.pathway)
        .source(args.source)
        .max_packet_size(args.max_packet_size)
        .log_level(args.log_level)
        .build()?;
    let log = iris_ingest::build_logger(config.log_level);

    let standards = Arc::new(
        DataStandards::with_prebuilt().context("failed to build the prebuilt modules")?,
    );
    let ingestor = Ingestor::new(config, Arc::clone(&standards), log)?;

    match args.cmd {
        Cmd::Decode { hex, json } => {
            for text in hex.iter() {
                let data = iris_ingest::parse_hex(text)?;
                print_packet(&ingestor, &data, json)?;
            }
        }
        Cmd::DecodeFile { path, json } => {
            let buffers = iris_ingest::read_hex_file(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            for data in buffers.iter() {
                print_packet(&ingestor, data, json)?;
            }
        }
        Cmd::EncodeCommand {
            module,
            command,
            seq,
            watchdog,
            args,
        } => {
            let kind = if watchdog {
                CommandKind::Watchdog
            } else {
                CommandKind::Standard
            };
            let assignments = args
                .iter()
                .map(|a| split_assignment(a))
                .collect::<Result<Vec<_>, _>>()?;
            let payload = ingestor.build_command(kind, &module, &command, &assignments)?;
            println!("{payload}");
            let packet = Packet::Common(ingestor.command_packet(seq, payload)?);
            let bytes = packet.encode(ingestor.context())?;
            println!("{}", bytes.iter().map(|b| format!("{b:02X}")).join(" "));
        }
        Cmd::Standards => print_standards(&standards),
    }
    Ok(())
}

fn print_packet(ingestor: &Ingestor, data: &[u8], json: bool) -> anyhow::Result<()> {
    let packet = ingestor.ingest(data)?;
    if json {
        let serialized = packet.to_serialized(ingestor.context());
        println!("{}", serde_json::to_string_pretty(&serialized)?);
        return Ok(());
    }

    println!("{packet}");
    let rows: Vec<_> = packet
        .payloads()
        .telemetry()
        .map(|t| TelemetryRow {
            channel: t.label().to_string(),
            timestamp: t.timestamp(),
            value: t.data().to_string(),
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }
    for event in packet.payloads().events() {
        println!("{event}");
    }
    for command in packet.payloads().commands() {
        println!("{command}");
    }
    Ok(())
}

fn print_standards(standards: &DataStandards) {
    let rows = standards
        .modules()
        .sorted_by_key(|m| m.id)
        .map(|m| ModuleRow {
            id: format!("0x{:02X}", m.id),
            name: m.name.clone(),
            commands: m.commands.len(),
            telemetry: m.telemetry.len(),
            events: m.events.len(),
        });
    println!("{}", Table::new(rows));
}
