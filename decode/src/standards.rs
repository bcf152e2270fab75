// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The data standards registry: modules and the commands, telemetry channels,
//! and events they define.
//!
//! The registry is built once, then shared read-only behind an `Arc`. All
//! lookups are by hash, so opcode resolution stays cheap on the decode path.

use crate::prebuilt;
use crate::Error;
use iris_messages::FswDataType;
use iris_messages::Opcode;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

/// One named value of an enumerated field.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumItem {
    pub name: String,
    pub value: i64,
    pub comment: Option<String>,
}

impl EnumItem {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// The layout of named sub-fields packed into an integer field.
///
/// Sub-fields are listed from the least-significant bit upward, and
/// `total_padding` unused bits sit above the last one.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitfields {
    pub fields: Vec<(String, u8)>,
    pub total_padding: u8,
}

impl Bitfields {
    pub fn new(fields: Vec<(String, u8)>, total_padding: u8) -> Self {
        Self {
            fields,
            total_padding,
        }
    }

    /// Every sub-field is a single bit.
    pub fn flags(names: &[&str], total_padding: u8) -> Self {
        Self::new(
            names.iter().map(|n| (n.to_string(), 1)).collect(),
            total_padding,
        )
    }

    pub fn total_bits(&self) -> usize {
        self.fields.iter().map(|(_, w)| usize::from(*w)).sum::<usize>()
            + usize::from(self.total_padding)
    }

    /// Split `value` into its named sub-fields.
    pub fn unpack(&self, value: u64) -> Vec<(String, u64)> {
        let mut shift = 0u32;
        let mut out = Vec::with_capacity(self.fields.len());
        for (name, width) in self.fields.iter() {
            let width = u32::from(*width);
            let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
            out.push((name.clone(), value.checked_shr(shift).unwrap_or(0) & mask));
            shift += width;
        }
        out
    }

    /// Combine named sub-field values into one integer. Missing sub-fields
    /// are zero; a value wider than its sub-field is an error.
    pub fn pack(&self, values: &[(&str, u64)]) -> Result<u64, Error> {
        let mut shift = 0u32;
        let mut out = 0u64;
        for (name, width) in self.fields.iter() {
            let width = u32::from(*width);
            let value = values
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .map(|(_, v)| *v)
                .unwrap_or(0);
            if width < 64 && value >> width != 0 {
                return Err(Error::Encode(format!(
                    "value {value} does not fit in the {width}-bit field {name}"
                )));
            }
            out |= value.checked_shl(shift).unwrap_or(0);
            shift += width;
        }
        Ok(out)
    }
}

/// The description of one typed field: a command or event argument, or the
/// value of a telemetry channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Argument {
    pub name: String,
    pub datatype: FswDataType,
    pub enum_items: Vec<EnumItem>,
    pub bitfields: Option<Bitfields>,
    pub comment: Option<String>,
}

impl Argument {
    pub fn new(name: impl Into<String>, datatype: FswDataType) -> Self {
        Self {
            name: name.into(),
            datatype,
            enum_items: Vec::new(),
            bitfields: None,
            comment: None,
        }
    }

    pub fn with_enum(mut self, items: Vec<EnumItem>) -> Self {
        self.enum_items = items;
        self
    }

    pub fn with_bitfields(mut self, bitfields: Bitfields) -> Self {
        self.bitfields = Some(bitfields);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_enum(&self) -> bool {
        !self.enum_items.is_empty()
    }

    pub fn enum_item(&self, value: i64) -> Option<&EnumItem> {
        self.enum_items.iter().find(|e| e.value == value)
    }

    pub fn enum_name(&self, value: i64) -> Option<&str> {
        self.enum_item(value).map(|e| e.name.as_str())
    }

    pub fn enum_value(&self, name: &str) -> Option<i64> {
        self.enum_items
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value)
    }

    /// The largest content a string field of this type can hold, excluding
    /// its length prefix.
    pub fn max_content_len(&self) -> usize {
        if self.datatype.category().is_length_prefixed() {
            self.datatype.num_octets() - 2
        } else {
            self.datatype.num_octets()
        }
    }
}

/// Anything that can be stored in an [`ItemTable`].
pub trait Item {
    fn id(&self) -> u8;
    fn name(&self) -> &str;
}

/// An ordered collection indexed by both id and name.
#[derive(Clone, Debug, Default)]
pub struct ItemTable<T> {
    items: Vec<T>,
    by_id: HashMap<u8, usize>,
    by_name: HashMap<String, usize>,
}

impl<T: Item> ItemTable<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> Result<(), Error> {
        if self.by_id.contains_key(&item.id()) {
            return Err(Error::Registry(format!(
                "duplicate item id 0x{:02X} ({})",
                item.id(),
                item.name()
            )));
        }
        if self.by_name.contains_key(item.name()) {
            return Err(Error::Registry(format!(
                "duplicate item name '{}'",
                item.name()
            )));
        }
        let index = self.items.len();
        self.by_id.insert(item.id(), index);
        self.by_name.insert(item.name().to_string(), index);
        self.items.push(item);
        Ok(())
    }

    pub fn by_id(&self, id: u8) -> Option<&T> {
        self.by_id.get(&id).map(|i| &self.items[*i])
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).map(|i| &self.items[*i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The importance of an event.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    ActivityLo,
    ActivityHi,
    Command,
    Diagnostic,
    WarningLo,
    WarningHi,
    Fatal,
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let s = match self {
            Severity::ActivityLo => "ACTIVITY_LO",
            Severity::ActivityHi => "ACTIVITY_HI",
            Severity::Command => "COMMAND",
            Severity::Diagnostic => "DIAGNOSTIC",
            Severity::WarningLo => "WARNING_LO",
            Severity::WarningHi => "WARNING_HI",
            Severity::Fatal => "FATAL",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryChannel {
    pub id: u8,
    pub field: Argument,
}

impl TelemetryChannel {
    pub fn new(id: u8, name: impl Into<String>, datatype: FswDataType) -> Self {
        Self {
            id,
            field: Argument::new(name, datatype),
        }
    }

    pub fn with_enum(mut self, items: Vec<EnumItem>) -> Self {
        self.field.enum_items = items;
        self
    }

    pub fn with_bitfields(mut self, bitfields: Bitfields) -> Self {
        self.field.bitfields = Some(bitfields);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.field.comment = Some(comment.into());
        self
    }

    pub fn datatype(&self) -> FswDataType {
        self.field.datatype
    }
}

impl Item for TelemetryChannel {
    fn id(&self) -> u8 {
        self.id
    }

    fn name(&self) -> &str {
        &self.field.name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub id: u8,
    pub name: String,
    /// Short operator-facing name. Defaults to `name`.
    pub mnemonic: String,
    pub args: Vec<Argument>,
    pub comment: Option<String>,
}

impl Command {
    pub fn new(id: u8, name: impl Into<String>, args: Vec<Argument>) -> Self {
        let name = name.into();
        Self {
            id,
            mnemonic: name.clone(),
            name,
            args,
            comment: None,
        }
    }

    pub fn with_mnemonic(mut self, mnemonic: impl Into<String>) -> Self {
        self.mnemonic = mnemonic.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl Item for Command {
    fn id(&self) -> u8 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: u8,
    pub name: String,
    pub severity: Severity,
    /// A printf-style template rendered with the event's arguments.
    pub format_string: String,
    pub args: Vec<Argument>,
    pub comment: Option<String>,
}

impl Event {
    pub fn new(
        id: u8,
        name: impl Into<String>,
        severity: Severity,
        format_string: impl Into<String>,
        args: Vec<Argument>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            severity,
            format_string: format_string.into(),
            args,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn arg(&self, name: &str) -> Option<&Argument> {
        self.args.iter().find(|a| a.name == name)
    }
}

impl Item for Event {
    fn id(&self) -> u8 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A named, numbered group of commands, telemetry channels, and events.
#[derive(Clone, Debug)]
pub struct Module {
    pub id: u8,
    pub name: String,
    pub commands: ItemTable<Command>,
    pub telemetry: ItemTable<TelemetryChannel>,
    pub events: ItemTable<Event>,
}

impl Module {
    pub fn new(
        id: u8,
        name: impl Into<String>,
        commands: Vec<Command>,
        telemetry: Vec<TelemetryChannel>,
        events: Vec<Event>,
    ) -> Result<Self, Error> {
        let name = name.into();
        let context = |e: Error| match e {
            Error::Registry(msg) => Error::Registry(format!("module {name}: {msg}")),
            e => e,
        };
        let mut module = Self {
            id,
            name: name.clone(),
            commands: ItemTable::new(),
            telemetry: ItemTable::new(),
            events: ItemTable::new(),
        };
        for c in commands {
            module.commands.insert(c).map_err(context)?;
        }
        for t in telemetry {
            module.telemetry.insert(t).map_err(context)?;
        }
        for e in events {
            module.events.insert(e).map_err(context)?;
        }
        Ok(module)
    }

    pub fn opcode(&self, item_id: u8) -> Opcode {
        Opcode::new(self.id, item_id)
    }

    pub fn command(&self, name: &str) -> Result<&Command, Error> {
        self.commands
            .by_name(name)
            .ok_or_else(|| Error::Registry(format!("no command '{name}' in {}", self.name)))
    }

    pub fn channel(&self, name: &str) -> Result<&TelemetryChannel, Error> {
        self.telemetry.by_name(name).ok_or_else(|| {
            Error::Registry(format!("no telemetry channel '{name}' in {}", self.name))
        })
    }

    pub fn event(&self, name: &str) -> Result<&Event, Error> {
        self.events
            .by_name(name)
            .ok_or_else(|| Error::Registry(format!("no event '{name}' in {}", self.name)))
    }
}

/// The registry of every module known to the ground software.
#[derive(Clone, Debug, Default)]
pub struct DataStandards {
    modules: Vec<Module>,
    by_id: HashMap<u8, usize>,
    by_name: HashMap<String, usize>,
}

impl DataStandards {
    pub fn new(modules: Vec<Module>) -> Result<Self, Error> {
        let mut standards = Self::default();
        standards.add_modules(modules)?;
        Ok(standards)
    }

    /// Build a registry holding only the prebuilt modules.
    pub fn with_prebuilt() -> Result<Self, Error> {
        Self::new(prebuilt::modules()?)
    }

    pub fn add_modules(&mut self, modules: Vec<Module>) -> Result<(), Error> {
        for module in modules {
            if self.by_id.contains_key(&module.id) {
                return Err(Error::Registry(format!(
                    "duplicate module id 0x{:02X} ({})",
                    module.id, module.name
                )));
            }
            if self.by_name.contains_key(&module.name) {
                return Err(Error::Registry(format!(
                    "duplicate module name '{}'",
                    module.name
                )));
            }
            let index = self.modules.len();
            self.by_id.insert(module.id, index);
            self.by_name.insert(module.name.clone(), index);
            self.modules.push(module);
        }
        Ok(())
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module_by_id(&self, id: u8) -> Result<&Module, Error> {
        self.by_id
            .get(&id)
            .map(|i| &self.modules[*i])
            .ok_or_else(|| Error::Registry(format!("no module with id 0x{id:02X}")))
    }

    pub fn module_by_name(&self, name: &str) -> Result<&Module, Error> {
        self.by_name
            .get(name)
            .map(|i| &self.modules[*i])
            .ok_or_else(|| Error::Registry(format!("no module named '{name}'")))
    }

    pub fn global_command_lookup(&self, opcode: Opcode) -> Result<(&Module, &Command), Error> {
        let module = self.module_by_id(opcode.module_id())?;
        let command = module.commands.by_id(opcode.item_id()).ok_or_else(|| {
            Error::Registry(format!("no command with opcode {opcode} in {}", module.name))
        })?;
        Ok((module, command))
    }

    pub fn global_telemetry_lookup(
        &self,
        opcode: Opcode,
    ) -> Result<(&Module, &TelemetryChannel), Error> {
        let module = self.module_by_id(opcode.module_id())?;
        let channel = module.telemetry.by_id(opcode.item_id()).ok_or_else(|| {
            Error::Registry(format!(
                "no telemetry channel with opcode {opcode} in {}",
                module.name
            ))
        })?;
        Ok((module, channel))
    }

    pub fn global_event_lookup(&self, opcode: Opcode) -> Result<(&Module, &Event), Error> {
        let module = self.module_by_id(opcode.module_id())?;
        let event = module.events.by_id(opcode.item_id()).ok_or_else(|| {
            Error::Registry(format!("no event with opcode {opcode} in {}", module.name))
        })?;
        Ok((module, event))
    }

    /// Look up one of the prebuilt modules the packet decoders depend on.
    pub fn prebuilt(&self, name: &'static str) -> Result<&Module, Error> {
        self.module_by_name(name)
            .map_err(|_| Error::MissingPrebuilt(name))
    }

    /// Check that every prebuilt module is present.
    pub fn validate_prebuilt(&self) -> Result<(), Error> {
        for name in prebuilt::ALL {
            self.prebuilt(name)?;
        }
        Ok(())
    }
}

static DEFAULT_STANDARDS: RwLock<Option<Arc<DataStandards>>> = RwLock::new(None);

/// Install the process-wide default registry, replacing any previous one.
///
/// Decoders already holding the previous `Arc` keep using it.
pub fn set_default_standards(standards: Arc<DataStandards>) {
    let mut slot = DEFAULT_STANDARDS
        .write()
        .unwrap_or_else(|poison| poison.into_inner());
    *slot = Some(standards);
}

pub fn default_standards() -> Option<Arc<DataStandards>> {
    DEFAULT_STANDARDS
        .read()
        .unwrap_or_else(|poison| poison.into_inner())
        .clone()
}

#[cfg(test)]
mod tests {
    use super::Argument;
    use super::Bitfields;
    use super::Command;
    use super::DataStandards;
    use super::EnumItem;
    use super::Module;
    use super::TelemetryChannel;
    use crate::prebuilt;
    use crate::test_support;
    use crate::Error;
    use iris_messages::FswDataType;
    use iris_messages::Opcode;

    #[test]
    fn test_opcode_lookups() {
        let standards = test_support::standards();
        let (module, command) = standards
            .global_command_lookup(Opcode::new(0x03, 0x05))
            .unwrap();
        assert_eq!(module.name, "ExampleMod");
        assert_eq!(command.name, "DoThing");
        let (_, channel) = standards
            .global_telemetry_lookup(Opcode(0x1002))
            .unwrap();
        assert_eq!(channel.field.name, "Temp");
        assert!(matches!(
            standards.global_event_lookup(Opcode(0x1002)),
            Err(Error::Registry(_))
        ));
        assert!(standards.global_command_lookup(Opcode(0x7777)).is_err());
    }

    #[test]
    fn test_module_lookups() {
        let standards = test_support::standards();
        assert_eq!(standards.module_by_id(0x10).unwrap().name, "Thermo");
        assert_eq!(standards.module_by_name("ExampleMod").unwrap().id, 0x03);
        assert!(standards.module_by_name("Nope").is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        let dup = Module::new(
            0x01,
            "Dup",
            vec![
                Command::new(0x01, "A", vec![]),
                Command::new(0x01, "B", vec![]),
            ],
            vec![],
            vec![],
        );
        assert!(matches!(dup, Err(Error::Registry(_))));

        let mut standards = test_support::standards().as_ref().clone();
        let again = Module::new(0x03, "Other", vec![], vec![], vec![]).unwrap();
        assert!(standards.add_modules(vec![again]).is_err());
    }

    #[test]
    fn test_prebuilt_validation() {
        let standards = DataStandards::with_prebuilt().unwrap();
        standards.validate_prebuilt().unwrap();
        assert_eq!(standards.len(), prebuilt::ALL.len());

        let empty = DataStandards::new(vec![]).unwrap();
        assert_eq!(
            empty.validate_prebuilt(),
            Err(Error::MissingPrebuilt(prebuilt::WATCHDOG_HEARTBEAT))
        );
    }

    #[test]
    fn test_enum_lookup() {
        let arg = Argument::new("mode", FswDataType::Enum).with_enum(vec![
            EnumItem::new("IDLE", 0),
            EnumItem::new("DRIVE", 7).with_comment("moving"),
        ]);
        assert!(arg.is_enum());
        assert_eq!(arg.enum_name(7), Some("DRIVE"));
        assert_eq!(arg.enum_value("IDLE"), Some(0));
        assert_eq!(arg.enum_name(3), None);
        assert_eq!(
            arg.enum_item(7).and_then(|e| e.comment.as_deref()),
            Some("moving")
        );
    }

    #[test]
    fn test_bitfields() {
        let bits = Bitfields::new(
            vec![("A".to_string(), 1), ("B".to_string(), 2), ("C".to_string(), 1)],
            4,
        );
        assert_eq!(bits.total_bits(), 8);
        let unpacked = bits.unpack(0b1101);
        assert_eq!(
            unpacked,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 2),
                ("C".to_string(), 1)
            ]
        );
        assert_eq!(bits.pack(&[("A", 1), ("B", 2), ("C", 1)]).unwrap(), 0b1101);
        assert!(bits.pack(&[("B", 4)]).is_err());
    }

    #[test]
    fn test_string_capacity() {
        let ch = TelemetryChannel::new(0, "Msg", FswDataType::VarString10k);
        assert_eq!(ch.field.max_content_len(), 10_000);
        let ch = TelemetryChannel::new(0, "X", FswDataType::U16);
        assert_eq!(ch.field.max_content_len(), 2);
    }
}
