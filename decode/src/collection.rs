// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! A collection of payloads, bucketed by concrete kind.

use crate::payload::CommandPayload;
use crate::payload::DownlinkTimes;
use crate::payload::EventPayload;
use crate::payload::FileBlockPayload;
use crate::payload::Payload;
use crate::payload::PayloadKind;
use crate::payload::SerializedPayload;
use crate::payload::State;
use crate::payload::TelemetryPayload;
use crate::Context;
use crate::Error;
use iris_messages::DataSource;
use iris_messages::Pathway;
use serde::Deserialize;
use serde::Serialize;

/// A set of payload kinds that can be queried together.
///
/// The classes form a tree: `All` holds `Uplinked` and `Downlinked`, and
/// `Command` includes `WatchdogCommand`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(test, derive(strum::EnumIter))]
pub enum PayloadClass {
    All,
    Uplinked,
    Command,
    WatchdogCommand,
    Downlinked,
    Telemetry,
    Event,
    FileBlock,
}

impl PayloadClass {
    /// The concrete kinds in this class, in bucket order.
    pub const fn kinds(&self) -> &'static [PayloadKind] {
        use PayloadKind::*;
        match self {
            PayloadClass::All => &PayloadKind::ALL,
            PayloadClass::Uplinked | PayloadClass::Command => &[Command, WatchdogCommand],
            PayloadClass::WatchdogCommand => &[WatchdogCommand],
            PayloadClass::Downlinked => &[Telemetry, Event, FileBlock],
            PayloadClass::Telemetry => &[Telemetry],
            PayloadClass::Event => &[Event],
            PayloadClass::FileBlock => &[FileBlock],
        }
    }
}

impl From<PayloadKind> for PayloadClass {
    fn from(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Command => PayloadClass::Command,
            PayloadKind::WatchdogCommand => PayloadClass::WatchdogCommand,
            PayloadKind::Telemetry => PayloadClass::Telemetry,
            PayloadKind::Event => PayloadClass::Event,
            PayloadKind::FileBlock => PayloadClass::FileBlock,
        }
    }
}

/// Payloads grouped into one bucket per [`PayloadKind`].
///
/// Insertion order is preserved within a bucket. Iterating a class walks its
/// buckets in [`PayloadKind::ALL`] order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PayloadCollection {
    buckets: [Vec<Payload>; 5],
}

impl PayloadCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a payload to the bucket for its kind.
    pub fn push(&mut self, payload: impl Into<Payload>) {
        let payload = payload.into();
        self.buckets[payload.kind().index()].push(payload);
    }

    /// Move every payload of `other` into this collection, bucket by bucket.
    pub fn extend(&mut self, other: PayloadCollection) {
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets) {
            mine.extend(theirs);
        }
    }

    pub fn extend_from<I>(&mut self, payloads: I)
    where
        I: IntoIterator<Item = Payload>,
    {
        for payload in payloads {
            self.push(payload);
        }
    }

    /// Remove the first payload equal to `payload`. Returns whether one was
    /// found.
    pub fn remove(&mut self, payload: &Payload) -> bool {
        let bucket = &mut self.buckets[payload.kind().index()];
        match bucket.iter().position(|p| p == payload) {
            Some(i) => {
                bucket.remove(i);
                true
            }
            None => false,
        }
    }

    /// Empty the buckets of every kind in `class`.
    pub fn erase(&mut self, class: PayloadClass) {
        for kind in class.kinds() {
            self.buckets[kind.index()].clear();
        }
    }

    pub fn clear(&mut self) {
        self.erase(PayloadClass::All);
    }

    /// The payloads of exactly one kind.
    pub fn get(&self, kind: PayloadKind) -> &[Payload] {
        &self.buckets[kind.index()]
    }

    pub fn iter(&self, class: PayloadClass) -> impl Iterator<Item = &Payload> + '_ {
        class
            .kinds()
            .iter()
            .flat_map(move |kind| self.buckets[kind.index()].iter())
    }

    pub fn iter_mut(&mut self, class: PayloadClass) -> impl Iterator<Item = &mut Payload> + '_ {
        let kinds = class.kinds();
        self.buckets
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| kinds.iter().any(|k| k.index() == *i))
            .flat_map(|(_, bucket)| bucket.iter_mut())
    }

    /// Every payload, in bucket order.
    pub fn all_payloads(&self) -> impl Iterator<Item = &Payload> + '_ {
        self.iter(PayloadClass::All)
    }

    pub fn telemetry(&self) -> impl Iterator<Item = &TelemetryPayload> + '_ {
        self.iter(PayloadClass::Telemetry)
            .filter_map(Payload::as_telemetry)
    }

    pub fn events(&self) -> impl Iterator<Item = &EventPayload> + '_ {
        self.iter(PayloadClass::Event).filter_map(Payload::as_event)
    }

    /// Commands of both kinds.
    pub fn commands(&self) -> impl Iterator<Item = &CommandPayload> + '_ {
        self.iter(PayloadClass::Command)
            .filter_map(Payload::as_command)
    }

    pub fn file_blocks(&self) -> impl Iterator<Item = &FileBlockPayload> + '_ {
        self.iter(PayloadClass::FileBlock)
            .filter_map(Payload::as_file_block)
    }

    /// The number of buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the collection holds no payloads at all.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn num_payloads(&self, class: PayloadClass) -> usize {
        class
            .kinds()
            .iter()
            .map(|k| self.buckets[k.index()].len())
            .sum()
    }

    pub fn all_payloads_count(&self) -> usize {
        self.num_payloads(PayloadClass::All)
    }

    pub fn contains(&self, payload: &Payload) -> bool {
        self.buckets[payload.kind().index()].contains(payload)
    }

    pub fn set_pathway(&mut self, pathway: Pathway) {
        for p in self.iter_mut(PayloadClass::All) {
            p.set_pathway(pathway);
        }
    }

    pub fn set_source(&mut self, source: DataSource) {
        for p in self.iter_mut(PayloadClass::All) {
            p.set_source(source);
        }
    }

    pub fn set_downlink_times(&mut self, times: &DownlinkTimes) {
        for p in self.iter_mut(PayloadClass::Downlinked) {
            p.set_downlink_times(times.clone());
        }
    }

    /// Serialize every payload, keyed by kind name.
    pub fn state(&self) -> State {
        let mut state = State::new();
        for kind in PayloadKind::ALL {
            let list: Vec<SerializedPayload> = self.buckets[kind.index()]
                .iter()
                .map(Payload::to_serialized)
                .collect();
            let value = serde_json::to_value(list).unwrap_or(serde_json::Value::Null);
            state.insert(kind.name().to_string(), value);
        }
        state
    }

    /// Rebuild a collection from [`PayloadCollection::state`].
    ///
    /// Buckets missing from `state` are left empty; unknown bucket names are
    /// an error.
    pub fn from_state(ctx: &Context, state: &State) -> Result<Self, Error> {
        let mut out = Self::new();
        for (name, value) in state.iter() {
            let kind = PayloadKind::from_name(name)
                .ok_or_else(|| Error::State(format!("unknown payload kind '{name}'")))?;
            let list: Vec<SerializedPayload> = serde_json::from_value(value.clone())
                .map_err(|e| Error::State(format!("bucket '{name}': {e}")))?;
            for s in list.iter() {
                if s.kind != kind {
                    return Err(Error::State(format!(
                        "{} payload found in the '{name}' bucket",
                        s.kind
                    )));
                }
                out.push(Payload::from_serialized(ctx, s)?);
            }
        }
        Ok(out)
    }
}

impl FromIterator<Payload> for PayloadCollection {
    fn from_iter<I: IntoIterator<Item = Payload>>(iter: I) -> Self {
        let mut out = Self::new();
        out.extend_from(iter);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::PayloadClass;
    use super::PayloadCollection;
    use crate::payload::CommandKind;
    use crate::payload::CommandPayload;
    use crate::payload::DownlinkTimes;
    use crate::payload::Payload;
    use crate::payload::PayloadKind;
    use crate::payload::TelemetryPayload;
    use crate::test_support;
    use crate::Context;
    use crate::Error;
    use chrono::TimeZone;
    use chrono::Utc;
    use iris_messages::DataSource;
    use iris_messages::Pathway;
    use iris_messages::Value;
    use strum::IntoEnumIterator;

    fn temp(ctx: &Context, ts: u32) -> Payload {
        TelemetryPayload::new(ctx, 0x10, 0x02, ts, Value::from(-1i16))
            .unwrap()
            .into()
    }

    fn command(ctx: &Context, kind: CommandKind, n: u16) -> Payload {
        CommandPayload::new(
            ctx,
            kind,
            0x03,
            0x05,
            vec![(String::from("n"), Value::from(n))],
        )
        .unwrap()
        .into()
    }

    fn sample(ctx: &Context) -> PayloadCollection {
        let mut c = PayloadCollection::new();
        c.push(temp(ctx, 1));
        c.push(command(ctx, CommandKind::Watchdog, 1));
        c.push(temp(ctx, 2));
        c.push(command(ctx, CommandKind::Standard, 2));
        c
    }

    #[test]
    fn test_buckets_and_classes() {
        let ctx = test_support::ctx();
        let c = sample(&ctx);
        assert_eq!(c.len(), 5);
        assert_eq!(c.all_payloads_count(), 4);
        assert_eq!(c.num_payloads(PayloadClass::Uplinked), 2);
        assert_eq!(c.num_payloads(PayloadClass::WatchdogCommand), 1);
        assert_eq!(c.get(PayloadKind::Telemetry).len(), 2);

        // Standard commands come before watchdog commands regardless of
        // insertion order.
        let kinds: Vec<PayloadKind> = c.all_payloads().map(Payload::kind).collect();
        assert_eq!(
            kinds,
            vec![
                PayloadKind::Command,
                PayloadKind::WatchdogCommand,
                PayloadKind::Telemetry,
                PayloadKind::Telemetry,
            ]
        );
        let stamps: Vec<u32> = c.telemetry().map(|t| t.timestamp()).collect();
        assert_eq!(stamps, vec![1, 2]);
        assert_eq!(c.commands().count(), 2);
    }

    #[test]
    fn test_every_class_covers_its_kinds() {
        let ctx = test_support::ctx();
        let c = sample(&ctx);
        for class in PayloadClass::iter() {
            let expected = c
                .all_payloads()
                .filter(|p| class.kinds().contains(&p.kind()))
                .count();
            assert_eq!(c.iter(class).count(), expected, "{class:?}");
        }
        for kind in PayloadKind::iter() {
            assert_eq!(PayloadClass::from(kind).kinds()[0], kind);
        }
    }

    #[test]
    fn test_remove_erase_clear() {
        let ctx = test_support::ctx();
        let mut c = sample(&ctx);
        let t1 = temp(&ctx, 1);
        assert!(c.contains(&t1));
        assert!(c.remove(&t1));
        assert!(!c.contains(&t1));
        assert!(!c.remove(&t1));
        assert_eq!(c.all_payloads_count(), 3);

        c.erase(PayloadClass::Command);
        assert_eq!(c.num_payloads(PayloadClass::Uplinked), 0);
        assert!(!c.is_empty());
        c.clear();
        assert!(c.is_empty());
    }

    #[test]
    fn test_extend() {
        let ctx = test_support::ctx();
        let mut a = sample(&ctx);
        a.extend(sample(&ctx));
        assert_eq!(a.all_payloads_count(), 8);
        let mut b = PayloadCollection::new();
        b.extend_from(sample(&ctx).all_payloads().cloned());
        assert_eq!(b, sample(&ctx));
        let c: PayloadCollection = sample(&ctx).all_payloads().cloned().collect();
        assert_eq!(c, b);
    }

    #[test]
    fn test_stamping() {
        let ctx = test_support::ctx();
        let mut c = sample(&ctx);
        c.set_pathway(Pathway::Wired);
        c.set_source(DataSource::UdpServer);
        let times = DownlinkTimes {
            amcc_rx: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        c.set_downlink_times(&times);
        assert!(c
            .all_payloads()
            .all(|p| p.metadata().pathway == Pathway::Wired
                && p.metadata().source == DataSource::UdpServer));
        assert!(c.telemetry().all(|t| t.downlink_times == Some(times.clone())));
    }

    #[test]
    fn test_state_round_trip() {
        let ctx = test_support::ctx();
        let mut c = sample(&ctx);
        c.set_pathway(Pathway::Wireless);
        let state = c.state();
        let back = PayloadCollection::from_state(&ctx, &state).unwrap();
        assert_eq!(back, c);

        let mut bad = state.clone();
        bad.insert(String::from("GadgetPayload"), serde_json::Value::Array(vec![]));
        assert!(matches!(
            PayloadCollection::from_state(&ctx, &bad),
            Err(Error::State(_))
        ));
    }
}
