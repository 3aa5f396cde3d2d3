use crate::{event::Callback, pins::PinTables, query::QueryReplies};
use chrono::{DateTime, Utc};
use kiddee_protocol::types::DhtReading;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

pub(crate) struct SonarEntry {
    pub(crate) callback: Option<Callback>,
    pub(crate) distance_cm: u16,
    pub(crate) time: Option<DateTime<Utc>>,
}

pub(crate) struct I2cEntry {
    pub(crate) callback: Option<Callback>,
    pub(crate) register: u16,
    pub(crate) data: Option<Vec<u16>>,
    pub(crate) time: Option<DateTime<Utc>>,
}

pub(crate) struct DhtEntry {
    pub(crate) callback: Option<Callback>,
    pub(crate) differential: f64,
    pub(crate) reading: DhtReading,
    pub(crate) time: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub(crate) struct Pm25Entry {
    pub(crate) callback: Option<Callback>,
    pub(crate) started: Option<DateTime<Utc>>,
    pub(crate) pm25: u16,
    pub(crate) pm10: u16,
    pub(crate) error: bool,
    pub(crate) time: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub(crate) struct IrEntry {
    pub(crate) callback: Option<Callback>,
    pub(crate) receiving: bool,
    pub(crate) address: u16,
    pub(crate) data: u16,
    pub(crate) time: Option<DateTime<Utc>>,
}

/// Everything the reporter mutates and the public API reads.
pub(crate) struct Shared {
    pub(crate) pins: Mutex<PinTables>,
    pub(crate) sonar: Mutex<BTreeMap<u8, SonarEntry>>,
    pub(crate) i2c: Mutex<HashMap<u16, I2cEntry>>,
    pub(crate) dht: Mutex<BTreeMap<u8, DhtEntry>>,
    pub(crate) pm25: Mutex<Pm25Entry>,
    pub(crate) ir: Mutex<IrEntry>,
    pub(crate) replies: QueryReplies,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            pins: Mutex::default(),
            sonar: Mutex::default(),
            i2c: Mutex::default(),
            dht: Mutex::default(),
            pm25: Mutex::default(),
            ir: Mutex::default(),
            replies: QueryReplies::new(),
        }
    }
}

/// Locks `mutex`, recovering the data if a callback panicked while it was
/// held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
