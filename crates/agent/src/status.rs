use crate::document::{self, get_datetime, get_i64_or_default, get_str};
use mongodb::bson::{Bson, DateTime};

/// One `serverStatus` reply, reduced to the fields this agent consumes.
///
/// A snapshot is built fresh for every cycle from the raw reply and never
/// mutated afterwards. Decoding is an explicit field-by-field mapping from
/// the wire names; numeric fields absent from the reply read as 0, matching
/// how older and newer server versions disagree about which sections exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub host: String,
    pub version: String,
    pub process: String,
    pub pid: i64,
    pub uptime: i64,
    pub uptime_millis: i64,
    pub uptime_estimate: i64,
    pub local_time: DateTime,
    pub connections: Connections,
    pub extra_info: ExtraInfo,
    pub mem: Mem,
    pub global_lock: GlobalLock,
    pub opcounters: Opcounters,
    /// Replica-set scoped counters. Decoded for completeness, not published.
    pub opcounters_repl: Opcounters,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Connections {
    pub current: i64,
    /// Raw driver value, may be negative in unusual states.
    pub available: i64,
    pub total_created: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Mem {
    pub resident: i64,
    pub virtual_mem: i64,
    pub mapped: i64,
    pub mapped_with_journal: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReaderWriterCount {
    pub readers: i64,
    pub writers: i64,
    pub total: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlobalLock {
    pub total_time: i64,
    pub lock_time: i64,
    pub current_queue: ReaderWriterCount,
    pub active_clients: ReaderWriterCount,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Opcounters {
    pub insert: i64,
    pub query: i64,
    pub update: i64,
    pub delete: i64,
    pub getmore: i64,
    pub command: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtraInfo {
    pub page_faults: i64,
    pub heap_usage_bytes: i64,
}

impl StatusSnapshot {
    pub fn decode(reply: &Bson) -> Result<Self, document::Error> {
        Ok(Self {
            host: get_str(reply, &["host"])?.to_string(),
            version: get_str(reply, &["version"])?.to_string(),
            process: get_str(reply, &["process"])?.to_string(),
            pid: get_i64_or_default(reply, &["pid"])?,
            uptime: get_i64_or_default(reply, &["uptime"])?,
            uptime_millis: get_i64_or_default(reply, &["uptimeMillis"])?,
            uptime_estimate: get_i64_or_default(reply, &["uptimeEstimate"])?,
            local_time: get_datetime(reply, &["localTime"])?,
            connections: Connections::decode(reply)?,
            extra_info: ExtraInfo::decode(reply)?,
            mem: Mem::decode(reply)?,
            global_lock: GlobalLock::decode(reply)?,
            opcounters: Opcounters::decode(reply, "opcounters")?,
            opcounters_repl: Opcounters::decode(reply, "opcountersRepl")?,
        })
    }
}

impl Connections {
    fn decode(reply: &Bson) -> Result<Self, document::Error> {
        Ok(Self {
            current: get_i64_or_default(reply, &["connections", "current"])?,
            available: get_i64_or_default(reply, &["connections", "available"])?,
            total_created: get_i64_or_default(reply, &["connections", "totalCreated"])?,
        })
    }
}

impl Mem {
    fn decode(reply: &Bson) -> Result<Self, document::Error> {
        Ok(Self {
            resident: get_i64_or_default(reply, &["mem", "resident"])?,
            virtual_mem: get_i64_or_default(reply, &["mem", "virtual"])?,
            mapped: get_i64_or_default(reply, &["mem", "mapped"])?,
            mapped_with_journal: get_i64_or_default(reply, &["mem", "mappedWithJournal"])?,
        })
    }
}

impl ReaderWriterCount {
    fn decode(reply: &Bson, section: &str) -> Result<Self, document::Error> {
        Ok(Self {
            readers: get_i64_or_default(reply, &["globalLock", section, "readers"])?,
            writers: get_i64_or_default(reply, &["globalLock", section, "writers"])?,
            total: get_i64_or_default(reply, &["globalLock", section, "total"])?,
        })
    }
}

impl GlobalLock {
    fn decode(reply: &Bson) -> Result<Self, document::Error> {
        Ok(Self {
            total_time: get_i64_or_default(reply, &["globalLock", "totalTime"])?,
            lock_time: get_i64_or_default(reply, &["globalLock", "lockTime"])?,
            current_queue: ReaderWriterCount::decode(reply, "currentQueue")?,
            active_clients: ReaderWriterCount::decode(reply, "activeClients")?,
        })
    }
}

impl Opcounters {
    fn decode(reply: &Bson, section: &str) -> Result<Self, document::Error> {
        Ok(Self {
            insert: get_i64_or_default(reply, &[section, "insert"])?,
            query: get_i64_or_default(reply, &[section, "query"])?,
            update: get_i64_or_default(reply, &[section, "update"])?,
            delete: get_i64_or_default(reply, &[section, "delete"])?,
            getmore: get_i64_or_default(reply, &[section, "getmore"])?,
            command: get_i64_or_default(reply, &[section, "command"])?,
        })
    }
}

impl ExtraInfo {
    fn decode(reply: &Bson) -> Result<Self, document::Error> {
        Ok(Self {
            page_faults: get_i64_or_default(reply, &["extra_info", "page_faults"])?,
            heap_usage_bytes: get_i64_or_default(reply, &["extra_info", "heap_usage_bytes"])?,
        })
    }
}
