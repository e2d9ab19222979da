//! 固定容量的并发流表。
//! Fixed-capacity concurrent flow tables.

use super::key::FlowKey;
use super::register::{CumulativeCounter, SaturatingRegister};
use super::state::{AckTracker, FlowState};
use crate::error::{Error, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A keyed map shared by every observation point.
///
/// Each operation is atomic with respect to its key: the closure passed to
/// [`FlowTable::update`] or [`FlowTable::upsert`] runs while the entry is
/// exclusively held. Entries are never removed.
///
/// 被所有观测点共享的键控映射。每个操作对其键是原子的：传给
/// [`FlowTable::update`] 或 [`FlowTable::upsert`] 的闭包在独占条目期间运行。
/// 条目永不删除。
pub trait FlowTable<V: Clone>: Send + Sync {
    /// The maximum number of entries.
    /// 最大条目数。
    fn capacity(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, key: &FlowKey) -> bool;

    /// Returns a copy of the value stored under `key`.
    /// 返回 `key` 下所存值的副本。
    fn get(&self, key: &FlowKey) -> Option<V>;

    /// Inserts `value` unless `key` is present. Returns whether it was inserted.
    ///
    /// 若 `key` 不存在则插入 `value`，返回是否插入。
    fn insert_if_absent(&self, key: FlowKey, value: V) -> Result<bool>;

    /// Read-modify-write of an existing entry.
    /// 对已有条目进行读-改-写。
    fn update<R>(&self, key: &FlowKey, f: impl FnOnce(&mut V) -> R) -> Option<R>;

    /// Read-modify-write that first creates the entry with `init` if needed.
    /// `f` receives `true` when the entry was just created.
    ///
    /// 读-改-写，若需要则先用 `init` 创建条目。条目刚被创建时 `f` 收到 `true`。
    fn upsert<R>(
        &self,
        key: FlowKey,
        init: impl FnOnce() -> V,
        f: impl FnOnce(&mut V, bool) -> R,
    ) -> Result<R>;
}

/// A [`FlowTable`] backed by a sharded [`DashMap`].
///
/// 由分片 [`DashMap`] 支撑的 [`FlowTable`]。
#[derive(Debug)]
pub struct DashTable<V> {
    map: DashMap<FlowKey, V>,
    capacity: usize,
    len: AtomicUsize,
}

impl<V> DashTable<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: DashMap::new(),
            capacity,
            len: AtomicUsize::new(0),
        }
    }

    /// Claims one slot, failing once the table is at capacity.
    fn reserve_slot(&self) -> Result<()> {
        self.len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.capacity).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| Error::TableFull)
    }
}

impl<V: Clone + Send + Sync> FlowTable<V> for DashTable<V> {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    fn contains(&self, key: &FlowKey) -> bool {
        self.map.contains_key(key)
    }

    fn get(&self, key: &FlowKey) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn insert_if_absent(&self, key: FlowKey, value: V) -> Result<bool> {
        match self.map.entry(key) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                self.reserve_slot()?;
                vacant.insert(value);
                Ok(true)
            }
        }
    }

    fn update<R>(&self, key: &FlowKey, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.map.get_mut(key).map(|mut entry| f(entry.value_mut()))
    }

    fn upsert<R>(
        &self,
        key: FlowKey,
        init: impl FnOnce() -> V,
        f: impl FnOnce(&mut V, bool) -> R,
    ) -> Result<R> {
        match self.map.entry(key) {
            Entry::Occupied(mut occupied) => Ok(f(occupied.get_mut(), false)),
            Entry::Vacant(vacant) => {
                self.reserve_slot()?;
                let mut entry = vacant.insert(init());
                Ok(f(entry.value_mut(), true))
            }
        }
    }
}

/// Chooses the [`FlowTable`] implementation behind [`FlowTables`].
///
/// 选择 [`FlowTables`] 背后的 [`FlowTable`] 实现。
pub trait TableBackend: fmt::Debug + Send + Sync + 'static {
    type Table<V: Clone + fmt::Debug + Send + Sync + 'static>: FlowTable<V> + fmt::Debug;

    fn table<V: Clone + fmt::Debug + Send + Sync + 'static>(capacity: usize) -> Self::Table<V>;
}

/// The default backend: every table is a [`DashTable`].
/// 默认后端：每张表都是 [`DashTable`]。
#[derive(Debug, Clone, Copy, Default)]
pub struct DashBackend;

impl TableBackend for DashBackend {
    type Table<V: Clone + fmt::Debug + Send + Sync + 'static> = DashTable<V>;

    fn table<V: Clone + fmt::Debug + Send + Sync + 'static>(capacity: usize) -> Self::Table<V> {
        DashTable::with_capacity(capacity)
    }
}

/// Every table the observation points share, each keyed by [`FlowKey`].
///
/// Writers are split by field: the ECN collector owns `ecn`, the drop
/// collectors own `drops` and `drop_results`, the inbound tracker owns
/// `ack_trackers`, and the parsers own `flows` plus the cycle-boundary shift
/// of the two registers.
///
/// 所有观测点共享的表，均以 [`FlowKey`] 为键。写者按字段划分。
#[derive(Debug)]
pub struct FlowTables<B: TableBackend = DashBackend> {
    pub flows: B::Table<FlowState>,
    pub ecn: B::Table<SaturatingRegister>,
    pub drops: B::Table<SaturatingRegister>,
    pub drop_results: B::Table<CumulativeCounter>,
    pub ack_trackers: B::Table<AckTracker>,
}

impl FlowTables {
    pub fn new(capacity: usize) -> Self {
        Self::with_backend(capacity)
    }
}

impl<B: TableBackend> FlowTables<B> {
    /// Builds every table through `B`, each holding up to `capacity` flows.
    /// 通过 `B` 构建所有表，每张表最多容纳 `capacity` 个流。
    pub fn with_backend(capacity: usize) -> Self {
        Self {
            flows: B::table(capacity),
            ecn: B::table(capacity),
            drops: B::table(capacity),
            // One extra slot so the aggregate never competes with flows.
            drop_results: B::table(capacity.saturating_add(1)),
            ack_trackers: B::table(capacity),
        }
    }
}
