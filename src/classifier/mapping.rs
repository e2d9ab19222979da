//! 从类标识符到流量类（队列）的外部映射。
//! The external mapping from class identifiers to traffic classes (queues).

use super::category::ClassId;
use std::collections::HashMap;
use std::fmt;

/// The traffic-class identifier handed to the queueing policy.
/// 交给排队策略的流量类标识符。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TrafficClass(pub u32);

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A total function from [`ClassId`] to [`TrafficClass`].
///
/// Two class identifiers that map to the same traffic class are treated as the
/// same regime: moving between them keeps the flow's signal history.
///
/// 从 [`ClassId`] 到 [`TrafficClass`] 的全函数。映射到同一流量类的两个类标识符
/// 被视为同一状态：在它们之间切换会保留流的信号历史。
pub trait ClassMapping: Send + Sync + 'static {
    fn map(&self, class_id: ClassId) -> TrafficClass;
}

impl<F> ClassMapping for F
where
    F: Fn(ClassId) -> TrafficClass + Send + Sync + 'static,
{
    fn map(&self, class_id: ClassId) -> TrafficClass {
        self(class_id)
    }
}

/// A table-driven mapping. Identifiers without an entry map to themselves.
///
/// 表驱动的映射。没有条目的标识符映射到其自身。
#[derive(Debug, Clone, Default)]
pub struct QueueMapping {
    table: HashMap<ClassId, TrafficClass>,
}

impl QueueMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, class_id: ClassId, traffic_class: TrafficClass) -> Self {
        self.table.insert(class_id, traffic_class);
        self
    }
}

impl FromIterator<(ClassId, TrafficClass)> for QueueMapping {
    fn from_iter<I: IntoIterator<Item = (ClassId, TrafficClass)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().collect(),
        }
    }
}

impl ClassMapping for QueueMapping {
    fn map(&self, class_id: ClassId) -> TrafficClass {
        self.table
            .get(&class_id)
            .copied()
            .unwrap_or(TrafficClass(class_id.0))
    }
}
