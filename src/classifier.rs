//! 响应性分类器：将每周期的信号计数转换为类别。
//! The responsiveness classifier: turns per-cycle signal counts into a category.

pub mod category;
pub mod mapping;
pub mod policy;

use crate::config::Config;
use crate::flow::{FlowState, SaturatingRegister};
use category::{ClassId, ClassIds};
use mapping::{ClassMapping, TrafficClass};
use policy::{CycleSample, ResponsivenessTest};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The externally supplied classification policy.
///
/// 外部提供的分类策略。
#[derive(Clone)]
pub struct Policy {
    pub mapping: Arc<dyn ClassMapping>,
    pub test: Arc<dyn ResponsivenessTest>,
}

impl Policy {
    pub fn new(mapping: impl ClassMapping, test: impl ResponsivenessTest) -> Self {
        Self {
            mapping: Arc::new(mapping),
            test: Arc::new(test),
        }
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy").finish_non_exhaustive()
    }
}

/// What happened when a cycle closed.
///
/// 周期结束时发生的事情。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleDecision {
    /// Bytes carried by the cycle that just closed.
    /// 刚结束周期所携带的字节数。
    pub bytes: u32,
    pub ecn_marks: u8,
    pub drops: u8,
    /// The cycle was large enough for a verdict to be considered.
    /// 周期足够大，可以考虑判定。
    pub sampled: bool,
    /// The flow's class identifier changed.
    /// 流的类标识符发生了变化。
    pub new_class: bool,
    /// The traffic class changed, so signal history is forgotten.
    /// 流量类发生变化，因此遗忘信号历史。
    pub reset_history: bool,
}

impl CycleDecision {
    /// Ages a signal register across the cycle boundary.
    ///
    /// 跨越周期边界老化一个信号寄存器。
    pub fn age(&self, register: &mut SaturatingRegister) {
        if self.reset_history {
            register.clear();
        }
        register.shift();
    }
}

/// Evaluates completed cycles against the configured policy.
///
/// 根据配置的策略评估已完成的周期。
#[derive(Debug, Clone)]
pub struct Classifier {
    class_ids: ClassIds,
    policy: Policy,
    min_cycle_bytes: u32,
}

impl Classifier {
    pub fn new(config: &Config, policy: Policy) -> Self {
        Self {
            class_ids: config.classifier.class_ids.clone(),
            policy,
            min_cycle_bytes: config.min_cycle_bytes(),
        }
    }

    pub fn class_ids(&self) -> &ClassIds {
        &self.class_ids
    }

    /// The class identifier new flows start with.
    pub fn initial_class(&self) -> ClassId {
        self.class_ids.initial()
    }

    pub fn traffic_class(&self, class_id: ClassId) -> TrafficClass {
        self.policy.mapping.map(class_id)
    }

    /// Closes the flow's running cycle.
    ///
    /// `ecn` and `drops` are the flow's registers as of the cycle close; the
    /// caller ages the stored registers with [`CycleDecision::age`]. The byte
    /// window is rolled and `new_bytes` opens the next cycle.
    ///
    /// 结束流当前的周期。`ecn` 与 `drops` 为周期结束时流的寄存器；调用方使用
    /// [`CycleDecision::age`] 老化存储的寄存器。字节窗口滚动，`new_bytes` 开启下一周期。
    pub fn close_cycle(
        &self,
        flow: &mut FlowState,
        ecn: SaturatingRegister,
        drops: SaturatingRegister,
        new_bytes: u32,
    ) -> CycleDecision {
        let sample = CycleSample {
            ecn,
            drops,
            bytes: flow.bytes,
        };
        let sampled = sample.cycle_bytes() >= self.min_cycle_bytes;

        let old_class = flow.class_id;
        let mut category = self.class_ids.category(old_class);
        let mut judged = false;

        if sampled {
            if let Some(verdict) = self.policy.test.ecn(&sample) {
                flow.tally.record_ecn(verdict);
                category = category.with_ecn(flow.tally.ecn_majority());
                judged = true;
            }
            if let Some(verdict) = self.policy.test.loss(&sample) {
                flow.tally.record_drop(verdict);
                category = category.with_drop(flow.tally.drop_majority());
                judged = true;
            }
        }

        let mut new_class = false;
        let mut reset_history = false;
        if judged {
            let candidate = self.class_ids.id(category);
            if candidate != old_class {
                new_class = true;
                reset_history = self.traffic_class(old_class) != self.traffic_class(candidate);
                flow.class_id = candidate;
                trace!(
                    old = %old_class,
                    new = %candidate,
                    %category,
                    reset_history,
                    "flow reclassified"
                );
            }
        }

        let bytes = flow.bytes.roll(new_bytes);

        CycleDecision {
            bytes,
            ecn_marks: ecn.current(),
            drops: drops.current(),
            sampled,
            new_class,
            reset_history,
        }
    }
}
