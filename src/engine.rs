//! 引擎门面：每个包路径挂载点对应一个方法。
//! The engine facade: one method per packet-path hook point.
//!
//! 每个挂载点都以 `&self` 调用，可被多个线程并发调用，且不会阻塞。
//! 引擎无法理解的包保持未分类，原因会被记录到日志。
//!
//! Every hook takes `&self` and may be called from many threads at once. No
//! hook blocks; a packet the engine cannot make sense of is left unclassified
//! and the reason is logged.

mod quic;
mod tcp;

use crate::classifier::category::ClassId;
use crate::classifier::mapping::TrafficClass;
use crate::classifier::{Classifier, Policy};
use crate::collector::ack::AckOutcome;
use crate::collector::drops::DropOutcome;
use crate::collector::ecn::EcnOutcome;
use crate::collector::{AckCollector, DropCollector, DropReason, EcnCollector, EnqueueStatus};
use crate::config::Config;
use crate::error::Result;
use crate::flow::{
    AckTracker, CumulativeCounter, DashBackend, FlowKey, FlowState, FlowTable, FlowTables,
    Protocol, SaturatingRegister, TableBackend,
};
use crate::packet::{PacketView, Transport};
use crate::report::{CycleReport, Emitter, ReportSink};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// The verdict handed back to the egress classification point.
///
/// 返回给出口分类点的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcAction {
    /// The packet belongs to a tracked flow in this traffic class.
    /// 包属于该流量类中被跟踪的流。
    Classified(TrafficClass),
    /// The packet could not be classified and passes through untouched.
    /// 包无法分类，原样通过。
    Unspecified,
}

/// A read-only copy of every record held for one flow.
///
/// 一个流所有记录的只读副本。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub state: Option<FlowState>,
    pub ecn: Option<SaturatingRegister>,
    pub drops: Option<SaturatingRegister>,
    pub cumulative_drops: Option<CumulativeCounter>,
    pub tracker: Option<AckTracker>,
}

impl FlowSnapshot {
    pub fn is_tracked(&self) -> bool {
        self.state.is_some()
    }
}

/// How a parser left a flow after one packet.
enum Step {
    Created(ClassId),
    Continued(ClassId),
    Closed(Box<CycleReport>),
}

/// The flow-classification engine.
///
/// 流分类引擎。
#[derive(Debug)]
pub struct Engine<B: TableBackend = DashBackend> {
    config: Config,
    tables: Arc<FlowTables<B>>,
    classifier: Classifier,
    emitter: Emitter,
    ecn: EcnCollector<B>,
    drops: DropCollector<B>,
    acks: AckCollector<B>,
}

impl Engine {
    /// Creates an engine publishing into a bounded channel of
    /// `config.output.channel_capacity` reports.
    ///
    /// 创建一个向容量为 `config.output.channel_capacity` 的有界通道发布报告的引擎。
    pub fn new(config: Config, policy: Policy) -> Result<(Self, mpsc::Receiver<CycleReport>)> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.output.channel_capacity);
        let engine = Self::with_sink(config, policy, tx)?;
        Ok((engine, rx))
    }

    /// Creates an engine publishing into a caller-supplied sink.
    ///
    /// 创建一个向调用方提供的 sink 发布报告的引擎。
    pub fn with_sink(config: Config, policy: Policy, sink: impl ReportSink) -> Result<Self> {
        Self::with_backend(config, policy, sink)
    }
}

impl<B: TableBackend> Engine<B> {
    /// Creates an engine whose flow tables are built by `B`.
    ///
    /// 创建一个由 `B` 构建流表的引擎。
    pub fn with_backend(config: Config, policy: Policy, sink: impl ReportSink) -> Result<Self> {
        config.validate()?;
        let tables = Arc::new(FlowTables::<B>::with_backend(config.tables.capacity));
        let classifier = Classifier::new(&config, policy);
        let emitter = Emitter::new(Box::new(sink), Instant::now());

        info!(
            capacity = config.tables.capacity,
            mss = config.classifier.mss,
            edge_threshold = config.quic.edge_threshold,
            prefix = %config.drops.source_prefix,
            "classification engine created"
        );

        Ok(Self {
            ecn: EcnCollector::new(tables.clone()),
            drops: DropCollector::new(tables.clone(), config.drops.source_prefix),
            acks: AckCollector::new(tables.clone()),
            config,
            tables,
            classifier,
            emitter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tables(&self) -> &Arc<FlowTables<B>> {
        &self.tables
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Egress classification hook. `frame` starts at the Ethernet header.
    ///
    /// 出口分类挂载点。`frame` 从以太网头开始。
    pub fn classify_egress(&self, frame: &[u8], now: Instant) -> TcAction {
        match self.try_classify_egress(frame, now) {
            Ok(traffic_class) => TcAction::Classified(traffic_class),
            Err(e) => {
                if e.is_unclassifiable() {
                    trace!(error = %e, "leaving packet unclassified");
                } else {
                    warn!(error = %e, "unexpected error during classification");
                }
                TcAction::Unspecified
            }
        }
    }

    /// Same as [`Engine::classify_egress`], but reports why a packet was left
    /// unclassified.
    ///
    /// 与 [`Engine::classify_egress`] 相同，但会报告包未被分类的原因。
    pub fn try_classify_egress(&self, frame: &[u8], now: Instant) -> Result<TrafficClass> {
        let view = PacketView::from_ethernet(frame)?;
        let class_id = match &view.transport {
            Transport::Tcp(tcp) => self.classify_tcp(&view, tcp, now)?,
            Transport::Udp(_) => self.classify_quic(&view, now)?,
        };
        Ok(self.classifier.traffic_class(class_id))
    }

    /// Shaping-queue enqueue hook. `packet` starts at the IP header.
    ///
    /// 整形队列入队挂载点。`packet` 从 IP 头开始。
    pub fn on_enqueue(&self, packet: &[u8], status: EnqueueStatus) -> Result<DropOutcome> {
        self.drops.on_enqueue(packet, status)
    }

    /// Shaping-queue dequeue hook. `packet` starts at the IP header.
    ///
    /// 整形队列出队挂载点。`packet` 从 IP 头开始。
    pub fn on_dequeue(&self, packet: &[u8]) -> Result<EcnOutcome> {
        self.ecn.on_dequeue(packet)
    }

    /// Kernel passive-drop hook. `packet` starts at the IP header.
    ///
    /// 内核被动丢包挂载点。`packet` 从 IP 头开始。
    pub fn on_kernel_drop(&self, packet: &[u8], reason: DropReason) -> Result<DropOutcome> {
        self.drops.on_kernel_drop(packet, reason)
    }

    /// Inbound segment hook. `packet` starts at the IP header.
    ///
    /// 入向报文段挂载点。`packet` 从 IP 头开始。
    pub fn observe_inbound(&self, packet: &[u8]) -> Result<AckOutcome> {
        self.acks.observe(packet)
    }

    pub fn snapshot(&self, key: &FlowKey) -> FlowSnapshot {
        FlowSnapshot {
            state: self.tables.flows.get(key),
            ecn: self.tables.ecn.get(key),
            drops: self.tables.drops.get(key),
            cumulative_drops: self.tables.drop_results.get(key),
            tracker: self.tables.ack_trackers.get(key),
        }
    }

    /// The path-wide drop aggregate, zero until the first drop is seen.
    ///
    /// 全路径丢包汇总值，在首次观测到丢包之前为 0。
    pub fn aggregate_drops(&self) -> u32 {
        self.tables
            .drop_results
            .get(&FlowKey::AGGREGATE)
            .map(CumulativeCounter::value)
            .unwrap_or(0)
    }

    /// Closes the running cycle of `flow`. Called with the flow entry held.
    fn close_cycle(
        &self,
        key: FlowKey,
        flow: &mut FlowState,
        now: Instant,
        new_bytes: u32,
    ) -> CycleReport {
        let ecn = self.tables.ecn.get(&key).unwrap_or_default();
        let drops = self.tables.drops.get(&key).unwrap_or_default();
        let rtt = now.saturating_duration_since(flow.last_sample);
        flow.last_sample = now;

        let decision = self.classifier.close_cycle(flow, ecn, drops, new_bytes);
        self.tables.ecn.update(&key, |register| decision.age(register));
        self.tables.drops.update(&key, |register| decision.age(register));

        trace!(
            %key,
            rtt = ?rtt,
            bytes = decision.bytes,
            ecn = decision.ecn_marks,
            drops = decision.drops,
            sampled = decision.sampled,
            "cycle closed"
        );

        CycleReport {
            key,
            timestamp: self.emitter.timestamp(now),
            rtt,
            class_id: flow.class_id,
            bytes: decision.bytes,
            ecn_marks: decision.ecn_marks,
            drops: decision.drops,
            new_class: decision.new_class,
            tally: flow.tally,
            spin_history: flow.spin_history,
            protocol: flow.protocol,
        }
    }

    /// Publishes what a parser step produced and returns the flow's class.
    fn finish(&self, key: FlowKey, protocol: Protocol, step: Step) -> ClassId {
        match step {
            Step::Created(class_id) => {
                debug!(%key, %protocol, "tracking new flow");
                self.create_side_records(key, protocol);
                class_id
            }
            Step::Continued(class_id) => class_id,
            Step::Closed(report) => {
                let class_id = report.class_id;
                self.emitter.emit(*report);
                class_id
            }
        }
    }

    /// Creates the zeroed per-flow records the collectors write into.
    ///
    /// A full side table does not untrack the flow: the collectors create
    /// their records lazily once space is available again.
    fn create_side_records(&self, key: FlowKey, protocol: Protocol) {
        let results = [
            self.tables
                .ecn
                .insert_if_absent(key, SaturatingRegister::default()),
            self.tables
                .drops
                .insert_if_absent(key, SaturatingRegister::default()),
            self.tables
                .drop_results
                .insert_if_absent(key, CumulativeCounter::default()),
        ];
        for result in results {
            if let Err(e) = result {
                warn!(%key, error = %e, "could not create per-flow signal record");
            }
        }
        if protocol == Protocol::Tcp {
            if let Err(e) = self
                .tables
                .ack_trackers
                .insert_if_absent(key, AckTracker::default())
            {
                warn!(%key, error = %e, "could not create ack tracker");
            }
        }
    }
}
