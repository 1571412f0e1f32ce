//! 传输层抽象
//!
//! 发布核心只需要"拿到一条完整消息并交出去"。寻址、序列化格式、订阅者管理都在
//! [`MessageSink`] 实现内部完成。
//!
//! # 线程约束
//!
//! [`MessageSink::publish`] 只在通道的投递线程中调用，永远不会出现在控制线程上，
//! 因此实现可以阻塞、分配内存或做 I/O。

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace, warn};

/// 可发布的消息类型
pub trait Message: Clone + Send + fmt::Debug + 'static {}

impl<T: Clone + Send + fmt::Debug + 'static> Message for T {}

/// 单个话题的消息出口
pub trait MessageSink<M>: Send {
    fn publish(&mut self, topic: &str, msg: &M);
}

impl<M, F> MessageSink<M> for F
where
    F: FnMut(&str, &M) + Send,
{
    fn publish(&mut self, topic: &str, msg: &M) {
        self(topic, msg)
    }
}

/// 传输层：按话题创建消息出口
pub trait Transport {
    fn advertise<M: Message>(&self, topic: &str) -> Box<dyn MessageSink<M>>;
}

/// 基于 crossbeam 通道的进程内传输
///
/// 每个话题一个有界通道；消费者通过 [`subscribe`](Self::subscribe) 拿到接收端。
/// 通道满时丢弃新消息（只保留最新的语义由消费者自行处理）。
///
/// # 示例
///
/// ```rust
/// use armstate_driver::{ChannelTransport, Transport};
///
/// let transport = ChannelTransport::new(16);
/// let rx = transport.subscribe::<u32>("numbers").unwrap();
/// let mut sink = transport.advertise::<u32>("numbers");
/// sink.publish("numbers", &7);
/// assert_eq!(rx.try_recv().unwrap(), 7);
/// ```
pub struct ChannelTransport {
    capacity: usize,
    topics: Mutex<HashMap<String, Box<dyn Any + Send>>>,
}

type Endpoints<M> = (Sender<M>, Receiver<M>);

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: Mutex::new(HashMap::new()),
        }
    }

    fn endpoints<M: Message>(&self, topic: &str) -> Option<Endpoints<M>> {
        let mut topics = self.topics.lock();
        let entry = topics.entry(topic.to_string()).or_insert_with(|| {
            Box::new(crossbeam_channel::bounded::<M>(self.capacity)) as Box<dyn Any + Send>
        });
        entry.downcast_ref::<Endpoints<M>>().cloned()
    }

    /// 订阅话题（可在 advertise 之前或之后调用）
    ///
    /// 如果该话题已以其他消息类型注册，返回 `None`。
    pub fn subscribe<M: Message>(&self, topic: &str) -> Option<Receiver<M>> {
        self.endpoints::<M>(topic).map(|(_, rx)| rx)
    }

    /// 已注册的话题
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(64)
    }
}

struct ChannelSink<M> {
    tx: Sender<M>,
}

impl<M: Message> MessageSink<M> for ChannelSink<M> {
    fn publish(&mut self, topic: &str, msg: &M) {
        match self.tx.try_send(msg.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(_)) => {
                trace!("Channel for topic '{}' is full, dropping message", topic);
            },
            Err(TrySendError::Disconnected(_)) => {
                trace!("Channel for topic '{}' disconnected", topic);
            },
        }
    }
}

impl Transport for ChannelTransport {
    fn advertise<M: Message>(&self, topic: &str) -> Box<dyn MessageSink<M>> {
        match self.endpoints::<M>(topic) {
            Some((tx, _)) => Box::new(ChannelSink { tx }),
            None => {
                warn!(
                    "Topic '{}' already registered with a different message type, messages will be discarded",
                    topic
                );
                Box::new(|_: &str, _: &M| {})
            },
        }
    }
}

/// 把每条消息以 `debug` 级别写入日志的传输
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn advertise<M: Message>(&self, topic: &str) -> Box<dyn MessageSink<M>> {
        debug!("Advertised topic '{}'", topic);
        Box::new(|topic: &str, msg: &M| {
            debug!(topic, "{:?}", msg);
        })
    }
}
