//! 实时发布器（输出通道）
//!
//! 每个输出通道拥有一个固定形状的消息缓冲区。生产者（控制线程）只用 try-lock：
//!
//! - 拿到锁且上一帧已被投递 → 覆盖动态字段 → [`PublisherGuard::unlock_and_publish`]
//! - 否则本周期跳过该通道，不排队、不重试
//!
//! 投递端（独立线程或调用方手动 [`drain`](RealtimePublisher::drain)）在锁内复制
//! 缓冲区，交还发布权，然后在锁外调用 [`MessageSink::publish`]。
//!
//! # 状态流转
//!
//! ```text
//!        try_lock + unlock_and_publish
//!   ┌──────────────┐ ───────────────────→ ┌──────────────┐
//!   │  Realtime    │                      │ NonRealtime  │
//!   │ (可写入)      │ ←─────────────────── │ (待投递)      │
//!   └──────────────┘        drain         └──────────────┘
//! ```

use crate::error::DriverError;
use crate::metrics::PublisherMetrics;
use crate::transport::{Message, MessageSink};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, trace};

/// 投递线程在无通知时的轮询间隔（用于检查退出标志）
const DELIVERY_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Shared<M> {
    msg: Mutex<M>,
    /// true 表示缓冲区内有一帧尚未投递，生产者不得覆盖
    pending: AtomicBool,
    metrics: PublisherMetrics,
}

impl<M: Clone> Shared<M> {
    fn drain<F: FnOnce(&M)>(&self, deliver: F) -> bool {
        // Acquire: 看到 pending = true 时必须能看到生产者写入的完整缓冲区
        if !self.pending.load(Ordering::Acquire) {
            return false;
        }

        let msg = {
            let guard = self.msg.lock();
            // 持锁后再确认一次：其他 drain 可能已经取走这一帧
            if !self.pending.swap(false, Ordering::AcqRel) {
                return false;
            }
            guard.clone()
        };

        deliver(&msg);
        self.metrics.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }
}

/// 实时发布器
///
/// # 示例
///
/// ```rust
/// use armstate_driver::RealtimePublisher;
///
/// // 手动投递模式：由调用方 drain
/// let publisher = RealtimePublisher::new("counter", 0u32);
///
/// if let Some(mut msg) = publisher.try_lock() {
///     *msg = 42;
///     msg.unlock_and_publish();
/// }
///
/// // 上一帧尚未投递，本周期跳过
/// assert!(publisher.try_lock().is_none());
///
/// let mut delivered = None;
/// assert!(publisher.drain(|m| delivered = Some(*m)));
/// assert_eq!(delivered, Some(42));
/// assert!(publisher.try_lock().is_some());
/// ```
pub struct RealtimePublisher<M> {
    topic: String,
    shared: Arc<Shared<M>>,
    /// 投递线程唤醒通道（手动模式下为 None）
    ///
    /// Drop 时需要 **提前关闭通道**（在 join 投递线程之前）。
    notify_tx: Option<Sender<()>>,
    is_running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl<M: Message> RealtimePublisher<M> {
    /// 创建手动投递模式的发布器（调用方负责 [`drain`](Self::drain)）
    pub fn new(topic: impl Into<String>, initial: M) -> Self {
        Self {
            topic: topic.into(),
            shared: Arc::new(Shared {
                msg: Mutex::new(initial),
                pending: AtomicBool::new(false),
                metrics: PublisherMetrics::new(),
            }),
            notify_tx: None,
            is_running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// 创建带投递线程的发布器
    ///
    /// # 错误
    /// - `DriverError::SpawnThread`: 线程创建失败
    pub fn spawn(
        topic: impl Into<String>,
        initial: M,
        sink: Box<dyn MessageSink<M>>,
    ) -> Result<Self, DriverError> {
        let mut publisher = Self::new(topic, initial);

        // 容量 1：多次通知合并为一次
        let (notify_tx, notify_rx) = crossbeam_channel::bounded(1);
        publisher.is_running.store(true, Ordering::Release);

        let topic = publisher.topic.clone();
        let shared = publisher.shared.clone();
        let is_running = publisher.is_running.clone();

        let thread = std::thread::Builder::new()
            .name(format!("armstate-pub:{}", publisher.topic))
            .spawn(move || delivery_loop(topic, shared, sink, notify_rx, is_running))
            .map_err(|source| DriverError::SpawnThread {
                topic: publisher.topic.clone(),
                source,
            })?;

        publisher.notify_tx = Some(notify_tx);
        publisher.thread = Some(thread);
        Ok(publisher)
    }

    /// 话题名称
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 非阻塞获取缓冲区（生产者路径）
    ///
    /// 锁被占用或上一帧尚未投递时返回 `None`，并计入 `skipped`。
    #[inline]
    pub fn try_lock(&self) -> Option<PublisherGuard<'_, M>> {
        if let Some(guard) = self.shared.msg.try_lock() {
            if !self.shared.pending.load(Ordering::Acquire) {
                return Some(PublisherGuard {
                    guard,
                    publisher: self,
                });
            }
        }

        self.shared.metrics.skipped.fetch_add(1, Ordering::Relaxed);
        trace!("Publisher '{}' busy, skipping this cycle", self.topic);
        None
    }

    /// 投递一帧待发送的消息（手动模式）
    ///
    /// 没有待投递消息时返回 false。
    pub fn drain<F: FnOnce(&M)>(&self, deliver: F) -> bool {
        self.shared.drain(deliver)
    }

    /// 消费者侧句柄
    pub fn handle(&self) -> PublisherHandle<M> {
        PublisherHandle {
            topic: self.topic.clone(),
            shared: self.shared.clone(),
        }
    }

    /// 阻塞获取缓冲区（仅用于非实时路径）
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.shared.msg.lock()
    }

    /// 当前缓冲区的副本（阻塞，仅用于非实时路径）
    pub fn latest(&self) -> M {
        self.shared.msg.lock().clone()
    }

    /// 是否有一帧尚未投递
    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &PublisherMetrics {
        &self.shared.metrics
    }

    /// 是否由独立线程投递
    pub fn is_threaded(&self) -> bool {
        self.thread.is_some()
    }

    fn notify(&self) {
        if let Some(tx) = &self.notify_tx {
            // 通道已满说明投递线程已有待处理的唤醒
            let _ = tx.try_send(());
        }
    }
}

impl<M> Drop for RealtimePublisher<M> {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);

        // 先关闭通知通道，投递线程会收到 Disconnected 并退出
        drop(self.notify_tx.take());

        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            error!("Delivery thread for '{}' panicked", self.topic);
        }
    }
}

fn delivery_loop<M: Message>(
    topic: String,
    shared: Arc<Shared<M>>,
    mut sink: Box<dyn MessageSink<M>>,
    notify_rx: Receiver<()>,
    is_running: Arc<AtomicBool>,
) {
    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Delivery thread '{}': is_running flag is false, exiting", topic);
            break;
        }

        match notify_rx.recv_timeout(DELIVERY_POLL_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Timeout) => {
                shared.drain(|msg| sink.publish(&topic, msg));
            },
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // 发布器已销毁：投递最后一帧后退出
    shared.drain(|msg| sink.publish(&topic, msg));
    trace!("Delivery thread '{}': loop exited", topic);
}

/// 独占的缓冲区写入权
///
/// 通过 `Deref`/`DerefMut` 访问消息。调用 [`unlock_and_publish`](Self::unlock_and_publish)
/// 提交；直接 drop 则释放锁且不发布任何消息。
pub struct PublisherGuard<'a, M: Message> {
    guard: MutexGuard<'a, M>,
    publisher: &'a RealtimePublisher<M>,
}

impl<M: Message> PublisherGuard<'_, M> {
    /// 释放锁并交给投递端
    pub fn unlock_and_publish(self) {
        let PublisherGuard { guard, publisher } = self;

        // Release: 投递端看到 pending = true 时，缓冲区写入已全部可见
        publisher.shared.pending.store(true, Ordering::Release);
        drop(guard);

        publisher
            .shared
            .metrics
            .published
            .fetch_add(1, Ordering::Relaxed);
        publisher.notify();
    }
}

impl<M: Message> Deref for PublisherGuard<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.guard
    }
}

impl<M: Message> DerefMut for PublisherGuard<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.guard
    }
}

/// 消费者侧句柄（可跨线程克隆）
///
/// 只提供阻塞访问，不得在控制线程上使用。
pub struct PublisherHandle<M> {
    topic: String,
    shared: Arc<Shared<M>>,
}

impl<M> Clone for PublisherHandle<M> {
    fn clone(&self) -> Self {
        Self {
            topic: self.topic.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<M: Message> PublisherHandle<M> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// 阻塞获取缓冲区
    ///
    /// 持有期间生产者的 try-lock 会失败，该通道的发布被跳过。
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.shared.msg.lock()
    }

    pub fn latest(&self) -> M {
        self.shared.msg.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// 投递一帧待发送的消息（手动模式下由消费者线程调用）
    pub fn drain<F: FnOnce(&M)>(&self, deliver: F) -> bool {
        self.shared.drain(deliver)
    }

    pub fn metrics(&self) -> &PublisherMetrics {
        &self.shared.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Sample {
        seq: u32,
        values: [f64; 3],
    }

    #[test]
    fn test_try_lock_publish_drain() {
        let publisher = RealtimePublisher::new("sample", Sample::default());

        {
            let mut msg = publisher.try_lock().unwrap();
            msg.seq = 1;
            msg.values = [1.0, 2.0, 3.0];
            msg.unlock_and_publish();
        }
        assert!(publisher.is_pending());

        let mut out = None;
        assert!(publisher.drain(|m| out = Some(m.clone())));
        assert_eq!(
            out,
            Some(Sample {
                seq: 1,
                values: [1.0, 2.0, 3.0]
            })
        );
        assert!(!publisher.is_pending());
        assert!(!publisher.drain(|_| panic!("nothing to deliver")));

        let snapshot = publisher.metrics().snapshot();
        assert_eq!(snapshot.published, 1);
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.skipped, 0);
    }

    #[test]
    fn test_skip_while_previous_pending() {
        let publisher = RealtimePublisher::new("sample", Sample::default());

        let mut msg = publisher.try_lock().unwrap();
        msg.seq = 1;
        msg.unlock_and_publish();

        // 未投递前不允许覆盖
        assert!(publisher.try_lock().is_none());
        assert_eq!(publisher.latest().seq, 1);
        assert_eq!(publisher.metrics().snapshot().skipped, 1);
    }

    #[test]
    fn test_skip_while_consumer_holds_lock() {
        let publisher = RealtimePublisher::new("sample", Sample::default());
        let handle = publisher.handle();

        let consumer_guard = handle.lock();
        assert!(publisher.try_lock().is_none());
        drop(consumer_guard);

        assert!(publisher.try_lock().is_some());
    }

    #[test]
    fn test_concurrent_drains_deliver_once() {
        use std::sync::atomic::AtomicUsize;

        let publisher = RealtimePublisher::new("sample", Sample::default());
        let mut msg = publisher.try_lock().unwrap();
        msg.seq = 7;
        msg.unlock_and_publish();

        let deliveries = Arc::new(AtomicUsize::new(0));
        let handle = publisher.handle();

        // 两个消费者都看到 pending 后在锁上排队
        let consumer_guard = handle.lock();
        let drainers: Vec<_> = (0..2)
            .map(|_| {
                let handle = handle.clone();
                let deliveries = deliveries.clone();
                thread::spawn(move || {
                    handle.drain(|m| {
                        assert_eq!(m.seq, 7);
                        deliveries.fetch_add(1, Ordering::SeqCst);
                    })
                })
            })
            .collect();
        thread::sleep(Duration::from_millis(50));
        drop(consumer_guard);

        let drained: Vec<bool> = drainers.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(drained.iter().filter(|d| **d).count(), 1);
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        let snapshot = publisher.metrics().snapshot();
        assert_eq!(snapshot.published, 1);
        assert_eq!(snapshot.delivered, 1);
    }

    #[test]
    fn test_drop_guard_without_publish() {
        let publisher = RealtimePublisher::new("sample", Sample::default());
        {
            let mut msg = publisher.try_lock().unwrap();
            msg.seq = 9;
        }
        assert!(!publisher.is_pending());
        assert_eq!(publisher.metrics().snapshot().published, 0);
        assert!(!publisher.drain(|_| {}));
    }

    #[test]
    fn test_threaded_delivery() {
        let (tx, rx) = unbounded();
        let sink = Box::new(move |topic: &str, msg: &Sample| {
            let _ = tx.send((topic.to_string(), msg.clone()));
        });
        let publisher = RealtimePublisher::spawn("sample", Sample::default(), sink).unwrap();
        assert!(publisher.is_threaded());

        for seq in 1..=5 {
            let mut msg = publisher.try_lock().expect("previous frame delivered");
            msg.seq = seq;
            msg.unlock_and_publish();

            let (topic, delivered) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(topic, "sample");
            assert_eq!(delivered.seq, seq);
        }

        assert_eq!(publisher.metrics().snapshot().delivered, 5);
    }

    #[test]
    fn test_slow_consumer_never_blocks_producer() {
        let (release_tx, release_rx) = unbounded::<()>();
        let (done_tx, done_rx) = unbounded::<u32>();
        let sink = Box::new(move |_: &str, msg: &Sample| {
            // 模拟慢消费者：等待测试放行
            let _ = release_rx.recv_timeout(Duration::from_secs(2));
            let _ = done_tx.send(msg.seq);
        });
        let publisher = RealtimePublisher::spawn("slow", Sample::default(), sink).unwrap();

        let mut msg = publisher.try_lock().unwrap();
        msg.seq = 1;
        msg.unlock_and_publish();

        // 等待投递线程取走第一帧（pending 被清除）
        let start = std::time::Instant::now();
        while publisher.is_pending() && start.elapsed() < Duration::from_secs(2) {
            thread::sleep(Duration::from_millis(1));
        }

        // 消费者阻塞在 sink 中，生产者仍可立即写入下一帧
        let start = std::time::Instant::now();
        let mut msg = publisher.try_lock().unwrap();
        msg.seq = 2;
        msg.unlock_and_publish();
        assert!(start.elapsed() < Duration::from_millis(50));

        // 第二帧未投递前，第三帧被跳过
        assert!(publisher.try_lock().is_none());

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(2)).unwrap(), 1);
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(2)).unwrap(), 2);
    }

    #[test]
    fn test_drop_stops_delivery_thread() {
        let (tx, rx) = unbounded();
        let sink = Box::new(move |_: &str, msg: &Sample| {
            let _ = tx.send(msg.seq);
        });
        let publisher = RealtimePublisher::spawn("sample", Sample::default(), sink).unwrap();
        let mut msg = publisher.try_lock().unwrap();
        msg.seq = 3;
        msg.unlock_and_publish();
        drop(publisher);

        // 最后一帧在退出前投递，之后 sink 被释放
        let received: Vec<u32> = rx.iter().collect();
        assert_eq!(received, vec![3]);
    }

    #[test]
    fn test_handle_is_send_and_clone() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PublisherHandle<Sample>>();
        assert_send_sync::<RealtimePublisher<Sample>>();

        let publisher = RealtimePublisher::new("sample", Sample::default());
        let handle = publisher.handle().clone();
        assert_eq!(handle.topic(), "sample");
        assert_eq!(handle.latest(), Sample::default());
    }
}
