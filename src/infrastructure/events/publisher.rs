//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现

use crate::application::ports::{LifecycleEvent, ProgressSinkPort};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// 全局 WebSocket 事件
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum WsEvent {
    /// 生成会话开始
    SessionStarted {
        session_id: String,
        project_id: String,
    },
    /// 生成会话结束
    SessionFinished {
        session_id: String,
        status: String,
    },
}

/// 事件发布器
pub struct EventPublisher {
    /// session_id -> broadcast sender (lifecycle events of one session)
    session_channels: DashMap<String, broadcast::Sender<LifecycleEvent>>,
    /// Global broadcast channel for session start/finish
    global_channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            session_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    /// 订阅会话事件，通道不存在时创建
    pub fn register_session(&self, session_id: &str) -> broadcast::Receiver<LifecycleEvent> {
        self.session_channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 订阅后再确认会话仍在运行，已结束则撤销订阅并返回 None
    ///
    /// 要求会话先进入终态、再关闭通道。
    pub fn register_live_session(
        &self,
        session_id: &str,
        is_running: impl FnOnce() -> bool,
    ) -> Option<broadcast::Receiver<LifecycleEvent>> {
        let rx = self.register_session(session_id);
        if is_running() {
            Some(rx)
        } else {
            self.unregister_session(session_id);
            None
        }
    }

    /// 取消注册会话；已订阅者读完缓冲区后收到 Closed
    pub fn unregister_session(&self, session_id: &str) {
        self.session_channels.remove(session_id);
    }

    /// 获取会话的事件接收器
    pub fn subscribe(&self, session_id: &str) -> Option<broadcast::Receiver<LifecycleEvent>> {
        self.session_channels.get(session_id).map(|s| s.subscribe())
    }

    fn publish_global(&self, event: WsEvent) {
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish global event (no receivers)");
        }
    }
}

impl ProgressSinkPort for EventPublisher {
    fn publish(&self, session_id: &str, event: LifecycleEvent) {
        if let Some(sender) = self.session_channels.get(session_id) {
            if let Err(e) = sender.send(event) {
                tracing::trace!(
                    session_id = %session_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }

    fn session_opened(&self, session_id: &str, project_id: &str) {
        self.session_channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        self.publish_global(WsEvent::SessionStarted {
            session_id: session_id.to_string(),
            project_id: project_id.to_string(),
        });
    }

    fn session_closed(&self, session_id: &str, status: &str) {
        self.unregister_session(session_id);
        self.publish_global(WsEvent::SessionFinished {
            session_id: session_id.to_string(),
            status: status.to_string(),
        });
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_events_delivered_then_closed() {
        let publisher = EventPublisher::new();
        let mut global = publisher.subscribe_global();

        publisher.session_opened("s1", "p1");
        let mut rx = publisher.subscribe("s1").unwrap();

        publisher.publish("s1", LifecycleEvent::SubUnitStarted { chapters: vec![1, 2] });
        publisher.publish("other", LifecycleEvent::Failed { reason: "x".into() });
        publisher.publish("s1", LifecycleEvent::AllComplete { total_chapters: 2 });
        publisher.session_closed("s1", "completed");

        assert_eq!(
            rx.recv().await.unwrap(),
            LifecycleEvent::SubUnitStarted { chapters: vec![1, 2] }
        );
        assert!(rx.recv().await.unwrap().is_terminal());
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));

        assert!(matches!(global.recv().await.unwrap(), WsEvent::SessionStarted { .. }));
        assert!(matches!(global.recv().await.unwrap(), WsEvent::SessionFinished { .. }));
        assert!(publisher.subscribe("s1").is_none());
    }

    #[test]
    fn test_register_after_finish_leaves_no_channel() {
        let publisher = EventPublisher::new();
        publisher.session_opened("s1", "p1");
        publisher.session_closed("s1", "completed");

        assert!(publisher.register_live_session("s1", || false).is_none());
        assert!(publisher.subscribe("s1").is_none());

        assert!(publisher.register_live_session("s2", || true).is_some());
        assert!(publisher.subscribe("s2").is_some());
    }

    #[test]
    fn test_event_wire_format() {
        let event = LifecycleEvent::BatchPersisted {
            batch_index: 1,
            completed_chapters: 8,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "batch_persisted");
        assert_eq!(json["data"]["completed_chapters"], 8);

        let json = serde_json::to_value(WsEvent::SessionFinished {
            session_id: "s".into(),
            status: "failed".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "session_finished");
    }
}
