//! Subscription registry and fan-out.
//!
//! Three forward indices (channel, subchannel, thread) map scopes to the
//! set of subscribed session ids, plus a reverse per-session set for O(1)
//! cleanup on disconnect — matching the teacher's `UserManager.senders`
//! registry (a `DashMap<key, Vec<SessionSender>>` the broker clones out
//! from under the lock before awaiting any send) generalized from "one key
//! per uid" to three separate subscription scopes.
//!
//! The broker owns only a `session_id` + `mpsc::Sender<Arc<Frame>>`
//! capability per session (a weak handle, per the design notes): it never
//! owns the session's lifetime, only a way to reach it while it's alive.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use superchat_proto::Frame;
use tokio::sync::mpsc;
use tracing::debug;

pub type SessionId = u64;

#[derive(Clone)]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub tx: mpsc::Sender<std::sync::Arc<Frame>>,
}

#[derive(Debug, Default)]
pub struct SessionCounters {
    pub dropped_broadcasts: AtomicU64,
}

/// Multimaps for each subscription scope, plus per-session bookkeeping.
#[derive(Default)]
pub struct Broker {
    channel_subs: DashMap<i64, HashSet<SessionId>>,
    subchannel_subs: DashMap<(i64, i64), HashSet<SessionId>>,
    thread_subs: DashMap<i64, HashSet<SessionId>>,
    sessions: DashMap<SessionId, SessionHandle>,
    session_subscriptions: DashMap<SessionId, SubscriptionSet>,
    counters: DashMap<SessionId, std::sync::Arc<SessionCounters>>,
}

#[derive(Default, Clone)]
struct SubscriptionSet {
    channels: HashSet<i64>,
    subchannels: HashSet<(i64, i64)>,
    threads: HashSet<i64>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_session(&self, handle: SessionHandle) {
        self.counters
            .insert(handle.session_id, std::sync::Arc::new(SessionCounters::default()));
        self.sessions.insert(handle.session_id, handle);
    }

    pub fn counters(&self, session_id: SessionId) -> Option<std::sync::Arc<SessionCounters>> {
        self.counters.get(&session_id).map(|c| c.clone())
    }

    pub fn subscribe_channel(&self, session_id: SessionId, channel_id: i64) -> bool {
        let inserted_index = self
            .channel_subs
            .entry(channel_id)
            .or_default()
            .insert(session_id);
        self.session_subscriptions
            .entry(session_id)
            .or_default()
            .channels
            .insert(channel_id);
        inserted_index
    }

    pub fn unsubscribe_channel(&self, session_id: SessionId, channel_id: i64) {
        if let Some(mut subs) = self.channel_subs.get_mut(&channel_id) {
            subs.remove(&session_id);
        }
        if let Some(mut set) = self.session_subscriptions.get_mut(&session_id) {
            set.channels.remove(&channel_id);
        }
    }

    pub fn subscribe_subchannel(&self, session_id: SessionId, channel_id: i64, subchannel_id: i64) {
        self.subchannel_subs
            .entry((channel_id, subchannel_id))
            .or_default()
            .insert(session_id);
        self.session_subscriptions
            .entry(session_id)
            .or_default()
            .subchannels
            .insert((channel_id, subchannel_id));
    }

    pub fn unsubscribe_subchannel(&self, session_id: SessionId, channel_id: i64, subchannel_id: i64) {
        if let Some(mut subs) = self.subchannel_subs.get_mut(&(channel_id, subchannel_id)) {
            subs.remove(&session_id);
        }
        if let Some(mut set) = self.session_subscriptions.get_mut(&session_id) {
            set.subchannels.remove(&(channel_id, subchannel_id));
        }
    }

    pub fn subscribe_thread(&self, session_id: SessionId, thread_root_id: i64) {
        self.thread_subs
            .entry(thread_root_id)
            .or_default()
            .insert(session_id);
        self.session_subscriptions
            .entry(session_id)
            .or_default()
            .threads
            .insert(thread_root_id);
    }

    pub fn unsubscribe_thread(&self, session_id: SessionId, thread_root_id: i64) {
        if let Some(mut subs) = self.thread_subs.get_mut(&thread_root_id) {
            subs.remove(&session_id);
        }
        if let Some(mut set) = self.session_subscriptions.get_mut(&session_id) {
            set.threads.remove(&thread_root_id);
        }
    }

    /// Removes every trace of a session: O(1) via the reverse index instead
    /// of scanning every forward map.
    pub fn remove_session(&self, session_id: SessionId) {
        if let Some((_, subs)) = self.session_subscriptions.remove(&session_id) {
            for channel_id in subs.channels {
                if let Some(mut set) = self.channel_subs.get_mut(&channel_id) {
                    set.remove(&session_id);
                }
            }
            for key in subs.subchannels {
                if let Some(mut set) = self.subchannel_subs.get_mut(&key) {
                    set.remove(&session_id);
                }
            }
            for thread_id in subs.threads {
                if let Some(mut set) = self.thread_subs.get_mut(&thread_id) {
                    set.remove(&session_id);
                }
            }
        }
        self.sessions.remove(&session_id);
        self.counters.remove(&session_id);
    }

    /// Recipients for a message `channel`/`subchannel`/`thread_root`,
    /// deduplicated. The publisher's own session is included by the
    /// caller, not excluded here — it only needs to already be subscribed,
    /// same as any other recipient.
    fn recipients(&self, channel_id: i64, subchannel_id: Option<i64>, thread_root_id: Option<i64>) -> HashSet<SessionId> {
        let mut out = HashSet::new();
        if let Some(set) = self.channel_subs.get(&channel_id) {
            out.extend(set.iter().copied());
        }
        if let Some(sub) = subchannel_id {
            if let Some(set) = self.subchannel_subs.get(&(channel_id, sub)) {
                out.extend(set.iter().copied());
            }
        }
        if let Some(root) = thread_root_id {
            if let Some(set) = self.thread_subs.get(&root) {
                out.extend(set.iter().copied());
            }
        }
        out
    }

    /// Non-blocking fan-out to every recipient of a (channel, subchannel,
    /// thread) scope. A full outbound queue drops the broadcast for that
    /// recipient only and bumps its `dropped_broadcasts` counter — the
    /// producer (this call) never blocks.
    pub fn publish(
        &self,
        channel_id: i64,
        subchannel_id: Option<i64>,
        thread_root_id: Option<i64>,
        frame: Frame,
    ) -> usize {
        let recipients = self.recipients(channel_id, subchannel_id, thread_root_id);
        let frame = std::sync::Arc::new(frame);
        let mut delivered = 0;
        for session_id in recipients {
            let Some(handle) = self.sessions.get(&session_id) else {
                continue;
            };
            match handle.tx.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    crate::metrics::BROADCASTS_DELIVERED.inc();
                }
                Err(_) => {
                    if let Some(counters) = self.counters.get(&session_id) {
                        counters.dropped_broadcasts.fetch_add(1, Ordering::Relaxed);
                    }
                    crate::metrics::BROADCASTS_DROPPED.inc();
                    debug!(session_id, "dropped broadcast, outbound full");
                }
            }
        }
        delivered
    }

    /// Publish only to the author's own session (shadowban isolation).
    pub fn publish_to_session(&self, session_id: SessionId, frame: Frame) -> bool {
        let Some(handle) = self.sessions.get(&session_id) else {
            return false;
        };
        let ok = handle.tx.try_send(std::sync::Arc::new(frame)).is_ok();
        if ok {
            crate::metrics::BROADCASTS_DELIVERED.inc();
        } else {
            crate::metrics::BROADCASTS_DROPPED.inc();
        }
        ok
    }

    pub fn broadcast_all(&self, frame: Frame) -> usize {
        let frame = std::sync::Arc::new(frame);
        let mut delivered = 0;
        for entry in self.sessions.iter() {
            if entry.value().tx.try_send(frame.clone()).is_ok() {
                delivered += 1;
                crate::metrics::BROADCASTS_DELIVERED.inc();
            } else {
                crate::metrics::BROADCASTS_DROPPED.inc();
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use superchat_proto::message::MessageType;

    fn dummy_frame() -> Frame {
        Frame::new(MessageType::Ping, bytes::Bytes::new())
    }

    #[tokio::test]
    async fn subscriber_receives_published_message() {
        let broker = Broker::new();
        let (tx, mut rx) = mpsc::channel(8);
        broker.register_session(SessionHandle { session_id: 1, tx });
        broker.subscribe_channel(1, 100);

        let delivered = broker.publish(100, None, None, dummy_frame());
        assert_eq!(delivered, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn full_outbound_increments_dropped_counter() {
        let broker = Broker::new();
        let (tx, _rx) = mpsc::channel(1);
        broker.register_session(SessionHandle { session_id: 1, tx });
        broker.subscribe_channel(1, 100);

        broker.publish(100, None, None, dummy_frame());
        broker.publish(100, None, None, dummy_frame());

        let counters = broker.counters(1).unwrap();
        assert!(counters.dropped_broadcasts.load(Ordering::Relaxed) >= 1);
    }

    #[tokio::test]
    async fn removing_session_clears_all_indices() {
        let broker = Broker::new();
        let (tx, _rx) = mpsc::channel(8);
        broker.register_session(SessionHandle { session_id: 1, tx });
        broker.subscribe_channel(1, 100);
        broker.subscribe_thread(1, 5);

        broker.remove_session(1);

        assert_eq!(broker.publish(100, None, None, dummy_frame()), 0);
        assert_eq!(broker.publish(999, None, Some(5), dummy_frame()), 0);
    }
}
