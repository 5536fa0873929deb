//! Room transport over the in-memory relay.

use serde_json::json;
use versus_tetris::net::{
    ChannelState, EventQueue, MemoryHub, MemoryRelay, PeerPayload, ReadyPayload, Relay,
    RoomEvent, StartPayload, TransportClient, TransportConfig,
};

fn client(hub: &MemoryHub, id: &str) -> TransportClient<MemoryRelay> {
    TransportClient::new(hub.connect(), TransportConfig::default()).with_user_id(id)
}

fn joined(hub: &MemoryHub, id: &str, room: &str) -> (TransportClient<MemoryRelay>, EventQueue) {
    let events = EventQueue::new();
    let mut c = client(hub, id);
    c.join(room, Some(id), Box::new(events.clone()));
    c.poll(0);
    (c, events)
}

#[test]
fn join_and_leave_reach_the_peer_but_not_the_sender() {
    let hub = MemoryHub::new();
    let (mut a, a_events) = joined(&hub, "a", "room-1");
    let (mut b, b_events) = joined(&hub, "b", "room-1");
    a.poll(1);
    b.poll(1);

    assert_eq!(
        a_events.drain(),
        vec![RoomEvent::Join(PeerPayload {
            user_id: "b".into(),
            name: Some("b".into()),
        })]
    );
    assert!(b_events.is_empty());

    b.leave();
    a.poll(2);
    assert!(matches!(
        a_events.drain().as_slice(),
        [RoomEvent::Leave(p)] if p.user_id == "b"
    ));
}

#[test]
fn ready_echo_is_delivered_to_the_sender() {
    let hub = MemoryHub::new();
    let (mut a, a_events) = joined(&hub, "a", "room-1");
    a.poll(1);
    a_events.drain();

    let ready = RoomEvent::Ready(ReadyPayload {
        user_id: "a".into(),
        ready: true,
    });
    assert!(a.send(&ready));
    a.poll(2);
    assert_eq!(a_events.drain(), vec![ready]);
}

#[test]
fn rooms_are_isolated() {
    let hub = MemoryHub::new();
    let (mut a, a_events) = joined(&hub, "a", "room-1");
    let (mut b, _) = joined(&hub, "b", "room-2");
    a.poll(1);
    b.poll(1);

    b.send(&RoomEvent::Start(StartPayload { seed: 1, at: 2 }));
    a.poll(2);
    assert!(a_events.is_empty());
}

#[test]
fn malformed_payloads_are_dropped() {
    let hub = MemoryHub::new();
    let (mut a, a_events) = joined(&hub, "a", "room-1");
    a.poll(1);

    let mut raw = hub.connect();
    raw.subscribe("room:room-1").unwrap();
    raw.publish("room:room-1", json!({"type": "state", "payload": {"oops": true}}))
        .unwrap();
    raw.publish("room:room-1", json!("not an event")).unwrap();
    raw.publish("room:room-1", json!({"type": "start", "payload": {"seed": 5, "at": 9}}))
        .unwrap();

    a.poll(2);
    assert_eq!(
        a_events.drain(),
        vec![RoomEvent::Start(StartPayload { seed: 5, at: 9 })]
    );
}

#[test]
fn health_check_resubscribes_after_backoff() {
    let hub = MemoryHub::new();
    let (mut a, a_events) = joined(&hub, "a", "room-1");
    let (mut b, b_events) = joined(&hub, "b", "room-1");
    a.poll(1);
    b.poll(1);
    a_events.drain();
    b_events.drain();

    hub.fail("room:room-1");
    assert_eq!(a.channel_state(), ChannelState::Errored);
    assert!(!a.send(&RoomEvent::Start(StartPayload { seed: 1, at: 1 })));

    // Health check at 5s tears down, backoff of 1s before re-subscribing
    a.poll(4_000);
    assert_eq!(a.channel_state(), ChannelState::Errored);
    a.poll(5_000);
    b.poll(5_000);
    assert_eq!(a.channel_state(), ChannelState::Closed);
    a.poll(5_500);
    assert_eq!(a.channel_state(), ChannelState::Closed);

    b.poll(6_000);
    a.poll(6_000);
    a.poll(6_001);
    assert_eq!(a.channel_state(), ChannelState::Joined);
    assert!(a.is_joined());
    assert_eq!(a.room_id(), Some("room-1"));

    // The replayed join reaches the peer with the original display name
    b.poll(6_002);
    assert!(b_events.drain().iter().any(|e| matches!(
        e,
        RoomEvent::Join(p) if p.user_id == "a" && p.name.as_deref() == Some("a")
    )));

    // And the handler survived the reconnect
    b.send(&RoomEvent::Start(StartPayload { seed: 3, at: 4 }));
    a.poll(6_100);
    assert_eq!(
        a_events.drain().last(),
        Some(&RoomEvent::Start(StartPayload { seed: 3, at: 4 }))
    );
}

#[test]
fn visibility_restore_checks_health_immediately() {
    let hub = MemoryHub::new();
    let (mut a, _) = joined(&hub, "a", "room-1");
    a.poll(1);

    a.on_visibility_change(false, 100);
    hub.fail("room:room-1");
    a.on_visibility_change(true, 200);
    assert_eq!(a.channel_state(), ChannelState::Closed);

    a.poll(1_200);
    a.poll(1_201);
    assert!(a.is_joined());
}

#[test]
fn leave_is_idempotent_and_cancels_timers() {
    let hub = MemoryHub::new();
    let (mut a, _) = joined(&hub, "a", "room-1");
    a.poll(1);

    a.leave();
    a.leave();
    assert_eq!(hub.subscriber_count("room:room-1"), 0);

    // No timer brings the subscription back
    a.poll(10_000);
    a.poll(20_000);
    assert_eq!(hub.subscriber_count("room:room-1"), 0);
    assert!(!a.is_joined());
}
