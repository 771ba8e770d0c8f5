//! Frame transport between a leader and its followers: fragmentation,
//! reassembly without mixing, inter-chunk pacing and the stuck watchdog.

mod common;

use common::{at, chunk, chunk_with_brightness, deliver_frame, exchange, node};
use embassy_time::Duration;
use playalights_sync::inbox::enqueue_packet;
use playalights_sync::protocol::{ChunkPacket, MessageType, TokenPacket};
use playalights_sync::{
    ButtonEvent, NodeRole, NodeToken, OutputProcessor, PacketInbox, Rgb, SyncConfig, TickOutcome,
};

const LEDS: usize = 300;

const RED: Rgb = Rgb::new(255, 0, 0);
const BLUE: Rgb = Rgb::new(0, 0, 255);

// -----------------------------------------------------------------------------
// Reassembly
// -----------------------------------------------------------------------------

#[test]
fn partial_frame_is_never_mixed_with_newer_sequence() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());

    for index in [0, 2, 3] {
        n.handle_packet(&chunk::<LEDS>(0x900, 100, index, RED), at(0))
            .expect("chunk");
    }
    n.handle_packet(&chunk::<LEDS>(0x900, 101, 0, BLUE), at(5))
        .expect("chunk");
    // The missing chunk of the superseded frame arrives late
    n.handle_packet(&chunk::<LEDS>(0x900, 100, 1, RED), at(6))
        .expect("stale chunk is not an error");

    assert_eq!(n.role(), NodeRole::Standalone);
    assert!(n.received_frame().iter().all(|c| *c == Rgb::default()));

    let stats = n.receive_stats();
    assert_eq!(stats.frames_completed, 0);
    assert_eq!(stats.frames_dropped, 1);
    assert_eq!(stats.stale_chunks, 1);

    for index in 1..4 {
        n.handle_packet(&chunk::<LEDS>(0x900, 101, index, BLUE), at(10))
            .expect("chunk");
    }

    assert_eq!(n.role(), NodeRole::Follower);
    assert!(n.received_frame().iter().all(|c| *c == BLUE));
}

#[test]
fn chunks_complete_in_any_order_despite_duplicates() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());

    for index in [3, 1, 1, 0, 2, 2] {
        n.handle_packet(&chunk::<LEDS>(0x900, 7, index, RED), at(0))
            .expect("chunk");
    }

    assert!(n.received_frame().iter().all(|c| *c == RED));
    assert_eq!(n.receive_stats().frames_completed, 1);
}

#[test]
fn mismatched_layout_is_rejected() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());

    // Built for a 150 LED strip: two chunks instead of four
    let foreign = chunk::<150>(0x900, 1, 0, RED);
    assert!(n.handle_packet(&foreign, at(0)).is_err());
    assert_eq!(n.receive_stats().rejected_chunks, 1);
}

#[test]
fn follower_applies_received_brightness() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    let color = Rgb::new(200, 100, 50);

    for index in 0..4 {
        n.handle_packet(
            &chunk_with_brightness::<LEDS>(0x900, 1, index, color, 128),
            at(0),
        )
        .expect("chunk");
    }
    n.tick(at(20), None);

    let mut expected = [Rgb::default(); LEDS];
    OutputProcessor::new().apply(&[color; LEDS], 128, &mut expected);
    assert_eq!(n.leds(), &expected);
    assert_eq!(n.ports().leds.last, expected.to_vec());
}

// -----------------------------------------------------------------------------
// Sending
// -----------------------------------------------------------------------------

#[test]
fn leader_paces_chunks_and_interleaves_heartbeats() {
    let config = SyncConfig::default();
    let mut n = node::<LEDS>(0x100, config);
    n.handle_button(ButtonEvent::LongPress, at(0));

    n.tick(at(0), None);
    let first = n.ports_mut().radio.take();
    assert_eq!(first.len(), 5);
    assert_eq!(first[0], TokenPacket::new(NodeToken::new(0x100)).encode());

    let sequence = ChunkPacket::decode(&first[1]).expect("chunk").header.sequence;
    for (index, packet) in first[1..].iter().enumerate() {
        let chunk = ChunkPacket::decode(packet).expect("chunk");
        assert_eq!(usize::from(chunk.header.index), index);
        assert_eq!(chunk.header.sequence, sequence);
        assert_eq!(chunk.header.count, 4);
        assert_eq!(chunk.header.originator, NodeToken::new(0x100));
    }

    // Three pauses for four chunks, none before the first
    let delay = &n.ports().delay;
    assert_eq!(delay.calls, 3);
    let pause = config.inter_packet_delay.as_micros() * 1000;
    assert_eq!(delay.total_ns, 3 * pause);

    n.tick(at(20), None);
    let second = n.ports_mut().radio.take();
    assert_eq!(second.len(), 4);
    assert!(second.iter().all(|p| p[0] == MessageType::Chunk as u8));
    let next = ChunkPacket::decode(&second[0]).expect("chunk").header.sequence;
    assert_eq!(next, sequence.wrapping_add(1));

    n.tick(at(100), None);
    let third = n.ports_mut().radio.take();
    assert_eq!(third[0][0], MessageType::Token as u8);
}

#[test]
fn follower_shows_exactly_what_leader_shows() {
    let config = SyncConfig::default();
    let mut nodes = [node::<LEDS>(0x200, config), node::<LEDS>(0x100, config)];
    nodes[0].handle_button(ButtonEvent::LongPress, at(0));

    for tick in 0..20 {
        let now = at(tick * 20);
        nodes[0].tick(now, None);
        exchange(&mut nodes, now);
        nodes[1].tick(now, None);

        assert_eq!(nodes[1].role(), NodeRole::Follower);
        assert_eq!(nodes[1].leds(), nodes[0].leds());
    }
    assert_eq!(nodes[1].receive_stats().frames_completed, 20);
}

// -----------------------------------------------------------------------------
// Inbox
// -----------------------------------------------------------------------------

#[test]
fn drained_inbox_feeds_the_node() {
    let inbox: PacketInbox<8> = PacketInbox::new();
    let mut n = node::<LEDS>(0x100, SyncConfig::default());

    for index in 0..4 {
        enqueue_packet(&inbox, &chunk::<LEDS>(0x900, 3, index, BLUE)).expect("room");
    }
    enqueue_packet(&inbox, &[0x7F, 1, 2]).expect("room");

    assert_eq!(n.drain_inbox(&inbox, at(0)), 5);
    assert_eq!(n.role(), NodeRole::Follower);
    assert!(n.received_frame().iter().all(|c| *c == BLUE));
}

// -----------------------------------------------------------------------------
// Watchdog
// -----------------------------------------------------------------------------

#[test]
fn endless_partial_frames_request_restart() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    let stuck_timeout = n.config().stuck_timeout;

    let mut sequence = 0;
    let mut now = 0;
    loop {
        sequence += 1;
        n.handle_packet(&chunk::<LEDS>(0x900, sequence, 0, RED), at(now))
            .expect("chunk");
        let outcome = n.tick(at(now), None);

        if at(now) <= at(0) + stuck_timeout {
            assert_eq!(outcome, TickOutcome::Continue, "restart at {now} ms");
        } else {
            assert_eq!(outcome, TickOutcome::Restart);
            break;
        }
        now += 100;
    }
    assert_eq!(now, stuck_timeout.as_millis() + 100);
}

#[test]
fn completed_frames_keep_the_watchdog_quiet() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());

    for tick in 0..120u32 {
        let now = u64::from(tick) * 100;
        deliver_frame(&mut n, 0x900, tick, BLUE, at(now));
        assert_eq!(n.tick(at(now), None), TickOutcome::Continue);
    }
    assert_eq!(n.role(), NodeRole::Follower);
}

#[test]
fn silence_is_not_stuck() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    n.handle_packet(&chunk::<LEDS>(0x900, 1, 0, RED), at(0))
        .expect("chunk");

    let later = at(0) + Duration::from_secs(20);
    assert_eq!(n.tick(later, None), TickOutcome::Continue);
}
