//! Role lifecycle of a node: leader loss, rejoin attempts, pattern-parameter
//! followers and audio-reactive leaders.

mod common;

use common::{at, chunk, deliver_frame, exchange, node};
use embassy_time::Duration;
use playalights_sync::protocol::{ChunkPacket, MessageType, PatternParams, TokenPacket};
use playalights_sync::{
    ButtonEvent, ElectionPolicy, NodeRole, NodeSettings, NodeToken, OperatingMode, PatternSlot, Rgb,
    SyncConfig, SyncPayload,
};

const LEDS: usize = 150;

// -----------------------------------------------------------------------------
// Leader loss
// -----------------------------------------------------------------------------

#[test]
fn silent_leader_is_abandoned_after_timeout() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(0));
    assert_eq!(n.role(), NodeRole::Follower);

    n.tick(at(1_600), None);

    assert_eq!(n.role(), NodeRole::Standalone);
    assert_eq!(n.arbiter().leader(), None);
}

#[test]
fn lone_follower_takes_over_silent_leader() {
    let mut n = node::<LEDS>(0x500, SyncConfig::default());
    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(0));

    let mut entered_election = false;
    let mut took_over = None;
    for tick in 1..=150 {
        n.tick(at(tick * 20), None);
        entered_election |= n.role() == NodeRole::Electing;
        if took_over.is_none() && n.role() == NodeRole::Leader {
            took_over = Some(tick * 20);
        }
    }

    assert!(entered_election);
    let took_over = took_over.expect("never took over");
    assert!(took_over < 1_500, "took over at {} ms", took_over);
    assert_eq!(n.role(), NodeRole::Leader);
    assert!(n.send_stats().frames > 0);
}

#[test]
fn conflict_avoidance_never_elects() {
    let config = SyncConfig {
        election_policy: ElectionPolicy::ConflictAvoidance,
        ..SyncConfig::default()
    };
    let mut n = node::<LEDS>(0x100, config);
    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(0));

    for tick in 1..=300 {
        n.tick(at(tick * 20), None);
        assert_ne!(n.role(), NodeRole::Electing);
    }
    assert_eq!(n.role(), NodeRole::Standalone);
    assert_eq!(n.send_stats().tokens_sent, 0);
}

#[test]
fn rejoin_attempts_are_bounded() {
    let config = SyncConfig::default();
    let mut n = node::<LEDS>(0x100, config);
    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(0));

    // 0x900 answers every round with its token but never sends a frame
    for tick in 1..=300 {
        let now = at(tick * 20);
        n.tick(now, None);
        if n.role() == NodeRole::Electing {
            n.handle_packet(&TokenPacket::new(NodeToken::new(0x900)).encode(), now)
                .expect("token");
        }
    }

    assert_eq!(n.role(), NodeRole::Standalone);
    assert_eq!(n.arbiter().rejoin_attempts(), config.max_rejoin_attempts);

    // No further rounds once the attempts are used up
    let tokens = n.send_stats().tokens_sent;
    assert!(tokens > 0);
    for tick in 301..=800 {
        n.tick(at(tick * 20), None);
    }
    assert_eq!(n.send_stats().tokens_sent, tokens);
    assert_eq!(n.role(), NodeRole::Standalone);
}

#[test]
fn rejoin_round_finds_returning_leader() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(0));
    n.tick(at(1_600), None);
    assert_eq!(n.role(), NodeRole::Standalone);

    // Rejoin attempts stay quiet until the rejoin interval has passed
    let mut now = 1_600;
    while n.role() == NodeRole::Standalone {
        now += 20;
        n.tick(at(now), None);
        assert!(now < 4_000, "no rejoin attempt");
    }
    assert_eq!(n.role(), NodeRole::Electing);

    n.handle_packet(&TokenPacket::new(NodeToken::new(0x900)).encode(), at(now + 10))
        .expect("token");
    let deadline = n.round().expect("round").deadline();
    n.tick(deadline, None);

    assert_eq!(n.role(), NodeRole::Follower);
}

// -----------------------------------------------------------------------------
// Buttons
// -----------------------------------------------------------------------------

#[test]
fn short_press_toggles_mode_only_when_rendering_locally() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    assert_eq!(n.mode(), OperatingMode::Plain);

    n.handle_button(ButtonEvent::ShortPress, at(0));
    assert_eq!(n.mode(), OperatingMode::AudioReactive);
    assert!(n.wants_audio());

    n.tick(at(20), Some(&[0i16; 64][..]));
    let status = n.ports().display.last.expect("status shown");
    assert_eq!(status.mode_label(), "AUDIO");
    assert_eq!(status.role_label(), "STANDALONE");

    deliver_frame(&mut n, 0x900, 1, Rgb::new(1, 1, 1), at(30));
    assert_eq!(n.role(), NodeRole::Follower);
    assert!(!n.wants_audio());

    n.handle_button(ButtonEvent::ShortPress, at(40));
    assert_eq!(n.mode(), OperatingMode::AudioReactive);
}

#[test]
fn long_press_leaves_leader_role() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    n.handle_button(ButtonEvent::LongPress, at(0));
    assert_eq!(n.role(), NodeRole::Leader);

    n.handle_button(ButtonEvent::LongPress, at(500));
    assert_eq!(n.role(), NodeRole::Standalone);

    n.ports_mut().radio.take();
    n.tick(at(520), None);
    assert!(n.ports().radio.packets.is_empty());
}

#[test]
fn restored_settings_drive_the_next_ticks() {
    let config = SyncConfig::default();
    let mut n = node::<LEDS>(0x100, config);
    assert_eq!(n.settings(), NodeSettings::default());

    n.restore(NodeSettings {
        mode: OperatingMode::AudioReactive,
        pattern: PatternSlot::COUNT + 2,
    });
    assert_eq!(n.mode(), OperatingMode::AudioReactive);
    assert!(n.wants_audio());

    n.tick(at(0), Some(&[0i16; 64][..]));
    assert_eq!(n.render_context().pattern_index, 2);

    // Pattern rotation shows up in the settings to save
    n.tick(at(config.pattern_duration.as_millis()), Some(&[0i16; 64][..]));
    assert_eq!(n.settings().pattern, 3);

    n.handle_button(ButtonEvent::ShortPress, at(30_020));
    assert_eq!(n.settings().mode, OperatingMode::Plain);
}

// -----------------------------------------------------------------------------
// Pattern parameters
// -----------------------------------------------------------------------------

#[test]
fn parameter_follower_renders_in_lockstep() {
    let config = SyncConfig {
        payload: SyncPayload::PatternParameters,
        ..SyncConfig::default()
    };
    let mut nodes = [node::<LEDS>(0x200, config), node::<LEDS>(0x100, config)];
    nodes[0].handle_button(ButtonEvent::LongPress, at(0));

    for tick in 0..30 {
        let now = at(tick * 20);
        nodes[0].tick(now, None);
        exchange(&mut nodes, now);
        nodes[1].tick(now, None);

        assert_eq!(nodes[1].role(), NodeRole::Follower);
        assert_eq!(nodes[1].leds(), nodes[0].leds());
    }
    assert_eq!(nodes[1].receive_stats().chunks, 0);
    assert!(nodes[0].send_stats().params_sent >= 30);
}

#[test]
fn parameters_from_unknown_sender_are_ignored() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    let params = PatternParams {
        pattern: 2,
        pattern_start: 0,
        sender_clock: 100,
        global_hue: 40,
        random_seed: 7,
        frame_counter: 3,
    };

    n.handle_packet(&params.encode(), at(0)).expect("params");
    assert_eq!(n.role(), NodeRole::Standalone);
    assert!(n.arbiter().can_promote(at(1), n.config()));
}

#[test]
fn parameters_stay_with_the_followed_leader() {
    let config = SyncConfig {
        payload: SyncPayload::PatternParameters,
        ..SyncConfig::default()
    };
    let mut n = node::<LEDS>(0x300, config);
    let params = |pattern| PatternParams {
        pattern,
        pattern_start: 0,
        sender_clock: 100,
        global_hue: 40,
        random_seed: 7,
        frame_counter: 3,
    };

    n.handle_packet(&TokenPacket::new(NodeToken::new(0x900)).encode(), at(0))
        .expect("token");
    n.handle_packet(&params(1).encode(), at(0)).expect("params");
    assert_eq!(n.role(), NodeRole::Follower);

    // A lower node starts an election nearby, then the leader's params arrive
    n.handle_packet(&TokenPacket::new(NodeToken::new(0x100)).encode(), at(250))
        .expect("token");
    n.handle_packet(&params(3).encode(), at(260)).expect("params");

    assert_eq!(n.arbiter().leader(), Some(NodeToken::new(0x900)));
    assert_eq!(n.arbiter().leader_silence(at(260)), Some(Duration::from_ticks(0)));

    n.tick(at(300), None);
    assert_eq!(n.role(), NodeRole::Follower);
}

// -----------------------------------------------------------------------------
// Audio-reactive leader
// -----------------------------------------------------------------------------

fn samples(tick: u64) -> [i16; 64] {
    // 120 BPM: a 60 ms burst every 500 ms over a quiet background
    let amplitude: i16 = if (tick * 20) % 500 < 60 { 12_000 } else { 300 };
    let mut buffer = [0; 64];
    for (i, sample) in buffer.iter_mut().enumerate() {
        *sample = if i % 2 == 0 { amplitude } else { -amplitude };
    }
    buffer
}

#[test]
fn audio_brightness_reaches_followers() {
    let config = SyncConfig::default();
    let mut nodes = [node::<LEDS>(0x200, config), node::<LEDS>(0x100, config)];
    nodes[0].handle_button(ButtonEvent::ShortPress, at(0));
    nodes[0].handle_button(ButtonEvent::LongPress, at(0));
    assert_eq!(nodes[0].mode(), OperatingMode::AudioReactive);

    let mut brightness = Vec::new();
    for tick in 0..400u64 {
        let now = at(tick * 20);
        nodes[0].tick(now, Some(&samples(tick)[..]));

        for packet in &nodes[0].ports().radio.packets {
            if packet[0] == MessageType::Chunk as u8 {
                let chunk = ChunkPacket::decode(packet).expect("chunk");
                brightness.push(chunk.header.brightness);
            }
        }

        exchange(&mut nodes, now);
        nodes[1].tick(now, None);
        assert_eq!(nodes[1].leds(), nodes[0].leds());
    }

    let status = nodes[0].status();
    assert!(status.bpm > 0);
    assert!(brightness.iter().any(|b| *b != brightness[0]));
    assert!(brightness.iter().any(|b| *b != config.plain_brightness));
}

#[test]
fn isolated_noise_leaves_audio_leader_at_plain_levels() {
    let config = SyncConfig::default();
    let mut n = node::<LEDS>(0x200, config);
    n.handle_button(ButtonEvent::ShortPress, at(0));
    n.handle_button(ButtonEvent::LongPress, at(0));

    let mut beats = 0;
    for tick in 0..150u64 {
        // One door slam at 200 ms, quiet otherwise
        let amplitude: i16 = if (10..13).contains(&tick) { 12_000 } else { 300 };
        let buffer: [i16; 64] = core::array::from_fn(|i| if i % 2 == 0 { amplitude } else { -amplitude });
        n.tick(at(tick * 20), Some(&buffer[..]));
        beats += usize::from(n.status().beat);

        for packet in n.ports_mut().radio.take() {
            if packet[0] == MessageType::Chunk as u8 {
                let chunk = ChunkPacket::decode(&packet).expect("chunk");
                assert_eq!(chunk.header.brightness, config.plain_brightness);
                assert_eq!(chunk.header.speed, config.plain_speed);
            }
        }
    }
    assert!(beats > 0, "the noise never registered");
}

#[test]
fn stale_chunks_from_lower_token_do_not_disturb_follower() {
    let mut n = node::<LEDS>(0x100, SyncConfig::default());
    deliver_frame(&mut n, 0x900, 1, Rgb::new(0, 255, 0), at(0));

    n.handle_packet(&chunk::<LEDS>(0x050, 1, 0, Rgb::new(255, 0, 0)), at(10))
        .expect("chunk");
    n.handle_packet(&chunk::<LEDS>(0x050, 1, 1, Rgb::new(255, 0, 0)), at(10))
        .expect("chunk");

    assert!(n.received_frame().iter().all(|c| *c == Rgb::new(0, 255, 0)));
    assert_eq!(n.arbiter().leader(), Some(NodeToken::new(0x900)));
}
