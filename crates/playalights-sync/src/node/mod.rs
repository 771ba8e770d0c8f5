//! Node orchestrator
//!
//! [`SyncNode`] owns every piece of engine state and is driven from a single
//! cooperative task. Each render interval the firmware hands it, in order:
//!
//! 1. button events ([`SyncNode::handle_button`]),
//! 2. queued radio packets ([`SyncNode::drain_inbox`]),
//! 3. one [`SyncNode::tick`], which runs role timers and elections, audio,
//!    rendering, the leader broadcast and the status update.

mod fsm;

pub use fsm::{button_action, ButtonAction, NodeRole, OperatingMode};

use embassy_time::Instant;
use embedded_hal::delay::DelayNs;
use rand_core::RngCore;

use crate::audio::{AudioEngine, AudioFrame};
use crate::broadcast::{ChunkOutcome, FrameSender, Reassembler, ReceiveStats, SendStats};
use crate::config::{AudioConfig, SyncConfig, SyncPayload};
use crate::election::{Arbiter, ElectionDecision, ElectionRound, RoundOrigin};
use crate::error::{ConfigError, ProtocolError};
use crate::identity::NodeToken;
use crate::inbox::PacketInbox;
use crate::ports::{ButtonEvent, LedDriver, Radio, StatusDisplay};
use crate::protocol::{ChunkPacket, Packet, PatternParams};
use crate::render::{OutputProcessor, PatternSlot, RenderContext, Renderer};
use crate::Rgb;

/// What the firmware should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// Reception is stuck; reset the device
    Restart,
}

/// Snapshot for the status display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStatus {
    pub token: NodeToken,
    pub mode: OperatingMode,
    pub role: NodeRole,
    /// Followed leader, if any
    pub leader: Option<NodeToken>,
    /// Gained input level in percent
    pub audio_level: u8,
    pub beat: bool,
    pub bpm: u16,
}

impl NodeStatus {
    pub const fn mode_label(&self) -> &'static str {
        self.mode.label()
    }

    pub const fn role_label(&self) -> &'static str {
        self.role.label()
    }
}

/// User choices worth keeping across restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeSettings {
    pub mode: OperatingMode,
    /// Index of the local pattern
    pub pattern: u8,
}

/// Hardware collaborators of a node
pub struct NodePorts<R, D, L, S, G> {
    pub radio: R,
    pub delay: D,
    pub leds: L,
    pub display: S,
    pub rng: G,
}

/// The node synchronization engine
pub struct SyncNode<R, D, L, S, G, const N: usize> {
    ports: NodePorts<R, D, L, S, G>,
    config: SyncConfig,
    token: NodeToken,
    role: NodeRole,
    mode: OperatingMode,
    arbiter: Arbiter,
    round: Option<ElectionRound>,
    sender: FrameSender,
    reassembler: Reassembler<N>,
    audio: AudioEngine,
    processor: OutputProcessor,
    context: RenderContext,
    pattern_started: Option<Instant>,
    /// Latest pattern parameters of the followed leader
    remote_pattern: Option<RenderContext>,
    pattern: [Rgb; N],
    output: [Rgb; N],
    brightness: u8,
    speed: u8,
    last_audio: Option<AudioFrame>,
}

impl<R, D, L, S, G, const N: usize> SyncNode<R, D, L, S, G, N>
where
    R: Radio,
    D: DelayNs,
    L: LedDriver<N>,
    S: StatusDisplay,
    G: RngCore,
{
    pub fn new(
        token: NodeToken,
        config: SyncConfig,
        audio_config: AudioConfig,
        mut ports: NodePorts<R, D, L, S, G>,
    ) -> Result<Self, ConfigError> {
        config.validate(N)?;

        let context = RenderContext {
            random_seed: ports.rng.next_u32(),
            speed: config.plain_speed,
            ..RenderContext::default()
        };

        log::info!("node: token {} with {} LEDs", token, N);

        Ok(Self {
            ports,
            arbiter: Arbiter::new(config.election_policy),
            token,
            role: NodeRole::Standalone,
            mode: OperatingMode::Plain,
            round: None,
            sender: FrameSender::new(),
            reassembler: Reassembler::new(),
            audio: AudioEngine::new(audio_config),
            processor: OutputProcessor::new(),
            context,
            pattern_started: None,
            remote_pattern: None,
            pattern: [Rgb::default(); N],
            output: [Rgb::default(); N],
            brightness: config.plain_brightness,
            speed: config.plain_speed,
            last_audio: None,
            config,
        })
    }

    pub fn token(&self) -> NodeToken {
        self.token
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Election round in progress
    pub fn round(&self) -> Option<&ElectionRound> {
        self.round.as_ref()
    }

    pub fn ports(&self) -> &NodePorts<R, D, L, S, G> {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut NodePorts<R, D, L, S, G> {
        &mut self.ports
    }

    /// Last processed output written to the strip
    pub fn leds(&self) -> &[Rgb; N] {
        &self.output
    }

    /// Last completed frame received from a leader
    pub fn received_frame(&self) -> &[Rgb; N] {
        self.reassembler.frame()
    }

    pub fn render_context(&self) -> &RenderContext {
        &self.context
    }

    pub fn send_stats(&self) -> SendStats {
        self.sender.stats()
    }

    pub fn receive_stats(&self) -> ReceiveStats {
        self.reassembler.stats()
    }

    /// The node renders its own pattern rather than a leader's
    fn renders_locally(&self) -> bool {
        match self.role {
            NodeRole::Standalone | NodeRole::Leader => true,
            NodeRole::Follower => false,
            NodeRole::Electing => self
                .round
                .is_some_and(|round| round.origin() == RoundOrigin::Standalone),
        }
    }

    /// Microphone samples are used on the next tick
    pub fn wants_audio(&self) -> bool {
        self.mode == OperatingMode::AudioReactive && self.renders_locally()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn status(&self) -> NodeStatus {
        let audio = self.last_audio.unwrap_or_default();
        NodeStatus {
            token: self.token,
            mode: self.mode,
            role: self.role,
            leader: self.arbiter.leader(),
            audio_level: libm::roundf(audio.level.clamp(0.0, 1.0) * 100.0) as u8,
            beat: audio.beat,
            bpm: libm::roundf(audio.bpm.max(0.0)) as u16,
        }
    }

    pub fn settings(&self) -> NodeSettings {
        NodeSettings {
            mode: self.mode,
            pattern: self.context.pattern_index,
        }
    }

    /// Apply settings saved by an earlier run
    ///
    /// Out-of-range pattern indices wrap onto the available patterns.
    pub fn restore(&mut self, settings: NodeSettings) {
        self.mode = settings.mode;
        self.context.pattern_index = settings.pattern % PatternSlot::COUNT;
        log::info!(
            "node: restored mode {} with pattern {}",
            self.mode,
            PatternSlot::from_index(self.context.pattern_index).name()
        );
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    pub fn handle_button(&mut self, event: ButtonEvent, now: Instant) {
        match button_action(self.role, event) {
            ButtonAction::ToggleMode => {
                self.mode = self.mode.toggled();
                log::info!("node: mode {}", self.mode);
            }
            ButtonAction::RequestLeader => {
                if self.arbiter.can_promote(now, &self.config) {
                    self.become_leader(now);
                } else {
                    log::info!("node: leader request refused, another leader is active");
                }
            }
            ButtonAction::StepDown => {
                self.role = NodeRole::Standalone;
                self.arbiter.stand_alone();
                log::info!("node: left leader role");
            }
            ButtonAction::Ignore => {
                if event != ButtonEvent::Released {
                    log::debug!("node: {:?} ignored while {}", event, self.role);
                }
            }
        }
    }

    /// Handle every packet queued since the last tick
    pub fn drain_inbox<const DEPTH: usize>(&mut self, inbox: &PacketInbox<DEPTH>, now: Instant) -> usize {
        let mut handled = 0;
        while let Ok(packet) = inbox.try_receive() {
            if let Err(e) = self.handle_packet(packet.as_bytes(), now) {
                log::debug!("node: dropped packet: {}", e);
            }
            handled += 1;
        }
        handled
    }

    /// Decode and apply one received packet
    pub fn handle_packet(&mut self, bytes: &[u8], now: Instant) -> Result<(), ProtocolError> {
        match Packet::decode(bytes)? {
            Packet::Token(packet) => {
                self.on_token(packet.token, now);
                Ok(())
            }
            Packet::Chunk(chunk) => self.on_chunk(&chunk, now),
            Packet::PatternParams(params) => {
                self.on_params(&params, now);
                Ok(())
            }
        }
    }

    fn on_token(&mut self, token: NodeToken, now: Instant) {
        if token == self.token {
            return;
        }
        self.arbiter.note_token(token, now);

        match self.role {
            NodeRole::Leader if token > self.token => {
                log::info!("node: preempted by token {}", token);
                self.follow(token, now);
            }
            NodeRole::Electing => {
                if let Some(round) = self.round.as_mut() {
                    round.observe(token);
                }
            }
            _ => {}
        }
    }

    fn on_chunk(&mut self, chunk: &ChunkPacket<'_>, now: Instant) -> Result<(), ProtocolError> {
        let originator = chunk.header.originator;
        if originator == self.token {
            return Ok(());
        }
        self.arbiter.note_frame(originator, now);

        match self.role {
            NodeRole::Leader => {
                if originator < self.token {
                    return Ok(());
                }
                log::info!("node: stepping down for leader {}", originator);
                self.follow(originator, now);
            }
            NodeRole::Electing => {
                if let Some(round) = self.round.as_mut() {
                    round.observe(originator);
                }
                return Ok(());
            }
            NodeRole::Follower => {
                if self.arbiter.leader().is_some_and(|leader| originator < leader) {
                    return Ok(());
                }
            }
            NodeRole::Standalone => {}
        }

        if self.reassembler.accept(chunk, now)? == ChunkOutcome::Completed {
            self.remote_pattern = None;
            if self.role == NodeRole::Standalone {
                log::info!("node: following leader {}", originator);
                self.follow(originator, now);
            }
        }
        Ok(())
    }

    /// Params carry no originator. They belong to the followed leader when
    /// there is one, otherwise to the last token heard.
    fn on_params(&mut self, params: &PatternParams, now: Instant) {
        let Some(originator) = self.arbiter.leader().or(self.arbiter.last_token_heard()) else {
            log::debug!("node: pattern parameters from unknown sender");
            return;
        };
        if originator == self.token {
            return;
        }
        self.arbiter.note_frame(originator, now);

        match self.role {
            NodeRole::Leader if originator < self.token => return,
            NodeRole::Electing => {
                if let Some(round) = self.round.as_mut() {
                    round.observe(originator);
                }
                return;
            }
            NodeRole::Follower if self.arbiter.leader().is_some_and(|leader| originator < leader) => {
                return;
            }
            NodeRole::Leader | NodeRole::Standalone => {
                log::info!("node: following leader {}", originator);
                self.follow(originator, now);
            }
            NodeRole::Follower => {}
        }

        self.remote_pattern = Some(RenderContext {
            pattern_index: params.pattern,
            global_hue: params.global_hue,
            random_seed: params.random_seed,
            elapsed_ticks: u32::from(params.frame_counter),
            speed: self.config.plain_speed,
        });
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    fn follow(&mut self, leader: NodeToken, now: Instant) {
        if self.role == NodeRole::Leader {
            self.reassembler.reset();
        }
        self.role = NodeRole::Follower;
        self.round = None;
        self.arbiter.follow(leader, now);
    }

    fn become_leader(&mut self, now: Instant) {
        if let Some(remote) = self.remote_pattern.take() {
            self.context = remote;
        }
        self.role = NodeRole::Leader;
        self.round = None;
        self.reassembler.reset();
        self.arbiter.lead(now);
        log::info!("node: now leader with token {}", self.token);
    }

    fn demote_after_timeout(&mut self, now: Instant) {
        log::info!("node: leader lost, back to standalone");
        self.role = NodeRole::Standalone;
        self.round = None;
        self.remote_pattern = None;
        self.reassembler.reset();
        self.arbiter.demote_after_timeout(now, &self.config);
    }

    fn start_round(&mut self, origin: RoundOrigin, now: Instant) {
        self.arbiter.begin_attempt();
        let round = ElectionRound::start(self.token, origin, now, &self.config, &mut self.ports.rng);
        log::info!(
            "node: election attempt {} ({:?}), broadcasting in {} ms",
            self.arbiter.rejoin_attempts(),
            origin,
            round.broadcast_at().saturating_duration_since(now).as_millis()
        );
        self.round = Some(round);
        self.role = NodeRole::Electing;
    }

    fn finish_round(&mut self, decision: ElectionDecision, now: Instant) {
        match decision {
            ElectionDecision::Lead => self.become_leader(now),
            ElectionDecision::Follow(leader) => {
                log::info!("node: election won by {}", leader);
                self.follow(leader, now);
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Run one cooperative tick
    ///
    /// `samples` is the microphone buffer captured for this tick; it is only
    /// used while [`Self::wants_audio`] holds.
    pub fn tick(&mut self, now: Instant, samples: Option<&[i16]>) -> TickOutcome {
        self.update_role(now);

        if self
            .reassembler
            .is_stuck(now, self.config.stuck_timeout, self.config.leader_timeout)
        {
            log::warn!("node: frames stopped completing, restarting");
            self.reassembler.reset();
            return TickOutcome::Restart;
        }

        self.last_audio = match samples {
            Some(samples) if self.wants_audio() => Some(self.audio.process(samples, now)),
            _ => None,
        };

        self.render(now);

        if self.role == NodeRole::Leader {
            self.broadcast(now);
        }

        let status = self.status();
        self.ports.display.show(&status);
        TickOutcome::Continue
    }

    fn update_role(&mut self, now: Instant) {
        match self.role {
            NodeRole::Follower => {
                if self.arbiter.leader_timed_out(now, &self.config) {
                    self.demote_after_timeout(now);
                } else if self.arbiter.heartbeats_missed(now, &self.config) {
                    self.start_round(RoundOrigin::Follower, now);
                }
            }
            NodeRole::Electing => self.progress_round(now),
            NodeRole::Standalone => {
                if self.arbiter.rejoin_due(now, &self.config) {
                    self.start_round(RoundOrigin::Standalone, now);
                }
            }
            NodeRole::Leader => {}
        }
    }

    fn progress_round(&mut self, now: Instant) {
        let Some(mut round) = self.round else {
            self.role = NodeRole::Standalone;
            return;
        };

        if round.origin() == RoundOrigin::Follower && self.arbiter.leader_timed_out(now, &self.config) {
            self.demote_after_timeout(now);
            return;
        }

        if round.broadcast_due(now) {
            if let Err(e) = self.sender.send_token(&mut self.ports.radio, self.token) {
                log::warn!("node: election token not sent: {}", e);
            }
            round.mark_broadcast();
        }

        match round.decide(self.token, now) {
            Some(decision) => self.finish_round(decision, now),
            None => self.round = Some(round),
        }
    }

    fn render(&mut self, now: Instant) {
        if self.renders_locally() {
            self.render_local(now);
        } else if let Some(remote) = self.remote_pattern {
            PatternSlot::from_index(remote.pattern_index).render(&remote, &mut self.pattern);
            self.processor
                .apply(&self.pattern, self.config.plain_brightness, &mut self.output);
        } else {
            self.processor.apply(
                self.reassembler.frame(),
                self.reassembler.brightness(),
                &mut self.output,
            );
        }
        self.ports.leds.write(&self.output);
    }

    fn render_local(&mut self, now: Instant) {
        let started = *self.pattern_started.get_or_insert(now);
        if now.saturating_duration_since(started) >= self.config.pattern_duration {
            self.context.next_pattern();
            self.pattern_started = Some(now);
            log::debug!(
                "node: pattern {}",
                PatternSlot::from_index(self.context.pattern_index).name()
            );
        }

        (self.brightness, self.speed) = match self.mode {
            OperatingMode::Plain => (self.config.plain_brightness, self.config.plain_speed),
            // Without music the pattern runs as in plain mode
            OperatingMode::AudioReactive => {
                let frame = self.audio.last_frame();
                if frame.music {
                    (frame.brightness, frame.speed)
                } else {
                    (self.config.plain_brightness, self.config.plain_speed)
                }
            }
        };

        self.context.advance();
        self.context.speed = self.speed;
        PatternSlot::from_index(self.context.pattern_index).render(&self.context, &mut self.pattern);
        self.processor
            .apply(&self.pattern, self.brightness, &mut self.output);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn broadcast(&mut self, now: Instant) {
        if self.arbiter.take_heartbeat(now, &self.config) {
            if let Err(e) = self.sender.send_token(&mut self.ports.radio, self.token) {
                log::warn!("node: heartbeat not sent: {}", e);
            }
        }

        match self.config.payload {
            SyncPayload::RawPixels => {
                let report = self.sender.send_frame(
                    &mut self.ports.radio,
                    &mut self.ports.delay,
                    self.config.inter_packet_delay,
                    self.token,
                    &self.pattern,
                    self.brightness,
                    self.speed,
                );
                if report.failed > 0 {
                    log::debug!(
                        "node: frame {} sent {} chunks, {} failed",
                        report.sequence,
                        report.sent,
                        report.failed
                    );
                }
            }
            SyncPayload::PatternParameters => {
                let pattern_start = self
                    .pattern_started
                    .map_or(0, |at| at.as_millis() as u32);
                let params = PatternParams {
                    pattern: self.context.pattern_index,
                    pattern_start,
                    sender_clock: now.as_millis() as u32,
                    global_hue: self.context.global_hue,
                    random_seed: self.context.random_seed,
                    frame_counter: self.context.elapsed_ticks as u16,
                };
                if let Err(e) = self.sender.send_params(&mut self.ports.radio, &params) {
                    log::warn!("node: pattern parameters not sent: {}", e);
                }
            }
        }
    }
}
