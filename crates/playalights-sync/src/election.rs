//! Leader election and conflict arbitration
//!
//! Two mechanisms keep a domain down to one leader:
//!
//! - a conflict check that refuses an explicit promotion while another
//!   leader's frames are still audible, and
//! - timed election rounds in which every candidate broadcasts its token
//!   once, higher tokens first, and the highest token heard by the deadline
//!   wins.
//!
//! A leader that hears a higher token at any time steps down (preemption),
//! which resolves the rare case of two rounds overlapping.

use embassy_time::{Duration, Instant};
use rand_core::RngCore;

use crate::config::{ElectionPolicy, SyncConfig};
use crate::identity::NodeToken;

/// Number of priority slots, one per possible token bit length
const PRIORITY_SLOTS: u32 = 33;

/// Width of one priority slot
pub fn slot_width(config: &SyncConfig) -> Duration {
    config.election_base_delay / PRIORITY_SLOTS
}

/// Delay before a candidate broadcasts its token in a round
///
/// Longer tokens get earlier slots. The random part never exceeds one slot,
/// so a node in a higher slot always broadcasts strictly earlier.
pub fn broadcast_delay<G: RngCore>(token: NodeToken, config: &SyncConfig, rng: &mut G) -> Duration {
    let slot = slot_width(config);
    let rank = u32::BITS - token.bit_length();
    let spread = config.election_jitter.min(slot).as_ticks();
    let jitter = if spread == 0 {
        0
    } else {
        u64::from(rng.next_u32()) % spread
    };
    slot * rank + Duration::from_ticks(jitter)
}

/// Where a node came from when it entered an election round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOrigin {
    /// A follower that missed the leader's heartbeats
    Follower,
    /// A standalone node attempting to rejoin after a timeout demotion
    Standalone,
}

/// Result of a finished round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionDecision {
    /// Own token is the highest heard
    Lead,
    /// A higher token was heard
    Follow(NodeToken),
}

/// One election round
#[derive(Debug, Clone, Copy)]
pub struct ElectionRound {
    origin: RoundOrigin,
    deadline: Instant,
    broadcast_at: Instant,
    broadcast_done: bool,
    highest: NodeToken,
}

impl ElectionRound {
    pub fn start<G: RngCore>(
        own: NodeToken,
        origin: RoundOrigin,
        now: Instant,
        config: &SyncConfig,
        rng: &mut G,
    ) -> Self {
        Self {
            origin,
            deadline: now + config.election_timeout,
            broadcast_at: now + broadcast_delay(own, config, rng),
            broadcast_done: false,
            highest: own,
        }
    }

    pub fn origin(&self) -> RoundOrigin {
        self.origin
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Broadcast time of this node's token
    pub fn broadcast_at(&self) -> Instant {
        self.broadcast_at
    }

    pub fn highest(&self) -> NodeToken {
        self.highest
    }

    /// Record a peer token heard in a token packet or data frame
    pub fn observe(&mut self, token: NodeToken) {
        if token > self.highest {
            self.highest = token;
        }
    }

    /// Own token should go out now
    pub fn broadcast_due(&self, now: Instant) -> bool {
        !self.broadcast_done && now >= self.broadcast_at
    }

    pub fn mark_broadcast(&mut self) {
        self.broadcast_done = true;
    }

    /// Decision once the deadline has passed, `None` before it
    ///
    /// A candidate that heard nobody leads. A higher token showing up later
    /// preempts it.
    pub fn decide(&self, own: NodeToken, now: Instant) -> Option<ElectionDecision> {
        if now < self.deadline {
            return None;
        }
        Some(if self.highest > own {
            ElectionDecision::Follow(self.highest)
        } else {
            ElectionDecision::Lead
        })
    }
}

/// Leader liveness and rejoin bookkeeping
///
/// Keeps every timestamp the role machine needs to decide on promotions,
/// demotions and rejoin attempts.
#[derive(Debug, Clone)]
pub struct Arbiter {
    policy: ElectionPolicy,
    /// Most recent data frame (chunk or pattern parameters) from any peer
    last_foreign_frame: Option<Instant>,
    /// Most recent traffic from the followed leader, heartbeats included
    last_leader_evidence: Option<Instant>,
    /// Most recent token heard, used to attribute pattern parameters
    last_token_heard: Option<NodeToken>,
    leader: Option<NodeToken>,
    rejoin_attempts: u8,
    next_rejoin: Option<Instant>,
    next_heartbeat: Option<Instant>,
}

impl Arbiter {
    pub const fn new(policy: ElectionPolicy) -> Self {
        Self {
            policy,
            last_foreign_frame: None,
            last_leader_evidence: None,
            last_token_heard: None,
            leader: None,
            rejoin_attempts: 0,
            next_rejoin: None,
            next_heartbeat: None,
        }
    }

    /// Leader currently followed
    pub fn leader(&self) -> Option<NodeToken> {
        self.leader
    }

    pub fn last_token_heard(&self) -> Option<NodeToken> {
        self.last_token_heard
    }

    pub fn rejoin_attempts(&self) -> u8 {
        self.rejoin_attempts
    }

    /// An explicit promotion request may proceed
    ///
    /// Refused while a data frame from another node was heard within
    /// `leader_timeout`. Token packets alone do not block promotion.
    pub fn can_promote(&self, now: Instant, config: &SyncConfig) -> bool {
        self.last_foreign_frame
            .is_none_or(|at| now.saturating_duration_since(at) > config.leader_timeout)
    }

    /// Record a data frame from `originator`
    ///
    /// Data from the followed leader refills the rejoin budget.
    pub fn note_frame(&mut self, originator: NodeToken, now: Instant) {
        self.last_foreign_frame = Some(now);
        if self.leader.is_some_and(|leader| originator >= leader) {
            self.leader = Some(originator);
            self.last_leader_evidence = Some(now);
            self.rejoin_attempts = 0;
        }
    }

    /// Record a token packet from `token`
    pub fn note_token(&mut self, token: NodeToken, now: Instant) {
        self.last_token_heard = Some(token);
        if self.leader.is_some_and(|leader| token >= leader) {
            self.leader = Some(token);
            self.last_leader_evidence = Some(now);
        }
    }

    /// Start following `leader`
    ///
    /// The rejoin budget is kept until the leader actually sends data.
    pub fn follow(&mut self, leader: NodeToken, now: Instant) {
        self.leader = Some(leader);
        self.last_leader_evidence = Some(now);
        self.next_rejoin = None;
        self.next_heartbeat = None;
    }

    /// Take the lead; heartbeats start immediately
    pub fn lead(&mut self, now: Instant) {
        self.leader = None;
        self.rejoin_attempts = 0;
        self.next_rejoin = None;
        self.next_heartbeat = Some(now);
    }

    /// Go back to standalone without any rejoin schedule
    pub fn stand_alone(&mut self) {
        self.leader = None;
        self.next_rejoin = None;
        self.next_heartbeat = None;
    }

    /// Go back to standalone after the leader fell silent
    ///
    /// Under the active policy rejoin rounds follow every `rejoin_interval`
    /// until the attempt budget is spent.
    pub fn demote_after_timeout(&mut self, now: Instant, config: &SyncConfig) {
        self.leader = None;
        self.next_heartbeat = None;
        self.next_rejoin = match self.policy {
            ElectionPolicy::Active if self.rejoin_attempts < config.max_rejoin_attempts => {
                Some(now + config.rejoin_interval)
            }
            _ => None,
        };
    }

    /// Time since the followed leader was last heard
    pub fn leader_silence(&self, now: Instant) -> Option<Duration> {
        self.last_leader_evidence
            .map(|at| now.saturating_duration_since(at))
    }

    /// The followed leader has been silent for longer than `leader_timeout`
    pub fn leader_timed_out(&self, now: Instant, config: &SyncConfig) -> bool {
        self.leader_silence(now)
            .is_some_and(|silence| silence > config.leader_timeout)
    }

    /// A follower missed enough heartbeats to start a rejoin round
    pub fn heartbeats_missed(&self, now: Instant, config: &SyncConfig) -> bool {
        self.policy == ElectionPolicy::Active
            && self.rejoin_attempts < config.max_rejoin_attempts
            && self
                .leader_silence(now)
                .is_some_and(|silence| silence >= config.missed_heartbeat_window())
    }

    /// A standalone node is due for its next rejoin round
    pub fn rejoin_due(&self, now: Instant, config: &SyncConfig) -> bool {
        self.policy == ElectionPolicy::Active
            && self.rejoin_attempts < config.max_rejoin_attempts
            && self.next_rejoin.is_some_and(|at| now >= at)
    }

    /// Consume one rejoin attempt
    pub fn begin_attempt(&mut self) {
        self.rejoin_attempts = self.rejoin_attempts.saturating_add(1);
        self.next_rejoin = None;
    }

    /// Leader heartbeat due; advances the schedule when it is
    pub fn take_heartbeat(&mut self, now: Instant, config: &SyncConfig) -> bool {
        match self.next_heartbeat {
            Some(at) if now >= at => {
                self.next_heartbeat = Some(now + config.heartbeat_interval);
                true
            }
            _ => false,
        }
    }
}
