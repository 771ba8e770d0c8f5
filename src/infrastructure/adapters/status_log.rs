use playalights_sync::{NodeRole, NodeStatus, NodeToken, OperatingMode, StatusDisplay};

/// Ticks between two periodic status lines
const REPORT_EVERY: u32 = 250;

/// Status display printing to the log
///
/// Changes of role, mode or leader are logged right away; the audio
/// readings are reported periodically.
#[derive(Default)]
pub struct LogStatusDisplay {
    shown: Option<(NodeRole, OperatingMode, Option<NodeToken>)>,
    ticks: u32,
}

impl StatusDisplay for LogStatusDisplay {
    fn show(&mut self, status: &NodeStatus) {
        let key = (status.role, status.mode, status.leader);
        if self.shown != Some(key) {
            self.shown = Some(key);
            match status.leader {
                Some(leader) => log::info!(
                    "status: {} {} {} following {}",
                    status.token,
                    status.role_label(),
                    status.mode_label(),
                    leader
                ),
                None => log::info!(
                    "status: {} {} {}",
                    status.token,
                    status.role_label(),
                    status.mode_label()
                ),
            }
        }

        self.ticks = self.ticks.wrapping_add(1);
        if self.ticks % REPORT_EVERY == 0 && status.mode == OperatingMode::AudioReactive {
            log::debug!(
                "status: level {}% bpm {} beat {}",
                status.audio_level,
                status.bpm,
                status.beat
            );
        }
    }
}
