//! Lock / drop-out tracking for a received MTC stream.
//!
//! The state machine is driven by quarter-frame groups (one every 2 MTC
//! frames) and by the passage of time. It never waits on anything itself:
//! callers pass in the `Instant` each event happened at.

use super::decoder::Direction;
use super::frame_rate::MtcFrameRate;
use crate::config::{DEFAULT_DROP_OUT_FRAMES, DEFAULT_LOCK_FRAMES};
use crate::timecode::{FrameRate, Timecode};
use log::{debug, info};
use std::fmt;
use std::time::{Duration, Instant};

/// Thresholds, counted in quarter-frame groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    pub lock_frames: u32,
    pub drop_out_frames: u32,
}

impl SyncPolicy {
    pub fn new(lock_frames: u32, drop_out_frames: u32) -> Result<Self, String> {
        if lock_frames == 0 {
            return Err("lock_frames must be at least 1".to_string());
        }
        Ok(SyncPolicy {
            lock_frames,
            drop_out_frames,
        })
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy {
            lock_frames: DEFAULT_LOCK_FRAMES,
            drop_out_frames: DEFAULT_DROP_OUT_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not receiving
    Idle,
    /// Qualifying the stream; lock is expected at `lock_time` at `timecode`
    PreSync {
        lock_time: Instant,
        timecode: Timecode,
    },
    /// Locked
    Sync,
    /// Locked, but groups are missing; position is being predicted
    Freewheeling,
    /// Received MTC rate cannot drive the local frame rate
    IncompatibleFrameRate,
}

impl SyncState {
    pub fn is_synchronized(&self) -> bool {
        matches!(self, SyncState::Sync | SyncState::Freewheeling)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Idle => write!(f, "Idle"),
            SyncState::PreSync { timecode, .. } => write!(f, "Pre-Sync (lock at {})", timecode),
            SyncState::Sync => write!(f, "Sync"),
            SyncState::Freewheeling => write!(f, "Freewheeling"),
            SyncState::IncompatibleFrameRate => write!(f, "Incompatible Frame Rate"),
        }
    }
}

/// A completed quarter-frame group as seen by the decoder.
#[derive(Debug, Clone, Copy)]
pub struct GroupObservation {
    pub at: Instant,
    /// The 8-piece value at the MTC rate's direct equivalent
    pub mtc_timecode: Timecode,
    pub rate: MtcFrameRate,
    pub direction: Direction,
    /// Timecode reported to the caller when the group completed
    pub timecode: Timecode,
}

/// Real time spanned by one quarter-frame group at `frame_rate`.
pub fn group_duration(frame_rate: FrameRate) -> Duration {
    frame_rate.mtc_quarter_frame_interval() * 8
}

/// Group duration on the wire, which runs at the MTC rate's direct equivalent
/// whatever the local rate.
pub fn mtc_group_duration(rate: MtcFrameRate) -> Duration {
    group_duration(rate.direct_equivalent())
}

/// Advances `timecode` by a number of MTC frames, scaled to its own rate.
pub fn advance_by_mtc_frames(
    timecode: &Timecode,
    rate: MtcFrameRate,
    mtc_frames: i64,
    direction: Direction,
) -> Timecode {
    let local = timecode.frame_rate();
    let scale = if rate.derived_frame_rates().contains(&local) {
        local.mtc_scale_factor()
    } else {
        1.0
    };
    let frames = (mtc_frames as f64 * scale).round() as i64;
    match direction {
        Direction::Backwards => timecode.subtract_frames(frames),
        _ => timecode.add_frames(frames),
    }
}

pub struct SyncStateMachine {
    policy: SyncPolicy,
    state: SyncState,
    consecutive_lock_count: u32,
    consecutive_miss_count: u32,
    last_group: Option<GroupObservation>,
    last_event_at: Option<Instant>,
    group_duration: Duration,
}

impl SyncStateMachine {
    pub fn new(policy: SyncPolicy) -> Self {
        SyncStateMachine {
            policy,
            state: SyncState::Idle,
            consecutive_lock_count: 0,
            consecutive_miss_count: 0,
            last_group: None,
            last_event_at: None,
            group_duration: group_duration(FrameRate::Fps30),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    pub fn consecutive_lock_count(&self) -> u32 {
        self.consecutive_lock_count
    }

    pub fn consecutive_miss_count(&self) -> u32 {
        self.consecutive_miss_count
    }

    pub fn last_group(&self) -> Option<&GroupObservation> {
        self.last_group.as_ref()
    }

    /// Groups that should have arrived by `now` but did not.
    pub fn missed_groups(&self, now: Instant) -> u32 {
        let Some(last) = self.last_event_at else {
            return 0;
        };
        let elapsed = now.saturating_duration_since(last).as_nanos();
        let groups = elapsed / self.group_duration.as_nanos().max(1);
        groups.saturating_sub(1).min(u128::from(u32::MAX)) as u32
    }

    /// Feeds a completed group. Returns the new state on a transition.
    pub fn group_received(&mut self, group: GroupObservation) -> Option<SyncState> {
        let misses = self.missed_groups(group.at);
        let continuous = self.is_continuous(&group, misses);
        self.group_duration = mtc_group_duration(group.rate);

        let next = match self.state {
            SyncState::Idle => self.begin_pre_sync(&group, 1),
            SyncState::PreSync { .. } => {
                let in_step = continuous
                    && misses == 0
                    && self
                        .last_group
                        .map_or(true, |last| last.direction == group.direction);
                if in_step {
                    self.consecutive_lock_count += 1;
                    if self.consecutive_lock_count >= self.policy.lock_frames {
                        SyncState::Sync
                    } else {
                        self.state
                    }
                } else {
                    debug!("Group out of step during pre-sync, dropping back to idle");
                    self.consecutive_lock_count = 0;
                    SyncState::Idle
                }
            }
            SyncState::Sync | SyncState::Freewheeling => {
                if continuous {
                    self.consecutive_lock_count = self.consecutive_lock_count.saturating_add(1);
                    SyncState::Sync
                } else {
                    debug!("Discontinuity in locked stream, re-qualifying");
                    self.begin_pre_sync(&group, 1)
                }
            }
            SyncState::IncompatibleFrameRate => self.state,
        };

        self.consecutive_miss_count = 0;
        self.last_event_at = Some(group.at);
        self.last_group = Some(group);
        self.transition(next)
    }

    /// A full-frame locate was received. `timecode` is the decoded position.
    pub fn full_frame_received(&mut self, at: Instant, timecode: Timecode) -> Option<SyncState> {
        self.last_group = None;
        self.last_event_at = Some(at);
        self.consecutive_miss_count = 0;
        self.group_duration = mtc_group_duration(timecode.frame_rate().mtc_frame_rate());

        let next = match self.state {
            SyncState::PreSync { .. } if self.consecutive_lock_count == 0 => return None,
            _ => {
                self.consecutive_lock_count = 0;
                self.pre_sync_state(at, &timecode, None)
            }
        };
        self.transition(next)
    }

    pub fn incompatible_frame_rate(&mut self) -> Option<SyncState> {
        self.consecutive_lock_count = 0;
        self.consecutive_miss_count = 0;
        self.last_group = None;
        self.last_event_at = None;
        self.transition(SyncState::IncompatibleFrameRate)
    }

    /// Leaves the incompatible state once the rates line up again.
    pub fn frame_rate_compatible(&mut self, at: Instant, timecode: Timecode) -> Option<SyncState> {
        if self.state != SyncState::IncompatibleFrameRate {
            return None;
        }
        self.last_event_at = Some(at);
        self.group_duration = mtc_group_duration(timecode.frame_rate().mtc_frame_rate());
        let next = self.pre_sync_state(at, &timecode, None);
        self.transition(next)
    }

    /// Applies any missed groups up to `now`. Returns the new state on a transition.
    pub fn check_timeout(&mut self, now: Instant) -> Option<SyncState> {
        let misses = self.missed_groups(now);
        if misses == 0 || misses == self.consecutive_miss_count {
            return None;
        }
        self.consecutive_miss_count = misses;

        let next = match self.state {
            SyncState::PreSync { .. } => SyncState::Idle,
            SyncState::Sync | SyncState::Freewheeling if misses > self.policy.drop_out_frames => {
                info!(
                    "MTC drop-out: {} groups missed (tolerance {})",
                    misses, self.policy.drop_out_frames
                );
                SyncState::Idle
            }
            SyncState::Sync => SyncState::Freewheeling,
            _ => return None,
        };

        if next == SyncState::Idle {
            self.reset_counters();
        }
        self.transition(next)
    }

    /// Dead-reckoned position while freewheeling.
    pub fn predicted_timecode(&self, now: Instant) -> Option<Timecode> {
        if self.state != SyncState::Freewheeling {
            return None;
        }
        let last = self.last_group.as_ref()?;
        let misses = i64::from(self.missed_groups(now));
        Some(advance_by_mtc_frames(
            &last.timecode,
            last.rate,
            2 * misses,
            last.direction,
        ))
    }

    pub fn reset(&mut self) -> Option<SyncState> {
        self.reset_counters();
        self.transition(SyncState::Idle)
    }

    fn reset_counters(&mut self) {
        self.consecutive_lock_count = 0;
        self.consecutive_miss_count = 0;
        self.last_group = None;
        self.last_event_at = None;
    }

    fn is_continuous(&self, group: &GroupObservation, misses: u32) -> bool {
        let Some(last) = self.last_group.as_ref() else {
            return true;
        };
        if last.rate != group.rate {
            return false;
        }
        let rate = group.mtc_timecode.frame_rate();
        let day = rate.max_frames_per_day();
        let mut delta = (group.mtc_timecode.frame_count() - last.mtc_timecode.frame_count())
            .rem_euclid(day);
        if delta > day / 2 {
            delta -= day;
        }
        delta.abs() <= 2 * (i64::from(misses) + 1)
    }

    fn begin_pre_sync(&mut self, group: &GroupObservation, count: u32) -> SyncState {
        self.consecutive_lock_count = count;
        if count >= self.policy.lock_frames {
            return SyncState::Sync;
        }
        self.pre_sync_state(group.at, &group.timecode, Some((group.rate, group.direction)))
    }

    fn pre_sync_state(
        &self,
        at: Instant,
        timecode: &Timecode,
        stream: Option<(MtcFrameRate, Direction)>,
    ) -> SyncState {
        let remaining = self
            .policy
            .lock_frames
            .saturating_sub(self.consecutive_lock_count);
        let (rate, direction) =
            stream.unwrap_or((timecode.frame_rate().mtc_frame_rate(), Direction::Forwards));

        SyncState::PreSync {
            lock_time: at + self.group_duration * remaining,
            timecode: advance_by_mtc_frames(timecode, rate, 2 * i64::from(remaining), direction),
        }
    }

    fn transition(&mut self, next: SyncState) -> Option<SyncState> {
        if next == self.state {
            return None;
        }
        info!("MTC sync state: {} -> {}", self.state, next);
        self.state = next;
        Some(next)
    }
}
