//! Scheduling controls.
//!
//! Only the time-sharing class exists. Priorities use the host's relative
//! thread priority range (idle = -15 .. time-critical = +15) for every
//! policy and are recorded rather than applied.

use core::sync::atomic::{AtomicI32, Ordering};

use crate::error::{PthreadError, PthreadResult};
use crate::time::Timespec;

pub const SCHED_OTHER: i32 = 0;
pub const SCHED_FIFO: i32 = 1;
pub const SCHED_RR: i32 = 2;

/// Lowest priority (idle).
pub const PRIORITY_MIN: i32 = -15;
/// Highest priority (time critical).
pub const PRIORITY_MAX: i32 = 15;
/// Priority a thread starts with.
pub const PRIORITY_NORMAL: i32 = 0;

/// Round-robin quantum: one 64 Hz clock tick.
pub const RR_INTERVAL: Timespec = Timespec::new(0, 15_625_000);

static PROCESS_PRIORITY: AtomicI32 = AtomicI32::new(PRIORITY_NORMAL);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Policy {
    #[default]
    Other,
    Fifo,
    RoundRobin,
}

impl Policy {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            SCHED_OTHER => Ok(Self::Other),
            SCHED_FIFO => Ok(Self::Fifo),
            SCHED_RR => Ok(Self::RoundRobin),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Other => SCHED_OTHER,
            Self::Fifo => SCHED_FIFO,
            Self::RoundRobin => SCHED_RR,
        }
    }

    /// Realtime classes are refused rather than silently downgraded.
    pub const fn require_supported(self) -> PthreadResult<()> {
        match self {
            Self::Other => Ok(()),
            Self::Fifo | Self::RoundRobin => Err(PthreadError::Unsupported),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct SchedParam {
    pub priority: i32,
}

impl SchedParam {
    pub const fn validate(self, policy: Policy) -> PthreadResult<()> {
        let _ = policy;
        if self.priority < PRIORITY_MIN || self.priority > PRIORITY_MAX {
            return Err(PthreadError::InvalidArgument);
        }
        Ok(())
    }
}

/// Give up the processor.
pub fn sched_yield() {
    std::thread::yield_now();
}

pub const fn sched_get_priority_min(policy: Policy) -> i32 {
    let _ = policy;
    PRIORITY_MIN
}

pub const fn sched_get_priority_max(policy: Policy) -> i32 {
    let _ = policy;
    PRIORITY_MAX
}

/// `pid` 0 or the current process; anything else is `NoSuchThread`.
fn check_pid(pid: i32) -> PthreadResult<()> {
    if pid == 0 || u32::try_from(pid).is_ok_and(|p| p == std::process::id()) {
        Ok(())
    } else {
        Err(PthreadError::NoSuchThread)
    }
}

pub fn sched_getscheduler(pid: i32) -> PthreadResult<Policy> {
    check_pid(pid)?;
    Ok(Policy::Other)
}

pub fn sched_setscheduler(pid: i32, policy: Policy, param: SchedParam) -> PthreadResult<()> {
    check_pid(pid)?;
    policy.require_supported()?;
    param.validate(policy)?;
    PROCESS_PRIORITY.store(param.priority, Ordering::Relaxed);
    Ok(())
}

pub fn sched_getparam(pid: i32) -> PthreadResult<SchedParam> {
    check_pid(pid)?;
    Ok(SchedParam {
        priority: PROCESS_PRIORITY.load(Ordering::Relaxed),
    })
}

pub fn sched_setparam(pid: i32, param: SchedParam) -> PthreadResult<()> {
    check_pid(pid)?;
    param.validate(Policy::Other)?;
    PROCESS_PRIORITY.store(param.priority, Ordering::Relaxed);
    Ok(())
}

pub fn sched_rr_get_interval(pid: i32) -> PthreadResult<Timespec> {
    check_pid(pid)?;
    Ok(RR_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_range_is_symmetric() {
        for policy in [Policy::Other, Policy::Fifo, Policy::RoundRobin] {
            assert_eq!(sched_get_priority_min(policy), -15);
            assert_eq!(sched_get_priority_max(policy), 15);
        }
    }

    #[test]
    fn only_time_sharing_is_accepted() {
        let p = SchedParam::default();
        assert_eq!(sched_getscheduler(0), Ok(Policy::Other));
        assert_eq!(
            sched_setscheduler(0, Policy::Fifo, p),
            Err(PthreadError::Unsupported)
        );
        assert_eq!(
            sched_setscheduler(0, Policy::RoundRobin, p),
            Err(PthreadError::Unsupported)
        );
    }

    #[test]
    fn param_round_trip_and_range() {
        let own = std::process::id() as i32;
        sched_setparam(own, SchedParam { priority: 2 }).unwrap();
        assert_eq!(sched_getparam(0).unwrap().priority, 2);
        sched_setscheduler(0, Policy::Other, SchedParam { priority: -3 }).unwrap();
        assert_eq!(sched_getparam(own).unwrap().priority, -3);
        assert_eq!(
            sched_setparam(0, SchedParam { priority: 16 }),
            Err(PthreadError::InvalidArgument)
        );
        sched_setparam(0, SchedParam::default()).unwrap();
    }

    #[test]
    fn foreign_pid_is_rejected() {
        let other = (std::process::id() as i32).wrapping_add(1);
        assert_eq!(sched_getparam(other), Err(PthreadError::NoSuchThread));
    }

    #[test]
    fn rr_interval_is_one_tick() {
        assert_eq!(sched_rr_get_interval(0), Ok(Timespec::new(0, 15_625_000)));
    }

    #[test]
    fn raw_policy_mapping() {
        assert_eq!(Policy::from_raw(SCHED_RR), Ok(Policy::RoundRobin));
        assert_eq!(Policy::from_raw(5), Err(PthreadError::InvalidArgument));
        assert_eq!(Policy::Fifo.as_raw(), SCHED_FIFO);
        sched_yield();
    }
}
