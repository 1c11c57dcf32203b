//! Attribute records.
//!
//! Plain configuration with validation at the points where a value is
//! handed to a constructor. Raw-value mappings use the Linux constants so the
//! ABI layer can pass integers straight through.

use crate::error::{PthreadError, PthreadResult};
use crate::sched::{Policy, SchedParam};
use crate::time::ClockId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const PTHREAD_MUTEX_NORMAL: i32 = 0;
pub const PTHREAD_MUTEX_RECURSIVE: i32 = 1;
pub const PTHREAD_MUTEX_ERRORCHECK: i32 = 2;
pub const PTHREAD_MUTEX_DEFAULT: i32 = PTHREAD_MUTEX_NORMAL;

pub const PTHREAD_PRIO_NONE: i32 = 0;
pub const PTHREAD_PRIO_INHERIT: i32 = 1;
pub const PTHREAD_PRIO_PROTECT: i32 = 2;

pub const PTHREAD_PROCESS_PRIVATE: i32 = 0;
pub const PTHREAD_PROCESS_SHARED: i32 = 1;

pub const PTHREAD_CREATE_JOINABLE: i32 = 0;
pub const PTHREAD_CREATE_DETACHED: i32 = 1;

pub const PTHREAD_INHERIT_SCHED: i32 = 0;
pub const PTHREAD_EXPLICIT_SCHED: i32 = 1;

pub const PTHREAD_SCOPE_SYSTEM: i32 = 0;
pub const PTHREAD_SCOPE_PROCESS: i32 = 1;

/// Smallest stack a thread may be created with.
pub const PTHREAD_STACK_MIN: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Process sharing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProcessShared {
    #[default]
    Private,
    Shared,
}

impl ProcessShared {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_PROCESS_PRIVATE => Ok(Self::Private),
            PTHREAD_PROCESS_SHARED => Ok(Self::Shared),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Private => PTHREAD_PROCESS_PRIVATE,
            Self::Shared => PTHREAD_PROCESS_SHARED,
        }
    }

    /// Cross-process primitives are not provided.
    pub const fn require_private(self) -> PthreadResult<()> {
        match self {
            Self::Private => Ok(()),
            Self::Shared => Err(PthreadError::Unsupported),
        }
    }
}

// ---------------------------------------------------------------------------
// Mutex attributes
// ---------------------------------------------------------------------------

/// Mutex kind. Recursive and error-checking kinds are accepted and recorded
/// but lock exactly like `Normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MutexKind {
    #[default]
    Normal,
    Recursive,
    ErrorCheck,
}

impl MutexKind {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_MUTEX_NORMAL => Ok(Self::Normal),
            PTHREAD_MUTEX_RECURSIVE => Ok(Self::Recursive),
            PTHREAD_MUTEX_ERRORCHECK => Ok(Self::ErrorCheck),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Normal => PTHREAD_MUTEX_NORMAL,
            Self::Recursive => PTHREAD_MUTEX_RECURSIVE,
            Self::ErrorCheck => PTHREAD_MUTEX_ERRORCHECK,
        }
    }
}

/// Priority protocol. Only `None` is implemented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MutexProtocol {
    #[default]
    None,
    Inherit,
    Protect,
}

impl MutexProtocol {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_PRIO_NONE => Ok(Self::None),
            PTHREAD_PRIO_INHERIT => Ok(Self::Inherit),
            PTHREAD_PRIO_PROTECT => Ok(Self::Protect),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::None => PTHREAD_PRIO_NONE,
            Self::Inherit => PTHREAD_PRIO_INHERIT,
            Self::Protect => PTHREAD_PRIO_PROTECT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MutexAttr {
    pub kind: MutexKind,
    pub pshared: ProcessShared,
    pub protocol: MutexProtocol,
}

impl MutexAttr {
    /// Reject configurations no mutex here can honour.
    pub const fn validate(&self) -> PthreadResult<()> {
        if let Err(e) = self.pshared.require_private() {
            return Err(e);
        }
        match self.protocol {
            MutexProtocol::None => Ok(()),
            MutexProtocol::Inherit | MutexProtocol::Protect => Err(PthreadError::Unsupported),
        }
    }
}

// ---------------------------------------------------------------------------
// Condition variable / barrier attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CondAttr {
    pub pshared: ProcessShared,
    /// Clock that `timed_wait` deadlines are measured against.
    pub clock: ClockId,
}

impl Default for CondAttr {
    fn default() -> Self {
        Self {
            pshared: ProcessShared::Private,
            clock: ClockId::Realtime,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BarrierAttr {
    pub pshared: ProcessShared,
}

// ---------------------------------------------------------------------------
// Thread attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DetachState {
    #[default]
    Joinable,
    Detached,
}

impl DetachState {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_CREATE_JOINABLE => Ok(Self::Joinable),
            PTHREAD_CREATE_DETACHED => Ok(Self::Detached),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Joinable => PTHREAD_CREATE_JOINABLE,
            Self::Detached => PTHREAD_CREATE_DETACHED,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InheritSched {
    #[default]
    Inherit,
    Explicit,
}

impl InheritSched {
    pub const fn from_raw(raw: i32) -> PthreadResult<Self> {
        match raw {
            PTHREAD_INHERIT_SCHED => Ok(Self::Inherit),
            PTHREAD_EXPLICIT_SCHED => Ok(Self::Explicit),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Inherit => PTHREAD_INHERIT_SCHED,
            Self::Explicit => PTHREAD_EXPLICIT_SCHED,
        }
    }
}

/// Thread creation attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ThreadAttr {
    pub detach_state: DetachState,
    /// `None` uses the host default.
    pub stack_size: Option<usize>,
    pub inherit_sched: InheritSched,
    pub policy: Policy,
    pub param: SchedParam,
    /// Native thread name; `fpt-<id>` when unset.
    pub name: Option<String>,
}

impl ThreadAttr {
    #[must_use]
    pub fn detached() -> Self {
        Self {
            detach_state: DetachState::Detached,
            ..Self::default()
        }
    }

    /// `pthread_attr_setstacksize`.
    pub fn set_stack_size(&mut self, size: usize) -> PthreadResult<()> {
        if size < PTHREAD_STACK_MIN {
            return Err(PthreadError::InvalidArgument);
        }
        self.stack_size = Some(size);
        Ok(())
    }

    /// `pthread_attr_setschedpolicy`: realtime classes are refused.
    pub fn set_policy(&mut self, policy: Policy) -> PthreadResult<()> {
        policy.require_supported()?;
        self.policy = policy;
        Ok(())
    }

    /// `pthread_attr_setschedparam`.
    pub fn set_param(&mut self, param: SchedParam) -> PthreadResult<()> {
        param.validate(self.policy)?;
        self.param = param;
        Ok(())
    }

    /// `pthread_attr_setscope`: only system scope exists.
    pub fn set_scope(&mut self, scope: i32) -> PthreadResult<()> {
        match scope {
            PTHREAD_SCOPE_SYSTEM => Ok(()),
            PTHREAD_SCOPE_PROCESS => Err(PthreadError::Unsupported),
            _ => Err(PthreadError::InvalidArgument),
        }
    }

    /// Full check before a thread is created from this record.
    pub fn validate(&self) -> PthreadResult<()> {
        if self.stack_size.is_some_and(|s| s < PTHREAD_STACK_MIN) {
            return Err(PthreadError::InvalidArgument);
        }
        self.policy.require_supported()?;
        self.param.validate(self.policy)
    }
}
