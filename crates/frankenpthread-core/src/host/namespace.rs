//! Process-wide namespace of named kernel semaphores.
//!
//! The namespace holds weak references only: a named object lives exactly as
//! long as some handle to it does, and disappears when the last one closes.
//! There is therefore nothing for an unlink to do.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Weak};

use parking_lot::Mutex;

use super::semaphore::KernelSemaphore;
use crate::error::{PthreadError, PthreadResult};

static NAMESPACE: LazyLock<Mutex<HashMap<String, Weak<KernelSemaphore>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// What to do when the name is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateRequest {
    /// Fail with `AlreadyExists` if the name is live.
    pub exclusive: bool,
    pub initial: u32,
    pub max: u32,
}

/// Outcome of [`open`].
#[derive(Debug)]
pub struct Opened {
    pub semaphore: Arc<KernelSemaphore>,
    pub created: bool,
}

/// Open `name`, creating it when `create` is given and the name is absent.
pub fn open(name: &str, create: Option<CreateRequest>) -> PthreadResult<Opened> {
    let mut names = NAMESPACE.lock();
    if let Some(live) = names.get(name).and_then(Weak::upgrade) {
        if create.is_some_and(|c| c.exclusive) {
            return Err(PthreadError::AlreadyExists);
        }
        return Ok(Opened {
            semaphore: live,
            created: false,
        });
    }
    let Some(req) = create else {
        return Err(PthreadError::NotFound);
    };
    let semaphore =
        Arc::new(KernelSemaphore::new(req.initial, req.max).map_err(|_| PthreadError::NoSpace)?);
    names.retain(|_, weak| weak.strong_count() > 0);
    names.insert(name.to_string(), Arc::downgrade(&semaphore));
    Ok(Opened {
        semaphore,
        created: true,
    })
}

/// True while some handle keeps `name` alive.
#[must_use]
pub fn is_live(name: &str) -> bool {
    NAMESPACE
        .lock()
        .get(name)
        .is_some_and(|weak| weak.strong_count() > 0)
}
