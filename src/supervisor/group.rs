//! Enumerable, interruptible groups of worker threads.
//!
//! Threads cannot be killed from the outside, so interruption is cooperative: every member carries an
//! interrupt flag that [`WorkerGroup::interrupt_all`] raises before unparking the thread. Test code
//! observes it through [`is_interrupted`], [`check_interrupted`] and [`sleep`]. A destroyed group
//! forgets its members (they run on detached) and refuses new ones.

use std::cell::RefCell;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("worker group '{0}' has been destroyed")]
    Destroyed(String),

    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
}

/// Raised to test code that notices its group was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker interrupted")]
pub struct Interrupted;

struct Member {
    name: String,
    thread: Thread,
    interrupted: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

struct GroupInner {
    label: String,
    members: Mutex<Vec<Member>>,
    destroyed: AtomicBool,
}

/// A named set of threads that can be enumerated and interrupted together.
#[derive(Clone)]
pub struct WorkerGroup {
    inner: Arc<GroupInner>,
}

#[derive(Clone)]
struct Membership {
    group: WorkerGroup,
    interrupted: Arc<AtomicBool>,
}

thread_local! {
    static MEMBERSHIP: RefCell<Option<Membership>> = const { RefCell::new(None) };
}

/// Marks its member finished when the thread ends, panicking or not.
struct FinishGuard(Arc<AtomicBool>);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl WorkerGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                label: label.into(),
                members: Mutex::new(Vec::new()),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// The group the calling thread belongs to, if any.
    pub fn current() -> Option<WorkerGroup> {
        MEMBERSHIP.with(|m| m.borrow().as_ref().map(|m| m.group.clone()))
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Spawn `f` on a new named thread that belongs to this group.
    pub fn spawn<F, T>(&self, name: impl Into<String>, f: F) -> Result<JoinHandle<T>, GroupError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let name = name.into();
        let mut members = self.members();
        if self.is_destroyed() {
            return Err(GroupError::Destroyed(self.inner.label.clone()));
        }

        let interrupted = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let membership = Membership {
            group: self.clone(),
            interrupted: Arc::clone(&interrupted),
        };
        let guard = FinishGuard(Arc::clone(&finished));

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _guard = guard;
                MEMBERSHIP.with(|m| *m.borrow_mut() = Some(membership));
                f()
            })
            .map_err(GroupError::Spawn)?;

        members.push(Member {
            name,
            thread: handle.thread().clone(),
            interrupted,
            finished,
        });
        Ok(handle)
    }

    /// Names of the members that are still running.
    pub fn enumerate(&self) -> Vec<String> {
        self.members()
            .iter()
            .filter(|m| !m.finished.load(Ordering::SeqCst))
            .map(|m| m.name.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.members()
            .iter()
            .filter(|m| !m.finished.load(Ordering::SeqCst))
            .count()
    }

    /// Raise the interrupt flag of every running member and wake it. Returns how many were interrupted.
    pub fn interrupt_all(&self) -> usize {
        let members = self.members();
        let mut count = 0;
        for member in members.iter().filter(|m| !m.finished.load(Ordering::SeqCst)) {
            member.interrupted.store(true, Ordering::SeqCst);
            member.thread.unpark();
            count += 1;
        }
        count
    }

    /// Refuse new members and forget the current ones.
    pub fn destroy(&self) {
        let mut members = self.members();
        self.inner.destroyed.store(true, Ordering::SeqCst);
        members.clear();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    fn members(&self) -> MutexGuard<'_, Vec<Member>> {
        self.inner.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for WorkerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerGroup")
            .field("label", &self.inner.label)
            .field("active", &self.active_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// True if the calling thread belongs to a group and has been interrupted.
pub fn is_interrupted() -> bool {
    MEMBERSHIP.with(|m| {
        m.borrow()
            .as_ref()
            .is_some_and(|m| m.interrupted.load(Ordering::SeqCst))
    })
}

pub fn check_interrupted() -> Result<(), Interrupted> {
    if is_interrupted() { Err(Interrupted) } else { Ok(()) }
}

/// Sleep for `duration`, returning early with [`Interrupted`] if the calling worker is interrupted.
pub fn sleep(duration: Duration) -> Result<(), Interrupted> {
    let deadline = Instant::now() + duration;
    loop {
        check_interrupted()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::park_timeout(deadline - now);
    }
}
