//! Scheduling policy applied by each worker to itself right after it starts.
//!
//! Both knobs are best effort: real-time priority normally needs privileges and
//! a core may be offline, so failures are logged and the worker keeps running.

use rotate_geometry::presets::{AffinityPolicy, ThreadPriority};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulingPolicy {
    pub priority: ThreadPriority,
    pub affinity: AffinityPolicy,
}

impl SchedulingPolicy {
    /// Apply to the calling thread, which is worker `index`.
    pub fn apply_to_current(&self, index: usize) {
        if let ThreadPriority::RealTime(priority) = self.priority {
            match set_realtime(priority) {
                Ok(()) => debug!(worker = index, priority, "real-time priority set"),
                Err(e) => warn!(worker = index, priority, error = %e, "could not set real-time priority"),
            }
        }
        if let Some(core) = self.affinity.core_for(index) {
            match pin_to_core(core) {
                Ok(()) => debug!(worker = index, core, "pinned"),
                Err(e) => warn!(worker = index, core, error = %e, "could not pin worker"),
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn set_realtime(priority: i32) -> std::io::Result<()> {
    // SAFETY: sched_param is plain data; pthread_self is always valid.
    let rc = unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = priority;
        libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param)
    };
    if rc == 0 { Ok(()) } else { Err(std::io::Error::from_raw_os_error(rc)) }
}

#[cfg(target_os = "linux")]
fn pin_to_core(core: usize) -> std::io::Result<()> {
    if core >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::from_raw_os_error(libc::EINVAL));
    }
    // SAFETY: cpu_set_t is plain data and the set outlives the call.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc == 0 { Ok(()) } else { Err(std::io::Error::last_os_error()) }
}

#[cfg(not(target_os = "linux"))]
fn set_realtime(_priority: i32) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "real-time priority"))
}

#[cfg(not(target_os = "linux"))]
fn pin_to_core(_core: usize) -> std::io::Result<()> {
    Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "thread affinity"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_noop() {
        let policy = SchedulingPolicy::default();
        assert_eq!(policy.priority, ThreadPriority::Normal);
        std::thread::spawn(move || policy.apply_to_current(0)).join().unwrap();
    }

    #[test]
    fn test_pinning_failure_is_not_fatal() {
        // Core 1000 is unlikely to exist; the worker must survive anyway.
        let policy = SchedulingPolicy {
            priority: ThreadPriority::Normal,
            affinity: AffinityPolicy::RoundRobin { core_count: 1001 },
        };
        std::thread::spawn(move || policy.apply_to_current(1000)).join().unwrap();
        let beyond = SchedulingPolicy {
            priority: ThreadPriority::Normal,
            affinity: AffinityPolicy::RoundRobin { core_count: 5000 },
        };
        std::thread::spawn(move || beyond.apply_to_current(4999)).join().unwrap();
    }
}
