// Thread scheduling - real-time class for the producer, idle class for the display
//
// Every request here is best effort. Failures are logged as warnings and the
// caller keeps running with normal scheduling.

use tracing::{info, warn};

/// SCHED_FIFO / SCHED_RR priority requested for the audio producer
pub const REALTIME_PRIORITY: i32 = 20;
/// Niceness used when no real-time class is available
pub const FALLBACK_NICE: i32 = -20;
/// Number of cores a `cpu_set_t` mask can address
#[cfg(target_os = "linux")]
pub const MAX_CPU_CORES: usize = libc::CPU_SETSIZE as usize;
#[cfg(not(target_os = "linux"))]
pub const MAX_CPU_CORES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulingClass {
    Fifo(i32),
    RoundRobin(i32),
    Nice(i32),
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeRequest {
    pub enabled: bool,
    pub cpu_core: Option<usize>,
    pub lock_memory: bool,
}

impl Default for RealtimeRequest {
    fn default() -> Self {
        Self {
            enabled: true,
            cpu_core: Some(3),
            lock_memory: true,
        }
    }
}

/// Applies everything the producer thread asks for, in order: memory lock,
/// CPU pinning, scheduling class
pub fn prepare_producer_thread(request: &RealtimeRequest) -> SchedulingClass {
    if !request.enabled {
        return SchedulingClass::Normal;
    }

    if request.lock_memory {
        lock_memory();
    }
    if let Some(core) = request.cpu_core {
        pin_to_core(core);
    }
    request_realtime(REALTIME_PRIORITY)
}

#[cfg(target_os = "linux")]
mod imp {
    use std::io;

    pub fn set_scheduler(policy: libc::c_int, priority: i32) -> io::Result<()> {
        let param = libc::sched_param {
            sched_priority: priority,
        };
        // SAFETY: pid 0 targets the calling thread; `param` outlives the call
        let rc = unsafe { libc::sched_setscheduler(0, policy, &param) };
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    pub fn set_nice(nice: i32) -> io::Result<()> {
        // SAFETY: plain syscall on the calling thread
        let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, nice) };
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    pub fn pin(core: usize) -> io::Result<()> {
        // CPU_SET indexes a fixed-size mask and panics past its end
        if core >= super::MAX_CPU_CORES {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        // SAFETY: cpu_set_t is plain data; zeroed is the empty set
        let rc = unsafe {
            let mut set: libc::cpu_set_t = std::mem::zeroed();
            libc::CPU_ZERO(&mut set);
            libc::CPU_SET(core, &mut set);
            libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
        };
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    pub fn lock_all() -> io::Result<()> {
        // SAFETY: no pointers involved
        let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
        if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
    }

    pub const FIFO: libc::c_int = libc::SCHED_FIFO;
    pub const RR: libc::c_int = libc::SCHED_RR;
    pub const IDLE: libc::c_int = libc::SCHED_IDLE;
}

/// SCHED_FIFO, then SCHED_RR, then nice(-20)
#[cfg(target_os = "linux")]
pub fn request_realtime(priority: i32) -> SchedulingClass {
    match imp::set_scheduler(imp::FIFO, priority) {
        Ok(()) => {
            info!(priority, "Audio thread running with SCHED_FIFO");
            return SchedulingClass::Fifo(priority);
        }
        Err(e) => warn!(error = %e, "SCHED_FIFO unavailable"),
    }

    match imp::set_scheduler(imp::RR, priority) {
        Ok(()) => {
            info!(priority, "Audio thread running with SCHED_RR");
            return SchedulingClass::RoundRobin(priority);
        }
        Err(e) => warn!(error = %e, "SCHED_RR unavailable"),
    }

    match imp::set_nice(FALLBACK_NICE) {
        Ok(()) => {
            warn!(nice = FALLBACK_NICE, "No real-time scheduling, using nice instead");
            SchedulingClass::Nice(FALLBACK_NICE)
        }
        Err(e) => {
            warn!(error = %e, "Could not raise priority, timing may suffer");
            SchedulingClass::Normal
        }
    }
}

#[cfg(target_os = "linux")]
pub fn request_idle() -> bool {
    match imp::set_scheduler(imp::IDLE, 0) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "SCHED_IDLE unavailable for display thread");
            false
        }
    }
}

#[cfg(target_os = "linux")]
pub fn pin_to_core(core: usize) -> bool {
    match imp::pin(core) {
        Ok(()) => {
            info!(core, "Audio thread pinned");
            true
        }
        Err(e) => {
            warn!(core, error = %e, "Could not pin audio thread");
            false
        }
    }
}

#[cfg(target_os = "linux")]
pub fn lock_memory() -> bool {
    match imp::lock_all() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "mlockall failed, page faults may cause glitches");
            false
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn request_realtime(_priority: i32) -> SchedulingClass {
    warn!("Real-time scheduling not supported on this platform");
    SchedulingClass::Normal
}

#[cfg(not(target_os = "linux"))]
pub fn request_idle() -> bool {
    false
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_core(core: usize) -> bool {
    warn!(core, "CPU pinning not supported on this platform");
    false
}

#[cfg(not(target_os = "linux"))]
pub fn lock_memory() -> bool {
    warn!("Memory locking not supported on this platform");
    false
}
