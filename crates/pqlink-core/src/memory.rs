//! Process and buffer hardening for seed material
//!
//! - [`disable_core_dumps`] sets `RLIMIT_CORE` to zero so a crash during
//!   derivation never writes a mnemonic or seed to disk.
//! - [`LockedBuffer`] keeps a heap buffer out of swap with `mlock()` and
//!   zeroizes it before unlocking on drop.
//!
//! Both are best-effort: containers and unprivileged users often cannot lock
//! memory, so failures are logged and the caller continues.

use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::Zeroize;

static CORE_DUMPS_DISABLED: AtomicBool = AtomicBool::new(false);

/// Disable core dumps for the current process.
///
/// Idempotent; returns `true` once core dumps are off.
pub fn disable_core_dumps() -> bool {
    if CORE_DUMPS_DISABLED.swap(true, Ordering::SeqCst) {
        return true;
    }

    #[cfg(unix)]
    {
        unix::disable_core_dumps_impl()
    }

    #[cfg(not(unix))]
    {
        log::warn!("Core dump prevention not supported on this platform");
        false
    }
}

/// Heap buffer that is mlocked for its lifetime and zeroized on drop.
pub struct LockedBuffer {
    data: Vec<u8>,
    locked: bool,
}

impl LockedBuffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        let data = vec![0u8; len];
        let locked = if data.is_empty() {
            true
        } else {
            lock_region(data.as_ptr(), data.len())
        };

        if !locked {
            log::warn!("Failed to mlock {} bytes; seed material may be swappable", len);
        }

        Self { data, locked }
    }

    /// Copy `bytes` into a fresh locked buffer.
    ///
    /// The source is not cleared; callers keep it in a `Zeroizing` or wipe
    /// it themselves.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut buf = Self::new(bytes.len());
        buf.data.copy_from_slice(bytes);
        buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether `mlock` succeeded for this buffer.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        // Wipe while the pages are still pinned.
        self.data.as_mut_slice().zeroize();

        if self.locked && !self.data.is_empty() {
            unlock_region(self.data.as_ptr(), self.data.len());
        }
    }
}

fn lock_region(ptr: *const u8, len: usize) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: ptr/len describe a live allocation owned by the caller.
        unsafe { unix::mlock_impl(ptr, len) }
    }

    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
        false
    }
}

fn unlock_region(ptr: *const u8, len: usize) {
    #[cfg(unix)]
    {
        // SAFETY: called from Drop with the same region passed to lock_region.
        unsafe {
            unix::munlock_impl(ptr, len);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = (ptr, len);
    }
}

#[cfg(unix)]
mod unix {
    pub fn disable_core_dumps_impl() -> bool {
        let rlim = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: setrlimit(RLIMIT_CORE) with a valid rlimit struct.
        let result = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlim) };
        if result != 0 {
            log::warn!(
                "Failed to disable core dumps: {}",
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn mlock_impl(ptr: *const u8, len: usize) -> bool {
        if libc::mlock(ptr as *const libc::c_void, len) != 0 {
            log::debug!(
                "mlock({} bytes) failed: {}",
                len,
                std::io::Error::last_os_error()
            );
            return false;
        }
        true
    }

    pub unsafe fn munlock_impl(ptr: *const u8, len: usize) -> bool {
        libc::munlock(ptr as *const libc::c_void, len) == 0
    }
}
