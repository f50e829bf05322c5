//! Linux spawner on raw pthreads
//!
//! The worker closure is boxed, leaked into `pthread_create`, and reclaimed
//! exactly once by the trampoline. A panic is caught before it can unwind
//! across the `extern "C"` boundary and reported through the thread's
//! return value.

use std::ffi::{c_void, CString};
use std::mem::MaybeUninit;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use prodcon_core::{pc_error, pc_warn, PcError, PcResult, WorkerError};

use super::{panic_message, ThreadSpawner, WorkerFn};

/// Kernel limit for thread names, excluding the NUL
const MAX_NAME_LEN: usize = 15;

/// Trampoline return value for a panicked worker
const PANICKED: usize = 1;

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSpawner;

pub struct NativeHandle {
    name: String,
    thread: libc::pthread_t,
}

// SAFETY: a pthread_t is an opaque id that may be joined from any thread
unsafe impl Send for NativeHandle {}

extern "C" fn trampoline(arg: *mut c_void) -> *mut c_void {
    // SAFETY: `arg` came from Box::into_raw in `spawn` and is consumed only here
    let body: Box<WorkerFn> = unsafe { Box::from_raw(arg as *mut WorkerFn) };
    match panic::catch_unwind(AssertUnwindSafe(move || (*body)())) {
        Ok(()) => ptr::null_mut(),
        Err(payload) => {
            pc_error!("worker panicked: {}", panic_message(payload.as_ref()));
            PANICKED as *mut c_void
        }
    }
}

fn spawn_failed(code: i32) -> PcError {
    PcError::Worker(WorkerError::SpawnFailed(code))
}

impl ThreadSpawner for NativeSpawner {
    type Handle = NativeHandle;

    fn spawn(&self, name: &str, stack_size: usize, body: WorkerFn) -> PcResult<NativeHandle> {
        let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();
        let mut thread = MaybeUninit::<libc::pthread_t>::uninit();

        // SAFETY: attr is initialized before use and destroyed on every path;
        // the leaked closure is reclaimed here if the thread never starts.
        unsafe {
            let rc = libc::pthread_attr_init(attr.as_mut_ptr());
            if rc != 0 {
                return Err(spawn_failed(rc));
            }
            let stack = stack_size.max(libc::PTHREAD_STACK_MIN);
            let rc = libc::pthread_attr_setstacksize(attr.as_mut_ptr(), stack);
            if rc != 0 {
                libc::pthread_attr_destroy(attr.as_mut_ptr());
                return Err(spawn_failed(rc));
            }

            let arg = Box::into_raw(Box::new(body)) as *mut c_void;
            let rc = libc::pthread_create(thread.as_mut_ptr(), attr.as_ptr(), trampoline, arg);
            libc::pthread_attr_destroy(attr.as_mut_ptr());
            if rc != 0 {
                drop(Box::from_raw(arg as *mut WorkerFn));
                return Err(spawn_failed(rc));
            }

            let thread = thread.assume_init();
            set_name(thread, name);
            Ok(NativeHandle { name: name.to_string(), thread })
        }
    }

    fn join(&self, handle: NativeHandle) -> Result<(), WorkerError> {
        let mut ret: *mut c_void = ptr::null_mut();
        // SAFETY: each handle is joined once; join consumes it
        let rc = unsafe { libc::pthread_join(handle.thread, &mut ret) };
        if rc != 0 {
            return Err(WorkerError::JoinFailed(rc));
        }
        if ret as usize == PANICKED {
            return Err(WorkerError::Panicked(handle.name));
        }
        Ok(())
    }
}

/// Name the thread for debuggers and `/proc`; failure is only logged
fn set_name(thread: libc::pthread_t, name: &str) {
    let mut end = name.len().min(MAX_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    let Ok(cname) = CString::new(&name[..end]) else {
        return;
    };
    // SAFETY: thread is live (not yet joined) and cname is NUL-terminated
    let rc = unsafe { libc::pthread_setname_np(thread, cname.as_ptr()) };
    if rc != 0 {
        pc_warn!("cannot set thread name {}: error {}", name, rc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_stack_size_honored() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen2 = seen.clone();
        let h = NativeSpawner
            .spawn("stack", 512 * 1024, Box::new(move || {
                // SAFETY: querying our own attributes
                unsafe {
                    let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();
                    assert_eq!(libc::pthread_getattr_np(libc::pthread_self(), attr.as_mut_ptr()), 0);
                    let mut size = 0usize;
                    libc::pthread_attr_getstacksize(attr.as_ptr(), &mut size);
                    libc::pthread_attr_destroy(attr.as_mut_ptr());
                    seen2.store(size as u64, Ordering::SeqCst);
                }
            }))
            .unwrap();
        NativeSpawner.join(h).unwrap();
        assert!(seen.load(Ordering::SeqCst) >= 512 * 1024);
    }

    #[test]
    fn test_long_name_truncated() {
        // 15-byte limit; an untruncated name would make setname fail with ERANGE
        let h = NativeSpawner
            .spawn("a-very-long-worker-name", 128 * 1024, Box::new(|| {}))
            .unwrap();
        NativeSpawner.join(h).unwrap();
    }
}
