//! Portable spawner on `std::thread`

use std::thread::{self, JoinHandle};

use prodcon_core::{pc_error, PcError, PcResult, WorkerError};

use super::{panic_message, ThreadSpawner, WorkerFn};

#[derive(Debug, Default, Clone, Copy)]
pub struct StdSpawner;

/// Running std thread plus the name used for error reports
pub struct StdHandle {
    name: String,
    inner: JoinHandle<()>,
}

impl ThreadSpawner for StdSpawner {
    type Handle = StdHandle;

    fn spawn(&self, name: &str, stack_size: usize, body: WorkerFn) -> PcResult<StdHandle> {
        let inner = thread::Builder::new()
            .name(name.to_string())
            .stack_size(stack_size)
            .spawn(body)
            .map_err(|e| {
                PcError::Worker(WorkerError::SpawnFailed(e.raw_os_error().unwrap_or(-1)))
            })?;
        Ok(StdHandle { name: name.to_string(), inner })
    }

    fn join(&self, handle: StdHandle) -> Result<(), WorkerError> {
        handle.inner.join().map_err(|payload| {
            pc_error!("{} panicked: {}", handle.name, panic_message(payload.as_ref()));
            WorkerError::Panicked(handle.name)
        })
    }
}
