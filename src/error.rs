//! Error taxonomy (spec §7). Generalizes the kernel driver convention of
//! `Result<T, &'static str>` into a matchable enum, the same step
//! `naming`/`syscall` already took with their `Errno` type.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidManagerError {
    /// Loading the persistent guid→lid map failed. Fatal only when
    /// `exit_on_fatal` is set.
    PersistentStoreLoad,
    /// Flushing the persistent guid→lid map failed.
    PersistentStoreStore,
    /// `process_sm()` could not find a discovered port matching
    /// `sm_port_guid`.
    SmPortNotFound,
}

impl fmt::Display for LidManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LidManagerError::PersistentStoreLoad => write!(f, "failed to load guid2lid store"),
            LidManagerError::PersistentStoreStore => write!(f, "failed to flush guid2lid store"),
            LidManagerError::SmPortNotFound => write!(f, "SM port guid not found among discovered ports"),
        }
    }
}
