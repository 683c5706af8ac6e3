//! Purpose: Abstract provider of records for listing commands.
//! Exports: `RecordSource`.
//! Role: Injection seam between command handlers and the host's registry.
//! Invariants: `fetch` is read-only; ordering is stable for a fixed backend state.
//! Invariants: An uninitialized backend fails with `SourceUnavailable`.
use crate::core::error::Error;
use crate::core::filter::FilterMap;
use crate::core::formatter::Capabilities;
use crate::core::record::Record;

pub trait RecordSource {
    /// Every record satisfying all constraints in `filters`.
    fn fetch(&self, filters: &FilterMap) -> Result<Vec<Record>, Error>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

impl<T: RecordSource + ?Sized> RecordSource for &T {
    fn fetch(&self, filters: &FilterMap) -> Result<Vec<Record>, Error> {
        (**self).fetch(filters)
    }

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }
}
