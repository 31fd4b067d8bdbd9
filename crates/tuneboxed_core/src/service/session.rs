//! "Who is signed in" accessor used for display gating only.

use crate::backend::simple::SimpleBackend;
use crate::kv::{KeyValueStore, KvResult};
use crate::model::signup::SignupRecord;

/// Thin view over the simple store's `current_user` key.
pub struct SessionPointer<'a, K> {
    simple: &'a SimpleBackend<K>,
}

impl<'a, K: KeyValueStore> SessionPointer<'a, K> {
    pub fn new(simple: &'a SimpleBackend<K>) -> Self {
        Self { simple }
    }

    /// Returns the signed-in record, or `None` when absent or unreadable.
    pub fn current(&self) -> Option<SignupRecord> {
        self.simple.session_pointer()
    }

    pub fn set(&self, record: &SignupRecord) -> KvResult<()> {
        self.simple.set_session_pointer(record)
    }

    pub fn clear(&self) -> KvResult<()> {
        self.simple.clear_session_pointer()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionPointer;
    use crate::backend::simple::SimpleBackend;
    use crate::kv::{KeyValueStore, MemoryKeyValueStore};
    use crate::model::signup::SignupRecord;

    #[test]
    fn corrupt_pointer_reads_as_signed_out() {
        let simple = SimpleBackend::new(MemoryKeyValueStore::new());
        simple.kv().set("current_user", "[]").unwrap();
        let session = SessionPointer::new(&simple);
        assert!(!session.is_signed_in());
    }

    #[test]
    fn set_then_clear() {
        let simple = SimpleBackend::new(MemoryKeyValueStore::new());
        let session = SessionPointer::new(&simple);
        let record = SignupRecord::new("a@x.com", "Ann", "2024-05-01T12:00:00.000Z");

        session.set(&record).unwrap();
        assert_eq!(session.current(), Some(record));
        session.clear().unwrap();
        assert!(session.current().is_none());
    }
}
