//! Shared-system-buffer collaborator.
//!
//! Some cells do not own their storage: their contents live in a
//! process-wide buffer managed elsewhere (the clipboard-like singleton of
//! the host). Such cells delegate every read and write through this
//! trait's open/commit protocol and never assume ownership of the memory.
//! Numeric caching is permanently disabled for them because the backing
//! store can change out-of-band.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{VarError, VarResult};

/// Protocol offered by the host's shared buffer.
pub trait SharedBuffer {
    /// Current textual contents, opening the buffer for read if needed.
    fn contents(&mut self) -> &str;

    /// Capacity currently available for writing, in bytes.
    fn capacity(&self) -> usize;

    /// Replace the contents (open, write, commit, close).
    fn set(&mut self, text: &str) -> VarResult<()>;

    /// Open for write with at least `needed` bytes available; a later
    /// [`SharedBuffer::commit`] publishes whatever was staged.
    fn prepare_write(&mut self, needed: usize) -> VarResult<()>;

    /// Publish staged contents and close.
    fn commit(&mut self) -> VarResult<()>;

    /// Close without publishing.
    fn close(&mut self);
}

/// Handle a shared-kind cell keeps to its collaborator.
pub type SharedBufferHandle = Rc<RefCell<dyn SharedBuffer>>;

/// In-memory implementation, sufficient for tests and non-windowed hosts.
#[derive(Default)]
pub struct MemorySharedBuffer {
    committed: String,
    staged: Option<String>,
}

impl MemorySharedBuffer {
    pub fn new() -> Self {
        MemorySharedBuffer::default()
    }

    pub fn handle(self) -> SharedBufferHandle {
        Rc::new(RefCell::new(self))
    }
}

impl SharedBuffer for MemorySharedBuffer {
    fn contents(&mut self) -> &str {
        match &self.staged {
            Some(staged) => staged,
            None => &self.committed,
        }
    }

    fn capacity(&self) -> usize {
        match &self.staged {
            Some(staged) => staged.capacity(),
            None => self.committed.capacity(),
        }
    }

    fn set(&mut self, text: &str) -> VarResult<()> {
        // A staged write must be committed or closed before a direct set.
        if self.staged.is_some() {
            return Err(VarError::SharedBufferWrite {
                reason: "a staged write is already open".to_owned(),
            });
        }
        self.committed.clear();
        self.committed.push_str(text);
        Ok(())
    }

    fn prepare_write(&mut self, needed: usize) -> VarResult<()> {
        self.staged = Some(String::with_capacity(needed));
        Ok(())
    }

    fn commit(&mut self) -> VarResult<()> {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.staged = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn staged_writes_publish_on_commit() {
        let mut buf = MemorySharedBuffer::new();
        buf.set("one").unwrap();
        assert_eq!(buf.contents(), "one");

        buf.prepare_write(16).unwrap();
        buf.close();
        assert_eq!(buf.contents(), "one");

        buf.prepare_write(16).unwrap();
        if let Some(staged) = &mut buf.staged {
            staged.push_str("two");
        }
        buf.commit().unwrap();
        assert_eq!(buf.contents(), "two");
    }
}
