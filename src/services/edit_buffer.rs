/// Local copy of a server value that follows the server until the user
/// edits it. Once dirty, refreshes no longer overwrite it, so a background
/// reload cannot eat unsaved input.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer<T> {
    value: T,
    dirty: bool,
}

impl<T: Clone + PartialEq> EditBuffer<T> {
    pub fn new(source: T) -> Self {
        Self {
            value: source,
            dirty: false,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the buffered value. Edits equal to the current value do not
    /// mark the buffer dirty.
    pub fn edit(&mut self, value: T) {
        if value != self.value {
            self.value = value;
            self.dirty = true;
        }
    }

    /// Follow the source of truth unless there are unsaved edits. Returns
    /// whether the buffer took the new value.
    pub fn sync(&mut self, source: &T) -> bool {
        if self.dirty {
            return false;
        }
        if &self.value != source {
            self.value = source.clone();
        }
        true
    }

    /// Throw away edits and take the source value.
    pub fn discard(&mut self, source: T) {
        self.value = source;
        self.dirty = false;
    }

    /// The saved value is now the source of truth.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }
}
