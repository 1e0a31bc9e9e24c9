/// In-memory browser history: a list of paths with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    index: usize,
}

impl History {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![initial.to_string()],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.entries[self.index]
    }

    /// Push `path` unless it equals the current entry. Drops any forward entries.
    ///
    /// Returns whether an entry was added.
    pub fn push(&mut self, path: &str) -> bool {
        if self.current() == path {
            return false;
        }
        self.entries.truncate(self.index + 1);
        self.entries.push(path.to_string());
        self.index += 1;
        true
    }

    /// Overwrite the current entry (used when canonicalizing the boot URL).
    pub fn replace(&mut self, path: &str) {
        self.entries[self.index] = path.to_string();
    }

    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(self.current())
    }

    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(self.current())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_duplicates() {
        let mut h = History::new("/");
        assert!(!h.push("/"));
        assert!(h.push("/kategori/moda"));
        assert!(!h.push("/kategori/moda"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_back_forward() {
        let mut h = History::new("/");
        h.push("/a");
        h.push("/b");
        assert_eq!(h.back(), Some("/a"));
        assert_eq!(h.back(), Some("/"));
        assert_eq!(h.back(), None);
        assert_eq!(h.forward(), Some("/a"));

        // Pushing from the middle discards the forward entries
        h.push("/c");
        assert_eq!(h.forward(), None);
        assert_eq!(h.len(), 3);
        assert_eq!(h.current(), "/c");
    }

    #[test]
    fn test_replace() {
        let mut h = History::new("/profile");
        h.replace("/profil");
        assert_eq!(h.current(), "/profil");
        assert_eq!(h.len(), 1);
    }
}
