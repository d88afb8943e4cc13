/// Caller-owned memoization of a value that only changes when its key does.
#[derive(Clone, Debug)]
pub struct Memoized<K, V> {
    state: Option<(K, V)>,
}

impl<K, V> Default for Memoized<K, V> {
    fn default() -> Self {
        Self { state: None }
    }
}

impl<K: PartialEq, V> Memoized<K, V> {
    /// Return the cached value, recomputing it first if the key has changed.
    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        let state = match self.state.take() {
            Some((last_key, value)) if last_key == key => (last_key, value),
            _ => (key, compute()),
        };
        &self.state.insert(state).1
    }

    #[must_use]
    pub fn last_key(&self) -> Option<&K> {
        self.state.as_ref().map(|(key, _)| key)
    }

    pub fn invalidate(&mut self) {
        self.state = None;
    }
}
