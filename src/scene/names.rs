use rustc_hash::FxHashMap;

/// Hands out default entity names (`obj0`, `obj1`, `robot0`, ...).
///
/// Each scene owns its own allocator, so independent scenes produce the same
/// sequence of names.
#[derive(Debug, Default)]
pub struct NameAllocator {
    counters: FxHashMap<String, usize>,
}

impl NameAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next `{prefix}{n}` for which `taken` is false.
    pub fn allocate(&mut self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let name = format!("{prefix}{counter}");
            *counter += 1;
            if !taken(&name) {
                return name;
            }
        }
    }
}
