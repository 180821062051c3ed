use std::collections::HashSet;

/// Previous run's file set, used to classify files as they are discovered
#[derive(Debug, Default, Clone)]
pub struct Baseline {
    previous: HashSet<String>,
}

impl Baseline {
    pub fn new<I, S>(previous: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            previous: previous.into_iter().map(Into::into).collect(),
        }
    }

    /// True when `path` was not part of the previous file set
    pub fn is_new(&self, path: &str) -> bool {
        !self.previous.contains(path)
    }

    /// Previous files that were not found this time, sorted
    pub fn removed(&self, found: &HashSet<String>) -> Vec<String> {
        let mut removed: Vec<String> = self
            .previous
            .iter()
            .filter(|path| !found.contains(*path))
            .cloned()
            .collect();
        removed.sort();
        removed
    }
}
