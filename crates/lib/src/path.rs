//! Path types for addressing nodes in the object graph.
//!
//! A [`PathBuf`] is a sequence of [`Step`]s from the root: either an object
//! key or an array index. This follows the same owned/borrowed split as
//! `std::path::Path`/`PathBuf`, adapted from a single dot-separated string of
//! components (as in a plain document path) to a typed sequence, because
//! object steps and array steps encode to different byte shapes (§4.2).

use std::fmt;

/// A single step in a path: either an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    Key(String),
    Index(u64),
}

impl Step {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Step::Key(k) => Some(k),
            Step::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<u64> {
        match self {
            Step::Index(i) => Some(*i),
            Step::Key(_) => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(k) => write!(f, ".{k:?}"),
            Step::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl From<&str> for Step {
    fn from(s: &str) -> Self {
        Step::Key(s.to_string())
    }
}

impl From<String> for Step {
    fn from(s: String) -> Self {
        Step::Key(s)
    }
}

impl From<u64> for Step {
    fn from(i: u64) -> Self {
        Step::Index(i)
    }
}

impl From<usize> for Step {
    fn from(i: usize) -> Self {
        Step::Index(i as u64)
    }
}

/// An owned, ordered sequence of [`Step`]s from the root. The empty path
/// denotes the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathBuf {
    steps: Vec<Step>,
}

impl PathBuf {
    /// The empty path, denoting the root.
    pub fn root() -> Self {
        Self { steps: Vec::new() }
    }

    /// Builds a new path by appending a step.
    pub fn child(&self, step: impl Into<Step>) -> Self {
        let mut steps = self.steps.clone();
        steps.push(step.into());
        Self { steps }
    }

    /// Appends a step in place, returning `self` for chaining.
    pub fn push(mut self, step: impl Into<Step>) -> Self {
        self.steps.push(step.into());
        self
    }

    /// The parent path, or `None` if this is the root.
    pub fn parent(&self) -> Option<PathBuf> {
        if self.steps.is_empty() {
            None
        } else {
            Some(PathBuf {
                steps: self.steps[..self.steps.len() - 1].to_vec(),
            })
        }
    }

    /// The final step of this path, or `None` if this is the root.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for PathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for step in &self.steps {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromIterator<Step> for PathBuf {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}
