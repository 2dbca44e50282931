use serde::Serialize;

use crate::classify::Classification;
use crate::config::RepositorySpec;
use crate::record::Commit;

/// A repository together with the classified commits of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
    pub branch: String,
    pub accepted_commits: Vec<Commit>,
    pub rejected_commits: Vec<Commit>,
}

impl From<&RepositorySpec> for Repository {
    fn from(spec: &RepositorySpec) -> Self {
        Self {
            name: spec.name.clone(),
            url: spec.url.clone(),
            branch: spec.branch.clone(),
            accepted_commits: Vec::new(),
            rejected_commits: Vec::new(),
        }
    }
}

impl Repository {
    /// Returns a new value carrying exactly `classification`; previous lists are
    /// discarded, so applying the same classification twice gives the same value.
    pub fn with_classification(self, classification: Classification) -> Self {
        Self {
            accepted_commits: classification.accepted,
            rejected_commits: classification.rejected,
            ..self
        }
    }

    pub fn has_accepted(&self) -> bool {
        !self.accepted_commits.is_empty()
    }

    pub fn has_rejected(&self) -> bool {
        !self.rejected_commits.is_empty()
    }
}
