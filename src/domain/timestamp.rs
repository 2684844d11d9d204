use super::{ProjectId, VersionId};
use serde::{Deserialize, Serialize};

/// Description of the initial version of every project.
pub const START_DESCRIPTION: &str = "Start";

/// An immutable marker for one point in the phase sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeStamp {
    pub id: VersionId,
    pub project: ProjectId,
    pub period: i64,
    pub predecessor: Option<VersionId>,
    /// Name of the super-phase this step belongs to, for hierarchical display.
    pub superstate: Option<String>,
    /// Name of the phase that produced this version.
    pub description: String,
}

impl TimeStamp {
    pub fn initial(project: ProjectId) -> Self {
        Self {
            id: VersionId::INITIAL,
            project,
            period: 1,
            predecessor: None,
            superstate: None,
            description: START_DESCRIPTION.to_string(),
        }
    }

    pub fn successor(
        &self,
        period: i64,
        description: impl Into<String>,
        superstate: Option<String>,
    ) -> Self {
        Self {
            id: self.id.next(),
            project: self.project,
            period,
            predecessor: Some(self.id),
            superstate,
            description: description.into(),
        }
    }
}
