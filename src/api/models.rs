use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{CirclogError, Result};

/// Identity of a CircleCI project: VCS type, organization and repository.
///
/// Serializes to the slash-delimited form the API uses in routes,
/// `vcs_type/username/reponame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub vcs_type: String,
    pub username: String,
    pub reponame: String,
}

impl FromStr for Project {
    type Err = CirclogError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [vcs_type, username, reponame]
                if !vcs_type.is_empty() && !username.is_empty() && !reponame.is_empty() =>
            {
                Ok(Self {
                    vcs_type: (*vcs_type).to_string(),
                    username: (*username).to_string(),
                    reponame: (*reponame).to_string(),
                })
            }
            _ => Err(CirclogError::MalformedProjectIdentity(s.to_string())),
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.vcs_type, self.username, self.reponame)
    }
}

/// One entry of the authenticated user's project listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub username: String,
    pub reponame: String,
    pub vcs_type: String,
    /// Source-control URL of the repository
    pub url: String,
    /// Derived short id, `username/reponame`
    pub id: String,
}

impl ProjectSummary {
    pub fn from_json(json: &Value) -> Result<Self> {
        let username = required_str(json, "username")?;
        let reponame = required_str(json, "reponame")?;
        let id = format!("{username}/{reponame}");

        Ok(Self {
            username,
            reponame,
            vcs_type: required_str(json, "vcs_type")?,
            url: required_str(json, "vcs_url")?,
            id,
        })
    }
}

/// Build status as reported by the API.
///
/// Only the statuses the CLI colorizes get their own variant; anything
/// else is passed through opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Failed,
    Running,
    Other(String),
}

impl From<&str> for BuildStatus {
    fn from(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "running" => Self::Running,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
            Self::Running => f.write_str("running"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Workflow metadata attached to a build, resolved once at mapping time.
///
/// Builds predating workflows have no `workflows` object; their job name
/// comes from a top-level field instead, and workflow name/id read as
/// empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowInfo {
    Present {
        job_name: String,
        workflow_name: String,
        workflow_id: String,
    },
    Absent {
        job_name: String,
    },
}

impl WorkflowInfo {
    fn from_json(json: &Value) -> Result<Self> {
        match json.get("workflows") {
            Some(workflows) => Ok(Self::Present {
                job_name: required_str(workflows, "job_name")?,
                workflow_name: required_str(workflows, "workflow_name")?,
                workflow_id: required_str(workflows, "workflow_id")?,
            }),
            None => Ok(Self::Absent {
                job_name: json
                    .get("job_name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
        }
    }
}

/// One execution of a single job.
///
/// Immutable once mapped. The sanitized raw payload is retained for
/// consumers that need fields not promoted to attributes, most notably
/// step extraction.
#[derive(Debug, Clone)]
pub struct Build {
    pub build_num: u64,
    pub build_url: String,
    pub status: BuildStatus,
    pub outcome: String,
    pub branch: String,
    pub workflow: WorkflowInfo,
    raw: Value,
}

impl Build {
    /// Maps a sanitized build payload into a `Build`.
    ///
    /// # Errors
    ///
    /// Returns a schema error when a required field is missing or has the
    /// wrong type. Null string fields read as empty strings; a running
    /// build, for instance, carries a null `outcome`.
    pub fn from_json(json: Value) -> Result<Self> {
        Ok(Self {
            build_num: required_u64(&json, "build_num")?,
            build_url: required_str(&json, "build_url")?,
            status: BuildStatus::from(required_str(&json, "status")?.as_str()),
            outcome: required_str(&json, "outcome")?,
            branch: required_str(&json, "branch")?,
            workflow: WorkflowInfo::from_json(&json)?,
            raw: json,
        })
    }

    pub fn job_name(&self) -> &str {
        match &self.workflow {
            WorkflowInfo::Present { job_name, .. } | WorkflowInfo::Absent { job_name } => job_name,
        }
    }

    pub fn workflow_name(&self) -> &str {
        match &self.workflow {
            WorkflowInfo::Present { workflow_name, .. } => workflow_name,
            WorkflowInfo::Absent { .. } => "",
        }
    }

    pub fn workflow_id(&self) -> &str {
        match &self.workflow {
            WorkflowInfo::Present { workflow_id, .. } => workflow_id,
            WorkflowInfo::Absent { .. } => "",
        }
    }

    /// The sanitized payload the build was mapped from.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} in {} {}",
            self.job_name(),
            self.build_num,
            self.status,
            self.workflow_name(),
            self.workflow_id()
        )
    }
}

/// One executed action within a build.
///
/// A step fans out into one action per parallel run; `index`
/// disambiguates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub build_num: u64,
    pub step_id: u64,
    pub name: String,
    pub index: u64,
    pub status: String,
}

impl BuildStep {
    /// Maps one action entry of a build's step list.
    ///
    /// # Errors
    ///
    /// Returns a schema error when `name`, `step`, `index` or `status`
    /// is missing or malformed.
    pub fn from_action(action: &Value, build_num: u64) -> Result<Self> {
        Ok(Self {
            build_num,
            step_id: required_u64(action, "step")?,
            name: required_str(action, "name")?,
            index: required_u64(action, "index")?,
            status: required_str(action, "status")?,
        })
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} (step: {}, index {})",
            self.name, self.step_id, self.index
        )
    }
}

fn required_str(json: &Value, key: &str) -> Result<String> {
    match json.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(CirclogError::Schema(format!(
            "field `{key}` is not a string: {other}"
        ))),
        None => Err(CirclogError::Schema(format!("missing field `{key}`"))),
    }
}

fn required_u64(json: &Value, key: &str) -> Result<u64> {
    json.get(key)
        .ok_or_else(|| CirclogError::Schema(format!("missing field `{key}`")))?
        .as_u64()
        .ok_or_else(|| CirclogError::Schema(format!("field `{key}` is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_roundtrip() {
        let project: Project = "github/test/project".parse().unwrap();

        assert_eq!(project.vcs_type, "github");
        assert_eq!(project.username, "test");
        assert_eq!(project.reponame, "project");
        assert_eq!(project.to_string(), "github/test/project");
    }

    #[test]
    fn test_project_rejects_wrong_arity() {
        assert!(matches!(
            "github/test".parse::<Project>(),
            Err(CirclogError::MalformedProjectIdentity(_))
        ));
        assert!(matches!(
            "github/test/project/extra".parse::<Project>(),
            Err(CirclogError::MalformedProjectIdentity(_))
        ));
    }

    #[test]
    fn test_project_rejects_empty_component() {
        assert!(matches!(
            "github//project".parse::<Project>(),
            Err(CirclogError::MalformedProjectIdentity(_))
        ));
    }

    #[test]
    fn test_build_maps_workflow_payload() {
        let build = Build::from_json(json!({
            "build_num": 12345,
            "build_url": "https://circleci.com/gh/test/project/12345",
            "status": "success",
            "outcome": "success",
            "branch": "master",
            "workflows": {
                "job_name": "build",
                "workflow_name": "ci",
                "workflow_id": "0811f7f3-e543-4c3b-b1b8-6c9e4da03e9e"
            }
        }))
        .unwrap();

        assert_eq!(build.build_num, 12345);
        assert_eq!(build.status, BuildStatus::Success);
        assert_eq!(build.job_name(), "build");
        assert_eq!(build.workflow_name(), "ci");
        assert_eq!(build.workflow_id(), "0811f7f3-e543-4c3b-b1b8-6c9e4da03e9e");
    }

    #[test]
    fn test_build_maps_legacy_payload() {
        let build = Build::from_json(json!({
            "build_num": 42,
            "build_url": "https://circleci.com/gh/test/project/42",
            "status": "failed",
            "outcome": "failed",
            "branch": "master",
            "job_name": "deploy"
        }))
        .unwrap();

        assert_eq!(build.job_name(), "deploy");
        assert_eq!(build.workflow_name(), "");
        assert_eq!(build.workflow_id(), "");
    }

    #[test]
    fn test_build_legacy_payload_defaults_job_name() {
        let build = Build::from_json(json!({
            "build_num": 42,
            "build_url": "u",
            "status": "running",
            "outcome": null,
            "branch": "master"
        }))
        .unwrap();

        assert_eq!(build.job_name(), "");
        assert_eq!(build.outcome, "");
        assert_eq!(build.status, BuildStatus::Running);
    }

    #[test]
    fn test_build_missing_build_num_is_schema_error() {
        let result = Build::from_json(json!({
            "build_url": "u",
            "status": "success",
            "outcome": "success",
            "branch": "master"
        }));

        assert!(matches!(result, Err(CirclogError::Schema(_))));
    }

    #[test]
    fn test_build_status_passes_unknown_through() {
        let status = BuildStatus::from("infrastructure_fail");

        assert_eq!(status, BuildStatus::Other("infrastructure_fail".into()));
        assert_eq!(status.to_string(), "infrastructure_fail");
    }

    #[test]
    fn test_build_step_from_action() {
        let step = BuildStep::from_action(
            &json!({
                "name": "Checkout code",
                "step": 0,
                "index": 0,
                "status": "success"
            }),
            12345,
        )
        .unwrap();

        assert_eq!(step.build_num, 12345);
        assert_eq!(step.name, "Checkout code");
        assert_eq!(step.step_id, 0);
        assert_eq!(step.index, 0);
    }

    #[test]
    fn test_build_step_missing_index_is_schema_error() {
        let result = BuildStep::from_action(
            &json!({"name": "Checkout code", "step": 0, "status": "success"}),
            12345,
        );

        assert!(matches!(result, Err(CirclogError::Schema(_))));
    }

    #[test]
    fn test_project_summary_derives_id() {
        let summary = ProjectSummary::from_json(&json!({
            "username": "tests_user",
            "reponame": "project1",
            "vcs_type": "github",
            "vcs_url": "https://github.com/tests_user/project1"
        }))
        .unwrap();

        assert_eq!(summary.id, "tests_user/project1");
    }
}
