//! Profile sources for the analysis step.
//!
//! `ProfileSource` is the seam between the intake dialogue and whatever builds a profile
//! from a role and job description. The shipped source serves a fixed fixture per variant.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::dialogue::controller::IntakeRequest;
use crate::models::profile::Profile;
use crate::render::TemplateVariant;

const BUNDLED_GENERAL: &str = include_str!("../../fixtures/general.json");
const BUNDLED_RESEARCH: &str = include_str!("../../fixtures/research.json");

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture {name} is not a valid profile: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Produces the profile a finished intake hands to the render pipeline.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn generate(&self, request: &IntakeRequest) -> anyhow::Result<Profile>;
}

/// Serves one fixed profile per template variant; role and description are not consulted.
#[derive(Debug, Clone)]
pub struct FixtureProfileSource {
    general: Profile,
    research: Profile,
}

impl FixtureProfileSource {
    /// Fixtures compiled into the binary.
    pub fn bundled() -> Result<Self, FixtureError> {
        Ok(Self {
            general: parse_fixture("general.json", BUNDLED_GENERAL)?,
            research: parse_fixture("research.json", BUNDLED_RESEARCH)?,
        })
    }

    /// Reads `general.json` and `research.json` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, FixtureError> {
        Ok(Self {
            general: read_fixture(&dir.join("general.json"))?,
            research: read_fixture(&dir.join("research.json"))?,
        })
    }

    pub fn fixture(&self, variant: TemplateVariant) -> &Profile {
        match variant {
            TemplateVariant::General => &self.general,
            TemplateVariant::Research => &self.research,
        }
    }
}

#[async_trait]
impl ProfileSource for FixtureProfileSource {
    async fn generate(&self, request: &IntakeRequest) -> anyhow::Result<Profile> {
        tracing::debug!(
            role = %request.role,
            variant = request.variant.as_str(),
            "serving fixture profile"
        );
        Ok(self.fixture(request.variant).clone())
    }
}

fn read_fixture(path: &Path) -> Result<Profile, FixtureError> {
    let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_fixture(&path.display().to_string(), &raw)
}

fn parse_fixture(name: &str, raw: &str) -> Result<Profile, FixtureError> {
    serde_json::from_str(raw).map_err(|source| FixtureError::Parse {
        name: name.to_string(),
        source,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn request(variant: TemplateVariant) -> IntakeRequest {
        IntakeRequest {
            role: "Software Engineer".to_string(),
            description: "Rust".to_string(),
            variant,
        }
    }

    #[test]
    fn test_bundled_fixtures_parse() {
        let source = FixtureProfileSource::bundled().unwrap();
        let general = source.fixture(TemplateVariant::General);
        assert!(general.personal_info.is_some());
        assert!(!general.skills.is_empty());

        let research = source.fixture(TemplateVariant::Research);
        assert!(research.work_ex.iter().any(|w| w.is_research()));
        assert!(research.work_ex.iter().any(|w| !w.is_research()));
        assert!(!research.interests.is_empty());
    }

    #[test]
    fn test_bundled_fixtures_render_completely() {
        let source = FixtureProfileSource::bundled().unwrap();
        for variant in [TemplateVariant::General, TemplateVariant::Research] {
            let report = crate::render::render_profile(source.fixture(variant), variant);
            assert_eq!(
                report.outcome,
                crate::render::RenderOutcome::Complete,
                "{variant:?} fixture: {:?}",
                report.issues
            );
        }
    }

    #[tokio::test]
    async fn test_generate_ignores_role_and_description() {
        let source = FixtureProfileSource::bundled().unwrap();
        let mut other = request(TemplateVariant::Research);
        other.role = "Astronaut".to_string();

        let a = source.generate(&request(TemplateVariant::Research)).await.unwrap();
        let b = source.generate(&other).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(&a, source.fixture(TemplateVariant::Research));
    }

    #[test]
    fn test_from_dir_reads_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("general.json"),
            r#"{"personalInfo": {"firstName": "Ada"}, "skills": ["Rust"]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("research.json"), r#"{"skills": []}"#).unwrap();

        let source = FixtureProfileSource::from_dir(dir.path()).unwrap();
        let general = source.fixture(TemplateVariant::General);
        assert_eq!(
            general.personal_info.as_ref().unwrap().first_name.as_deref(),
            Some("Ada")
        );
    }

    #[test]
    fn test_from_dir_reports_missing_and_malformed_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FixtureProfileSource::from_dir(dir.path()),
            Err(FixtureError::Io { .. })
        ));

        std::fs::write(dir.path().join("general.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("research.json"), "{}").unwrap();
        assert!(matches!(
            FixtureProfileSource::from_dir(dir.path()),
            Err(FixtureError::Parse { .. })
        ));
    }
}
