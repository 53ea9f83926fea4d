//! Profile — the résumé content a render consumes.
//!
//! Mirrors the camelCase document the web client edits. Every field is optional and
//! lists tolerate `null`, so a half-filled form still deserializes; presence is
//! resolved by the render plan, never by the model.

use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub personal_info: Option<PersonalInfo>,
    #[serde(deserialize_with = "null_as_default")]
    pub academic: Vec<AcademicEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub work_ex: Vec<WorkEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub skills: Vec<Skill>,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: Vec<CertificationEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub achievements: Vec<AchievementEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub publications: Vec<PublicationEntry>,
    #[serde(deserialize_with = "null_as_default")]
    pub interests: Vec<InterestGroup>,
    pub socials: Option<Socials>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicEntry {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub grade: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkEntry {
    pub company: Option<String>,
    pub position: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_current: bool,
    pub description: Option<String>,
    /// Free-form tag; only the exact value `"research"` routes an entry to research experience.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub location: Option<String>,
}

impl WorkEntry {
    pub fn is_research(&self) -> bool {
        self.kind.as_deref() == Some("research")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub technologies_used: Vec<String>,
    pub project_link: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_open_source: bool,
}

/// A skill is either a bare name or a `{name, category}` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Skill {
    Name(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        category: Option<String>,
    },
}

impl Skill {
    pub fn name(&self) -> Option<&str> {
        match self {
            Skill::Name(name) => Some(name.as_str()),
            Skill::Detailed { name, .. } => name.as_deref(),
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Skill::Name(_) => None,
            Skill::Detailed { category, .. } => category.as_deref(),
        }
    }
}

impl From<&str> for Skill {
    fn from(name: &str) -> Self {
        Skill::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationEntry {
    pub name: Option<String>,
    pub issuing_organization: Option<String>,
    pub issue_date: Option<String>,
    pub expiration_date: Option<String>,
    pub credential_id: Option<String>,
    #[serde(rename = "credentialURL")]
    pub credential_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub issuer: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublicationEntry {
    pub title: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterestGroup {
    pub category: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Socials {
    pub linked_in: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub medium: Option<String>,
    pub stack_overflow: Option<String>,
    pub leetcode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_profile_deserializes_with_empty_lists() {
        let profile: Profile = serde_json::from_value(json!({
            "personalInfo": { "firstName": "Jane", "lastName": "Doe" },
            "skills": ["Python"],
            "academic": [],
            "workEx": [],
            "projects": []
        }))
        .unwrap();

        let info = profile.personal_info.as_ref().unwrap();
        assert_eq!(info.first_name.as_deref(), Some("Jane"));
        assert_eq!(profile.skills, vec![Skill::Name("Python".to_string())]);
        assert!(profile.certifications.is_empty());
        assert!(profile.socials.is_none());
    }

    #[test]
    fn test_null_lists_are_treated_as_empty() {
        let profile: Profile = serde_json::from_value(json!({
            "academic": null,
            "workEx": null,
            "skills": null
        }))
        .unwrap();
        assert!(profile.academic.is_empty());
        assert!(profile.work_ex.is_empty());
        assert!(profile.skills.is_empty());
    }

    #[test]
    fn test_work_entry_type_tag_and_current_flag() {
        let entry: WorkEntry = serde_json::from_value(json!({
            "company": "Lab",
            "position": "Research Assistant",
            "type": "research",
            "isCurrent": null
        }))
        .unwrap();
        assert!(entry.is_research());
        assert!(!entry.is_current);

        let other = WorkEntry {
            kind: Some("Research".to_string()),
            ..Default::default()
        };
        assert!(!other.is_research(), "tag match is exact");
    }

    #[test]
    fn test_skill_accepts_string_and_object_forms() {
        let skills: Vec<Skill> = serde_json::from_value(json!([
            "Rust",
            { "name": "PyTorch", "category": "ML" },
            { "category": "Orphan" }
        ]))
        .unwrap();

        assert_eq!(skills[0].name(), Some("Rust"));
        assert_eq!(skills[0].category(), None);
        assert_eq!(skills[1].name(), Some("PyTorch"));
        assert_eq!(skills[1].category(), Some("ML"));
        assert_eq!(skills[2].name(), None);
    }

    #[test]
    fn test_certification_url_field_name() {
        let cert: CertificationEntry = serde_json::from_value(json!({
            "name": "CKA",
            "credentialURL": "https://example.org/verify/1"
        }))
        .unwrap();
        assert_eq!(
            cert.credential_url.as_deref(),
            Some("https://example.org/verify/1")
        );

        let value = serde_json::to_value(&cert).unwrap();
        assert!(value.get("credentialURL").is_some());
    }
}
