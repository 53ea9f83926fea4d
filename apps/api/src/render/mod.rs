// Render pipeline: Profile + variant -> DocumentPlan -> {PDF bytes, LaTeX text}.
// Layout and PDF serialization are CPU-bound and run inside tokio::task::spawn_blocking.

pub mod artifacts;
pub mod dates;
pub mod handlers;
pub mod latex;
pub mod pdf;
pub mod plan;

use std::str::FromStr;

use bytes::Bytes;
use serde::Serialize;
use tracing::{error, warn};

use crate::layout::composer::compose;
use crate::layout::font_metrics::{default_page_config, FontFamily, PageConfig};
use crate::models::profile::{PersonalInfo, Profile};
use crate::render::plan::{build_plan, SectionKind};

// ────────────────────────────────────────────────────────────────────────────
// Template variant
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    General,
    Research,
}

impl TemplateVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateVariant::General => "general",
            TemplateVariant::Research => "research",
        }
    }

    /// Body face of the PDF output; headings use the bold face of the same family.
    pub fn body_font(self) -> FontFamily {
        match self {
            TemplateVariant::General => FontFamily::Helvetica,
            TemplateVariant::Research => FontFamily::TimesRoman,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown template variant '{0}' (expected general or research)")]
pub struct UnknownVariant(pub String);

impl FromStr for TemplateVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" | "developer" | "balanced" => Ok(TemplateVariant::General),
            "research" | "researcher" => Ok(TemplateVariant::Research),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Render result types
// ────────────────────────────────────────────────────────────────────────────

/// A tolerated problem found while rendering. `section`/`entry` locate it when known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderIssue {
    pub section: Option<SectionKind>,
    pub entry: Option<usize>,
    pub message: String,
}

impl RenderIssue {
    pub fn header(message: &str) -> Self {
        Self {
            section: None,
            entry: None,
            message: message.to_string(),
        }
    }

    pub fn entry(section: SectionKind, entry: usize, message: String) -> Self {
        Self {
            section: Some(section),
            entry: Some(entry),
            message,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            section: None,
            entry: None,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOutcome {
    /// Every field rendered.
    Complete,
    /// Artifacts were produced but some fields were skipped or shown raw.
    Partial,
    /// No artifacts were produced.
    Failed,
}

/// The (document, template source) pair for one render call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderArtifact {
    pub variant: TemplateVariant,
    pub latex: String,
    #[serde(skip)]
    pub pdf: Bytes,
    pub pdf_filename: String,
    pub latex_filename: String,
    pub page_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderReport {
    pub outcome: RenderOutcome,
    pub issues: Vec<RenderIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<RenderArtifact>,
}

impl RenderReport {
    fn failed(issues: Vec<RenderIssue>) -> Self {
        Self {
            outcome: RenderOutcome::Failed,
            issues,
            artifact: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Renders `profile` with the default page geometry for `variant`.
pub fn render_profile(profile: &Profile, variant: TemplateVariant) -> RenderReport {
    render_with_config(profile, variant, &default_page_config(variant.body_font()))
}

/// Best-effort render: malformed fields become issues, only a layout failure is `Failed`.
pub fn render_with_config(
    profile: &Profile,
    variant: TemplateVariant,
    config: &PageConfig,
) -> RenderReport {
    let (plan, mut issues) = build_plan(profile, variant);
    for issue in &issues {
        warn!(
            variant = variant.as_str(),
            section = ?issue.section,
            entry = ?issue.entry,
            "render issue: {}",
            issue.message
        );
    }

    let pages = match compose(&plan, config) {
        Ok(pages) => pages,
        Err(e) => {
            error!(variant = variant.as_str(), "layout failed: {e}");
            issues.push(RenderIssue::failure(e.to_string()));
            return RenderReport::failed(issues);
        }
    };

    let latex = latex::render_latex(&plan);
    let pdf = pdf::write_pdf(&pages, config, &plan.header.name);
    let personal_info = profile.personal_info.as_ref();

    let artifact = RenderArtifact {
        variant,
        latex,
        pdf,
        pdf_filename: download_filename(personal_info, "pdf"),
        latex_filename: download_filename(personal_info, "tex"),
        page_count: pages.len(),
    };

    RenderReport {
        outcome: if issues.is_empty() {
            RenderOutcome::Complete
        } else {
            RenderOutcome::Partial
        },
        issues,
        artifact: Some(artifact),
    }
}

/// Runs `render_profile` on the blocking pool. A panic inside the pipeline becomes `Failed`.
pub async fn render_profile_blocking(profile: Profile, variant: TemplateVariant) -> RenderReport {
    match tokio::task::spawn_blocking(move || render_profile(&profile, variant)).await {
        Ok(report) => report,
        Err(e) => {
            error!(variant = variant.as_str(), "render task failed: {e}");
            RenderReport::failed(vec![RenderIssue::failure(format!(
                "render task failed: {e}"
            ))])
        }
    }
}

/// `"{firstName}_{lastName}.{ext}"`, `Resume` standing in for a missing first name.
/// Whitespace runs become a single underscore; control characters are dropped and path or
/// quoting characters (`"`, `\`, `/`) become underscores.
pub fn download_filename(personal_info: Option<&PersonalInfo>, ext: &str) -> String {
    let pick = |value: Option<&String>| {
        value
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let first = pick(personal_info.and_then(|p| p.first_name.as_ref()))
        .unwrap_or_else(|| "Resume".to_string());
    let last = pick(personal_info.and_then(|p| p.last_name.as_ref())).unwrap_or_default();

    let raw = format!("{first}_{last}.{ext}");
    let mut name = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                name.push('_');
            }
            in_whitespace = true;
        } else if c.is_control() {
            continue;
        } else {
            name.push(match c {
                '"' | '\\' | '/' => '_',
                other => other,
            });
            in_whitespace = false;
        }
    }
    name
}

/// `Content-Disposition` value for a download. Non-ASCII names keep an ASCII `filename`
/// fallback and carry the real name in an RFC 6266 `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{filename}\"");
    }
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::WorkEntry;
    use serde_json::json;

    fn jane() -> Profile {
        serde_json::from_value(json!({
            "personalInfo": { "firstName": "Jane", "lastName": "Doe" },
            "skills": ["Python"],
            "academic": [],
            "workEx": [],
            "projects": []
        }))
        .unwrap()
    }

    // ── variant selector ────────────────────────────────────────────────────

    #[test]
    fn test_variant_aliases() {
        assert_eq!("general".parse::<TemplateVariant>(), Ok(TemplateVariant::General));
        assert_eq!("developer".parse::<TemplateVariant>(), Ok(TemplateVariant::General));
        assert_eq!("Balanced".parse::<TemplateVariant>(), Ok(TemplateVariant::General));
        assert_eq!("research".parse::<TemplateVariant>(), Ok(TemplateVariant::Research));
        assert_eq!("researcher".parse::<TemplateVariant>(), Ok(TemplateVariant::Research));
        assert!("academic".parse::<TemplateVariant>().is_err());
    }

    // ── end-to-end ──────────────────────────────────────────────────────────

    #[test]
    fn test_skills_only_profile_end_to_end() {
        let report = render_profile(&jane(), TemplateVariant::General);
        assert_eq!(report.outcome, RenderOutcome::Complete);
        assert!(report.issues.is_empty());

        let artifact = report.artifact.unwrap();
        assert!(artifact.latex.contains("\\section{Skills}\nPython \\\\\n"));
        for heading in ["Education", "Work Experience", "Projects"] {
            assert!(
                !artifact.latex.contains(&format!("\\section{{{heading}}}")),
                "unexpected {heading} heading"
            );
        }
        assert_eq!(artifact.pdf_filename, "Jane_Doe.pdf");
        assert_eq!(artifact.latex_filename, "Jane_Doe.tex");
        assert_eq!(artifact.page_count, 1);
        assert!(artifact.pdf.starts_with(b"%PDF-1.4"));
    }

    #[test]
    fn test_research_partition_end_to_end() {
        let mut profile = jane();
        profile.work_ex = vec![
            WorkEntry {
                company: Some("Lab".to_string()),
                position: Some("Research Assistant".to_string()),
                kind: Some("research".to_string()),
                ..Default::default()
            },
            WorkEntry {
                company: Some("Shop".to_string()),
                position: Some("Clerk".to_string()),
                ..Default::default()
            },
        ];
        let report = render_profile(&profile, TemplateVariant::Research);
        let latex = report.artifact.unwrap().latex;

        let research = latex.split("\\section{Research Experience}").nth(1).unwrap();
        let research = research.split("\\section{").next().unwrap();
        assert_eq!(research.matches("\\resumeSubheading").count(), 1);
        assert!(research.contains("{Research Assistant}"));

        let other = latex.split("\\section{Other Experience}").nth(1).unwrap();
        let other = other.split("\\section{").next().unwrap();
        assert_eq!(other.matches("\\resumeSubheading").count(), 1);
        assert!(other.contains("{Clerk}"));
    }

    #[test]
    fn test_render_is_byte_identical() {
        let mut profile = jane();
        profile.work_ex.push(WorkEntry {
            company: Some("Acme".to_string()),
            position: Some("Engineer".to_string()),
            start_date: Some("2021-03-01".to_string()),
            description: Some("Did work.".to_string()),
            ..Default::default()
        });
        for variant in [TemplateVariant::General, TemplateVariant::Research] {
            let first = render_profile(&profile, variant).artifact.unwrap();
            let second = render_profile(&profile, variant).artifact.unwrap();
            assert_eq!(first.latex, second.latex);
            assert_eq!(first.pdf, second.pdf);
        }
    }

    #[test]
    fn test_bad_date_yields_partial() {
        let mut profile = jane();
        profile.work_ex.push(WorkEntry {
            position: Some("Engineer".to_string()),
            start_date: Some("the nineties".to_string()),
            ..Default::default()
        });
        let report = render_profile(&profile, TemplateVariant::General);
        assert_eq!(report.outcome, RenderOutcome::Partial);
        assert_eq!(report.issues.len(), 1);
        assert!(report
            .artifact
            .unwrap()
            .latex
            .contains("the nineties - Present"));
    }

    #[test]
    fn test_layout_failure_yields_failed_without_artifact() {
        let mut profile = jane();
        profile.work_ex = (0..40)
            .map(|i| WorkEntry {
                position: Some(format!("Role {i}")),
                description: Some("Long description of duties. ".repeat(10)),
                ..Default::default()
            })
            .collect();
        let mut config = default_page_config(FontFamily::Helvetica);
        config.max_pages = 1;

        let report = render_with_config(&profile, TemplateVariant::General, &config);
        assert_eq!(report.outcome, RenderOutcome::Failed);
        assert!(report.artifact.is_none());
        assert_eq!(report.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_blocking_wrapper_matches_sync_render() {
        let sync = render_profile(&jane(), TemplateVariant::Research);
        let blocking = render_profile_blocking(jane(), TemplateVariant::Research).await;
        assert_eq!(sync, blocking);
    }

    #[test]
    fn test_rendered_pdf_contains_name() {
        let report = render_profile(&jane(), TemplateVariant::General);
        let pdf = report.artifact.unwrap().pdf;
        let text = pdf_extract::extract_text_from_mem(&pdf).unwrap();
        assert!(text.contains("Jane"), "extracted: {text:?}");
        assert!(text.contains("Python"), "extracted: {text:?}");
    }

    // ── filenames ───────────────────────────────────────────────────────────

    #[test]
    fn test_download_filename() {
        let info = PersonalInfo {
            first_name: Some("Mary Ann".to_string()),
            last_name: Some("van  Dyke".to_string()),
            ..Default::default()
        };
        assert_eq!(download_filename(Some(&info), "pdf"), "Mary_Ann_van_Dyke.pdf");
        assert_eq!(download_filename(None, "tex"), "Resume_.tex");

        let last_only = PersonalInfo {
            last_name: Some("Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(download_filename(Some(&last_only), "pdf"), "Resume_Doe.pdf");
    }

    #[test]
    fn test_download_filename_strips_unsafe_characters() {
        let info = PersonalInfo {
            first_name: Some("Ja\"ne".to_string()),
            last_name: Some("D\u{1}o/e\\".to_string()),
            ..Default::default()
        };
        assert_eq!(download_filename(Some(&info), "pdf"), "Ja_ne_Do_e_.pdf");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("Jane_Doe.pdf"),
            "attachment; filename=\"Jane_Doe.pdf\""
        );
        assert_eq!(
            content_disposition("Zoë_Doe.pdf"),
            "attachment; filename=\"Zo__Doe.pdf\"; filename*=UTF-8''Zo%C3%AB_Doe.pdf"
        );
    }
}
