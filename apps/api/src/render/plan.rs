//! Document plan — the declarative description both render backends consume.
//!
//! `build_plan` resolves every optional profile field exactly once: it decides which
//! sections exist, in what order, and what text each entry carries. The PDF layout pass
//! and the LaTeX templates only format what the plan holds, so they cannot disagree on
//! which sections or entries appear.
//!
//! A section with nothing to show is never planned; no backend can emit an empty heading.

use serde::Serialize;

use crate::models::profile::{
    AcademicEntry, AchievementEntry, CertificationEntry, InterestGroup, Profile, ProjectEntry,
    PublicationEntry, Skill, WorkEntry,
};
use crate::render::dates::DateFormatter;
use crate::render::{RenderIssue, TemplateVariant};

// ────────────────────────────────────────────────────────────────────────────
// Plan types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Education,
    Experience,
    ResearchExperience,
    OtherExperience,
    Projects,
    Presentations,
    Publications,
    Skills,
    SpecializedSkills,
    Certifications,
    Achievements,
    Awards,
    Interests,
}

impl SectionKind {
    pub fn heading(self) -> &'static str {
        match self {
            SectionKind::Education => "Education",
            SectionKind::Experience => "Work Experience",
            SectionKind::ResearchExperience => "Research Experience",
            SectionKind::OtherExperience => "Other Experience",
            SectionKind::Projects => "Projects",
            SectionKind::Presentations => "Research Presentations",
            SectionKind::Publications => "Publications",
            SectionKind::Skills => "Skills",
            SectionKind::SpecializedSkills => "Specialized Skills",
            SectionKind::Certifications => "Certifications",
            SectionKind::Achievements => "Achievements",
            SectionKind::Awards => "Awards & Honors",
            SectionKind::Interests => "Other Interests",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentPlan {
    pub variant: TemplateVariant,
    pub header: Header,
    pub sections: Vec<Section>,
}

impl DocumentPlan {
    #[cfg(test)]
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }
}

/// Name and contact details, already trimmed; blank values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Header {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub linked_in: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

impl Header {
    /// `email | phone | city, state`; city and state only when both are known.
    pub fn contact_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        items.extend(self.email.clone());
        items.extend(self.phone.clone());
        if let (Some(city), Some(state)) = (&self.city, &self.state) {
            items.push(format!("{city}, {state}"));
        }
        items
    }

    pub fn social_items(&self) -> Vec<String> {
        let mut items = Vec::new();
        if let Some(url) = &self.linked_in {
            items.push(format!("LinkedIn: {url}"));
        }
        if let Some(url) = &self.github {
            items.push(format!("GitHub: {url}"));
        }
        if let Some(url) = &self.website {
            items.push(format!("Website: {url}"));
        }
        items
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub content: SectionContent,
}

impl Section {
    pub fn heading(&self) -> &'static str {
        self.kind.heading()
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[Entry] {
        match &self.content {
            SectionContent::Entries(entries) => entries,
            SectionContent::Groups(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "items", rename_all = "snake_case")]
pub enum SectionContent {
    Entries(Vec<Entry>),
    Groups(Vec<Group>),
}

/// One block: bold title, muted metadata, wrapped body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Entry {
    pub title: String,
    pub organization: Option<String>,
    pub dates: Option<String>,
    pub location: Option<String>,
    pub facts: Vec<Fact>,
    pub description: Option<String>,
    pub link: Option<Link>,
}

impl Entry {
    /// `organization | dates | location`, or `None` when none is known.
    pub fn meta_line(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.organization.as_deref(),
            self.dates.as_deref(),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    pub label: &'static str,
    pub value: String,
}

impl Fact {
    pub fn line(&self) -> String {
        format!("{}: {}", self.label, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub label: &'static str,
    pub url: String,
}

/// A labelled list (skills by category, interests). An unlabelled group renders as a bare list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub label: Option<String>,
    pub items: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

const DEFAULT_SKILL_CATEGORY: &str = "General";
const DEFAULT_INTEREST_CATEGORY: &str = "Interests";

/// Resolves a profile into the plan for `variant`, collecting every tolerated problem.
///
/// Entries keep the order they have in the profile; nothing is sorted or deduplicated.
pub fn build_plan(profile: &Profile, variant: TemplateVariant) -> (DocumentPlan, Vec<RenderIssue>) {
    let mut builder = PlanBuilder::default();
    let header = builder.header(profile);

    let sections = match variant {
        TemplateVariant::General => vec![
            builder.entries(SectionKind::Education, &profile.academic, |b, e| {
                b.education(e, false)
            }),
            builder.entries(SectionKind::Experience, &profile.work_ex, PlanBuilder::work),
            builder.entries(SectionKind::Projects, &profile.projects, PlanBuilder::project),
            builder.flat_skills(&profile.skills),
            builder.entries(
                SectionKind::Certifications,
                &profile.certifications,
                PlanBuilder::certification,
            ),
            builder.entries(
                SectionKind::Achievements,
                &profile.achievements,
                PlanBuilder::achievement,
            ),
            builder.entries(
                SectionKind::Publications,
                &profile.publications,
                PlanBuilder::publication,
            ),
        ],
        TemplateVariant::Research => {
            let (research, other): (Vec<&WorkEntry>, Vec<&WorkEntry>) =
                profile.work_ex.iter().partition(|w| w.is_research());
            vec![
                builder.entries(SectionKind::Education, &profile.academic, |b, e| {
                    b.education(e, true)
                }),
                builder.entries(SectionKind::ResearchExperience, &research, |b, w| b.work(w)),
                builder.entries(SectionKind::OtherExperience, &other, |b, w| b.work(w)),
                builder.entries(
                    SectionKind::Presentations,
                    &profile.projects,
                    PlanBuilder::project,
                ),
                builder.entries(
                    SectionKind::Publications,
                    &profile.publications,
                    PlanBuilder::publication,
                ),
                builder.entries(
                    SectionKind::Awards,
                    &profile.achievements,
                    PlanBuilder::achievement,
                ),
                builder.grouped_skills(&profile.skills),
                builder.interests(&profile.interests),
            ]
        }
    };

    let plan = DocumentPlan {
        variant,
        header,
        sections: sections.into_iter().flatten().collect(),
    };
    (plan, builder.issues)
}

#[derive(Default)]
struct PlanBuilder {
    dates: DateFormatter,
    issues: Vec<RenderIssue>,
}

impl PlanBuilder {
    fn header(&mut self, profile: &Profile) -> Header {
        let info = profile.personal_info.clone().unwrap_or_default();
        let address = info.address.clone().unwrap_or_default();
        let socials = profile.socials.clone().unwrap_or_default();

        let name = [clean(&info.first_name), clean(&info.last_name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.issues.push(RenderIssue::header("profile has no name"));
        }

        Header {
            name,
            email: clean(&info.email),
            phone: clean(&info.phone),
            street: clean(&address.street),
            city: clean(&address.city),
            state: clean(&address.state),
            zip_code: clean(&address.zip_code),
            linked_in: clean(&socials.linked_in),
            github: clean(&socials.github),
            website: clean(&socials.website),
        }
    }

    /// Builds an entry section; entries that resolve to nothing are reported and skipped.
    fn entries<T>(
        &mut self,
        kind: SectionKind,
        source: &[T],
        build: impl Fn(&mut Self, &T) -> Option<Entry>,
    ) -> Option<Section> {
        let mut entries = Vec::with_capacity(source.len());
        for (index, item) in source.iter().enumerate() {
            let entry = build(self, item);
            for err in self.dates.take_errors() {
                self.issues
                    .push(RenderIssue::entry(kind, index, err.to_string()));
            }
            match entry {
                Some(entry) => entries.push(entry),
                None => self.issues.push(RenderIssue::entry(
                    kind,
                    index,
                    "entry has no title and was skipped".to_string(),
                )),
            }
        }

        if entries.is_empty() {
            None
        } else {
            Some(Section {
                kind,
                content: SectionContent::Entries(entries),
            })
        }
    }

    fn education(&mut self, edu: &AcademicEntry, institution_first: bool) -> Option<Entry> {
        let course = match (clean(&edu.degree), clean(&edu.field_of_study)) {
            (Some(degree), Some(field)) => Some(format!("{degree} in {field}")),
            (degree, field) => degree.or(field),
        };
        let institution = clean(&edu.institution);

        let (title, organization) = if institution_first {
            (institution.clone().or(course.clone())?, institution.and(course))
        } else {
            (course.clone().or(institution.clone())?, course.and(institution))
        };

        let mut facts = Vec::new();
        if let Some(grade) = clean(&edu.grade) {
            facts.push(Fact {
                label: "Grade",
                value: grade,
            });
        }

        Some(Entry {
            title,
            organization,
            dates: self.dates.range(
                edu.start_date.as_deref(),
                edu.end_date.as_deref(),
                false,
            ),
            location: clean(&edu.location),
            facts,
            description: clean(&edu.description),
            link: None,
        })
    }

    fn work(&mut self, work: &WorkEntry) -> Option<Entry> {
        let position = clean(&work.position);
        let company = clean(&work.company);
        let (title, organization) = match position {
            Some(position) => (position, company),
            None => (company?, None),
        };

        Some(Entry {
            title,
            organization,
            dates: self.dates.range(
                work.start_date.as_deref(),
                work.end_date.as_deref(),
                work.is_current,
            ),
            location: clean(&work.location),
            facts: Vec::new(),
            description: clean(&work.description),
            link: None,
        })
    }

    fn project(&mut self, project: &ProjectEntry) -> Option<Entry> {
        let title = clean(&project.title)?;
        let technologies: Vec<&str> = project
            .technologies_used
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();

        let mut facts = Vec::new();
        if !technologies.is_empty() {
            facts.push(Fact {
                label: "Technologies",
                value: technologies.join(", "),
            });
        }

        Some(Entry {
            title,
            organization: None,
            dates: self.dates.range(
                project.start_date.as_deref(),
                project.end_date.as_deref(),
                false,
            ),
            location: None,
            facts,
            description: clean(&project.description),
            link: clean(&project.project_link).map(|url| Link {
                label: "Project Link",
                url,
            }),
        })
    }

    fn certification(&mut self, cert: &CertificationEntry) -> Option<Entry> {
        let title = clean(&cert.name)?;
        let mut facts = Vec::new();
        if let Some(id) = clean(&cert.credential_id) {
            facts.push(Fact {
                label: "Credential ID",
                value: id,
            });
        }

        Some(Entry {
            title,
            organization: clean(&cert.issuing_organization),
            dates: self.dates.range(
                cert.issue_date.as_deref(),
                cert.expiration_date.as_deref(),
                false,
            ),
            location: None,
            facts,
            description: None,
            link: clean(&cert.credential_url).map(|url| Link {
                label: "Credential",
                url,
            }),
        })
    }

    fn achievement(&mut self, achievement: &AchievementEntry) -> Option<Entry> {
        Some(Entry {
            title: clean(&achievement.title)?,
            organization: clean(&achievement.issuer),
            dates: self.dates.single(achievement.date.as_deref()),
            location: None,
            facts: Vec::new(),
            description: clean(&achievement.description),
            link: None,
        })
    }

    fn publication(&mut self, publication: &PublicationEntry) -> Option<Entry> {
        Some(Entry {
            title: clean(&publication.title)?,
            organization: clean(&publication.publisher),
            dates: self.dates.single(publication.publication_date.as_deref()),
            location: None,
            facts: Vec::new(),
            description: clean(&publication.description),
            link: clean(&publication.link).map(|url| Link { label: "Link", url }),
        })
    }

    fn skill_names<'a>(
        &mut self,
        kind: SectionKind,
        skills: &'a [Skill],
    ) -> Vec<(&'a Skill, String)> {
        let mut named = Vec::with_capacity(skills.len());
        for (index, skill) in skills.iter().enumerate() {
            match skill.name().map(str::trim).filter(|n| !n.is_empty()) {
                Some(name) => named.push((skill, name.to_string())),
                None => self.issues.push(RenderIssue::entry(
                    kind,
                    index,
                    "skill has no name and was skipped".to_string(),
                )),
            }
        }
        named
    }

    fn flat_skills(&mut self, skills: &[Skill]) -> Option<Section> {
        let items: Vec<String> = self
            .skill_names(SectionKind::Skills, skills)
            .into_iter()
            .map(|(_, name)| name)
            .collect();
        if items.is_empty() {
            return None;
        }
        Some(Section {
            kind: SectionKind::Skills,
            content: SectionContent::Groups(vec![Group { label: None, items }]),
        })
    }

    /// Groups skills by category in order of each category's first appearance.
    fn grouped_skills(&mut self, skills: &[Skill]) -> Option<Section> {
        let mut groups: Vec<Group> = Vec::new();
        for (skill, name) in self.skill_names(SectionKind::SpecializedSkills, skills) {
            let category = skill
                .category()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_SKILL_CATEGORY);

            match groups
                .iter_mut()
                .find(|g| g.label.as_deref() == Some(category))
            {
                Some(group) => group.items.push(name),
                None => groups.push(Group {
                    label: Some(category.to_string()),
                    items: vec![name],
                }),
            }
        }

        if groups.is_empty() {
            None
        } else {
            Some(Section {
                kind: SectionKind::SpecializedSkills,
                content: SectionContent::Groups(groups),
            })
        }
    }

    fn interests(&mut self, interests: &[InterestGroup]) -> Option<Section> {
        let groups: Vec<Group> = interests
            .iter()
            .filter_map(|group| {
                let items: Vec<String> = group
                    .items
                    .iter()
                    .map(|i| i.trim())
                    .filter(|i| !i.is_empty())
                    .map(str::to_string)
                    .collect();
                if items.is_empty() {
                    return None;
                }
                let label = clean(&group.category)
                    .unwrap_or_else(|| DEFAULT_INTEREST_CATEGORY.to_string());
                Some(Group {
                    label: Some(label),
                    items,
                })
            })
            .collect();

        if groups.is_empty() {
            None
        } else {
            Some(Section {
                kind: SectionKind::Interests,
                content: SectionContent::Groups(groups),
            })
        }
    }
}

/// Trims a field; blank strings count as missing.
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
