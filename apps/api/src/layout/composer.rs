//! Layout pass — turns a `DocumentPlan` into pages of positioned draw commands.
//!
//! Every block is reduced to a list of lines before it is placed, so the pass can decide
//! pagination up front: a block that fits on a fresh page is never split, and a section
//! heading always shares a page with its first block. Coordinates are millimetres from
//! the top-left corner; the PDF backend flips them into PDF user space.

use serde::Serialize;
use thiserror::Error;

use crate::layout::font_metrics::{get_metrics, FontFamily, PageConfig};
use crate::render::plan::{DocumentPlan, Entry, Group, Section, SectionContent, SectionKind};

// ────────────────────────────────────────────────────────────────────────────
// Draw commands
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const INK: Rgb = Rgb(0, 0, 0);
pub const ACCENT: Rgb = Rgb(70, 108, 247);
pub const HEADING: Rgb = Rgb(43, 58, 103);
pub const MUTED: Rgb = Rgb(100, 116, 139);
pub const BODY: Rgb = Rgb(51, 65, 85);

const NAME_SIZE_PT: f32 = 18.0;
const HEADING_SIZE_PT: f32 = 14.0;
const TITLE_SIZE_PT: f32 = 12.0;
const BODY_SIZE_PT: f32 = 10.0;

const NAME_Y_MM: f32 = 20.0;
const CONTACT_Y_MM: f32 = 30.0;
const SOCIALS_Y_MM: f32 = 35.0;
const CONTENT_START_Y_MM: f32 = 45.0;

const RULE_OFFSET_MM: f32 = 3.0;
const RULE_WIDTH_MM: f32 = 0.5;
const HEADING_ADVANCE_MM: f32 = 8.0;
const ENTRY_GAP_MM: f32 = 5.0;
const COMPACT_ENTRY_GAP_MM: f32 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawCommand {
    /// A single line of text; `y_mm` is the baseline.
    Text {
        x_mm: f32,
        y_mm: f32,
        font: FontFamily,
        size_pt: f32,
        color: Rgb,
        text: String,
    },
    /// A horizontal rule.
    Rule {
        x1_mm: f32,
        x2_mm: f32,
        y_mm: f32,
        width_mm: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    pub commands: Vec<DrawCommand>,
}

impl Page {
    /// Text of every text command on the page, in drawing order.
    #[cfg(test)]
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            DrawCommand::Rule { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("document needs more than {limit} pages")]
    PageLimit { limit: usize },
}

// ────────────────────────────────────────────────────────────────────────────
// Compose
// ────────────────────────────────────────────────────────────────────────────

/// Lays the plan out onto pages. Fails only when the page limit is exceeded.
pub fn compose(plan: &DocumentPlan, config: &PageConfig) -> Result<Vec<Page>, LayoutError> {
    let mut cursor = Cursor::new(config);
    cursor.header(plan);

    for section in &plan.sections {
        let blocks = section_blocks(section, config);
        let first_height = blocks.first().map(Block::height).unwrap_or(0.0);

        cursor.ensure_room(HEADING_ADVANCE_MM + first_height)?;
        cursor.heading(section.heading());

        for block in &blocks {
            cursor.place(block)?;
        }
    }

    Ok(cursor.finish())
}

/// One line of a block, placed at the cursor's current y.
#[derive(Debug, Clone)]
struct Line {
    font: FontFamily,
    size_pt: f32,
    color: Rgb,
    text: String,
    /// Advance applied after the line is drawn.
    advance_mm: f32,
}

#[derive(Debug, Clone, Default)]
struct Block {
    lines: Vec<Line>,
    /// Vertical gap after the block.
    gap_mm: f32,
}

impl Block {
    fn height(&self) -> f32 {
        self.lines.iter().map(|l| l.advance_mm).sum::<f32>()
    }

    fn push_wrapped(&mut self, text: &str, font: FontFamily, color: Rgb, config: &PageConfig) {
        for text in get_metrics(font).wrap(text, BODY_SIZE_PT, config.content_width_mm) {
            self.lines.push(Line {
                font,
                size_pt: BODY_SIZE_PT,
                color,
                text,
                advance_mm: config.line_height_mm,
            });
        }
    }
}

fn section_blocks(section: &Section, config: &PageConfig) -> Vec<Block> {
    let gap_mm = match section.kind {
        SectionKind::Certifications | SectionKind::Achievements | SectionKind::Awards => {
            COMPACT_ENTRY_GAP_MM
        }
        _ => ENTRY_GAP_MM,
    };

    match &section.content {
        SectionContent::Entries(entries) => entries
            .iter()
            .map(|entry| entry_block(entry, gap_mm, config))
            .collect(),
        SectionContent::Groups(groups) => vec![groups_block(groups, config)],
    }
}

fn entry_block(entry: &Entry, gap_mm: f32, config: &PageConfig) -> Block {
    let mut block = Block {
        lines: Vec::new(),
        gap_mm,
    };

    // Titles may wrap too; each wrapped title line keeps the title face.
    for text in get_metrics(config.heading_font).wrap(
        &entry.title,
        TITLE_SIZE_PT,
        config.content_width_mm,
    ) {
        block.lines.push(Line {
            font: config.heading_font,
            size_pt: TITLE_SIZE_PT,
            color: INK,
            text,
            advance_mm: config.line_height_mm,
        });
    }

    if let Some(meta) = entry.meta_line() {
        block.push_wrapped(&meta, config.body_font, MUTED, config);
    }
    for fact in &entry.facts {
        block.push_wrapped(&fact.line(), config.body_font, BODY, config);
    }
    if let Some(description) = &entry.description {
        block.push_wrapped(description, config.body_font, BODY, config);
    }
    if let Some(link) = &entry.link {
        let line = format!("{}: {}", link.label, link.url);
        block.push_wrapped(&line, config.body_font, MUTED, config);
    }
    block
}

fn groups_block(groups: &[Group], config: &PageConfig) -> Block {
    let mut block = Block {
        lines: Vec::new(),
        gap_mm: ENTRY_GAP_MM,
    };
    for group in groups {
        let items = group.items.join(", ");
        let text = match &group.label {
            Some(label) => format!("{label}: {items}"),
            None => items,
        };
        block.push_wrapped(&text, config.body_font, BODY, config);
    }
    block
}

// ────────────────────────────────────────────────────────────────────────────
// Cursor
// ────────────────────────────────────────────────────────────────────────────

struct Cursor<'a> {
    config: &'a PageConfig,
    pages: Vec<Page>,
    current: Page,
    y: f32,
}

impl<'a> Cursor<'a> {
    fn new(config: &'a PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: Page::default(),
            y: CONTENT_START_Y_MM,
        }
    }

    fn header(&mut self, plan: &DocumentPlan) {
        let header = &plan.header;
        if !header.name.is_empty() {
            self.centered(&header.name, self.config.heading_font, NAME_SIZE_PT, NAME_Y_MM);
        }

        let contact = header.contact_items();
        if !contact.is_empty() {
            self.centered(
                &contact.join(" | "),
                self.config.body_font,
                BODY_SIZE_PT,
                CONTACT_Y_MM,
            );
        }

        let socials = header.social_items();
        if !socials.is_empty() {
            self.centered(
                &socials.join(" | "),
                self.config.body_font,
                BODY_SIZE_PT,
                SOCIALS_Y_MM,
            );
        }
        self.y = CONTENT_START_Y_MM;
    }

    fn centered(&mut self, text: &str, font: FontFamily, size_pt: f32, y_mm: f32) {
        let width = get_metrics(font).width_mm(text, size_pt);
        let x_mm = ((self.config.page_width_mm - width) / 2.0).max(self.config.margin_left_mm);
        self.current.commands.push(DrawCommand::Text {
            x_mm,
            y_mm,
            font,
            size_pt,
            color: INK,
            text: text.to_string(),
        });
    }

    fn heading(&mut self, heading: &str) {
        let rule_y = self.y - RULE_OFFSET_MM;
        self.current.commands.push(DrawCommand::Rule {
            x1_mm: self.config.margin_left_mm,
            x2_mm: self.config.margin_left_mm + self.config.content_width_mm,
            y_mm: rule_y,
            width_mm: RULE_WIDTH_MM,
            color: ACCENT,
        });
        self.current.commands.push(DrawCommand::Text {
            x_mm: self.config.margin_left_mm,
            y_mm: self.y,
            font: self.config.heading_font,
            size_pt: HEADING_SIZE_PT,
            color: HEADING,
            text: heading.to_string(),
        });
        self.y += HEADING_ADVANCE_MM;
    }

    /// Places a block, moving to a fresh page first when the whole block would fit there.
    fn place(&mut self, block: &Block) -> Result<(), LayoutError> {
        self.ensure_room(block.height())?;
        for line in &block.lines {
            if self.y > self.config.bottom_mm {
                self.new_page()?;
            }
            self.current.commands.push(DrawCommand::Text {
                x_mm: self.config.margin_left_mm,
                y_mm: self.y,
                font: line.font,
                size_pt: line.size_pt,
                color: line.color,
                text: line.text.clone(),
            });
            self.y += line.advance_mm;
        }
        self.y += block.gap_mm;
        Ok(())
    }

    /// Breaks the page unless `height` fits below the cursor or could not fit on any page.
    fn ensure_room(&mut self, height: f32) -> Result<(), LayoutError> {
        let last_baseline = self.y + height - self.config.line_height_mm;
        let fresh_capacity = self.config.bottom_mm - self.config.top_mm + self.config.line_height_mm;
        if last_baseline > self.config.bottom_mm && height <= fresh_capacity {
            self.new_page()?;
        }
        Ok(())
    }

    fn new_page(&mut self) -> Result<(), LayoutError> {
        if self.pages.len() + 1 >= self.config.max_pages {
            return Err(LayoutError::PageLimit {
                limit: self.config.max_pages,
            });
        }
        self.pages.push(std::mem::take(&mut self.current));
        self.y = self.config.top_mm;
        Ok(())
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);
        self.pages
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::default_page_config;
    use crate::models::profile::{PersonalInfo, Profile, Skill, WorkEntry};
    use crate::render::plan::build_plan;
    use crate::render::TemplateVariant;

    fn jane() -> Profile {
        Profile {
            personal_info: Some(PersonalInfo {
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                email: Some("jane@example.org".to_string()),
                ..Default::default()
            }),
            skills: vec![Skill::from("Python")],
            ..Default::default()
        }
    }

    fn busy_profile(jobs: usize) -> Profile {
        let mut profile = jane();
        profile.work_ex = (0..jobs)
            .map(|i| WorkEntry {
                company: Some(format!("Company {i}")),
                position: Some("Engineer".to_string()),
                start_date: Some("2020-01-01".to_string()),
                description: Some("Shipped things that mattered to customers. ".repeat(8)),
                ..Default::default()
            })
            .collect();
        profile
    }

    fn layout(profile: &Profile) -> Result<Vec<Page>, LayoutError> {
        let (plan, _) = build_plan(profile, TemplateVariant::General);
        compose(&plan, &default_page_config(FontFamily::Helvetica))
    }

    // ── content ─────────────────────────────────────────────────────────────

    #[test]
    fn test_skills_only_profile_fits_one_page() {
        let pages = layout(&jane()).unwrap();
        assert_eq!(pages.len(), 1);

        let texts: Vec<&str> = pages[0].texts().collect();
        assert_eq!(texts[0], "Jane Doe");
        assert!(texts.contains(&"jane@example.org"));
        assert!(texts.contains(&"Skills"));
        assert!(texts.contains(&"Python"));
        assert!(!texts.contains(&"Education"));
        assert!(!texts.contains(&"Work Experience"));
    }

    #[test]
    fn test_heading_is_drawn_below_its_rule() {
        let pages = layout(&jane()).unwrap();
        let rule_y = pages[0]
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Rule { y_mm, color, .. } => {
                    assert_eq!(*color, ACCENT);
                    Some(*y_mm)
                }
                _ => None,
            })
            .unwrap();
        assert_eq!(rule_y, CONTENT_START_Y_MM - RULE_OFFSET_MM);
    }

    // ── pagination ──────────────────────────────────────────────────────────

    #[test]
    fn test_long_profile_paginates_within_bounds() {
        let config = default_page_config(FontFamily::Helvetica);
        let pages = layout(&busy_profile(20)).unwrap();
        assert!(pages.len() > 1);

        for page in &pages {
            for cmd in &page.commands {
                if let DrawCommand::Text { y_mm, .. } = cmd {
                    assert!(*y_mm <= config.bottom_mm, "baseline {y_mm} below limit");
                }
            }
        }
        let entry_titles = pages
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| *t == "Engineer")
            .count();
        assert_eq!(entry_titles, 20, "no entry may be lost across page breaks");
    }

    #[test]
    fn test_heading_never_ends_a_page() {
        let pages = layout(&busy_profile(14)).unwrap();
        for page in &pages {
            if let Some(DrawCommand::Text { size_pt, .. }) = page.commands.last() {
                assert_ne!(*size_pt, HEADING_SIZE_PT, "orphaned section heading");
            }
        }
    }

    #[test]
    fn test_page_limit_is_an_error() {
        let (plan, _) = build_plan(&busy_profile(30), TemplateVariant::General);
        let mut config = default_page_config(FontFamily::Helvetica);
        config.max_pages = 2;

        assert_eq!(
            compose(&plan, &config),
            Err(LayoutError::PageLimit { limit: 2 })
        );
    }

    #[test]
    fn test_layout_is_deterministic() {
        let profile = busy_profile(5);
        assert_eq!(layout(&profile).unwrap(), layout(&profile).unwrap());
    }
}
