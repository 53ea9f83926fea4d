//! LaTeX backend — fills one of two fixed document skeletons from a `DocumentPlan`.
//!
//! Every user-supplied string goes through `escape_latex` (or `escape_url` for link targets)
//! before it is interpolated; the skeleton text itself is the only raw LaTeX in the output.

use crate::render::plan::{DocumentPlan, Entry, Group, Header, Section, SectionContent, SectionKind};
use crate::render::TemplateVariant;

/// Escapes text for use in LaTeX body text and macro arguments.
///
/// Line breaks collapse to spaces so an argument never contains a paragraph break.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            // Braced so a `\\` before the text never reads it as an optional length.
            '[' => out.push_str("{[}"),
            ']' => out.push_str("{]}"),
            '$' => out.push_str("\\$"),
            '&' => out.push_str("\\&"),
            '#' => out.push_str("\\#"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            '\n' | '\r' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

/// Escapes a URL for the first argument of `\href`.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len() + 4);
    for c in url.trim().chars() {
        match c {
            '\\' => out.push_str("\\%5C"),
            '{' => out.push_str("\\%7B"),
            '}' => out.push_str("\\%7D"),
            ' ' => out.push_str("\\%20"),
            '%' => out.push_str("\\%"),
            '#' => out.push_str("\\#"),
            other => out.push(other),
        }
    }
    out
}

/// Renders the complete LaTeX document for the plan's variant.
pub fn render_latex(plan: &DocumentPlan) -> String {
    match plan.variant {
        TemplateVariant::General => general_document(plan),
        TemplateVariant::Research => research_document(plan),
    }
}

fn href(url: &str, label: &str) -> String {
    format!("\\href{{{}}}{{{}}}", escape_url(url), escape_latex(label))
}

fn strip_scheme(url: &str) -> &str {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
}

// ────────────────────────────────────────────────────────────────────────────
// General skeleton
// ────────────────────────────────────────────────────────────────────────────

const GENERAL_PREAMBLE: &str = r"\documentclass[letterpaper,11pt]{article}

\usepackage[empty]{fullpage}
\usepackage{xcolor}
\usepackage{geometry}
\usepackage[hidelinks]{hyperref}
\usepackage{fontawesome5}
\usepackage{titlesec}
\usepackage{enumitem}
\usepackage{tabularx}

% Document settings
\geometry{left=0.6in,right=0.6in,top=0.5in,bottom=0.5in}
\pagestyle{empty}
\raggedbottom
\raggedright
\setlength{\tabcolsep}{0pt}
\setlength{\parindent}{0pt}

% Colors
\definecolor{primary}{RGB}{52, 73, 94}
\definecolor{accent}{RGB}{41, 128, 185}
\definecolor{heading}{RGB}{44, 62, 80}
\definecolor{sectionline}{RGB}{211, 211, 211}
\definecolor{bodytext}{RGB}{50, 50, 50}

% Section formatting
\titleformat{\section}
  {\color{heading}\scshape\Large}
  {}{0em}
  {}
  [{\color{sectionline}\titlerule[0.8pt]}]
\titlespacing*{\section}{0pt}{10pt}{6pt}

% Name and contact line
\newcommand{\name}[1]{{\Huge\bfseries\color{primary}#1}\vspace{2pt}}
\newcommand{\contact}[1]{
  \begin{center}
    #1
  \end{center}
  \vspace{-8pt}
}

% Entry title with dates on the right
\newcommand{\datedentry}[2]{
  \noindent\begin{tabularx}{\textwidth}{X r}
    {\bfseries#1} & {\color{accent}\small#2} \\
  \end{tabularx}
}

% Entry with organization line and body
\newcommand{\resumeentry}[4]{
  \datedentry{#1}{#2}
  {\itshape#3}\\
  #4\vspace{6pt}
}

% Labelled list
\newcommand{\skills}[2]{
  \textbf{#1}: #2 \\
}

\begin{document}
\color{bodytext}
";

fn general_document(plan: &DocumentPlan) -> String {
    let mut doc = String::from(GENERAL_PREAMBLE);
    let header = &plan.header;

    doc.push_str("\n% Header\n\\begin{center}\n");
    doc.push_str(&format!("  \\name{{{}}}\n", escape_latex(&header.name)));
    doc.push_str("\\end{center}\n");

    let contact = general_contact_items(header);
    if !contact.is_empty() {
        doc.push_str(&format!(
            "\\contact{{{}}}\n",
            contact.join(" \\hspace{1cm} ")
        ));
    }

    for section in &plan.sections {
        doc.push_str(&format!(
            "\n% {}\n\\section{{{}}}\n",
            section.heading(),
            escape_latex(section.heading())
        ));
        match (&section.content, section.kind) {
            (SectionContent::Entries(entries), SectionKind::Achievements) => {
                doc.push_str("\\begin{itemize}[leftmargin=15pt, itemsep=2pt]\n");
                for entry in entries {
                    doc.push_str(&general_achievement(entry));
                }
                doc.push_str("\\end{itemize}\n");
            }
            (SectionContent::Entries(entries), _) => {
                for entry in entries {
                    doc.push_str(&general_entry(entry));
                }
            }
            (SectionContent::Groups(groups), _) => {
                for group in groups {
                    doc.push_str(&general_group(group));
                }
            }
        }
    }

    doc.push_str("\n\\end{document}\n");
    doc
}

fn general_contact_items(header: &Header) -> Vec<String> {
    let mut items = Vec::new();
    if let Some(email) = &header.email {
        items.push(format!(
            "\\href{{mailto:{}}}{{\\faEnvelope\\ {}}}",
            escape_url(email),
            escape_latex(email)
        ));
    }
    if let Some(phone) = &header.phone {
        items.push(format!("\\faPhone\\ {}", escape_latex(phone)));
    }
    let socials = [
        (&header.website, "\\faGlobe"),
        (&header.linked_in, "\\faLinkedin"),
        (&header.github, "\\faGithub"),
    ];
    for (url, icon) in socials {
        if let Some(url) = url {
            items.push(format!(
                "\\href{{{}}}{{{icon}\\ {}}}",
                escape_url(url),
                escape_latex(strip_scheme(url))
            ));
        }
    }
    items
}

fn general_entry(entry: &Entry) -> String {
    let mut body: Vec<String> = entry
        .facts
        .iter()
        .map(|fact| escape_latex(&fact.line()))
        .collect();
    if let Some(description) = &entry.description {
        body.push(escape_latex(description));
    }
    if let Some(link) = &entry.link {
        body.push(href(&link.url, link.label));
    }

    let organization = [entry.organization.as_deref(), entry.location.as_deref()]
        .into_iter()
        .flatten()
        .map(escape_latex)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\n\\resumeentry\n{{{}}}\n{{{}}}\n{{{}}}\n{{{}}}\n",
        escape_latex(&entry.title),
        escape_latex(entry.dates.as_deref().unwrap_or_default()),
        organization,
        body.join(" \\\\\n"),
    )
}

fn general_achievement(entry: &Entry) -> String {
    let mut item = format!("    \\item \\textbf{{{}}}", escape_latex(&entry.title));
    if let Some(date) = &entry.dates {
        item.push_str(&format!(" ({})", escape_latex(date)));
    }
    if let Some(issuer) = &entry.organization {
        item.push_str(&format!(", {}", escape_latex(issuer)));
    }
    if let Some(description) = &entry.description {
        item.push_str(&format!(": {}", escape_latex(description)));
    }
    item.push('\n');
    item
}

fn general_group(group: &Group) -> String {
    let items = group
        .items
        .iter()
        .map(|i| escape_latex(i))
        .collect::<Vec<_>>()
        .join(", ");
    match &group.label {
        Some(label) => format!("\\skills{{{}}}{{{items}}}\n", escape_latex(label)),
        None => format!("{items} \\\\\n"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Research skeleton
// ────────────────────────────────────────────────────────────────────────────

const RESEARCH_PREAMBLE: &str = r"\documentclass[letterpaper,11pt]{article}

\usepackage{latexsym}
\usepackage[empty]{fullpage}
\usepackage{titlesec}
\usepackage{marvosym}
\usepackage[usenames,dvipsnames]{color}
\usepackage{verbatim}
\usepackage{enumitem}
\usepackage[hidelinks]{hyperref}
\usepackage{fancyhdr}
\usepackage[english]{babel}
\usepackage{tabularx}
\usepackage{multicol}
\input{glyphtounicode}

\usepackage{baskervillef}
\usepackage[T1]{fontenc}

\pagestyle{fancy}
\fancyhf{}
\fancyfoot{}
\setlength{\footskip}{10pt}
\renewcommand{\headrulewidth}{0pt}
\renewcommand{\footrulewidth}{0pt}

\addtolength{\topmargin}{0.2in}

\urlstyle{same}

\raggedright
\setlength{\tabcolsep}{0in}

\titleformat{\section}{
  \it\vspace{3pt}
}{}{0em}{}[\color{black}\titlerule\vspace{-5pt}]

\pdfgentounicode=1

\newcommand{\resumeItem}[1]{
  \item{
    {#1 \vspace{-4pt}}
  }
}

\newcommand{\resumeSubheading}[4]{
  \vspace{-2pt}\item
    \begin{tabular*}{0.97\textwidth}[t]{l@{\extracolsep{\fill}}r}
      \textbf{#1} & #2 \\
      \textit{\small #3} & \textit{\small #4} \\
    \end{tabular*}\vspace{-10pt}
}

\renewcommand\labelitemii{$\vcenter{\hbox{\tiny$\bullet$}}$}
\newcommand{\resumeSubHeadingListStart}{\begin{itemize}[leftmargin=0.15in, label={}]}
\newcommand{\resumeSubHeadingListEnd}{\end{itemize}}
\newcommand{\resumeItemListStart}{\begin{itemize}}
\newcommand{\resumeItemListEnd}{\end{itemize}\vspace{-2pt}}

\begin{document}
";

const PRESENTATION_SUMMARY_CHARS: usize = 100;

fn research_document(plan: &DocumentPlan) -> String {
    let mut doc = String::from(RESEARCH_PREAMBLE);
    doc.push_str(&research_header(&plan.header));

    for section in &plan.sections {
        doc.push_str(&format!(
            "\n%-----------{}-----------\n\\section{{{}}}\n",
            section.heading().to_uppercase(),
            escape_latex(section.heading())
        ));
        doc.push_str(&research_section(section));
    }

    doc.push_str("\n\\end{document}\n");
    doc
}

fn research_header(header: &Header) -> String {
    let mut left = Vec::new();
    if let Some(street) = &header.street {
        left.push(format!("    \\large{{{}}} \\\\\n", escape_latex(street)));
    }
    let locality = [header.city.as_deref(), header.state.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ");
    let locality = [Some(locality.as_str()), header.zip_code.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !locality.is_empty() {
        left.push(format!("    \\large{{{}}} \\\\\n", escape_latex(&locality)));
    }

    let mut right = Vec::new();
    if let Some(website) = &header.website {
        right.push(format!(
            "    \\href{{{}}}{{\\large{{{}}}}} \\\\\n",
            escape_url(website),
            escape_latex(strip_scheme(website))
        ));
    }
    if let Some(email) = &header.email {
        right.push(format!(
            "    \\href{{mailto:{}}}{{\\large{{{}}}}} \\\\\n",
            escape_url(email),
            escape_latex(email)
        ));
    }

    let mut out = String::from("\n\\begin{center}\n");
    out.push_str(&format!(
        "    {{\\LARGE {}}} \\\\ \\vspace{{0pt}}\n",
        escape_latex(&header.name)
    ));
    if !left.is_empty() || !right.is_empty() {
        out.push_str("    \\begin{multicols}{2}\n    \\begin{flushleft}\n");
        out.push_str(&left.concat());
        out.push_str("    \\end{flushleft}\n\n    \\begin{flushright}\n");
        out.push_str(&right.concat());
        out.push_str("    \\end{flushright}\n    \\end{multicols}\n");
    }
    out.push_str("\\end{center}\n");
    out
}

fn research_section(section: &Section) -> String {
    match (&section.content, section.kind) {
        (SectionContent::Entries(entries), SectionKind::Presentations) => {
            let lines: String = entries.iter().map(presentation_line).collect();
            plain_list(&lines)
        }
        (SectionContent::Entries(entries), SectionKind::Awards) => {
            let items: String = entries
                .iter()
                .map(|entry| {
                    subheading(
                        &entry.title,
                        "",
                        entry.organization.as_deref().unwrap_or_default(),
                        entry.dates.as_deref().unwrap_or_default(),
                    )
                })
                .collect();
            format!("\\resumeSubHeadingListStart\n{items}\\resumeSubHeadingListEnd\n")
        }
        (SectionContent::Entries(entries), _) => {
            let items: String = entries.iter().map(research_entry).collect();
            format!("\\resumeSubHeadingListStart\n{items}\\resumeSubHeadingListEnd\n")
        }
        (SectionContent::Groups(groups), _) => {
            let lines: String = groups
                .iter()
                .map(|group| {
                    let items = group
                        .items
                        .iter()
                        .map(|i| escape_latex(i))
                        .collect::<Vec<_>>()
                        .join(", ");
                    match &group.label {
                        Some(label) => {
                            format!("     \\textbf{{{}}}{{: {items}}} \\\\\n", escape_latex(label))
                        }
                        None => format!("     {items} \\\\\n"),
                    }
                })
                .collect();
            plain_list(&lines)
        }
    }
}

fn plain_list(lines: &str) -> String {
    format!(
        "\\begin{{itemize}}[leftmargin=0.15in, label={{}}]\n    \\normalsize{{\\item{{\n{lines}    }}}}\n \\end{{itemize}}\n"
    )
}

fn subheading(title: &str, dates: &str, organization: &str, location: &str) -> String {
    format!(
        "    \\resumeSubheading\n      {{{}}}{{{}}}\n      {{{}}}{{{}}}\n",
        escape_latex(title),
        escape_latex(dates),
        escape_latex(organization),
        escape_latex(location)
    )
}

fn research_entry(entry: &Entry) -> String {
    let mut out = subheading(
        &entry.title,
        entry.dates.as_deref().unwrap_or_default(),
        entry.organization.as_deref().unwrap_or_default(),
        entry.location.as_deref().unwrap_or_default(),
    );

    let mut items: Vec<String> = entry
        .facts
        .iter()
        .map(|fact| escape_latex(&fact.line()))
        .collect();
    if let Some(description) = &entry.description {
        items.push(escape_latex(description));
    }
    if let Some(link) = &entry.link {
        items.push(href(&link.url, link.label));
    }

    // An empty itemize is a LaTeX error, so the item list only exists when it has items.
    if !items.is_empty() {
        out.push_str("      \\resumeItemListStart\n");
        for item in items {
            out.push_str(&format!("        \\small\\resumeItem{{{item}}}\n"));
        }
        out.push_str("      \\resumeItemListEnd\n");
    }
    out
}

fn presentation_line(entry: &Entry) -> String {
    let title = escape_latex(&entry.title);
    match &entry.description {
        Some(description) => {
            let summary: String = description.chars().take(PRESENTATION_SUMMARY_CHARS).collect();
            let ellipsis = if description.chars().count() > PRESENTATION_SUMMARY_CHARS {
                "..."
            } else {
                ""
            };
            format!(
                "    {{{title} -- {}{ellipsis}}} \\\\\n",
                escape_latex(&summary)
            )
        }
        None => format!("    {{{title}}} \\\\\n"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{
        AchievementEntry, PersonalInfo, Profile, ProjectEntry, Skill, Socials, WorkEntry,
    };
    use crate::render::plan::build_plan;

    fn jane() -> Profile {
        Profile {
            personal_info: Some(PersonalInfo {
                first_name: Some("Jane".to_string()),
                last_name: Some("Doe".to_string()),
                ..Default::default()
            }),
            skills: vec![Skill::from("Python")],
            ..Default::default()
        }
    }

    fn latex(profile: &Profile, variant: TemplateVariant) -> String {
        render_latex(&build_plan(profile, variant).0)
    }

    fn count_environments(doc: &str, env: &str) -> (usize, usize) {
        (
            doc.matches(&format!("\\begin{{{env}}}")).count(),
            doc.matches(&format!("\\end{{{env}}}")).count(),
        )
    }

    // ── escaping ────────────────────────────────────────────────────────────

    #[test]
    fn test_escape_latex_specials() {
        assert_eq!(
            escape_latex("R&D 100% #1 $5 a_b {x} ~ ^"),
            "R\\&D 100\\% \\#1 \\$5 a\\_b \\{x\\} \\textasciitilde{} \\textasciicircum{}"
        );
        assert_eq!(escape_latex("C:\\path"), "C:\\textbackslash{}path");
        assert_eq!(escape_latex("line one\nline two"), "line one line two");
    }

    #[test]
    fn test_escape_latex_brackets() {
        assert_eq!(escape_latex("[x]"), "{[}x{]}");
    }

    #[test]
    fn test_bracketed_text_after_line_break() {
        let mut profile = jane();
        profile.projects.push(ProjectEntry {
            title: Some("Toy compiler".to_string()),
            description: Some("[Open source] A toy compiler".to_string()),
            technologies_used: vec!["Rust".to_string()],
            ..Default::default()
        });
        profile.work_ex.push(WorkEntry {
            company: Some("Acme".to_string()),
            position: Some("Engineer".to_string()),
            description: Some("[Remote] Built things".to_string()),
            ..Default::default()
        });

        for variant in [TemplateVariant::General, TemplateVariant::Research] {
            let doc = latex(&profile, variant);
            assert!(!doc.contains("[Open source]"), "{variant:?}");
            assert!(!doc.contains("[Remote]"), "{variant:?}");
            assert!(doc.contains("{[}Remote{]} Built things"), "{variant:?}");
        }
        assert!(latex(&profile, TemplateVariant::General)
            .contains("Rust \\\\\n{[}Open source{]} A toy compiler"));
    }

    #[test]
    fn test_escape_url() {
        assert_eq!(
            escape_url("https://example.org/a b#frag?q=50%"),
            "https://example.org/a\\%20b\\#frag?q=50\\%"
        );
    }

    #[test]
    fn test_user_text_is_never_raw() {
        let mut profile = jane();
        profile.projects.push(ProjectEntry {
            title: Some("100% \\input{/etc/passwd}".to_string()),
            ..Default::default()
        });
        let doc = latex(&profile, TemplateVariant::General);
        assert!(!doc.contains("\\input{/etc/passwd}"));
        assert!(doc.contains("100\\% \\textbackslash{}input\\{/etc/passwd\\}"));
    }

    // ── general skeleton ────────────────────────────────────────────────────

    #[test]
    fn test_general_skills_only() {
        let doc = latex(&jane(), TemplateVariant::General);
        assert!(doc.starts_with("\\documentclass"));
        assert!(doc.trim_end().ends_with("\\end{document}"));
        assert!(doc.contains("\\name{Jane Doe}"));
        assert!(doc.contains("\\section{Skills}\nPython \\\\\n"));
        assert!(!doc.contains("\\section{Education}"));
        assert!(!doc.contains("\\section{Work Experience}"));
        assert!(!doc.contains("\\section{Projects}"));
    }

    #[test]
    fn test_general_achievements_use_one_list() {
        let mut profile = jane();
        profile.achievements = vec![
            AchievementEntry {
                title: Some("Winner".to_string()),
                date: Some("2022-05-01".to_string()),
                ..Default::default()
            },
            AchievementEntry {
                title: Some("Speaker".to_string()),
                ..Default::default()
            },
        ];
        let doc = latex(&profile, TemplateVariant::General);
        assert!(doc.contains("\\item \\textbf{Winner} (May 2022)\n"));
        assert!(doc.contains("\\item \\textbf{Speaker}\n"));
        assert_eq!(count_environments(&doc, "itemize"), (1, 1));
    }

    #[test]
    fn test_general_contact_line() {
        let mut profile = jane();
        profile.socials = Some(Socials {
            github: Some("https://github.com/janedoe".to_string()),
            ..Default::default()
        });
        let doc = latex(&profile, TemplateVariant::General);
        assert!(doc.contains("\\href{https://github.com/janedoe}{\\faGithub\\ github.com/janedoe}"));
    }

    // ── research skeleton ───────────────────────────────────────────────────

    #[test]
    fn test_research_sections_and_balanced_lists() {
        let mut profile = jane();
        profile.work_ex = vec![
            WorkEntry {
                company: Some("Vision Lab".to_string()),
                position: Some("Research Assistant".to_string()),
                kind: Some("research".to_string()),
                description: Some("Studied things.".to_string()),
                ..Default::default()
            },
            WorkEntry {
                company: Some("Cafe".to_string()),
                position: Some("Barista".to_string()),
                ..Default::default()
            },
        ];
        profile.achievements.push(AchievementEntry {
            title: Some("Best Paper".to_string()),
            issuer: Some("NeurIPS".to_string()),
            ..Default::default()
        });

        let doc = latex(&profile, TemplateVariant::Research);
        assert!(doc.contains("\\usepackage{baskervillef}"));
        assert!(doc.contains("\\section{Research Experience}"));
        assert!(doc.contains("\\section{Other Experience}"));
        assert!(doc.contains("\\section{Awards \\& Honors}"));
        assert!(doc.contains("\\section{Specialized Skills}"));
        assert!(doc.contains("\\textbf{General}{: Python} \\\\"));
        assert!(doc.contains("{Best Paper}{}\n      {NeurIPS}{}"));

        // The barista entry has no body, so only the research entry opens an item list.
        assert_eq!(doc.matches("\\resumeItemListStart\n").count(), 1);
        assert_eq!(
            doc.matches("\\resumeSubHeadingListStart\n").count(),
            doc.matches("\\resumeSubHeadingListEnd\n").count()
        );
        let (begins, ends) = count_environments(&doc, "itemize");
        assert_eq!(begins, ends);
    }

    #[test]
    fn test_research_presentation_truncates_description() {
        let mut profile = jane();
        profile.projects.push(ProjectEntry {
            title: Some("Talk".to_string()),
            description: Some("x".repeat(150)),
            ..Default::default()
        });
        let doc = latex(&profile, TemplateVariant::Research);
        let expected = format!("{{Talk -- {}...}} \\\\", "x".repeat(100));
        assert!(doc.contains(&expected));
    }

    #[test]
    fn test_latex_is_deterministic() {
        let profile = jane();
        assert_eq!(
            latex(&profile, TemplateVariant::Research),
            latex(&profile, TemplateVariant::Research)
        );
    }
}
