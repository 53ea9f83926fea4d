//! Dialogue controller — the linear two-question intake script.
//!
//! ```text
//! AwaitingRole ──input──▶ AwaitingDescription ──input──▶ Analyzing ──complete──▶ Complete
//!                                                          │  ▲
//!                                              failure     │  │ retry (attempts left)
//!                                                          ▼  │
//!                                                   Failed (budget spent)
//! any non-terminal stage ──cancel──▶ Cancelled
//! ```
//!
//! The controller is synchronous and owns nothing but its transcript; the session layer
//! decides when analysis succeeds or fails and reports back through `complete` and
//! `record_failure`.

use serde::Serialize;

use crate::models::profile::Profile;
use crate::render::TemplateVariant;

pub const GREETING: &str =
    "Hi! I'm your resume builder assistant. Please enter the job role you're applying for:";
pub const ASK_DESCRIPTION: &str = "Great! Now please paste the job description:";
pub const GENERATION_ERROR: &str =
    "Sorry, there was an error generating your resume. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueStage {
    AwaitingRole,
    AwaitingDescription,
    Analyzing,
    Complete,
    Failed,
    Cancelled,
}

impl DialogueStage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DialogueStage::Complete | DialogueStage::Failed | DialogueStage::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }
}

/// Result of one dialogue step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Nothing changed: blank input, or input the current stage does not accept.
    Ignored,
    Advanced { stage: DialogueStage },
    /// Analysis failed and will be attempted again.
    Retrying { attempt: u32 },
    /// Analysis failed and the attempt budget is spent.
    Failed,
}

/// What the analysis step needs to produce a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    pub role: String,
    pub description: String,
    pub variant: TemplateVariant,
}

#[derive(Debug, Clone)]
pub struct DialogueController {
    variant: TemplateVariant,
    stage: DialogueStage,
    role: Option<String>,
    description: Option<String>,
    transcript: Vec<Message>,
    failed_attempts: u32,
    max_attempts: u32,
}

impl DialogueController {
    pub fn new(variant: TemplateVariant, max_attempts: u32) -> Self {
        Self {
            variant,
            stage: DialogueStage::AwaitingRole,
            role: None,
            description: None,
            transcript: vec![Message::bot(GREETING)],
            failed_attempts: 0,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn stage(&self) -> DialogueStage {
        self.stage
    }

    pub fn variant(&self) -> TemplateVariant {
        self.variant
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Accepts user input. Blank input and input outside the two question stages are no-ops.
    pub fn submit(&mut self, input: &str) -> StepOutcome {
        let input = input.trim();
        if input.is_empty() {
            return StepOutcome::Ignored;
        }

        match self.stage {
            DialogueStage::AwaitingRole => {
                self.transcript.push(Message::user(input));
                self.role = Some(input.to_string());
                self.transcript.push(Message::bot(ASK_DESCRIPTION));
                self.advance(DialogueStage::AwaitingDescription)
            }
            DialogueStage::AwaitingDescription => {
                self.transcript.push(Message::user(input));
                self.description = Some(input.to_string());
                self.transcript.push(Message::bot(format!(
                    "Thanks! Analyzing your profile for a {} position...",
                    self.role.as_deref().unwrap_or_default()
                )));
                self.advance(DialogueStage::Analyzing)
            }
            _ => StepOutcome::Ignored,
        }
    }

    /// The collected intake, available once the controller is analyzing.
    pub fn intake(&self) -> Option<IntakeRequest> {
        if self.stage != DialogueStage::Analyzing {
            return None;
        }
        Some(IntakeRequest {
            role: self.role.clone()?,
            description: self.description.clone()?,
            variant: self.variant,
        })
    }

    /// Records a failed analysis attempt and reports whether another is allowed.
    pub fn record_failure(&mut self) -> StepOutcome {
        if self.stage != DialogueStage::Analyzing {
            return StepOutcome::Ignored;
        }
        self.failed_attempts += 1;
        self.transcript.push(Message::bot(GENERATION_ERROR));

        if self.failed_attempts >= self.max_attempts {
            self.stage = DialogueStage::Failed;
            StepOutcome::Failed
        } else {
            StepOutcome::Retrying {
                attempt: self.failed_attempts + 1,
            }
        }
    }

    /// Announces the findings for `profile` and enters `Complete`.
    pub fn complete(&mut self, profile: &Profile) -> StepOutcome {
        if self.stage != DialogueStage::Analyzing {
            return StepOutcome::Ignored;
        }
        let role = self.role.clone().unwrap_or_default();
        let announcements = [
            "Identifying relevant skills for this position...".to_string(),
            format!(
                "I found {} relevant skills for this position.",
                profile.skills.len()
            ),
            "Identifying relevant projects for this position...".to_string(),
            format!(
                "I found {} relevant projects for this position.",
                profile.projects.len()
            ),
            "Identifying relevant work experience...".to_string(),
            format!(
                "I found {} relevant work experiences for this position.",
                profile.work_ex.len()
            ),
            "Generating a tailored summary for your resume...".to_string(),
            format!(
                "Your resume is ready! I've created a tailored resume that highlights your \
                 relevant skills and experience for this {role} position. You can view it in \
                 the preview panel and download it as a PDF."
            ),
        ];
        self.transcript
            .extend(announcements.into_iter().map(Message::bot));
        self.advance(DialogueStage::Complete)
    }

    /// Moves any non-terminal controller to `Cancelled`.
    pub fn cancel(&mut self) -> StepOutcome {
        if self.stage.is_terminal() {
            return StepOutcome::Ignored;
        }
        self.advance(DialogueStage::Cancelled)
    }

    fn advance(&mut self, stage: DialogueStage) -> StepOutcome {
        tracing::debug!(from = ?self.stage, to = ?stage, "dialogue transition");
        self.stage = stage;
        StepOutcome::Advanced { stage }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
