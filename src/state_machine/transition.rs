//! Pure state transition function
//!
//! Given the same state and event, `transition` always produces the same next
//! state and effects. Sending and persistence happen in the runtime.

use super::effect::{ChoiceOption, LeadCapture};
use super::event::{COACH_CHOICE_ID, KNOW_CHOICE_ID};
use super::state::{Attempt, Course, Group, InfoTopic, Mode};
use super::{ConvState, Effect, Event};
use crate::content;

const GREETINGS: [&str; 4] = ["hi", "hello", "menu", "start"];

/// How the flow treated an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Moved to another stage
    Advanced,
    /// Final choice made, lead captured, state reset
    Completed,
    /// Informational reply, state untouched
    Informed,
    /// Free text that is not a greeting
    Nudged,
    /// Valid choice made out of order; user asked to restart
    InvalidSequence,
    /// Choice not recognised at this stage
    Unrecognized,
}

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
    pub disposition: Disposition,
}

impl TransitionResult {
    pub fn new(state: ConvState, disposition: Disposition) -> Self {
        Self {
            new_state: state,
            effects: vec![],
            disposition,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Lead captured by this transition, if any
    #[allow(dead_code)] // Used in tests
    pub fn lead(&self) -> Option<&LeadCapture> {
        self.effects.iter().find_map(|e| match e {
            Effect::RecordLead(lead) => Some(lead),
            _ => None,
        })
    }
}

pub fn is_greeting(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    GREETINGS.contains(&lower.as_str())
}

/// Pure transition function
pub fn transition(state: &ConvState, event: Event) -> TransitionResult {
    match (state, event) {
        // ============================================================
        // Free text
        // ============================================================
        (_, Event::Text { body }) if is_greeting(&body) => {
            TransitionResult::new(ConvState::TopMenu, Disposition::Advanced)
                .with_effect(top_menu())
        }

        (state, Event::Text { .. }) => {
            TransitionResult::new(state.clone(), Disposition::Nudged)
                .with_effect(Effect::text(content::NUDGE))
        }

        // ============================================================
        // Top menu (always available, restarts the chosen branch)
        // ============================================================
        (_, Event::Know) => TransitionResult::new(ConvState::KnowChoice, Disposition::Advanced)
            .with_effect(know_menu()),

        (_, Event::Coach) => {
            TransitionResult::new(ConvState::CourseChoice, Disposition::Advanced)
                .with_effect(course_menu())
        }

        // ============================================================
        // Coaching enquiry
        // ============================================================

        // A course pick restarts the coaching flow from wherever the user is
        (_, Event::CourseChosen(course)) => TransitionResult::new(
            ConvState::AttemptChoice { course },
            Disposition::Advanced,
        )
        .with_effect(attempt_menu()),

        // Attempt needs a course on record; re-picking rewinds later answers
        (
            ConvState::AttemptChoice { course }
            | ConvState::GroupChoice { course, .. }
            | ConvState::ModeChoice { course, .. },
            Event::AttemptChosen(attempt),
        ) => attempt_chosen(*course, attempt),

        (state, Event::AttemptChosen(_)) => invalid_sequence(state),

        (
            ConvState::GroupChoice { course, attempt }
            | ConvState::ModeChoice {
                course,
                attempt,
                group: Some(_),
            },
            Event::GroupChosen(group),
        ) => TransitionResult::new(
            ConvState::ModeChoice {
                course: *course,
                attempt: *attempt,
                group: Some(group),
            },
            Disposition::Advanced,
        )
        .with_effect(mode_menu()),

        (state, Event::GroupChosen(_)) => invalid_sequence(state),

        (
            ConvState::ModeChoice {
                course,
                attempt,
                group,
            },
            Event::ModeChosen(mode),
        ) => TransitionResult::new(ConvState::Idle, Disposition::Completed)
            .with_effect(Effect::RecordLead(LeadCapture {
                course: *course,
                attempt: *attempt,
                group: *group,
                mode,
            }))
            .with_effect(Effect::text(content::mode_features(mode)))
            .with_effect(Effect::text(content::CLOSING_THANKS)),

        (state, Event::ModeChosen(_)) => invalid_sequence(state),

        // ============================================================
        // Informational list
        // ============================================================
        (ConvState::KnowChoice, Event::InfoChosen(topic)) => {
            TransitionResult::new(ConvState::KnowChoice, Disposition::Informed)
                .with_effect(Effect::text(content::info_text(topic)))
        }

        (state, Event::InfoChosen(_) | Event::UnknownChoice { .. }) => {
            TransitionResult::new(state.clone(), Disposition::Unrecognized)
                .with_effect(Effect::text(content::GENERIC_ACK))
        }
    }
}

fn attempt_chosen(course: Course, attempt: Attempt) -> TransitionResult {
    match course {
        Course::FinalTestSeries => TransitionResult::new(
            ConvState::GroupChoice { course, attempt },
            Disposition::Advanced,
        )
        .with_effect(Effect::text(content::test_series_schedule(attempt)))
        .with_effect(group_menu()),
        Course::Intermediate => TransitionResult::new(
            ConvState::GroupChoice { course, attempt },
            Disposition::Advanced,
        )
        .with_effect(group_menu()),
        Course::Foundation => TransitionResult::new(
            ConvState::ModeChoice {
                course,
                attempt,
                group: None,
            },
            Disposition::Advanced,
        )
        .with_effect(mode_menu()),
    }
}

fn invalid_sequence(state: &ConvState) -> TransitionResult {
    TransitionResult::new(state.clone(), Disposition::InvalidSequence)
        .with_effect(Effect::text(content::RESTART_COACHING))
}

// ============================================================
// Menus
// ============================================================

fn top_menu() -> Effect {
    Effect::buttons(
        content::MAIN_MENU_BODY,
        vec![
            ChoiceOption::new(KNOW_CHOICE_ID, content::MAIN_MENU_KNOW),
            ChoiceOption::new(COACH_CHOICE_ID, content::MAIN_MENU_COACH),
        ],
    )
}

fn know_menu() -> Effect {
    Effect::list(
        content::KNOW_HEADER,
        content::KNOW_BODY,
        InfoTopic::ALL
            .iter()
            .map(|t| ChoiceOption::new(t.choice_id(), t.label()))
            .collect(),
    )
}

fn course_menu() -> Effect {
    Effect::buttons(
        content::COURSE_PROMPT,
        Course::ALL
            .iter()
            .map(|c| ChoiceOption::new(c.choice_id(), c.label()))
            .collect(),
    )
}

fn attempt_menu() -> Effect {
    Effect::buttons(
        content::ATTEMPT_PROMPT,
        Attempt::ALL
            .iter()
            .map(|a| ChoiceOption::new(a.choice_id(), a.label()))
            .collect(),
    )
}

fn group_menu() -> Effect {
    Effect::buttons(
        content::GROUP_PROMPT,
        Group::ALL
            .iter()
            .map(|g| ChoiceOption::new(g.choice_id(), g.label()))
            .collect(),
    )
}

fn mode_menu() -> Effect {
    Effect::buttons(
        content::MODE_PROMPT,
        Mode::ALL
            .iter()
            .map(|m| ChoiceOption::new(m.choice_id(), m.label()))
            .collect(),
    )
}
