//! Conversation state types

use serde::{Deserialize, Serialize};

// ============================================================================
// Choice catalog - strongly typed answers for each step of the enquiry
// ============================================================================

/// Course the student is enquiring about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Course {
    #[serde(rename = "FOUNDATION")]
    Foundation,
    #[serde(rename = "INTERMEDIATE")]
    Intermediate,
    #[serde(rename = "FINAL_TS")]
    FinalTestSeries,
}

impl Course {
    pub const ALL: [Course; 3] = [
        Course::Foundation,
        Course::Intermediate,
        Course::FinalTestSeries,
    ];

    /// Choice id carried by the course button
    pub fn choice_id(self) -> &'static str {
        match self {
            Course::Foundation => "COURSE_FOUNDATION",
            Course::Intermediate => "COURSE_INTERMEDIATE",
            Course::FinalTestSeries => "COURSE_FINAL_TS",
        }
    }

    /// Code stored in the enquiry ledger
    pub fn code(self) -> &'static str {
        match self {
            Course::Foundation => "FOUNDATION",
            Course::Intermediate => "INTERMEDIATE",
            Course::FinalTestSeries => "FINAL_TS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Course::Foundation => "CA Foundation",
            Course::Intermediate => "CA Intermediate",
            Course::FinalTestSeries => "Final Test Series",
        }
    }

    /// Foundation has no groups; every other course asks for one
    pub fn requires_group(self) -> bool {
        !matches!(self, Course::Foundation)
    }

    pub fn from_choice_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.choice_id() == id)
    }
}

/// Exam attempt (sitting) the student is targeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attempt {
    #[serde(rename = "SEP")]
    September,
    #[serde(rename = "MAY")]
    May,
    #[serde(rename = "JAN")]
    January,
}

impl Attempt {
    pub const ALL: [Attempt; 3] = [Attempt::September, Attempt::May, Attempt::January];

    pub fn choice_id(self) -> &'static str {
        match self {
            Attempt::September => "ATTEMPT_SEP",
            Attempt::May => "ATTEMPT_MAY",
            Attempt::January => "ATTEMPT_JAN",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Attempt::September => "SEP",
            Attempt::May => "MAY",
            Attempt::January => "JAN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Attempt::September => "September",
            Attempt::May => "May",
            Attempt::January => "January",
        }
    }

    pub fn from_choice_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.choice_id() == id)
    }
}

/// Paper group within a course
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "BOTH")]
    Both,
}

impl Group {
    pub const ALL: [Group; 3] = [Group::One, Group::Two, Group::Both];

    pub fn choice_id(self) -> &'static str {
        match self {
            Group::One => "GROUP_1",
            Group::Two => "GROUP_2",
            Group::Both => "GROUP_BOTH",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Group::One => "1",
            Group::Two => "2",
            Group::Both => "BOTH",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Group::One => "Group 1",
            Group::Two => "Group 2",
            Group::Both => "Both Groups",
        }
    }

    pub fn from_choice_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.choice_id() == id)
    }
}

/// How classes are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "Face to Face")]
    FaceToFace,
    Online,
    Virtual,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::FaceToFace, Mode::Online, Mode::Virtual];

    pub fn choice_id(self) -> &'static str {
        match self {
            Mode::FaceToFace => "MODE_FACE",
            Mode::Online => "MODE_ONLINE",
            Mode::Virtual => "MODE_VIRTUAL",
        }
    }

    /// The ledger stores the mode by its display label
    pub fn label(self) -> &'static str {
        match self {
            Mode::FaceToFace => "Face to Face",
            Mode::Online => "Online",
            Mode::Virtual => "Virtual",
        }
    }

    pub fn from_choice_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.choice_id() == id)
    }
}

/// Entries of the "know about our institute" list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoTopic {
    Social,
    Features,
    Results,
    Contacts,
}

impl InfoTopic {
    pub const ALL: [InfoTopic; 4] = [
        InfoTopic::Social,
        InfoTopic::Features,
        InfoTopic::Results,
        InfoTopic::Contacts,
    ];

    pub fn choice_id(self) -> &'static str {
        match self {
            InfoTopic::Social => "KNOW_SOCIAL",
            InfoTopic::Features => "KNOW_FEATURES",
            InfoTopic::Results => "KNOW_RESULTS",
            InfoTopic::Contacts => "KNOW_CONTACTS",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InfoTopic::Social => "Social Media",
            InfoTopic::Features => "Unique Features",
            InfoTopic::Results => "Results",
            InfoTopic::Contacts => "Important Contacts",
        }
    }

    pub fn from_choice_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.choice_id() == id)
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Position of one user's conversation in the enquiry flow.
///
/// Each variant carries exactly the answers collected so far, so a field
/// cannot be read before the step that produces it has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ConvState {
    /// No flow in progress
    #[default]
    Idle,

    /// Top menu offered (know / coaching)
    TopMenu,

    /// Informational list offered
    KnowChoice,

    /// Waiting for a course pick
    CourseChoice,

    /// Waiting for an attempt pick
    AttemptChoice { course: Course },

    /// Waiting for a group pick (courses with groups only)
    GroupChoice { course: Course, attempt: Attempt },

    /// Waiting for the mode pick that completes the enquiry
    ModeChoice {
        course: Course,
        attempt: Attempt,
        #[serde(default)]
        group: Option<Group>,
    },
}

impl ConvState {
    /// Stage name as exposed to the admin API and logs
    pub fn stage_name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::TopMenu => "top_menu",
            ConvState::KnowChoice => "know_choice",
            ConvState::CourseChoice => "course_choice",
            ConvState::AttemptChoice { .. } => "attempt_choice",
            ConvState::GroupChoice { .. } => "group_choice",
            ConvState::ModeChoice { .. } => "mode_choice",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }

    /// Course on record, if the coaching flow has got that far
    #[allow(dead_code)] // Used in tests
    pub fn course(&self) -> Option<Course> {
        match self {
            ConvState::AttemptChoice { course }
            | ConvState::GroupChoice { course, .. }
            | ConvState::ModeChoice { course, .. } => Some(*course),
            _ => None,
        }
    }
}
