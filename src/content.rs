//! Institute copy shown to users
//!
//! Everything here is passed through the flow as opaque text.

use crate::state_machine::state::{Attempt, InfoTopic, Mode};

pub const INSTITUTE_NAME: &str = "Paras Institute";

pub const MAIN_MENU_BODY: &str =
    "Hi! Thanks for contacting Paras Institute of Commerce.\nHow can we help you?";
pub const MAIN_MENU_KNOW: &str = "Know our Institute";
pub const MAIN_MENU_COACH: &str = "CA Coaching";

pub const KNOW_HEADER: &str = "Know about our Institute";
pub const KNOW_BODY: &str = "Choose one:";

pub const COURSE_PROMPT: &str = "Which course are you looking for?";
pub const ATTEMPT_PROMPT: &str = "Choose your Attempt";
pub const GROUP_PROMPT: &str = "Which Group are you considering?";
pub const MODE_PROMPT: &str = "Which mode of classes are you looking for?";

pub const RESTART_COACHING: &str = "Please start with *CA Coaching* again.";
pub const GENERIC_ACK: &str = "Thanks! How can we help?";
pub const NUDGE: &str = "Please type *Hi* to see options, or share your query directly.";
pub const CLOSING_THANKS: &str =
    "Thanks for contacting Paras Institute. We'll soon connect with you via call.";

const SOCIAL_LINKS: [(&str, &str); 3] = [
    (
        "Instagram",
        "https://www.instagram.com/paras_institute_of_commerce/",
    ),
    (
        "YouTube",
        "https://www.youtube.com/@ParasInstituteofCommercePvtLtd",
    ),
    ("Facebook", "https://www.facebook.com/ParasInstituteIndia"),
];

const UNIQUE_FEATURES: [&str; 12] = [
    "Paras Institute Of Commerce Since 1995",
    "Face to Face, Virtual & Online Classes",
    "30+ Years of Experience in teaching",
    "A Core-competent, Efficient & Dedicated Faculty Team",
    "Monthly Progress Report",
    "Regular Doubt-Clearance Classes",
    "Regular Classes Management",
    "Regular co-ordination with parents",
    "CA Foundation : 60 Chapter wise Tests, 12 Unit Tests and 12 Final Mock Test",
    "CA Intermediate : 70 Chapter wise Tests, 12 Unit Tests and 12 Final Mock Test",
    "CA Final : 16 Unit Tests and 12 Final Mock Tests",
    "Timely Test Checking",
];

const RESULTS_SUMMARY: [&str; 4] = [
    "Excellent performance each year",
    "Paras CA Foundation: 80–90% Result",
    "Paras CA Intermediate: 70–80% Result",
    "80+ All India Rank Holders",
];

const IMPORTANT_CONTACTS: [&str; 6] = [
    "Counselor 1 :            +91 9896162844",
    "Counselor 2 :            +91 9896685777",
    "Counselor 3 :            +91 8199996644",
    "Face to Face Management: +91 8950329505",
    "Online Management:       +91 9253076101",
    "Test Dept:               +91 9034510124",
];

const FACE_TO_FACE_FEATURES: &str = "Face to Face Classes – Key Features:\n\
• 30+ Years of Experience in teaching\n\
• Daily in-class teaching\n\
• Doubt counter & peer study rooms\n\
• Regular tests & evaluation\n\
• Parent coordination & progress reports\n\
• Library & discipline-support on campus\n\
• CA Foundation : 60 Chapter wise Tests, 12 Unit Tests and 12 Final Mock Test\n\
• CA Intermediate : 70 Chapter wise Tests, 12 Unit Tests and 12 Final Mock Test\n\
• CA Final : 16 Unit Tests and 12 Final Mock Tests\n\
• Timely Test Checking\n\
• Individual Attention to Each Student";

const ONLINE_FEATURES: &str = "Online Classes – Key Features:\n\
• Lectures of face to face classes with two way communication between students and teachers.\n\
• Unique teaching pattern with concept clarity from basic to advance.\n\
• Best study material and updated question banks covering all type of questions with 100% coverage of syllabus.\n\
• Chapter wise, Unit wise and Final Test system for complete syllabus.\n\
• Subject wise classes schedule managed by Paras Team on daily basis.\n\
• Regular coordination by Paras management Team Members with students & Parents.\n\
• Daily Home work PDF checking and revision classes.\n\
• Monthly Performance Report and Analysis.\n\
• Daily doubt clearance sessions by faculty.\n\
• Regular work on physical and mental health.";

const VIRTUAL_FEATURES: &str = "Virtual Classes – Key Features:\n\
• Fixed timetable (live virtual)\n\
• Interactive doubt clearing\n\
• Regular tests & mentor guidance\n\
• Parent updates & performance summary\n\
• List of City with Virtual centres of Paras Institute\n\
- Bhiwani                  +919429049069\n\
- Jind                     +919992757534\n\
- Narwana                  +918168188426\n\
- Bathinda                 +917888602120\n\
- Kaithal                  +919097044004\n\
- Rohtak                   +919034869678\n\
- Sirsa                    +919416509909\n\
- Yamunanagar              +917404909400\n\
- Ambala                   +918708824618\n\
- Jaipur                   +918802084656\n\
- Shahdara, Delhi          +919716692702\n\
- Laxmi Nagar, Delhi       +918199996644\n\
- Tohana                   +917988476224\n\
- Sonipat                  +917015755714\n\
- Siliguri                 +919832062876\n\
- Rewari                   +919729827454";

/// Key features of a class mode, sent when the enquiry completes
pub fn mode_features(mode: Mode) -> &'static str {
    match mode {
        Mode::FaceToFace => FACE_TO_FACE_FEATURES,
        Mode::Online => ONLINE_FEATURES,
        Mode::Virtual => VIRTUAL_FEATURES,
    }
}

/// When the Final Test Series runs for an attempt
pub fn test_series_schedule(attempt: Attempt) -> &'static str {
    match attempt {
        Attempt::September => {
            "Test series for September attempt are held during July & August months."
        }
        Attempt::May => "Test series for May attempt are held during March & April months.",
        Attempt::January => {
            "Test series for January attempt are held during November & December months."
        }
    }
}

/// Reply for one entry of the informational list
pub fn info_text(topic: InfoTopic) -> String {
    let (title, lines): (&str, Vec<String>) = match topic {
        InfoTopic::Social => (
            "Follow us on Social Media:",
            SOCIAL_LINKS
                .iter()
                .map(|(name, url)| format!("• {name}: {url}"))
                .collect(),
        ),
        InfoTopic::Features => ("Unique Features:", bullets(&UNIQUE_FEATURES)),
        InfoTopic::Results => ("Results:", bullets(&RESULTS_SUMMARY)),
        InfoTopic::Contacts => ("Important Contacts:", bullets(&IMPORTANT_CONTACTS)),
    };
    format!("{title}\n{}", lines.join("\n"))
}

fn bullets(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| format!("• {item}")).collect()
}
