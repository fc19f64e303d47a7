//! The fixed content served whenever live generation is unavailable or
//! produces nothing usable.

use super::ClarityContent;

/// Report text used when an entry somehow carries a blank summary.
pub const FALLBACK_REPORT: &str =
    "Your reflection is ready. Take a moment with the feelings and steps below.";

const SUMMARY: &str = "You are carrying a lot right now, and it makes sense that things feel \
tangled. Naming what you feel and choosing one small next step is a good place to start.";

const FEELINGS: [&str; 5] = [
    "Overwhelmed by how many things need attention at once",
    "Uncertain about which direction is the right one",
    "Tired from holding everything together",
    "Frustrated that progress feels slow",
    "Hopeful that things can become clearer",
];

const ACTION_PLAN: [&str; 5] = [
    "Write down everything that is on your mind, without sorting it yet",
    "Circle the one item that would bring the most relief if it were handled",
    "Break that item into a first step you can finish in fifteen minutes",
    "Do that step today, then pause and notice how it feels",
    "Set aside time tomorrow to choose the next small step",
];

const REFLECTION_PROMPTS: [&str; 4] = [
    "What feels most urgent right now, and is it truly urgent?",
    "What would you tell a close friend who was in your situation?",
    "Which of these worries is within your control this week?",
    "What is one thing that went well recently, however small?",
];

/// A fresh copy of the fallback record's content.
pub fn fallback_content() -> ClarityContent {
    ClarityContent {
        summary: SUMMARY.to_string(),
        feelings: FEELINGS.iter().map(|s| s.to_string()).collect(),
        action_plan: ACTION_PLAN.iter().map(|s| s.to_string()).collect(),
        reflection_prompts: REFLECTION_PROMPTS.iter().map(|s| s.to_string()).collect(),
    }
}
