//! Prompt construction for intent classification and grounded responses

use std::fmt::Write;

use crate::intent::Intent;

/// Instruction appended so the model declines instead of inventing answers
/// when retrieval produced nothing relevant
const REFUSAL_RULE: &str = "If the provided knowledge does not contain the answer, say that you \
do not know rather than guessing. Never invent facts that are not in the knowledge.";

/// System prompt for intent classification
///
/// The model must answer with exactly one label from the closed set.
#[must_use]
pub fn intent_prompt() -> String {
    let mut p = String::from(
        "You classify a user's utterance to a small robot named Michi into exactly one intent \
label. Respond with only the label, nothing else.\n\nLabels: ",
    );
    p.push_str(&Intent::labels().join(", "));
    p.push_str(
        "\n\nExamples:\n\
         \"Ayo joget bareng!\" -> dance\n\
         \"Michi, tidur dulu ya\" -> sleep\n\
         \"Kamu lucu banget aku senang\" -> happy\n\
         \"Aku kesal sama kamu\" -> mad\n\
         \"Aku sedih hari ini\" -> sad\n\
         \"Sampai jumpa besok\" -> goodbye\n\
         \"Kenalkan dirimu dong\" -> introduction\n\
         \"Benda apa yang ada di depanmu?\" -> detect\n\
         \"Siapa presiden pertama Indonesia?\" -> talk\n\n\
         If the utterance fits none of the non-talk labels, answer talk.",
    );
    p
}

/// System prompt for grounded response generation
///
/// The knowledge block may be empty; the refusal rule is always present so an
/// empty block yields a polite "I don't know" instead of a hallucination.
#[must_use]
pub fn grounded_prompt(knowledge: &str) -> String {
    let mut p = String::from(
        "You are Michi, a friendly small robot companion. You answer briefly, warmly, and in \
the same language the user speaks. Your answers are spoken aloud, so keep them short and \
conversational with no markup or lists.\n\n",
    );
    p.push_str(REFUSAL_RULE);
    p.push_str("\n\nKnowledge:\n");
    if knowledge.is_empty() {
        p.push_str("(none)\n");
    } else {
        let _ = writeln!(p, "{knowledge}");
    }
    p
}
