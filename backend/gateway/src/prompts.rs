//! Prompt text sent to the oracle.

use signshuffle_core::LetterCount;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "You read text from photographs of signs, labels, \
     menus and notes. You only ever answer by calling the function you are given.";

pub const TEXT_PRESENCE_PROMPT: &str = "Does this image contain any readable text? \
     Call report_text_presence with your answer.";

pub const EXTRACT_TEXT_PROMPT: &str = "Transcribe every piece of readable text in the image \
     exactly as written. Do not correct spelling, translate, summarise, or add anything. \
     Call report_extracted_text with the result.";

pub const GENERATION_SYSTEM_PROMPT: &str = "You write short, playful anagram sentences. \
     You only ever answer by calling the function you are given.";

/// Generation instructions for a specific letter budget.
///
/// The budget is embedded as a JSON object so each letter's allowance is explicit.
pub fn generation_prompt(letters: &LetterCount) -> String {
    let budget = serde_json::to_string(letters).unwrap_or_default();
    format!(
        "Here is a budget of letters, given as a JSON object mapping each letter to how many \
         times it may be used: {budget}\n\
         Write between 1 and 5 different English sentences. Each sentence may only use letters \
         from the budget, and may use each letter at most as many times as the budget allows. \
         Spaces are free. Sentences do not need to use every letter. \
         Call propose_sentences with the sentences."
    )
}
