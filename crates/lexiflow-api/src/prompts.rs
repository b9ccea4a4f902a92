//! Prompt templates for the streaming endpoints
//!
//! Every template asks for one JSON object per line with no surrounding
//! prose. Models do not always comply; the stream validator copes with the
//! rest.

/// Default system prompt when none is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Lexiflow, an English tutor for Vietnamese learners \
preparing for IELTS. Answer precisely and follow the requested output format exactly.";

pub fn vocabulary(topic: &str, count: usize, level: Option<&str>) -> String {
    let level = level.unwrap_or("intermediate");
    format!(
        "Generate {count} English vocabulary items about \"{topic}\" for a {level} learner.\n\
         Output exactly one JSON object per line and nothing else, no markdown, no numbering.\n\
         Each object has the fields:\n\
         \"word\" (the English word), \"meaning\" (its meaning in Vietnamese), \
         \"example\" (an English example sentence), \"phonetic\" (IPA), \
         \"part_of_speech\".\n\
         Example line:\n\
         {{\"word\":\"cat\",\"meaning\":\"con mèo\",\"example\":\"The cat sleeps.\",\"phonetic\":\"/kæt/\",\"part_of_speech\":\"noun\"}}"
    )
}

pub fn products(query: &str, count: usize) -> String {
    format!(
        "Suggest {count} learning products (courses, books or subscriptions) matching \"{query}\".\n\
         Output exactly one JSON object per line and nothing else.\n\
         Each object has the fields: \"name\", \"description\" (Vietnamese), \
         \"price\" (number in VND or null), \"tags\" (array of short strings, at least one)."
    )
}

pub fn evaluation(task: &str, answer: &str) -> String {
    format!(
        "Grade the following IELTS answer.\n\
         Task: {task}\n\
         Answer: {answer}\n\
         Output a single JSON object on one line with the fields: \
         \"band\" (number from 0 to 9 in steps of 0.5), \"feedback\" (Vietnamese), \
         \"strengths\" (array of strings), \"improvements\" (array of strings)."
    )
}

pub fn answer(question: &str, context: Option<&str>) -> String {
    let context = context
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!("Context:\n{c}\n\n"))
        .unwrap_or_default();
    format!(
        "{context}Question: {question}\n\n\
         Stream your answer as JSON lines. Each line is one object of the form \
         {{\"e\":\"data\",\"k\":\"answer\",\"c\":\"<next part of the answer>\"}}. \
         Use \"k\":\"example\" for example sentences and \"k\":\"note\" for extra tips. \
         Do not emit anything else."
    )
}
