// Prompt templates for the interview LLM calls. Placeholders are literal
// `{name}` markers filled with str::replace; the surrounding braces in the
// JSON examples are intentional.

/// System prompt shared by all structured interview calls.
pub const JSON_ONLY_SYSTEM: &str = "You are a JSON-only API. Do not return markdown.";

pub const SETUP_PROMPT_TEMPLATE: &str = r#"
Analyze this candidate for the given job description.

RESUME:
{resume_text}

JOB DESCRIPTION:
{jd_text}

Return STRICT JSON ONLY in this format:
{
  "match_score": 0-100,
  "strengths": ["3 matched strengths"],
  "gaps": ["2 weak areas"],
  "questions": [
    "Intro question",
    "Technical strength question",
    "Technical strength question",
    "Gap probing question",
    "Behavioral question"
  ]
}
"#;

pub const SCORE_PROMPT_TEMPLATE: &str = r#"
You are an expert technical interviewer.

QUESTION:
{question}

CANDIDATE ANSWER:
{transcript}

BEHAVIOR:
Emotion: {emotion}
Confidence: {confidence}

Score strictly (0-100) and return JSON ONLY:
{
  "accuracy": number,
  "communication": number,
  "behavior": number,
  "feedback": "one-line feedback"
}
"#;

pub const FOLLOWUP_PROMPT_TEMPLATE: &str = r#"
You are an interviewer. Decide if a single follow-up question is needed based on the candidate's answer.

RULES:
- Ask at most ONE follow-up question.
- The follow-up MUST be a SINGLE question (no multi-part, no "and also", no numbered lists).
- Ask a follow-up ONLY if the answer is vague, missing key details, has low confidence/accuracy, or lacks evidence/metrics/examples.
- If the answer is complete, set should_follow_up=false and follow_up_question="".
- Do NOT ask anything personal/sensitive. Keep it job-related.

JOB DESCRIPTION (optional):
{jd_text}

ROLE GAPS (optional):
{gaps}

ORIGINAL QUESTION:
{question}

CANDIDATE TRANSCRIPT:
{transcript}

RUBRIC SCORE (0-100):
{score}

FEEDBACK (optional):
{feedback}

Return STRICT JSON ONLY:
{
  "should_follow_up": true,
  "follow_up_question": "string",
  "reason": "string"
}
"#;

/// Truncates to at most `max` characters, on a char boundary. Keeps prompts
/// small and stable regardless of input size.
pub fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_is_a_noop_for_short_text() {
        assert_eq!(clip("hello", 10), "hello");
    }

    #[test]
    fn clip_cuts_at_the_char_count() {
        assert_eq!(clip("hello world", 5), "hello");
    }

    #[test]
    fn clip_respects_multibyte_boundaries() {
        assert_eq!(clip("héllo", 2), "hé");
    }
}
