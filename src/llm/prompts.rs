//! Prompt templates for answering and grading.
//!
//! Placeholders use `{name}` syntax and are filled in one pass by
//! [`fill_template`], so substituted text is never expanded again.

/// Collection of prompts used by the QA pipeline and the answer evaluator.
pub struct Prompts;

impl Prompts {
    /// Question-answering prompt. Placeholders: `{question}`, `{context}`.
    pub fn qa() -> &'static str {
        r#"You are an assistant for question-answering tasks. Use the following pieces of retrieved context to answer the question. If you don't know the answer, just say that you don't know. Use three sentences maximum and keep the answer concise.
Question: {question}
Context: {context}
Answer:"#
    }

    /// Grading rubric, sent as the system message to the grader.
    pub fn grading_rubric() -> &'static str {
        r#"You are a teacher grading a quiz on financial data.

You will be given a QUESTION, the GROUND TRUTH (correct) ANSWER, and the STUDENT ANSWER.

Here is the grade criteria to follow:
(1) Grade the student answers based ONLY on their factual accuracy relative to the ground truth answer.
(2) Ensure that the student answer does not contain any conflicting statements.
(3) It is OK if the student answer contains more information than the ground truth answer, as long as it is factually accurate relative to the ground truth answer.

Score:
A score of 1 represents the highest possible achievement, indicating that the student's answer fully satisfies all criteria. If the rounding is accurate, the answer should be considered correct.
A score of 0 means that the student's answer does not meet all of the criteria. This is the lowest possible score you can give.
A score of 0.5 indicates that the student successfully answered the question, accounting for errors within a margin of ±0.5.

Explain your reasoning in a step-by-step manner to ensure your reasoning and conclusion are correct.

Avoid simply stating the correct answer at the outset.

Reply in JSON format:
{
    "explanation": <your step-by-step reasoning>,
    "score": <0, 0.5 or 1>
}
Directly return the final JSON structure. Do not output anything else."#
    }

    /// Grader input. Placeholders: `{question}`, `{correct_answer}`, `{student_answer}`.
    pub fn grading_input() -> &'static str {
        r#"QUESTION: {question}
GROUND TRUTH ANSWER: {correct_answer}
STUDENT ANSWER: {student_answer}"#
    }
}

/// Substitute `{name}` placeholders in a single left-to-right pass.
///
/// Braces that do not form a known placeholder are copied through unchanged.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let matched = values.iter().find(|(name, _)| {
            tail.strip_prefix(*name)
                .is_some_and(|after| after.starts_with('}'))
        });

        match matched {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_substitutes_once() {
        let filled = fill_template(
            "Q: {question}\nC: {context}",
            &[("question", "what is {context}?"), ("context", "ctx")],
        );
        assert_eq!(filled, "Q: what is {context}?\nC: ctx");
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let filled = fill_template("{\"score\": {x}} {unknown} {", &[("x", "1")]);
        assert_eq!(filled, "{\"score\": 1} {unknown} {");
    }

    #[test]
    fn test_templates_carry_their_placeholders() {
        assert!(Prompts::qa().contains("{question}"));
        assert!(Prompts::qa().contains("{context}"));

        let input = Prompts::grading_input();
        for placeholder in ["{question}", "{correct_answer}", "{student_answer}"] {
            assert!(input.contains(placeholder), "missing {}", placeholder);
        }
        assert!(Prompts::grading_rubric().contains("\"score\""));
    }
}
