use shared::domain::{Question, QuestionId};

/// Built-in assessment catalog used by the demo flow. A deployment would
/// load this from its question bank instead.
pub fn sample_questions() -> Vec<Question> {
    vec![
        Question::SingleChoice {
            id: QuestionId::new("q1"),
            prompt: "Which of the following is NOT a JavaScript data type?".to_string(),
            options: vec![
                "String".to_string(),
                "Boolean".to_string(),
                "Float".to_string(),
                "Object".to_string(),
            ],
            correct: Some(2),
        },
        Question::Text {
            id: QuestionId::new("q2"),
            prompt: "Explain the difference between 'let', 'const', and 'var' in JavaScript."
                .to_string(),
        },
        Question::SingleChoice {
            id: QuestionId::new("q3"),
            prompt: "Which HTTP method is idempotent?".to_string(),
            options: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PATCH".to_string(),
                "DELETE".to_string(),
            ],
            correct: Some(0),
        },
        Question::MultiChoice {
            id: QuestionId::new("q4"),
            prompt: "Select all that apply to React hooks:".to_string(),
            options: vec![
                "Must be called at the top level of a component".to_string(),
                "Can be called inside loops".to_string(),
                "Can be called inside conditions".to_string(),
                "Can only be used in functional components".to_string(),
            ],
            correct: Some([0, 3].into_iter().collect()),
        },
        Question::Text {
            id: QuestionId::new("q5"),
            prompt: "Describe a challenging problem you've solved in a previous project."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique_and_ordered() {
        let questions = sample_questions();
        let ids: Vec<&str> = questions.iter().map(|q| q.id().0.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q3", "q4", "q5"]);
    }
}
