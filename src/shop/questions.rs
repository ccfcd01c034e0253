use crate::core::types::Gender;
use crate::storage::cart::NewCartLine;

/// Answers being collected for a product with free-form questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFlow {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub gender: Option<Gender>,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
}

impl QuestionFlow {
    pub fn new(product_id: i64, variant_id: Option<i64>, gender: Option<Gender>, questions: Vec<String>) -> Self {
        Self {
            product_id,
            variant_id,
            gender,
            questions,
            answers: Vec::new(),
        }
    }

    pub fn current_question(&self) -> Option<&str> {
        self.questions.get(self.answers.len()).map(String::as_str)
    }

    /// 1-based number of the current question and the total, for "Question 2/3"
    pub fn progress(&self) -> (usize, usize) {
        ((self.answers.len() + 1).min(self.questions.len()), self.questions.len())
    }

    /// Records an answer; returns true once every question is answered
    pub fn answer(&mut self, text: &str) -> bool {
        if self.current_question().is_some() {
            self.answers.push(text.trim().to_string());
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() >= self.questions.len()
    }

    pub fn into_line(self) -> NewCartLine {
        NewCartLine::product(self.product_id)
            .with_variant(self.variant_id)
            .with_gender(self.gender)
            .with_answers(self.answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_walks_questions_in_order() {
        let mut flow = QuestionFlow::new(
            7,
            Some(2),
            Some(Gender::Female),
            vec!["Name?".to_string(), "Number?".to_string()],
        );
        assert_eq!(flow.current_question(), Some("Name?"));
        assert_eq!(flow.progress(), (1, 2));
        assert!(!flow.answer(" Anna "));
        assert_eq!(flow.current_question(), Some("Number?"));
        assert!(flow.answer("42"));
        assert_eq!(flow.current_question(), None);

        let line = flow.into_line();
        assert_eq!(line.answers, vec!["Anna".to_string(), "42".to_string()]);
        assert_eq!(line.variant_id, Some(2));
        assert_eq!(line.gender, Some(Gender::Female));
    }
}
