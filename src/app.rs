use crate::models::{AppState, NUM_OPTIONS, Question};

pub struct App {
    pub state: AppState,
    title: String,
    questions: Vec<Question>,
    current_question_index: usize,
    selected_option: usize,
    answers: Vec<Option<usize>>,
    result_scroll: usize,
    last_percentage: Option<f64>,
}

impl App {
    pub fn with_questions(title: impl Into<String>, questions: Vec<Question>) -> Self {
        let num_questions = questions.len();

        Self {
            state: AppState::Welcome,
            title: title.into(),
            questions,
            current_question_index: 0,
            selected_option: 0,
            answers: vec![None; num_questions],
            result_scroll: 0,
            last_percentage: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    pub fn current_question_number(&self) -> usize {
        self.current_question_index + 1
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn selected_option(&self) -> usize {
        self.selected_option
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn result_scroll(&self) -> usize {
        self.result_scroll
    }

    pub fn select_next_option(&mut self) {
        self.selected_option = (self.selected_option + 1) % NUM_OPTIONS;
    }

    pub fn select_previous_option(&mut self) {
        self.selected_option = (self.selected_option + NUM_OPTIONS - 1) % NUM_OPTIONS;
    }

    pub fn start_quiz(&mut self) {
        if self.questions.is_empty() {
            self.finish();
        } else {
            self.state = AppState::Quiz;
        }
    }

    pub fn submit_answer(&mut self) {
        if let Some(answer) = self.answers.get_mut(self.current_question_index) {
            *answer = Some(self.selected_option);
        }
        self.current_question_index += 1;
        self.selected_option = 0;

        if self.current_question_index >= self.questions.len() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.state = AppState::Result;
        self.last_percentage = Some(self.percentage());
    }

    /// Percentage of the most recently completed attempt.
    pub fn last_percentage(&self) -> Option<f64> {
        self.last_percentage
    }

    pub fn calculate_score(&self) -> usize {
        self.answers
            .iter()
            .zip(self.questions.iter())
            .filter(|(answer, question)| answer.is_some_and(|a| question.is_correct(a)))
            .count()
    }

    /// Score as a percentage of all questions, 0 for an empty quiz.
    pub fn percentage(&self) -> f64 {
        let total = self.total_questions();
        if total > 0 {
            (self.calculate_score() as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Pick an option by its letter, `a`..`d` in either case.
    pub fn select_option_by_label(&mut self, label: char) {
        let index = (label.to_ascii_uppercase() as usize).wrapping_sub('A' as usize);
        if index < NUM_OPTIONS {
            self.selected_option = index;
        }
    }

    /// Move the result list by `rows`, staying on a question row.
    pub fn scroll_results(&mut self, rows: isize) {
        let target = self.result_scroll.saturating_add_signed(rows);
        self.scroll_results_to(target);
    }

    /// Jump to a result row, clamped to the last question.
    pub fn scroll_results_to(&mut self, row: usize) {
        self.result_scroll = row.min(self.questions.len().saturating_sub(1));
    }

    pub fn restart(&mut self) {
        self.state = AppState::Welcome;
        self.current_question_index = 0;
        self.selected_option = 0;
        self.result_scroll = 0;
        self.answers = vec![None; self.questions.len()];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_questions;

    const PAPER: &str = "Q1. What is 2+2?\nA) 3\nB) 4\nC) 5\nD) 6\nAnswer: B)\n\
                         Q2. Largest planet?\nA) Mars\nB) Venus\nC) Jupiter\nD) Earth\nAns: C)\n";

    fn app() -> App {
        App::with_questions("Paper", extract_questions(PAPER, 2))
    }

    #[test]
    fn test_full_run_scores_label_answers() {
        let mut app = app();
        app.start_quiz();
        assert_eq!(app.state, AppState::Quiz);

        app.select_next_option();
        app.submit_answer();
        app.select_previous_option();
        app.select_previous_option();
        app.submit_answer();

        assert_eq!(app.state, AppState::Result);
        assert_eq!(app.answers(), [Some(1), Some(2)]);
        assert_eq!(app.calculate_score(), 2);
        assert_eq!(app.percentage(), 100.0);
        assert_eq!(app.last_percentage(), Some(100.0));
    }

    #[test]
    fn test_wrong_answers() {
        let mut app = app();
        app.start_quiz();
        app.submit_answer();
        app.submit_answer();
        assert_eq!(app.calculate_score(), 0);
        assert_eq!(app.percentage(), 0.0);
    }

    #[test]
    fn test_option_selection_wraps() {
        let mut app = app();
        app.select_previous_option();
        assert_eq!(app.selected_option(), 3);
        app.select_next_option();
        assert_eq!(app.selected_option(), 0);
    }

    #[test]
    fn test_restart_clears_progress() {
        let mut app = app();
        app.start_quiz();
        app.submit_answer();
        app.submit_answer();
        assert_eq!(app.last_percentage(), Some(0.0));
        app.restart();
        assert_eq!(app.last_percentage(), Some(0.0));
        assert_eq!(app.state, AppState::Welcome);
        assert_eq!(app.current_question_number(), 1);
        assert!(app.answers().iter().all(Option::is_none));
    }

    #[test]
    fn test_empty_quiz_goes_straight_to_results() {
        let mut app = App::with_questions("Empty", Vec::new());
        app.start_quiz();
        assert_eq!(app.state, AppState::Result);
        assert!(app.current_question().is_none());
        assert_eq!(app.percentage(), 0.0);
    }

    #[test]
    fn test_result_scroll_bounds() {
        let mut app = app();
        app.scroll_results(-1);
        assert_eq!(app.result_scroll(), 0);
        app.scroll_results(1);
        app.scroll_results(1);
        assert_eq!(app.result_scroll(), 1);
    }

    #[test]
    fn test_result_paging_on_long_paper() {
        let mut app = App::with_questions("Long", extract_questions("", 25));
        app.scroll_results(10);
        assert_eq!(app.result_scroll(), 10);
        app.scroll_results(isize::MAX);
        assert_eq!(app.result_scroll(), 24);
        app.scroll_results(-10);
        assert_eq!(app.result_scroll(), 14);
        app.scroll_results_to(0);
        assert_eq!(app.result_scroll(), 0);

        let mut empty = App::with_questions("Empty", Vec::new());
        empty.scroll_results_to(usize::MAX);
        assert_eq!(empty.result_scroll(), 0);
    }

    #[test]
    fn test_select_option_by_label() {
        let mut app = app();
        app.select_option_by_label('c');
        assert_eq!(app.selected_option(), 2);
        app.select_option_by_label('D');
        assert_eq!(app.selected_option(), 3);
        app.select_option_by_label('e');
        assert_eq!(app.selected_option(), 3);
    }
}
