use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::models::Question;

/// Load a prepared question set: a JSON array of questions.
pub fn load_questions_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Question>, LoadError> {
    let path = path.as_ref();

    let json_content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let questions: Vec<Question> =
        serde_json::from_str(&json_content).map_err(|source| LoadError::Json {
            path: path.display().to_string(),
            source,
        })?;

    if questions.is_empty() {
        return Err(LoadError::Empty(path.display().to_string()));
    }

    Ok(questions)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_questions() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"question": "Q1. What is 2+2?", "options": ["A) 3", "B) 4", "C) 5", "D) 6"], "answer": "B)"}}]"#
        )
        .unwrap();

        let questions = load_questions_from_json(file.path()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt, "Q1. What is 2+2?");
        assert_eq!(questions[0].correct_option(), Some(1));
    }

    #[test]
    fn test_load_rejects_empty_set() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(matches!(load_questions_from_json(file.path()), Err(LoadError::Empty(_))));
    }

    #[test]
    fn test_load_rejects_wrong_option_count() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"question": "Q1", "options": ["A) 1"], "answer": "A)"}}]"#).unwrap();
        assert!(matches!(load_questions_from_json(file.path()), Err(LoadError::Json { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_questions_from_json(dir.path().join("missing.json"));
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
