use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionDetails};
use crate::models::result::QuestionResult;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GradedAttempt {
    /// Integer percentage of the auto-gradable points, 0..=100.
    pub score: i32,
    pub passed: bool,
    pub earned_points: i32,
    pub auto_gradable_points: i32,
    pub per_question: Vec<QuestionResult>,
}

pub struct GradingService;

impl GradingService {
    /// Pure function from the question bank and the submitted answers to a
    /// graded outcome. Questions must arrive in order_index order; the
    /// per-question breakdown preserves it.
    ///
    /// Missing or malformed answers score as incorrect, never as an error.
    /// Only an internally inconsistent bank (a multiple-choice key pointing
    /// at no option) raises, and that is a programming error upstream.
    pub fn grade(
        questions: &[Question],
        answers: &HashMap<Uuid, String>,
        passing_score: Decimal,
    ) -> Result<GradedAttempt> {
        let mut auto_gradable_points: i32 = 0;
        let mut earned_points: i32 = 0;
        let mut per_question = Vec::with_capacity(questions.len());

        for q in questions {
            let student_answer = answers.get(&q.id).cloned();

            match q.typed_details()? {
                QuestionDetails::MultipleChoice(mc) => {
                    if !mc.options.contains_key(&mc.correct_answer) {
                        return Err(Error::Integrity(format!(
                            "question {}: correct answer '{}' is not an option key",
                            q.id, mc.correct_answer
                        )));
                    }
                    // Option keys compare case-sensitively, as-is.
                    let is_correct =
                        student_answer.as_deref() == Some(mc.correct_answer.as_str());
                    auto_gradable_points += q.points;
                    if is_correct {
                        earned_points += q.points;
                    }
                    per_question.push(QuestionResult {
                        question_id: q.id,
                        question_type: q.question_type,
                        student_answer,
                        correct_answer: Some(mc.correct_answer),
                        is_correct: Some(is_correct),
                        points_earned: if is_correct { q.points } else { 0 },
                        max_points: q.points,
                    });
                }
                QuestionDetails::ShortAnswer(sa) => {
                    let is_correct = student_answer
                        .as_deref()
                        .map(|a| normalize(a) == normalize(&sa.correct_answer))
                        .unwrap_or(false);
                    auto_gradable_points += q.points;
                    if is_correct {
                        earned_points += q.points;
                    }
                    per_question.push(QuestionResult {
                        question_id: q.id,
                        question_type: q.question_type,
                        student_answer,
                        correct_answer: Some(sa.correct_answer),
                        is_correct: Some(is_correct),
                        points_earned: if is_correct { q.points } else { 0 },
                        max_points: q.points,
                    });
                }
                QuestionDetails::Essay(_) => {
                    per_question.push(QuestionResult {
                        question_id: q.id,
                        question_type: q.question_type,
                        student_answer,
                        correct_answer: None,
                        is_correct: None,
                        points_earned: 0,
                        max_points: q.points,
                    });
                }
            }
        }

        let score = percentage(earned_points, auto_gradable_points);
        let passed = Decimal::from(score) >= passing_score;

        Ok(GradedAttempt {
            score,
            passed,
            earned_points,
            auto_gradable_points,
            per_question,
        })
    }
}

/// Short answers compare normalized: surrounding whitespace and letter case
/// do not count against the student.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Integer percentage, rounded half up. 0 when nothing is auto-gradable.
fn percentage(earned: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((earned as f64 / total as f64) * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;
    use serde_json::json;

    fn mc_question(id: Uuid, points: i32, correct: &str) -> Question {
        Question {
            id,
            exam_id: Uuid::nil(),
            order_index: 0,
            question_text: "mc".into(),
            question_type: QuestionType::MultipleChoice,
            points,
            details: json!({
                "options": {"A": "first", "B": "second", "C": "third", "D": "fourth"},
                "correct_answer": correct,
            }),
            created_at: None,
            updated_at: None,
        }
    }

    fn short_question(id: Uuid, points: i32, correct: &str) -> Question {
        Question {
            id,
            exam_id: Uuid::nil(),
            order_index: 0,
            question_text: "sa".into(),
            question_type: QuestionType::ShortAnswer,
            points,
            details: json!({"correct_answer": correct}),
            created_at: None,
            updated_at: None,
        }
    }

    fn essay_question(id: Uuid, points: i32) -> Question {
        Question {
            id,
            exam_id: Uuid::nil(),
            order_index: 0,
            question_text: "essay".into(),
            question_type: QuestionType::Essay,
            points,
            details: json!({}),
            created_at: None,
            updated_at: None,
        }
    }

    fn answers(pairs: &[(Uuid, &str)]) -> HashMap<Uuid, String> {
        pairs
            .iter()
            .map(|(id, a)| (*id, a.to_string()))
            .collect()
    }

    #[test]
    fn one_of_two_multiple_choice_scores_fifty() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "A"), mc_question(q2, 10, "B")];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q1, "A"), (q2, "C")]),
            Decimal::from(50),
        )
        .unwrap();

        assert_eq!(graded.score, 50);
        assert!(graded.passed);
        assert_eq!(graded.earned_points, 10);
        assert_eq!(graded.auto_gradable_points, 20);
        assert_eq!(graded.per_question[0].is_correct, Some(true));
        assert_eq!(graded.per_question[1].is_correct, Some(false));
    }

    #[test]
    fn unanswered_question_is_incorrect_not_an_error() {
        let q1 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "A")];
        let graded =
            GradingService::grade(&questions, &HashMap::new(), Decimal::from(50)).unwrap();

        assert_eq!(graded.score, 0);
        assert!(!graded.passed);
        assert_eq!(graded.per_question[0].student_answer, None);
        assert_eq!(graded.per_question[0].is_correct, Some(false));
    }

    #[test]
    fn option_keys_compare_case_sensitively() {
        let q1 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "A")];
        let graded =
            GradingService::grade(&questions, &answers(&[(q1, "a")]), Decimal::from(50)).unwrap();
        assert_eq!(graded.per_question[0].is_correct, Some(false));
    }

    #[test]
    fn short_answers_match_normalized() {
        let q1 = Uuid::new_v4();
        let questions = vec![short_question(q1, 10, "Paris")];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q1, " paris ")]),
            Decimal::from(100),
        )
        .unwrap();

        assert_eq!(graded.score, 100);
        assert_eq!(graded.per_question[0].is_correct, Some(true));
    }

    #[test]
    fn short_answer_content_still_matters() {
        let q1 = Uuid::new_v4();
        let questions = vec![short_question(q1, 10, "Paris")];
        let graded =
            GradingService::grade(&questions, &answers(&[(q1, "Lyon")]), Decimal::from(50))
                .unwrap();
        assert_eq!(graded.score, 0);
    }

    #[test]
    fn essays_are_excluded_from_the_tally() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "A"), essay_question(q2, 40)];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q1, "A"), (q2, "my essay text")]),
            Decimal::from(60),
        )
        .unwrap();

        // Only the 10 auto-gradable points count, so a correct MC is 100%.
        assert_eq!(graded.auto_gradable_points, 10);
        assert_eq!(graded.score, 100);
        assert_eq!(graded.per_question[1].is_correct, None);
        assert_eq!(graded.per_question[1].correct_answer, None);
        assert_eq!(
            graded.per_question[1].student_answer.as_deref(),
            Some("my essay text")
        );
    }

    #[test]
    fn all_essay_exam_scores_zero() {
        let q1 = Uuid::new_v4();
        let questions = vec![essay_question(q1, 50)];
        let graded =
            GradingService::grade(&questions, &HashMap::new(), Decimal::from(0)).unwrap();
        assert_eq!(graded.score, 0);
        assert_eq!(graded.auto_gradable_points, 0);
        // passing_score of 0 means 0 >= 0 passes even with nothing gradable.
        assert!(graded.passed);
    }

    #[test]
    fn rounding_is_half_up() {
        // 99 of 200 points = 49.5% -> 50.
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 99, "A"), mc_question(q2, 101, "B")];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q1, "A"), (q2, "A")]),
            Decimal::from(50),
        )
        .unwrap();
        assert_eq!(graded.score, 50);
        assert!(graded.passed);

        // 1 of 3 points = 33.33..% -> 33.
        let q3 = Uuid::new_v4();
        let q4 = Uuid::new_v4();
        let questions = vec![mc_question(q3, 1, "A"), mc_question(q4, 2, "B")];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q3, "A")]),
            Decimal::from(50),
        )
        .unwrap();
        assert_eq!(graded.score, 33);
        assert!(!graded.passed);
    }

    #[test]
    fn score_stays_in_bounds() {
        let q1 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 7, "D")];
        for answer in ["A", "B", "C", "D", "", "garbage"] {
            let graded = GradingService::grade(
                &questions,
                &answers(&[(q1, answer)]),
                Decimal::from(50),
            )
            .unwrap();
            assert!((0..=100).contains(&graded.score));
        }
    }

    #[test]
    fn grading_is_deterministic() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "B"), short_question(q2, 5, "Answer")];
        let submitted = answers(&[(q1, "B"), (q2, "answer ")]);

        let first = GradingService::grade(&questions, &submitted, Decimal::from(70)).unwrap();
        let second = GradingService::grade(&questions, &submitted, Decimal::from(70)).unwrap();

        assert_eq!(first.score, second.score);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.per_question, second.per_question);
    }

    #[test]
    fn corrupt_correct_answer_key_is_an_integrity_error() {
        let q1 = Uuid::new_v4();
        let questions = vec![mc_question(q1, 10, "Z")];
        let err = GradingService::grade(&questions, &HashMap::new(), Decimal::from(50))
            .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn passing_is_compared_against_the_rounded_score() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        // 49.5% rounds to 50, which meets a threshold of 50.
        let questions = vec![mc_question(q1, 99, "A"), mc_question(q2, 101, "B")];
        let graded = GradingService::grade(
            &questions,
            &answers(&[(q1, "A")]),
            Decimal::from(50),
        )
        .unwrap();
        assert_eq!(graded.score, 50);
        assert!(graded.passed);
    }
}
