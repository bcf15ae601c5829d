use crate::models::Question;
use crate::voting::TallyFloor;

/// Folds one participant's vote into a copy of the shared tallies.
///
/// On a revote the previous choice loses one vote before the new choice
/// gains one. Questions other than `question_id` pass through untouched.
pub fn apply_vote(
    questions: &[Question],
    question_id: i64,
    previous: Option<&str>,
    choice: &str,
    floor: TallyFloor,
) -> Vec<Question> {
    questions
        .iter()
        .map(|q| {
            if q.id != question_id {
                return q.clone();
            }

            let mut q = q.clone();
            if let Some(prev) = previous {
                let count = q.votes.entry(prev.to_string()).or_insert(0);
                *count -= 1;
                if floor == TallyFloor::Zero && *count < 0 {
                    *count = 0;
                }
            }
            *q.votes.entry(choice.to_string()).or_insert(0) += 1;
            q
        })
        .collect()
}
