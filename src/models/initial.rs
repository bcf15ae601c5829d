use crate::models::Question;
use lazy_static::lazy_static;

const DEFAULT_QUESTIONS: &[(i64, &str, &str, [&str; 4])] = &[
    (
        1,
        "AI in Healthcare",
        "Which area will AI impact the most in healthcare by 2025?",
        ["Diagnostics", "Drug Discovery", "Personalized Medicine", "Administrative Tasks"],
    ),
    (
        2,
        "Autonomous Vehicles",
        "Will fully autonomous cars become mainstream by 2025?",
        ["Yes", "No", "In Specific Regions", "Only for Commercial Use"],
    ),
    (
        3,
        "Generative AI Tools",
        "Which industry will adopt generative AI tools the fastest in 2025?",
        ["Marketing", "Software Development", "Education", "Entertainment"],
    ),
    (
        4,
        "Cloud Computing Evolution",
        "Which cloud model will dominate in 2025?",
        ["Public Cloud", "Private Cloud", "Hybrid Cloud", "Edge Computing"],
    ),
    (
        5,
        "AI Ethics",
        "What will be the biggest ethical challenge for AI in 2025?",
        ["Bias", "Data Privacy", "Job Displacement", "Autonomy in Decision-Making"],
    ),
    (
        6,
        "Wearable Technology",
        "What will be the most popular wearable technology in 2025?",
        ["Smartwatches", "Smart Glasses", "Health Trackers", "AR Devices"],
    ),
];

lazy_static! {
    static ref INITIAL_QUESTIONS: Vec<Question> = DEFAULT_QUESTIONS
        .iter()
        .filter_map(|(id, title, description, options)| {
            Question::new(*id, title, description, options, *id).ok()
        })
        .collect();
}

/// The question set every session starts from.
pub fn initial_questions() -> Vec<Question> {
    INITIAL_QUESTIONS.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_six_zeroed_questions_in_order() {
        let questions = initial_questions();
        assert_eq!(questions.len(), 6);
        for (i, q) in questions.iter().enumerate() {
            assert_eq!(q.id, i as i64 + 1);
            assert_eq!(q.order, i as i64 + 1);
            assert_eq!(q.options.len(), 4);
            assert_eq!(q.total_votes(), 0);
        }
        assert_eq!(questions[1].options[0], "Yes");
    }
}
