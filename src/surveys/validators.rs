// src/surveys/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};

// ============================================================================
// Survey Validators
// ============================================================================

fn validate_questions(questions: &[Question], result: &mut ValidationResult) {
    for (idx, question) in questions.iter().enumerate() {
        let field = format!("questions[{}]", idx);

        if question.question.trim().is_empty() && question.text.as_deref().unwrap_or("").trim().is_empty()
        {
            result.add_error(&field, "Question label is required");
        }

        if let (Some(min), Some(max)) = (question.min, question.max) {
            if min > max {
                result.add_error(&field, "Scale minimum cannot be greater than maximum");
            }
        }

        // min/max only make sense for scale questions
        if (question.min.is_some() || question.max.is_some())
            && question.question_type != QuestionType::Scale
        {
            result.add_error(&field, "min/max are only valid for scale questions");
        }

        if let Some(conditional) = &question.conditional {
            if conditional.question_id.trim().is_empty() {
                result.add_error(&field, "Conditional rule must reference a question id");
            }
        }
    }
}

pub struct SurveyValidator;

impl Validator<CreateSurvey> for SurveyValidator {
    fn validate(&self, data: &CreateSurvey) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.title.trim().is_empty() {
            result.add_error("title", "Survey title is required");
        } else if data.title.len() > 255 {
            result.add_error("title", "Survey title must be less than 255 characters");
        }

        if let Some(description) = &data.description {
            if description.len() > 10000 {
                result.add_error(
                    "description",
                    "Description must be less than 10000 characters",
                );
            }
        }

        validate_questions(&data.questions, &mut result);

        if data.expiration_action == Some(ExpirationAction::Redirect)
            && data.redirect_url.as_deref().unwrap_or("").trim().is_empty()
        {
            result.add_error(
                "redirectUrl",
                "A redirect URL is required when the expiration action is redirect",
            );
        }

        result
    }
}

impl Validator<UpdateSurvey> for SurveyValidator {
    fn validate(&self, data: &UpdateSurvey) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(title) = &data.title {
            if title.trim().is_empty() {
                result.add_error("title", "Survey title cannot be empty");
            } else if title.len() > 255 {
                result.add_error("title", "Survey title must be less than 255 characters");
            }
        }

        if let Some(questions) = &data.questions {
            validate_questions(questions, &mut result);
        }

        result
    }
}
