use super::error::ReviewError;
use super::model::{AddReview, NewReview, ReviewPatch, UpdateReview};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn rating(value: i64) -> Result<i16, ReviewError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(ReviewError::invalid(
            "rating",
            format!("Rating must be between {} and {}", MIN_RATING, MAX_RATING),
        ));
    }
    Ok(value as i16)
}

pub fn message(value: String) -> Result<String, ReviewError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ReviewError::invalid("message", "Review message cannot be empty"));
    }
    Ok(trimmed.to_string())
}

pub fn new_review(input: AddReview, client_id: i32) -> Result<NewReview, ReviewError> {
    if input.developer_id <= 0 {
        return Err(ReviewError::invalid("developer_id", "Valid developer ID is required"));
    }

    Ok(NewReview {
        developer_id: input.developer_id,
        client_id,
        rating: rating(input.rating)?,
        message: message(input.message)?,
    })
}

pub fn patch(input: UpdateReview) -> Result<ReviewPatch, ReviewError> {
    Ok(ReviewPatch {
        rating: input.rating.map(rating).transpose()?,
        message: input.message.map(message).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert_eq!(rating(1).unwrap(), 1);
        assert_eq!(rating(5).unwrap(), 5);
        assert!(rating(0).is_err());
        assert!(rating(6).is_err());
        assert!(rating(i64::MAX).is_err());
    }

    #[test]
    fn blank_message_is_rejected() {
        let err = message("   \n".to_string()).unwrap_err();
        assert!(matches!(err, ReviewError::InvalidArgument { field: "message", .. }));
        assert_eq!(message("  solid work ".to_string()).unwrap(), "solid work");
    }

    #[test]
    fn patch_keeps_omitted_fields_unset() {
        let validated = patch(UpdateReview {
            rating: Some(3),
            message: None,
        })
        .unwrap();
        assert_eq!(validated.rating, Some(3));
        assert!(validated.message.is_none());
    }

    #[test]
    fn patch_validates_present_fields() {
        let err = patch(UpdateReview {
            rating: None,
            message: Some(String::new()),
        })
        .unwrap_err();
        assert!(matches!(err, ReviewError::InvalidArgument { field: "message", .. }));
    }

    #[test]
    fn new_review_requires_positive_developer_id() {
        let input = AddReview {
            developer_id: 0,
            rating: 4,
            message: "great".to_string(),
        };
        assert!(matches!(
            new_review(input, 9),
            Err(ReviewError::InvalidArgument { field: "developer_id", .. })
        ));
    }
}
