use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::reviews::eligibility::{self, Eligibility, IneligibilityReason};
use crate::reviews::{
    CanReviewResponse, CreateReviewRequest, Review, ReviewError, ReviewImage, ReviewReply,
    ReviewResponse, ReviewsRepository, UpdateReviewRequest,
};

/// Service layer for review business logic
#[derive(Clone)]
pub struct ReviewService {
    repository: ReviewsRepository,
}

impl ReviewService {
    /// Create a new ReviewService
    pub fn new(repository: ReviewsRepository) -> Self {
        Self { repository }
    }

    /// Eligibility pre-check for the review form
    ///
    /// 404 when the booking does not exist; every other failure comes back
    /// as `ok: false` with the reason, so the client can explain itself.
    pub async fn can_review(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<CanReviewResponse, ReviewError> {
        match self.assess_booking(booking_id, user.user_id).await? {
            Eligibility::Eligible { homestay_id } => Ok(CanReviewResponse {
                ok: true,
                reason: None,
                homestay_id: Some(homestay_id),
            }),
            Eligibility::NotEligible(reason) => Ok(CanReviewResponse {
                ok: false,
                reason: Some(reason.message()),
                homestay_id: None,
            }),
        }
    }

    /// Create a review for a finished stay
    ///
    /// Eligibility is re-checked here no matter what the client saw in the
    /// pre-check; a concurrent duplicate still loses at the unique index on
    /// `reviews.booking_id` and surfaces as a conflict.
    pub async fn create_review(
        &self,
        user: &AuthUser,
        request: CreateReviewRequest,
    ) -> Result<ReviewResponse, ReviewError> {
        let homestay_id = match self
            .assess_booking(request.booking_id, user.user_id)
            .await?
        {
            Eligibility::Eligible { homestay_id } => homestay_id,
            Eligibility::NotEligible(reason) => return Err(reason_to_error(reason)),
        };

        if request.homestay_id != homestay_id {
            return Err(ReviewError::ValidationError(
                "homestay_id does not match the booking's stay".to_string(),
            ));
        }

        let (review, images) = self
            .repository
            .create(
                request.booking_id,
                homestay_id,
                user.user_id,
                request.rating,
                &request.content,
                &request.images,
            )
            .await?;

        tracing::info!(
            "Review {} created for homestay {} (booking {})",
            review.id,
            homestay_id,
            review.booking_id
        );

        let author = self.author_name(review.customer_id).await?;
        Ok(ReviewResponse::from_parts(review, author, images, None))
    }

    /// Visible and verified reviews for a homestay, with attachments
    pub async fn homestay_reviews(
        &self,
        homestay_id: i32,
    ) -> Result<Vec<ReviewResponse>, ReviewError> {
        let reviews = self.repository.find_visible_by_homestay(homestay_id).await?;
        self.assemble(reviews).await
    }

    /// The authenticated customer's own reviews
    pub async fn my_reviews(&self, user: &AuthUser) -> Result<Vec<ReviewResponse>, ReviewError> {
        let reviews = self.repository.find_by_customer(user.user_id).await?;
        self.assemble(reviews).await
    }

    /// Update rating and/or content, author only, inside the edit window
    pub async fn update_review(
        &self,
        user: &AuthUser,
        review_id: i32,
        request: UpdateReviewRequest,
    ) -> Result<ReviewResponse, ReviewError> {
        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if existing.customer_id != user.user_id {
            return Err(ReviewError::Forbidden(
                "You do not own this review".to_string(),
            ));
        }

        if !eligibility::within_edit_window(existing.created_at, Utc::now()) {
            return Err(ReviewError::EditWindowLapsed);
        }

        let updated = self
            .repository
            .update(
                review_id,
                existing.homestay_id,
                request.rating,
                request.content.as_deref(),
            )
            .await?;

        self.assemble_one(updated).await
    }

    /// Delete a review
    ///
    /// Authors may delete inside the edit window; admins delete anything.
    pub async fn delete_review(&self, user: &AuthUser, review_id: i32) -> Result<(), ReviewError> {
        let existing = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if !user.is_admin() {
            if existing.customer_id != user.user_id {
                return Err(ReviewError::Forbidden(
                    "You do not own this review".to_string(),
                ));
            }

            if !eligibility::within_edit_window(existing.created_at, Utc::now()) {
                return Err(ReviewError::EditWindowLapsed);
            }
        }

        self.repository
            .delete(review_id, existing.homestay_id)
            .await?;

        tracing::info!("Review {} deleted by user {}", review_id, user.user_id);

        Ok(())
    }

    /// Admin moderation toggle for review visibility
    pub async fn set_visibility(
        &self,
        user: &AuthUser,
        review_id: i32,
        visible: bool,
    ) -> Result<ReviewResponse, ReviewError> {
        if !user.is_admin() {
            return Err(ReviewError::Forbidden("Admin access required".to_string()));
        }

        let updated = self.repository.set_visibility(review_id, visible).await?;
        self.assemble_one(updated).await
    }

    /// Create or edit the host reply on a review
    ///
    /// Ownership of the reviewed homestay is checked against the homestays
    /// table on every call, never cached.
    pub async fn upsert_reply(
        &self,
        user: &AuthUser,
        review_id: i32,
        content: &str,
    ) -> Result<ReviewReply, ReviewError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ReviewError::ValidationError(
                "Reply content must not be blank".to_string(),
            ));
        }

        let review = self
            .repository
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::NotFound)?;

        if !self
            .repository
            .user_owns_homestay(user.user_id, review.homestay_id)
            .await?
        {
            return Err(ReviewError::Forbidden(
                "You do not own this homestay".to_string(),
            ));
        }

        self.repository
            .upsert_reply(review.id, user.user_id, review.homestay_id, content)
            .await
    }

    /// Remove the host reply on a review
    pub async fn delete_reply(&self, user: &AuthUser, review_id: i32) -> Result<(), ReviewError> {
        let reply = self
            .repository
            .find_reply(review_id)
            .await?
            .ok_or(ReviewError::ReplyNotFound)?;

        if !self
            .repository
            .user_owns_homestay(user.user_id, reply.homestay_id)
            .await?
        {
            return Err(ReviewError::Forbidden(
                "You do not own this homestay".to_string(),
            ));
        }

        self.repository.delete_reply(review_id).await
    }

    async fn assess_booking(
        &self,
        booking_id: Uuid,
        customer_id: i32,
    ) -> Result<Eligibility, ReviewError> {
        let (booking, items) = self
            .repository
            .booking_facts(booking_id)
            .await?
            .ok_or(ReviewError::BookingNotFound)?;

        let has_review = self.repository.exists_for_booking(booking_id).await?;
        let today = Utc::now().date_naive();

        Ok(eligibility::assess(
            &booking,
            &items,
            customer_id,
            has_review,
            today,
        ))
    }

    async fn assemble(&self, reviews: Vec<Review>) -> Result<Vec<ReviewResponse>, ReviewError> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let review_ids: Vec<i32> = reviews.iter().map(|review| review.id).collect();
        let customer_ids: Vec<i32> = reviews.iter().map(|review| review.customer_id).collect();

        let authors = self.repository.author_names(&customer_ids).await?;

        let mut images_by_review: HashMap<i32, Vec<ReviewImage>> = HashMap::new();
        for image in self.repository.images_for(&review_ids).await? {
            images_by_review
                .entry(image.review_id)
                .or_default()
                .push(image);
        }

        let mut replies_by_review: HashMap<i32, ReviewReply> = self
            .repository
            .replies_for(&review_ids)
            .await?
            .into_iter()
            .map(|reply| (reply.review_id, reply))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let author = authors
                    .get(&review.customer_id)
                    .cloned()
                    .unwrap_or_else(|| format!("User #{}", review.customer_id));
                let images = images_by_review.remove(&review.id).unwrap_or_default();
                let reply = replies_by_review.remove(&review.id);

                ReviewResponse::from_parts(review, author, images, reply)
            })
            .collect())
    }

    async fn assemble_one(&self, review: Review) -> Result<ReviewResponse, ReviewError> {
        let author = self.author_name(review.customer_id).await?;
        let images = self.repository.images_for(&[review.id]).await?;
        let reply = self.repository.find_reply(review.id).await?;

        Ok(ReviewResponse::from_parts(review, author, images, reply))
    }

    async fn author_name(&self, customer_id: i32) -> Result<String, ReviewError> {
        let mut names = self.repository.author_names(&[customer_id]).await?;

        Ok(names
            .remove(&customer_id)
            .unwrap_or_else(|| format!("User #{}", customer_id)))
    }
}

fn reason_to_error(reason: IneligibilityReason) -> ReviewError {
    match reason {
        IneligibilityReason::NotYourBooking => ReviewError::NotYourBooking,
        IneligibilityReason::AlreadyReviewed => ReviewError::DuplicateReview,
        other => ReviewError::NotEligible(other.message()),
    }
}
