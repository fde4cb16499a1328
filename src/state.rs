use std::sync::Arc;

use crate::reviews::{ReviewRepository, ReviewService};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(repo: Arc<dyn ReviewRepository>) -> Self {
        Self {
            reviews: ReviewService::new(repo),
        }
    }
}
