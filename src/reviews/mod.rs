//! Review lifecycle and the developer rating aggregate kept alongside it.

pub mod aggregate;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod validate;

pub use aggregate::AggregateMaintainer;
pub use error::ReviewError;
pub use memory::{FaultPoint, MemoryReviewRepository};
pub use model::{
    AddReview, AdminReview, AggregateDrift, DeleteAuthority, DeveloperAggregate, DeveloperReview,
    ReconcileReport, Requester, Review, ReviewOutcome, UpdateReview, UserRemoval,
};
pub use postgres::PgReviewRepository;
pub use repository::{ReviewRepository, ReviewTransaction};
pub use service::ReviewService;
