// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Read-only review views shown on developer profiles.

pub mod reviews;

pub use reviews::developer_summary as review_developer_summary;
pub use reviews::list_for_developer as review_list_for_developer;
