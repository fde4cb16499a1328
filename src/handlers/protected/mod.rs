// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Route Prefix: /api/reviews
// Middleware: jwt_auth_middleware injects AuthUser

pub mod reviews;

pub use reviews::add as review_add;
pub use reviews::delete as review_delete;
pub use reviews::update as review_update;
