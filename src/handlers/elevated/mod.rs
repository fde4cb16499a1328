// handlers/elevated/mod.rs - Elevated handlers (admin JWT required)
//
// Route Prefix: /api/admin/*
// Middleware: jwt_auth_middleware, then require_admin

pub mod developers;
pub mod reviews;
pub mod users;

pub use developers::recompute as developer_recompute;
pub use reviews::delete as review_delete;
pub use reviews::list as review_list;
pub use users::delete as user_delete;
