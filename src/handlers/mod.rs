// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (JWT auth) → Elevated (JWT auth + is_admin)
pub mod public;    // Tier 1: No authentication required
pub mod protected; // Tier 2: JWT authentication required (/api/reviews)
pub mod elevated;  // Tier 3: Admin JWT required (/api/admin/*)

pub mod extract;
