// Elevated handlers: behind `require_admin_middleware`, role `admin` only.

pub mod companies;
pub mod jobs;
pub mod tickets;
pub mod workspaces;
