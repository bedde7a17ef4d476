// Protected handlers: JWT required. Company-scoped routes additionally check
// that the caller owns or belongs to the company.

pub mod auth;
pub mod banking;
pub mod companies;
pub mod data;
pub mod documents;
pub mod email;
pub mod integrations;
pub mod sequences;
pub mod support;
