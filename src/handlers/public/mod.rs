// Public handlers: no authentication. Webhooks authenticate by signature,
// the OAuth callback by its single-use state.

pub mod oauth;
pub mod system;
pub mod webhooks;

pub use oauth::datev_callback;
pub use system::{health, root};
pub use webhooks::stripe_webhook;
