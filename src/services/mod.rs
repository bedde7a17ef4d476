// Domain services; the only code that talks to the store.

pub mod banking;
pub mod company;
pub mod data;
pub mod datev;
pub mod email;
pub mod error;
pub mod finance;
pub mod sequence;
pub mod ticket;
pub mod webhook;
pub mod workspace;

pub use banking::BankingService;
pub use company::CompanyService;
pub use data::DataService;
pub use datev::DatevService;
pub use email::EmailService;
pub use error::{DomainError, DomainResult};
pub use finance::FinanceService;
pub use sequence::SequenceService;
pub use ticket::TicketService;
pub use webhook::{WebhookError, WebhookService};
pub use workspace::WorkspaceService;
