// Stored document bodies; ids and versions live on the store's `Document`.

pub mod activity;
pub mod company;
pub mod email;
pub mod finance;
pub mod job;
pub mod oauth;
pub mod sequence;
pub mod ticket;
pub mod timestamp;
pub mod transaction;
pub mod webhook;
pub mod workspace;

pub use activity::Activity;
pub use company::{Address, BankDetails, Company, Integrations, TaxSettings, UsageSnapshot};
pub use email::{EmailCacheEntry, EmailConfig, EmailConfigView, EmailProvider};
pub use finance::{DocumentInput, DocumentKind, DocumentStatus, FinanceDocument, LineItem, Totals};
pub use job::{JobFailure, JobRun};
pub use oauth::{IntegrationTokens, OAuthState};
pub use sequence::{NumberSequence, SequenceType};
pub use ticket::{AnalyticsRange, Comment, Priority, Ticket, TicketAnalytics, TicketStatus};
pub use transaction::{BankTransaction, BookingStatus, TransactionLink, TransactionView};
pub use webhook::{BalanceEntry, WebhookEvent, WebhookOutcome};
pub use workspace::{TaskStatus, Workspace, WorkspaceStatus, WorkspaceTask};
