//! Service layer for business logic
//!
//! Concrete service implementations that encapsulate authentication and tag
//! management logic. Services talk to storage exclusively through the
//! repository traits, so every one of them can be exercised against
//! in-memory mocks.

pub mod audit;
pub mod card;
pub mod login;
pub mod magic_link;
pub mod trusted_device;
pub mod two_factor;
pub mod user;

pub use audit::AuditService;
pub use card::CardService;
pub use login::{LoginCredentials, LoginOutcome, LoginService, UserProfile};
pub use magic_link::{IssuedMagicLink, MagicLinkService};
pub use trusted_device::TrustedDeviceService;
pub use two_factor::{Enrollment, TwoFactorService};
pub use user::UserService;
