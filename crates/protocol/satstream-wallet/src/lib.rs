//! Redemption client for the Satstream wallet service.
//!
//! The payment core never mutates settled funds directly; it goes through
//! the [`WalletBackend`] trait, which abstracts the hot-wallet collaborator:
//!
//! - [`HttpWallet`] - thin HTTP client against the walletd wire contract
//!   (`/receive`, `/balance`, `/sweep`, `/send`)
//! - [`MemoryWallet`] - in-memory backend for development and local runs
//! - `MockWallet` (in `satstream-test-utils`) - configurable mock for tests
//!
//! Redemption semantics: a token is presented at most once per session
//! lifecycle, only after the paid-for work succeeded. A wallet reporting the
//! token as already spent is a benign duplicate (retry after a crash), not
//! an error to propagate.

pub mod error;
pub mod http;
pub mod memory;
pub mod retry;
pub mod traits;
pub mod types;

pub use error::{WalletError, WalletResult};
pub use http::HttpWallet;
pub use memory::MemoryWallet;
pub use retry::RetryPolicy;
pub use traits::{Redemption, SweepOutcome, WalletBackend};
