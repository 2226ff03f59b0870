pub mod cache;
pub mod gate;
pub mod normalize;
pub mod presenter;
pub mod refresh;
pub mod session;

pub use cache::MetadataCache;
pub use gate::RequestGate;
pub use normalize::{cmp_decimal, normalize, parse_units};
pub use presenter::{present, present_with_prices, Criteria};
pub use refresh::BalanceTracker;
pub use session::{WalletEvent, WalletSession};
