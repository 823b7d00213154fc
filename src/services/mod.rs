// Service exports
pub mod appwrite;
pub mod cache;
pub mod identity;
pub mod memory;
pub mod notifier;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteError, AppwriteProfiles};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use identity::JwtIdentityProvider;
pub use memory::InMemoryStore;
pub use notifier::{
    AppwritePushNotifier, DeliveryResult, LogNotifier, Notification, NotificationDispatcher,
    Notifier, NotifyError,
};
pub use postgres::{PostgresError, PostgresStore};
pub use store::{InterestLedger, PreferenceStore, ProfileDirectory};
