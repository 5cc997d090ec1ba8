//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const ITINERARIES: &str = "itineraries";
    /// Planning preferences (keyed by user ID)
    pub const USER_PREFERENCES: &str = "userPreferences";
    pub const EXPENSES: &str = "expenses";
}
