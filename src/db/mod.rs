//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const CHALLENGES: &str = "challenges";
    /// Daily logs, keyed by `{challenge_id}_{user_id}_{date}` for uniqueness
    pub const DAILY_LOGS: &str = "daily_logs";
    /// Join collection for listing a user's challenges
    pub const CHALLENGE_MEMBERS: &str = "challenge_members";
}
