// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Challenges (document per challenge, participants embedded)
//! - Daily logs (deterministic IDs for per-day uniqueness)
//! - Challenge-Members (join collection for per-user queries)

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Challenge, ChallengeMember, ChallengeStatus, DailyLog};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Challenge Operations ────────────────────────────────────

    /// Get a challenge by ID.
    pub async fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(challenge_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new challenge together with its member join records.
    ///
    /// All writes go through a single transaction so a challenge can never
    /// exist without its member index (or vice versa).
    pub async fn create_challenge(&self, challenge: &Challenge) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&challenge.id)
            .object(challenge)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add challenge to transaction: {}", e))
            })?;

        for participant in &challenge.participants {
            let member = ChallengeMember {
                challenge_id: challenge.id.clone(),
                user_id: participant.user_id.clone(),
                invited_at: challenge.created_at,
            };
            let doc_id = member_doc_id(&challenge.id, &participant.user_id);

            client
                .fluent()
                .update()
                .in_col(collections::CHALLENGE_MEMBERS)
                .document_id(&doc_id)
                .object(&member)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add member to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            challenge_id = %challenge.id,
            participants = challenge.participants.len(),
            "Challenge created"
        );

        Ok(())
    }

    /// Persist an updated challenge with an optimistic version check.
    ///
    /// The caller mutates the in-memory challenge loaded at version N; the
    /// write only commits if the stored document is still at version N,
    /// otherwise the caller must re-read and retry. Increments `version`
    /// on success.
    pub async fn save_challenge(&self, challenge: &mut Challenge) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let stored: Option<Challenge> = client
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(&challenge.id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read challenge in transaction: {}", e))
            })?;

        let stored = match stored {
            Some(c) => c,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound("Challenge not found".to_string()));
            }
        };

        if stored.version != challenge.version {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(
                "Challenge was modified concurrently, please retry".to_string(),
            ));
        }

        challenge.version += 1;

        client
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&challenge.id)
            .object(challenge)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add challenge to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(())
    }

    /// Atomically store a daily log and the updated challenge.
    ///
    /// The log's deterministic document ID enforces the one-log-per-day
    /// rule: if a document with that ID already exists the transaction is
    /// rolled back and a conflict is returned. The challenge write carries
    /// the same version check as [`save_challenge`].
    ///
    /// [`save_challenge`]: FirestoreDb::save_challenge
    pub async fn commit_daily_log(
        &self,
        challenge: &mut Challenge,
        log: &DailyLog,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let existing: Option<DailyLog> = client
            .fluent()
            .select()
            .by_id_in(collections::DAILY_LOGS)
            .obj()
            .one(&log.id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read log in transaction: {}", e)))?;

        if existing.is_some() {
            let _ = transaction.rollback().await;
            return Err(AppError::Conflict(
                "Already logged for this day".to_string(),
            ));
        }

        let stored: Option<Challenge> = client
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGES)
            .obj()
            .one(&challenge.id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read challenge in transaction: {}", e))
            })?;

        match stored {
            Some(c) if c.version == challenge.version => {}
            Some(_) => {
                let _ = transaction.rollback().await;
                return Err(AppError::Conflict(
                    "Challenge was modified concurrently, please retry".to_string(),
                ));
            }
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound("Challenge not found".to_string()));
            }
        }

        challenge.version += 1;

        client
            .fluent()
            .update()
            .in_col(collections::DAILY_LOGS)
            .document_id(&log.id)
            .object(log)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add log to transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::CHALLENGES)
            .document_id(&challenge.id)
            .object(challenge)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add challenge to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            challenge_id = %challenge.id,
            user_id = %log.user_id,
            log_id = %log.id,
            "Daily log committed"
        );

        Ok(())
    }

    /// List all challenges a user belongs to, via the member join collection.
    pub async fn challenges_for_user(&self, user_id: &str) -> Result<Vec<Challenge>, AppError> {
        let client = self.get_client()?;
        let user_id = user_id.to_string();

        let members: Vec<ChallengeMember> = client
            .fluent()
            .select()
            .from(collections::CHALLENGE_MEMBERS)
            .filter(move |q| q.for_all([q.field("user_id").eq(&user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut challenges: Vec<Challenge> = stream::iter(members)
            .map(|member| async move {
                self.get_challenge(&member.challenge_id).await
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Challenge>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Challenge>>, AppError>>()?
            .into_iter()
            .flatten()
            .collect();

        challenges.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(challenges)
    }

    /// Challenges in a non-terminal status, for the periodic reconcile
    /// sweep.
    pub async fn reconcilable_challenges(&self) -> Result<Vec<Challenge>, AppError> {
        let mut out = Vec::new();
        for status in [ChallengeStatus::Pending, ChallengeStatus::Active] {
            let mut batch: Vec<Challenge> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::CHALLENGES)
                .filter(move |q| {
                    q.for_all([q.field("status").eq(match status {
                        ChallengeStatus::Pending => "pending",
                        _ => "active",
                    })])
                })
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            out.append(&mut batch);
        }
        Ok(out)
    }

    // ─── Daily Log Operations ────────────────────────────────────

    /// All logs for one participant in one challenge, oldest first.
    pub async fn get_logs_for_user(
        &self,
        challenge_id: &str,
        user_id: &str,
    ) -> Result<Vec<DailyLog>, AppError> {
        let challenge_id = challenge_id.to_string();
        let user_id = user_id.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_LOGS)
            .filter(move |q| {
                q.for_all([
                    q.field("challenge_id").eq(&challenge_id),
                    q.field("user_id").eq(&user_id),
                ])
            })
            .order_by([("date", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All logs in a challenge for one normalized day, across participants.
    pub async fn get_logs_for_day(
        &self,
        challenge_id: &str,
        day: DateTime<Utc>,
    ) -> Result<Vec<DailyLog>, AppError> {
        let challenge_id = challenge_id.to_string();

        // Dates are normalized to UTC midnight, so equality on the day is an
        // in-memory filter over the challenge's logs rather than a string
        // comparison against the serialized timestamp.
        let logs: Vec<DailyLog> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::DAILY_LOGS)
            .filter(move |q| q.for_all([q.field("challenge_id").eq(&challenge_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(logs.into_iter().filter(|l| l.date == day).collect())
    }
}

/// Document ID for a member join record.
pub fn member_doc_id(challenge_id: &str, user_id: &str) -> String {
    format!("{}_{}", challenge_id, urlencoding::encode(user_id))
}
