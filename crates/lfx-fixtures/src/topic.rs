//! # Topic Fixture
//!
//! Creates a consensus topic administered by the operator, publishes to it
//! as named actors, and listens for the first message.
//!
//! Publishing runs through a client operating as the publishing actor, so
//! the actor pays for and signs the message. A co-signed publish adds
//! further actors' signatures for threshold submit keys.
//!
//! `subscribe_once` returns immediately. The listener runs as its own task:
//! it waits for the mirror delay, subscribes from the start of the topic's
//! history, and unsubscribes after the first message.

use std::time::Duration;

use chrono::{DateTime, Utc};
use lfx_core::TopicId;
use lfx_crypto::{Ed25519KeyPair, KeyPolicy, ThresholdKey};
use lfx_ledger::{LedgerError, Receipt, TopicConfig, TopicMessage};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::error::{ensure_success, FixtureError, FixtureKind};
use crate::registry::Registry;

pub struct TopicFixture {
    registry: Registry,
    topic: RwLock<Option<TopicId>>,
    mirror_delay: Duration,
}

impl TopicFixture {
    pub fn new(registry: Registry, mirror_delay: Duration) -> Self {
        Self {
            registry,
            topic: RwLock::new(None),
            mirror_delay,
        }
    }

    /// The current topic, or `AssetNotInitialized`.
    pub fn topic_id(&self) -> Result<TopicId, FixtureError> {
        self.topic.read().ok_or(FixtureError::AssetNotInitialized {
            kind: FixtureKind::Topic,
        })
    }

    /// A `required`-of-n key over the named actors' public keys.
    pub async fn threshold_key(
        &self,
        actors: &[&str],
        required: u32,
    ) -> Result<KeyPolicy, FixtureError> {
        let mut members = Vec::with_capacity(actors.len());
        for actor in actors {
            members.push(self.registry.resolve(actor).await?.public_key());
        }
        let key = ThresholdKey::new(members, required)
            .map_err(|err| FixtureError::InvalidThreshold(err.to_string()))?;
        Ok(KeyPolicy::Threshold(key))
    }

    /// Create a topic administered and renewed by the operator, and make it
    /// the current one.
    pub async fn create(
        &self,
        memo: &str,
        submit_key: Option<KeyPolicy>,
    ) -> Result<TopicId, FixtureError> {
        let admin = self.registry.admin()?;
        let config = TopicConfig {
            memo: memo.to_string(),
            admin_key: Some(admin.public_key()),
            submit_key: submit_key.clone(),
            auto_renew_account: Some(admin.account()),
        };
        let receipt = self
            .registry
            .ledger()
            .create_topic(&config, &[admin.key()])
            .await?;
        ensure_success("topic create", receipt.status, || {
            format!("memo {memo:?}, operator {}", admin.account())
        })?;
        let topic = receipt.topic_id.ok_or_else(|| {
            LedgerError::InvalidTransaction(format!(
                "topic create {} returned no topic id",
                receipt.transaction_id
            ))
        })?;
        match &submit_key {
            Some(policy) => tracing::info!(%topic, memo, submit_key = %policy, "topic created"),
            None => tracing::info!(%topic, memo, "topic created"),
        }
        *self.topic.write() = Some(topic);
        Ok(topic)
    }

    /// Publish `message` as `actor`.
    pub async fn publish(&self, message: &str, actor: &str) -> Result<Receipt, FixtureError> {
        self.publish_cosigned(message, actor, &[]).await
    }

    /// Publish `message` as `publisher`, co-signed by `cosigners`.
    pub async fn publish_cosigned(
        &self,
        message: &str,
        publisher: &str,
        cosigners: &[&str],
    ) -> Result<Receipt, FixtureError> {
        let topic = self.topic_id()?;
        let publisher = self.registry.resolve(publisher).await?;
        let mut keys = Vec::with_capacity(cosigners.len());
        for name in cosigners {
            keys.push(self.registry.resolve(name).await?);
        }
        let signers: Vec<&Ed25519KeyPair> = keys.iter().map(|identity| identity.key()).collect();

        let client = self
            .registry
            .ledger()
            .with_operator(publisher.account(), publisher.key().clone());
        let receipt = client
            .publish_to_topic(topic, message.as_bytes(), &signers)
            .await?;
        tracing::info!(
            %topic,
            publisher = %publisher.name(),
            cosigners = cosigners.len(),
            status = %receipt.status,
            "publish"
        );
        ensure_success("topic message", receipt.status, || {
            format!(
                "{message:?} to topic {topic} by {publisher}, {} signer(s)",
                cosigners.len() + 1
            )
        })?;
        Ok(receipt)
    }

    /// Start a one-shot listener on the current topic.
    pub fn subscribe_once(&self) -> Result<PendingMessage, FixtureError> {
        let topic = self.topic_id()?;
        let ledger = std::sync::Arc::clone(self.registry.ledger());
        let delay = self.mirror_delay;
        let task = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut subscription = match ledger
                .subscribe_topic(topic, DateTime::<Utc>::UNIX_EPOCH)
                .await
            {
                Ok(subscription) => subscription,
                Err(err) => return Err(FixtureError::Ledger(err)),
            };
            tracing::debug!(%topic, subscription = %subscription.id(), "subscribed");
            let next = subscription.next().await;
            subscription.unsubscribe();
            match next {
                Some(Ok(message)) => {
                    tracing::info!(
                        %topic,
                        sequence = message.sequence_number,
                        contents = %message.contents_lossy(),
                        "message received"
                    );
                    Ok(message)
                }
                Some(Err(err)) => {
                    tracing::error!(%topic, error = %err, "subscription error");
                    Err(FixtureError::Subscription(err.to_string()))
                }
                None => Err(FixtureError::Subscription(format!(
                    "topic {topic} stream ended before a message arrived"
                ))),
            }
        });
        Ok(PendingMessage { topic, task })
    }
}

/// A running one-shot topic listener.
#[derive(Debug)]
pub struct PendingMessage {
    topic: TopicId,
    task: JoinHandle<Result<TopicMessage, FixtureError>>,
}

impl PendingMessage {
    pub fn topic(&self) -> TopicId {
        self.topic
    }

    /// Whether the listener has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the first message.
    pub async fn received(self) -> Result<TopicMessage, FixtureError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(FixtureError::Subscription(format!(
                "listener on topic {} stopped: {err}",
                self.topic
            ))),
        }
    }

    /// Stop listening without waiting for a message.
    pub fn cancel(self) {
        self.task.abort();
    }
}
