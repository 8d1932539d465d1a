//! Audit trail
//!
//! Every mutation that reaches the snapshot produces one [`AuditEvent`].
//! Events are recorded after the persist succeeds, never before.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guild_rbac::{DelegationKind, PrincipalId, RoleId, TenantId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// What changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditKind {
    /// A command grant was added.
    Granted {
        tenant: TenantId,
        principal: PrincipalId,
        command: String,
        subcommand: Option<String>,
    },
    /// A command grant was removed.
    Revoked {
        tenant: TenantId,
        principal: PrincipalId,
        command: String,
        subcommand: Option<String>,
    },
    /// The full wildcard was granted.
    WildcardGranted {
        tenant: TenantId,
        principal: PrincipalId,
    },
    /// The full wildcard was revoked.
    WildcardRevoked {
        tenant: TenantId,
        principal: PrincipalId,
    },
    /// A role delegate was added.
    DelegateAdded {
        kind: DelegationKind,
        role: RoleId,
        principal: PrincipalId,
    },
    /// A role delegate was removed.
    DelegateRemoved {
        kind: DelegationKind,
        role: RoleId,
        principal: PrincipalId,
    },
}

impl AuditKind {
    /// Short event name for log lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::Granted { .. } => "granted",
            AuditKind::Revoked { .. } => "revoked",
            AuditKind::WildcardGranted { .. } => "wildcard_granted",
            AuditKind::WildcardRevoked { .. } => "wildcard_revoked",
            AuditKind::DelegateAdded { .. } => "delegate_added",
            AuditKind::DelegateRemoved { .. } => "delegate_removed",
        }
    }
}

/// One persisted mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: Uuid,

    /// When the mutation was persisted
    pub timestamp: DateTime<Utc>,

    /// The change itself
    pub kind: AuditKind,
}

impl AuditEvent {
    /// Create an event stamped now.
    pub fn new(kind: AuditKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Receiver of audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Record an event. Sinks must not fail the mutation that produced it.
    async fn record(&self, event: AuditEvent);
}

/// Writes events as `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            audit_id = %event.id,
            event = event.kind.as_str(),
            detail = ?event.kind,
            "permission change persisted"
        );
    }
}

/// Keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Recorded kinds, oldest first.
    pub async fn kinds(&self) -> Vec<AuditKind> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.kind.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }
}
