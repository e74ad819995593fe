//! Core record types for rollcall.
//!
//! This module defines the attendee row stored in the table, along with the
//! enumerations for attendee type and payment status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the attendee entered the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendeeType {
    /// Self-registered through the desk.
    Novo,
    /// Already on the list before registration opened.
    Existente,
}

impl AttendeeType {
    /// The text stored in the table for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Novo => "Novo",
            Self::Existente => "Existente",
        }
    }
}

impl std::fmt::Display for AttendeeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendeeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Novo" => Ok(Self::Novo),
            "Existente" => Ok(Self::Existente),
            other => Err(format!("unknown attendee type '{other}'")),
        }
    }
}

/// Payment state of an attendee.
///
/// The only legal transition is `Pendente` to `Confirmado`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Waiting for a proof of payment.
    Pendente,
    /// A proof of payment was stored.
    #[serde(rename = "Pagamento Confirmado")]
    Confirmado,
}

impl PaymentStatus {
    /// The text stored in the table for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pendente => "Pendente",
            Self::Confirmado => "Pagamento Confirmado",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            // Older sheets spelled out the pending state.
            "Pendente" | "Pagamento Pendente" => Ok(Self::Pendente),
            "Pagamento Confirmado" => Ok(Self::Confirmado),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

/// Normalize a name for matching: trimmed and lower-cased.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One attendee's row in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeRecord {
    /// Display name; unique across the table by [`name_key`].
    pub name: String,

    /// Contact phone number.
    pub phone: String,

    /// How the attendee entered the list.
    #[serde(rename = "type")]
    pub attendee_type: AttendeeType,

    /// Payment state.
    pub status: PaymentStatus,

    /// Path of the stored proof of payment, once confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_path: Option<String>,
}

impl AttendeeRecord {
    /// Create a freshly registered attendee.
    ///
    /// The name and phone are trimmed; the record starts as `Novo` and
    /// `Pendente` with no proof.
    #[must_use]
    pub fn registration(name: &str, phone: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            attendee_type: AttendeeType::Novo,
            status: PaymentStatus::Pendente,
            proof_path: None,
        }
    }

    /// The normalized key of this record's name.
    #[must_use]
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    /// Check if this record's name matches `name`, ignoring case.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.key() == name_key(name)
    }

    /// Check if the payment has been confirmed.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmado
    }
}
