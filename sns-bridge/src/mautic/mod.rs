//! Mautic REST API module.
//!
//! This module provides:
//! - Authenticated GET/POST primitives against the Mautic API
//! - Contact lookup and creation
//! - Do-not-contact suppression updates
//!
//! Non-200 responses on lookups are treated as "no contacts found" rather
//! than errors; only transport failures propagate to callers.

pub mod client;
pub mod contacts;
pub mod dnc;

pub use client::{MauticClient, MauticConfigError};
pub use contacts::{create_contact, find_contact_ids_by_email};
pub use dnc::{add_do_not_contact, DncReason};
