//! The reconciliation engine: classify two event collections into
//! equal / updated / file-only / remote-only.
//!
//! Pure given its inputs. Signatures identify "the same birthday"; full
//! equality additionally compares the normalized remote projection, so the
//! caller can tell "changed presentation" apart from "different event" and
//! update in place instead of deleting and recreating.

use std::collections::BTreeMap;

use crate::error::{BdayError, BdayResult};
use crate::event::{Event, Signature};

/// What to do about duplicate signatures on the remote side. The file side
/// always fails: the reader rejects duplicates, so one surviving to this
/// point is a bug upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Fail with an error naming the duplicates (mutating commands).
    Fail,
    /// Keep the first of each signature and record the rest so the caller
    /// can warn (read-only display commands).
    Tolerate,
}

/// Result of comparing file events against remote events. The four buckets
/// partition the union of both inputs' signatures.
#[derive(Debug, Default)]
pub struct Reconciliation {
    /// Same signature, same normalized remote content.
    pub equal: Vec<Event>,
    /// Same signature, different content: update in place. Holds the file
    /// side; the uploader re-pairs with the remote side by signature.
    pub updated: Vec<Event>,
    /// Only in the file: create remotely.
    pub file_only: Vec<Event>,
    /// Only in the calendar: delete remotely.
    pub remote_only: Vec<Event>,
    /// Remote events dropped under [`DuplicatePolicy::Tolerate`].
    pub remote_duplicates: Vec<Event>,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !self.updated.is_empty() || !self.file_only.is_empty() || !self.remote_only.is_empty()
    }
}

pub fn compare(
    file_events: &[Event],
    remote_events: &[Event],
    policy: DuplicatePolicy,
) -> BdayResult<Reconciliation> {
    let (file_map, file_extras) = index_by_signature(file_events);
    if !file_extras.is_empty() {
        return Err(BdayError::DuplicateSignatures {
            source_name: "The input file".to_string(),
            details: duplicate_details(&file_extras),
        });
    }

    let (remote_map, remote_extras) = index_by_signature(remote_events);
    let remote_duplicates = if remote_extras.is_empty() {
        Vec::new()
    } else {
        match policy {
            DuplicatePolicy::Fail => {
                return Err(BdayError::DuplicateSignatures {
                    source_name: "The remote calendar".to_string(),
                    details: duplicate_details(&remote_extras),
                });
            }
            DuplicatePolicy::Tolerate => {
                remote_extras.iter().map(|e| (*e).clone()).collect()
            }
        }
    };

    let mut result = Reconciliation {
        remote_duplicates,
        ..Reconciliation::default()
    };

    // First split by signature, then by full content. BTreeMap iteration
    // keeps every bucket sorted by signature.
    for (signature, file_event) in &file_map {
        match remote_map.get(signature) {
            Some(remote_event) => {
                if file_event.normalized_projection()?
                    == remote_event.normalized_projection()?
                {
                    result.equal.push((*file_event).clone());
                } else {
                    result.updated.push((*file_event).clone());
                }
            }
            None => result.file_only.push((*file_event).clone()),
        }
    }
    for (signature, remote_event) in &remote_map {
        if !file_map.contains_key(signature) {
            result.remote_only.push((*remote_event).clone());
        }
    }

    Ok(result)
}

/// Map each signature to its first occurrence; later occurrences are
/// returned separately as duplicates.
fn index_by_signature(events: &[Event]) -> (BTreeMap<Signature, &Event>, Vec<&Event>) {
    let mut map: BTreeMap<Signature, &Event> = BTreeMap::new();
    let mut extras = Vec::new();
    for event in events {
        let signature = event.signature();
        if map.contains_key(&signature) {
            extras.push(event);
        } else {
            map.insert(signature, event);
        }
    }
    (map, extras)
}

fn duplicate_details(extras: &[&Event]) -> String {
    extras
        .iter()
        .map(|event| format!("  {}", event.signature()))
        .collect::<Vec<_>>()
        .join("\n")
}
