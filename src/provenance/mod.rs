//! Run provenance: BLAKE3 digests of artifacts and inputs, JSONL run log.

pub mod eventlog;
pub mod hasher;
