//! Append-only JSONL journal of popover transitions.

pub mod jsonl;
