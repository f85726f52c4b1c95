// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph storage
//!
//! This module provides:
//! - An in-memory quad store with subject, predicate and object indexes
//! - The [`Producer`](crate::exec::Producer) implementation the solver reads

pub mod memory_store;

pub use memory_store::MemoryStore;
