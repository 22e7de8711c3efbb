//! Strato Core
//!
//! Core types for the Strato stack deployment API.
//!
//! This crate contains:
//! - Domain types: Core business entities (Stack, StackId)
//! - DTOs: Request/response bodies for the HTTP API

pub mod domain;
pub mod dto;
