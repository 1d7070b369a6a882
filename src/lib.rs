//! # rag-query
//!
//! A retrieval-augmented question-answering service: documents are indexed
//! offline into a persistent vector store, and questions are answered online
//! by retrieving the most similar fragments, optionally reranking them with
//! a cross-encoder service, and passing them to an LLM for synthesis.
//!
//! ## Architecture
//!
//! The online query path is a strict top-down pipeline:
//!
//! ```text
//!                   ┌──────────────┐
//!                   │   Question   │
//!                   └──────┬───────┘
//!                          │
//!                          ▼
//!               ┌──────────────────────┐
//!               │  Embedding Provider  │
//!               │  (Ollama / OpenAI)   │
//!               └──────────┬───────────┘
//!                          │ query vector
//!                          ▼
//!               ┌──────────────────────┐
//!               │   Similarity Index   │
//!               │  cosine top-N cands  │
//!               └──────────┬───────────┘
//!                          │ N candidates
//!                          ▼
//!               ┌──────────────────────┐
//!               │       Reranker       │
//!               │  remote /rerank or   │
//!               │  passthrough when    │
//!               │  disabled; falls     │
//!               │  back on failure     │
//!               └──────────┬───────────┘
//!                          │ ranked, ≤ top_n
//!                          ▼
//!               ┌──────────────────────┐
//!               │  Truncate to top-K   │
//!               └──────────┬───────────┘
//!                          │ final fragments
//!                          ▼
//!               ┌──────────────────────┐
//!               │  Answer Synthesizer  │
//!               │   (LLM chat call)    │
//!               └──────────┬───────────┘
//!                          │
//!                          ▼
//!               ┌──────────────────────┐
//!               │     QueryAnswer      │
//!               └──────────────────────┘
//! ```
//!
//! A reranking outage degrades ranking quality (back to pure similarity
//! order), never availability: the reranker catches its own failures and
//! returns the leading candidates unchanged.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, paths, LLM and reranker
//! - [`error`] - The `QueryError` taxonomy surfaced to callers
//! - [`models`] - Shared data types: `Fragment`, request/response types
//! - [`index`] - `SimilarityIndex` trait and the persisted cosine vector store
//! - [`indexer`] - Offline path: walk documents, chunk, embed, build the store
//! - [`llm::embeddings`] - Embedding generation via Ollama or OpenAI-compatible APIs
//! - [`llm::rerank`] - Remote cross-encoder reranking with graceful fallback
//! - [`llm::synthesize`] - Answer synthesis from ordered context fragments
//! - [`pipeline`] - The embed → retrieve → rerank → truncate orchestration
//! - [`service`] - `QueryService`: validation, retrieval, synthesis, assembly
//! - [`api`] - Axum HTTP handlers for querying and health checks
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod state;
