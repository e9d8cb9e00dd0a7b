//! # Confluence MCP
//!
//! Read-only access to Confluence for AI tools. Two MCP tools,
//! `confluence_search` (CQL) and `confluence_get_content` (one page by
//! id), work against both Confluence Cloud and Server/Data Center.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌───────────────────┐
//! │ MCP host │──▶│ McpBridge    │──▶│ ToolRegistry      │
//! │ / CLI    │   │ stdio | HTTP │   │ search, get       │
//! └──────────┘   └──────────────┘   └─────────┬─────────┘
//!                                             ▼
//!                                  ┌─────────────────────┐
//!                                  │ ConfluenceGateway   │
//!                                  │ Cloud  |  OnPrem    │
//!                                  │ client → mapper     │
//!                                  └─────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML + environment configuration |
//! | [`auth`] | Credentials and the `Authorization` header |
//! | [`http`] | JSON GET with timeout and typed errors |
//! | [`links`] | URL joining and web-link resolution |
//! | [`cql`] | CQL syntax validation and default-condition merging |
//! | [`models`] | Normalized request and result types |
//! | [`confluence`] | Gateway trait, factory, and the two dialects |
//! | [`diagnostics`] | Mapper warnings |
//! | [`markdown`] | HTML to Markdown, char-based truncation |
//! | [`tools`] | Tool trait, registry, the two tools |
//! | [`mcp`] | rmcp `ServerHandler` over the registry |
//! | [`server`] | stdio and Streamable HTTP transports |

pub mod auth;
pub mod config;
pub mod confluence;
pub mod cql;
pub mod diagnostics;
pub mod http;
pub mod links;
pub mod markdown;
pub mod mcp;
pub mod models;
pub mod server;
pub mod tools;
