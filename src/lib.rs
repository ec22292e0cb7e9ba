//! Commerce Server, an e-commerce backend
//!
//! Order lifecycle, inventory and returns for a small storefront, backed by
//! SQLite.
//!
//! # Module structure
//!
//! ```text
//! src/
//! ├── core/       # Config, ServerState, Server, background tasks
//! ├── auth/       # JWT, accounts, password hashing, middleware
//! ├── api/        # HTTP routes and handlers
//! ├── db/         # Connection pools, migrations, row models
//! ├── orders/     # Order lifecycle engine, returns, expiry sweep
//! ├── inventory/  # Stock replenishment, audit ledger, catalog reads
//! └── utils/      # AppError, response envelope, pagination, logging
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod inventory;
pub mod orders;
pub mod utils;

pub use auth::{AuthService, CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use db::DbService;
pub use inventory::InventoryService;
pub use orders::OrderService;
pub use utils::{AppError, AppResult};

pub use utils::logger::{init_logger, init_logger_with_file};
