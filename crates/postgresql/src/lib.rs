//! Postgres helpers for envkit.
//!
//! - [`executor`] - Run SQL through the `psql` CLI or a native `tokio-postgres` client
//! - [`prisma`] - Drive the Prisma CLI (`migrate deploy`, `migrate reset`, `db push`, `generate`)
//! - [`seed`] - Compile declarative seed-yaml documents into ordered SQL scripts
//!
//! # Seed-yaml at a glance
//!
//! ```yaml
//! vars:
//!   tenant: acme
//! tables:
//!   - table: public.users
//!     upsert_key: [email]
//!     rows:
//!       - ref: alice
//!         values:
//!           email: "alice@${tenant}.test"
//!   - table: public.posts
//!     rows:
//!       - values:
//!           author_id: "@ref:alice.id"
//!           title: Hello
//! ```

pub mod args;
mod connection;
mod error;
pub mod executor;
pub mod prisma;
pub mod seed;
pub mod sql;

pub use args::PostgresArgs;
pub use connection::PgConnection;
pub use error::{PostgresError, SeedError};
pub use executor::{ExecutorFactory, ExecutorKind, QueryResult, SqlExecutor};
pub use prisma::{PrismaCommand, PrismaRunner};
pub use seed::{compile_file, DatabaseScript, SeedDocument, SeedPlan, SeedReport, Statement};
