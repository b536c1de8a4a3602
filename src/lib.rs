//! envkit - test environment tooling.
//!
//! One binary that seeds and inspects the backing services of a test
//! environment:
//!
//! - `opensearch` - index lifecycle, bulk seeding, search
//! - `mongodb` - collection seeding and queries
//! - `postgres` - queries, SQL scripts, Prisma migrations and `seed-yaml`
//! - `api-virtual` - a YAML-driven virtual API server
//!
//! The backends live in their own crates; this crate holds the CLI and the
//! glue that turns parsed commands into calls on them.

pub mod api_virtual;
pub mod cli;
pub mod mongodb;
pub mod opensearch;
pub mod postgresql;

/// Print command output, skipping empty renders.
pub(crate) fn print_output(rendered: String) {
    if !rendered.is_empty() {
        println!("{rendered}");
    }
}
