//! Commit history diff search and patch inspection.
//!
//! Binary crate entry point. All CLI logic is in the `cli` module.

// mimalloc returns freed pages to the OS more eagerly than the system
// allocator, which matters when many repositories are searched at once.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod cli;

fn main() {
    cli::run();
}
