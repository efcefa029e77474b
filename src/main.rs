//! sqlguard binary entry point
//!
//! Everything lives in `cli::run`; this shim only turns its error into
//! a stderr line and a nonzero exit, which is what the review gate in
//! CI keys off.

use sqlguard::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
