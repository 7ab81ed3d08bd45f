//! # Cube Batch Entry Point
//!
//! Calls into the library's `run()` function.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --release
//! ```

fn main() {
    if let Err(error) = cube_batch::run() {
        eprintln!("cube-batch: {}", error);
        std::process::exit(1);
    }
}
