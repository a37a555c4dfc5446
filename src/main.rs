//! # Virtual Lab Entry Point
//!
//! Runs one experiment headlessly and prints its recorded readouts as CSV.
//!
//! ```text
//! virtual-lab [EXPERIMENT] [--config PATH] [--csv PATH] [--set ID=VALUE]...
//! ```
//!
//! Set `RUST_LOG=info` (or `debug`) to follow the simulation lifecycle.
//! The actual driver lives in the `app` module.

fn main() {
    virtual_lab::app::run();
}
