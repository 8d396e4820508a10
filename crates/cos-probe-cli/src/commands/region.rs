use cos_probe_core::{derive_region, DEFAULT_REGION};

pub fn run(endpoint: &str) {
    println!("{}", derive_region(endpoint, DEFAULT_REGION));
}
