fn main() {
    // Embedded default configuration
    println!("cargo:rerun-if-changed=default_lab_config.ron");
}
