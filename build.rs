fn main() {
    // Npcap import libraries are only needed when targeting Windows
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("windows") {
        println!("cargo:rustc-link-search=native=lib");
        println!("cargo:rustc-link-lib=wpcap");
        println!("cargo:rustc-link-lib=Packet");
    }

    println!("cargo:rerun-if-changed=lib");
}
