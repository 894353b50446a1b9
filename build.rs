fn main() {
    let pkg_version = if let Ok(date) = std::env::var("DATE") {
        format!("{}.{}", env!("CARGO_PKG_VERSION"), date)
    } else {
        env!("CARGO_PKG_VERSION").to_string()
    };

    let full_version = match std::env::var("SOURCE_VERSION") {
        Ok(hash) if !hash.is_empty() => format!("{} ({})", pkg_version, hash),
        _ => pkg_version.clone(),
    };

    println!("cargo:rustc-env=SIMPLE_VERSION={}", pkg_version);
    println!("cargo:rustc-env=FULL_VERSION={}", full_version);
    println!("cargo:rerun-if-env-changed=DATE");
    println!("cargo:rerun-if-env-changed=SOURCE_VERSION");
}
