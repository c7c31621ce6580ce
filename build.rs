fn git(args: &[&str]) -> Option<String> {
    std::process::Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let tagged = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();

    // Release tags print the bare version; everything else carries the commit.
    let label = match git(&["rev-parse", "--short", "HEAD"]) {
        Some(hash) if !tagged && !hash.is_empty() => format!("{pkg_version}-dev+{hash}"),
        _ => pkg_version,
    };

    println!("cargo:rustc-env=STATIC_I18N_VERSION={label}");
}
