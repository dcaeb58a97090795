use std::{env, fs, path::Path};

fn main() {
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => dir,
        Err(e) => panic!("OUT_DIR not set by cargo: {e}"),
    };
    let dest = Path::new(&out_dir).join("build_info.rs");

    let name = env::var("CARGO_PKG_NAME").unwrap_or_else(|_| "pg-dropbox-backup".to_string());
    let version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string());
    let build_time = chrono::Utc::now().to_rfc3339();

    let contents = format!(
        "pub const PROJECT_NAME: &str = {name:?};\n\
         pub const PROJECT_VERSION: &str = {version:?};\n\
         pub const BUILD_TIME: &str = {build_time:?};\n"
    );

    if let Err(e) = fs::write(&dest, contents) {
        panic!("failed to write {}: {e}", dest.display());
    }

    println!("cargo:rerun-if-changed=build.rs");
}
