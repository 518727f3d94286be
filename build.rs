use std::error::Error;
use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn Error>> {
    // VERGEN_GIT_DESCRIBE feeds the full version string reported by --version
    EmitBuilder::builder()
        .fail_on_error()
        .all_git()
        .git_describe(true, false, Some("ThisPatternShouldNotMatchAnythingEver"))
        .emit()?;

    // track the manifest and sources so a dirty tree is reflected in the version
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=src");
    Ok(())
}
