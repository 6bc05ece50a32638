// The system BLAS backends of `ndarray-linalg` need the LAPACK libraries linked explicitly.
#[cfg(any(feature = "openblas-system", feature = "netlib-system"))]
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for lib in &["lapacke", "lapack", "cblas"] {
        println!("cargo:rustc-link-lib={}", lib);
    }
}

#[cfg(not(any(feature = "openblas-system", feature = "netlib-system")))]
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
}
