fn main() {
    if !(cfg!(target_os = "linux") && cfg!(target_arch = "x86_64")) {
        panic!(
            "{} only works with linux on x86_64",
            env!("CARGO_PKG_NAME")
        );
    }
}
