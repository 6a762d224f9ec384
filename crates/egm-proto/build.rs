fn main() {
    println!("cargo:rerun-if-changed=proto/egm.proto");
    prost_build::Config::new()
        .compile_protos(&["proto/egm.proto"], &["proto/"])
        .expect("failed to compile egm.proto");
}
