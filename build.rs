fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/kv.proto");
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .protoc_arg("--experimental_allow_proto3_optional")
        .compile_protos(&["proto/kv.proto"], &["proto"])
        .unwrap_or_else(|e| panic!("Failed to compile protos {e:?}"));
    Ok(())
}
