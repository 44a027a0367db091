use anyhow::Result;

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=proto/gtfs-realtime.proto");

    // Fall back to the bundled protoc when none is configured
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .map_err(|e| anyhow::anyhow!("no bundled protoc for this platform: {:?}", e))?;
        std::env::set_var("PROTOC", protoc);
    }

    let mut config = prost_build::Config::new();
    config.type_attribute(".", "#[derive(serde::Serialize)]");
    config.compile_protos(&["proto/gtfs-realtime.proto"], &["proto/"])?;
    Ok(())
}
