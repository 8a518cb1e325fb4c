use kubelet_volume_exporter::config::Config;

#[test]
fn test_config_load() {
    // This assumes config/Default.toml exists relative to where cargo test is run
    let config_res = Config::load("config/Default.toml");
    assert!(config_res.is_ok(), "Failed to load default config");

    let config = config_res.unwrap();
    assert_eq!(config.server.port, 8080);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let config = Config::load("config/does-not-exist").expect("missing file is optional");
    assert_eq!(config.kubelet.endpoint, "https://127.0.0.1:10250");
}
