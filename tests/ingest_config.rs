use std::net::{IpAddr, Ipv4Addr};
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use ts_ingest::config::IngestConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "TS_INGEST_CONFIG",
        "TS_INGEST_BIND_ADDR",
        "TS_INGEST_PORT",
        "TS_INGEST_RECV_TIMEOUT_MS",
        "TS_INGEST_BUFFER_BYTES",
        "TS_INGEST_PACKETS_PER_UNIT",
        "TS_INGEST_MULTICAST_GROUP",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "listen": {
            "addr": "127.0.0.1",
            "port": 6000,
            "recv_timeout_ms": 250
        },
        "buffer": {
            "bytes": 100000,
            "packets_per_unit": 7
        },
        "multicast": {
            "group": "239.1.1.1"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("TS_INGEST_CONFIG", file.path());
    std::env::set_var("TS_INGEST_PORT", "6100");
    std::env::set_var("TS_INGEST_BUFFER_BYTES", "13160");

    let cfg = IngestConfig::load().expect("load config");

    assert_eq!(cfg.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(cfg.port, 6100);
    assert_eq!(cfg.recv_timeout.as_millis(), 250);
    assert_eq!(cfg.buffer_bytes, 13160);
    assert_eq!(cfg.packets_per_unit, 7);
    assert_eq!(cfg.multicast_group, Some(Ipv4Addr::new(239, 1, 1, 1)));

    clear_env();
}

#[test]
fn loads_toml_config_and_rounds_buffer() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[listen]
port = 7000

[buffer]
bytes = 4000
packets_per_unit = 2
"#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = IngestConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.port, 7000);
    assert_eq!(cfg.packets_per_unit, 2);
    // 4000 bytes holds ten whole 376-byte units.
    assert_eq!(cfg.buffer_bytes, 3760);

    let options = cfg.options().expect("options");
    assert_eq!(options.layout.unit_size(), 376);
    assert_eq!(options.buffer_capacity, 3760);

    clear_env();
}

#[test]
fn defaults_apply_without_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = IngestConfig::load().expect("load config");
    assert_eq!(cfg.port, 5000);
    assert_eq!(cfg.bind_addr, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(cfg.packets_per_unit, 7);
    assert_eq!(cfg.buffer_bytes % 1316, 0);
    assert!(cfg.multicast_group.is_none());
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("TS_INGEST_PORT", "not-a-port");
    assert!(IngestConfig::load().is_err());
    clear_env();

    std::env::set_var("TS_INGEST_PACKETS_PER_UNIT", "8");
    assert!(IngestConfig::load().is_err());
    clear_env();

    std::env::set_var("TS_INGEST_RECV_TIMEOUT_MS", "0");
    assert!(IngestConfig::load().is_err());
    clear_env();
}
