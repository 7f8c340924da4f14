use account_sync::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const TEST_KEY_B64: &str = "YWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWFhYWE=";

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    unsafe {
        env::remove_var("ACCOUNT_SYNC_PROFILE");
        env::remove_var("ACCOUNT_SYNC_API_BIND_ADDR");
        env::remove_var("ACCOUNT_SYNC_LOG_LEVEL");
        env::remove_var("ACCOUNT_SYNC_CRYPTO_KEY");
        env::remove_var("ACCOUNT_SYNC_PLUGIN_ENDPOINTS");
        env::remove_var("ACCOUNT_SYNC_EXECUTOR_CONCURRENCY");
        env::remove_var("ACCOUNT_SYNC_SCHEDULER_ENABLED");
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("ACCOUNT_SYNC_CRYPTO_KEY", TEST_KEY_B64);
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.crypto_key.as_deref(), Some(&[b'a'; 32][..]));
    assert!(cfg.scheduler.enabled);
    assert!(cfg.executor.enabled);
    assert_eq!(cfg.jobs.duplicate_window_minutes, 10);
    assert!(cfg.plugin.endpoints.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "ACCOUNT_SYNC_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "ACCOUNT_SYNC_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "ACCOUNT_SYNC_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        &format!(
            "ACCOUNT_SYNC_PROFILE=test\nACCOUNT_SYNC_API_BIND_ADDR=127.0.0.1:4000\nACCOUNT_SYNC_CRYPTO_KEY={TEST_KEY_B64}\n"
        ),
    );

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "ACCOUNT_SYNC_API_BIND_ADDR=127.0.0.1:3000\nACCOUNT_SYNC_EXECUTOR_CONCURRENCY=2\n",
    );

    unsafe {
        env::set_var("ACCOUNT_SYNC_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("ACCOUNT_SYNC_CRYPTO_KEY", TEST_KEY_B64);
    }

    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.executor.concurrency, 2);

    clear_env();
}

#[test]
fn plugin_endpoints_and_flags_are_parsed() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("ACCOUNT_SYNC_CRYPTO_KEY", TEST_KEY_B64);
        env::set_var(
            "ACCOUNT_SYNC_PLUGIN_ENDPOINTS",
            "plugin-aws=http://aws-collector:50051/@1.2, plugin-gcp=http://gcp-collector:50051",
        );
        env::set_var("ACCOUNT_SYNC_SCHEDULER_ENABLED", "false");
    }

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let cfg = loader.load().expect("config loads with plugin endpoints");

    assert!(!cfg.scheduler.enabled);
    assert_eq!(cfg.plugin.endpoints.len(), 2);
    let aws = &cfg.plugin.endpoints[0];
    assert_eq!(aws.plugin_id, "plugin-aws");
    assert_eq!(aws.endpoint, "http://aws-collector:50051");
    assert_eq!(aws.version.as_deref(), Some("1.2"));
    assert_eq!(cfg.plugin.endpoints[1].version, None);

    clear_env();
}

#[test]
fn missing_crypto_key_is_rejected() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("crypto key is required");
    assert!(format!("{}", err).contains("crypto key is missing"));
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    unsafe {
        env::set_var("ACCOUNT_SYNC_API_BIND_ADDR", "not-an-addr");
        env::set_var("ACCOUNT_SYNC_CRYPTO_KEY", TEST_KEY_B64);
    }
    let temp_dir = TempDir::new().unwrap();
    let loader = ConfigLoader::with_base_dir(PathBuf::from(temp_dir.path()));
    let err = loader.load().expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}
