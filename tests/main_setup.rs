use serial_test::serial;
use std::{env, panic, path::PathBuf};
use triup_console::{
    AppConfig,
    config::{DEFAULT_FINDINGS_PAGE_SIZE, DEFAULT_USERS_PAGE_SIZE, Env},
};

const CONFIG_VARS: [&str; 6] = [
    "APP_ENV",
    "API_URL",
    "BIND_ADDR",
    "SESSION_STORE_PATH",
    "USERS_PAGE_SIZE",
    "FINDINGS_PAGE_SIZE",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with a clean set of config variables and restores the originals afterward.
fn run_with_env<T, R>(test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_app_config_production_fail_fast() {
    let result = run_with_env(|| {
        panic::catch_unwind(|| {
            unsafe {
                env::set_var("APP_ENV", "production");
            }
            // API_URL is missing.
            AppConfig::load()
        })
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without API_URL"
    );
}

#[test]
#[serial]
fn test_app_config_production_with_api_url() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "production");
            env::set_var("API_URL", "https://triup.example.ac.th");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Production);
    assert_eq!(config.api_url, "https://triup.example.ac.th");
}

#[test]
#[serial]
fn test_app_config_local_env_defaults() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("APP_ENV", "local");
        }
        AppConfig::load()
    });

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.api_url, "http://localhost:8000");
    assert_eq!(config.bind_addr, "127.0.0.1:3000");
    assert_eq!(config.session_store_path, None);
    assert_eq!(config.users_page_size, DEFAULT_USERS_PAGE_SIZE);
    assert_eq!(config.findings_page_size, DEFAULT_FINDINGS_PAGE_SIZE);
}

#[test]
#[serial]
fn test_app_config_overrides() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("BIND_ADDR", "0.0.0.0:8080");
            env::set_var("SESSION_STORE_PATH", "/tmp/console-sessions.json");
            env::set_var("USERS_PAGE_SIZE", "25");
            env::set_var("FINDINGS_PAGE_SIZE", " 7 ");
        }
        AppConfig::load()
    });

    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(
        config.session_store_path,
        Some(PathBuf::from("/tmp/console-sessions.json"))
    );
    assert_eq!(config.users_page_size, 25);
    assert_eq!(config.findings_page_size, 7);
}

#[test]
#[serial]
fn test_app_config_rejects_bad_page_sizes() {
    let config = run_with_env(|| {
        unsafe {
            env::set_var("USERS_PAGE_SIZE", "0");
            env::set_var("FINDINGS_PAGE_SIZE", "many");
            env::set_var("SESSION_STORE_PATH", "   ");
        }
        AppConfig::load()
    });

    assert_eq!(config.users_page_size, DEFAULT_USERS_PAGE_SIZE);
    assert_eq!(config.findings_page_size, DEFAULT_FINDINGS_PAGE_SIZE);
    assert_eq!(config.session_store_path, None);
}
