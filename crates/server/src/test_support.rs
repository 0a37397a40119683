use std::{
    path::Path,
    sync::{Mutex, MutexGuard, OnceLock},
};

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    prev_database_url: Option<String>,
    prev_asset_dir: Option<String>,
    prev_api_token: Option<String>,
    prev_localhost_bypass: Option<String>,
}

impl TestEnvGuard {
    pub fn new(temp_root: &Path, db_url: String) -> Self {
        Self::with_access_control(temp_root, db_url, None, false)
    }

    pub fn with_access_control(
        temp_root: &Path,
        db_url: String,
        api_token: Option<&str>,
        allow_localhost_bypass: bool,
    ) -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let prev_database_url = std::env::var("AVEE_DATABASE_URL").ok();
        let prev_asset_dir = std::env::var("AVEE_ASSET_DIR").ok();
        let prev_api_token = std::env::var("AVEE_API_TOKEN").ok();
        let prev_localhost_bypass = std::env::var("AVEE_ALLOW_LOCALHOST_BYPASS").ok();

        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            std::env::set_var("AVEE_ASSET_DIR", temp_root);
            std::env::set_var("AVEE_DATABASE_URL", db_url);
            match api_token {
                Some(token) => std::env::set_var("AVEE_API_TOKEN", token),
                None => std::env::remove_var("AVEE_API_TOKEN"),
            }
            if allow_localhost_bypass {
                std::env::set_var("AVEE_ALLOW_LOCALHOST_BYPASS", "1");
            } else {
                std::env::remove_var("AVEE_ALLOW_LOCALHOST_BYPASS");
            }
        }

        Self {
            _lock: lock,
            prev_database_url,
            prev_asset_dir,
            prev_api_token,
            prev_localhost_bypass,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            match &self.prev_database_url {
                Some(value) => std::env::set_var("AVEE_DATABASE_URL", value),
                None => std::env::remove_var("AVEE_DATABASE_URL"),
            }
            match &self.prev_asset_dir {
                Some(value) => std::env::set_var("AVEE_ASSET_DIR", value),
                None => std::env::remove_var("AVEE_ASSET_DIR"),
            }
            match &self.prev_api_token {
                Some(value) => std::env::set_var("AVEE_API_TOKEN", value),
                None => std::env::remove_var("AVEE_API_TOKEN"),
            }
            match &self.prev_localhost_bypass {
                Some(value) => std::env::set_var("AVEE_ALLOW_LOCALHOST_BYPASS", value),
                None => std::env::remove_var("AVEE_ALLOW_LOCALHOST_BYPASS"),
            }
        }
    }
}
