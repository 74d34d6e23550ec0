#![allow(dead_code)]

use mail_intake_module::IntakeConfig;
use tempfile::TempDir;

pub fn start_mockito_server(test_name: &str) -> Option<mockito::ServerGuard> {
    let server = std::panic::catch_unwind(mockito::Server::new);
    match server {
        Ok(server) => Some(server),
        Err(_) => {
            eprintln!("Skipping {test_name}; unable to start mockito server in this environment.");
            None
        }
    }
}

/// Config pointed at a mock Gmail API, downloading into `downloads`.
pub fn intake_config(api_base: &str, token: Option<&str>, downloads: &TempDir) -> IntakeConfig {
    IntakeConfig {
        gmail_authorization: token.map(str::to_string),
        gmail_api_base: api_base.to_string(),
        download_dir: downloads.path().to_path_buf(),
        ..IntakeConfig::default()
    }
}
