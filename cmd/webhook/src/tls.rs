use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustls::ServerConfig;
use rustls::pki_types::CertificateDer;

// Give the kubelet time to finish swapping every projected file.
const RELOAD_DELAY: Duration = Duration::from_secs(5);

pub fn load_tls_config(cert_path: &Path, key_path: &Path) -> anyhow::Result<ServerConfig> {
    let mut cert_reader = BufReader::new(File::open(cert_path)?);
    let mut key_reader = BufReader::new(File::open(key_path)?);

    let certs: Vec<CertificateDer> =
        rustls_pemfile::certs(&mut cert_reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        anyhow::bail!("No certificate found in {}", cert_path.display());
    }

    let key = rustls_pemfile::private_key(&mut key_reader)?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {}", key_path.display()))?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn watch_dirs(cert_path: &Path, key_path: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [cert_path, key_path]
        .iter()
        .filter_map(|p| p.parent())
        .map(|p| {
            if p.as_os_str().is_empty() {
                PathBuf::from(".")
            } else {
                p.to_path_buf()
            }
        })
        .collect();
    dirs.dedup();
    dirs
}

/// Reload `rustls_config` whenever the certificate or key changes on disk.
///
/// Parent directories are watched rather than the files, so the symlink swap
/// Kubernetes does for mounted secrets is picked up. A config that fails to
/// load is logged and the previous one stays in place.
pub async fn watch_tls_files(
    cert_path: PathBuf,
    key_path: PathBuf,
    rustls_config: RustlsConfig,
) -> anyhow::Result<()> {
    watch_with_delay(cert_path, key_path, rustls_config, RELOAD_DELAY).await
}

async fn watch_with_delay(
    cert_path: PathBuf,
    key_path: PathBuf,
    rustls_config: RustlsConfig,
    reload_delay: Duration,
) -> anyhow::Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);

    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) => {
                // a reload is already pending when the channel is full
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("TLS file watch error: {}", e),
        })?;

    for dir in watch_dirs(&cert_path, &key_path) {
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching {} for TLS changes", dir.display());
    }

    while rx.recv().await.is_some() {
        tokio::time::sleep(reload_delay).await;
        while rx.try_recv().is_ok() {}

        match load_tls_config(&cert_path, &key_path) {
            Ok(new_config) => {
                rustls_config.reload_from_config(Arc::new(new_config));
                tracing::info!("Successfully reloaded TLS certificates");
            }
            Err(e) => {
                tracing::error!("Failed to load new TLS config: {}", e);
            }
        }
    }

    Ok(())
}
