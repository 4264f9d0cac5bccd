//! Shared utilities for integration testing.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Generate a self-signed certificate and write it as a single PEM bundle
/// (certificate followed by private key). Returns the directory guard and
/// the bundle path; the file lives until the guard drops.
#[allow(dead_code)]
pub fn self_signed_cert_pem() -> (TempDir, PathBuf) {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let cert = params.self_signed(&key_pair).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.pem");
    let bundle = format!("{}{}", cert.pem(), key_pair.serialize_pem());
    fs::write(&path, bundle).unwrap();

    (dir, path)
}

/// Reserve a port that is currently free, then release it. Racy by nature,
/// but good enough to provoke "address in use" against a second bind.
#[allow(dead_code)]
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}
