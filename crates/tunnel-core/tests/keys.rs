//! Key loading against on-disk fixtures in every supported encoding.

use std::path::PathBuf;

use anyhow::Result;
use mcm_types::KeySource;
use tunnel_core::{KeyDecodeError, SshAuthenticator, TunnelError, keys::load_private_key};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[tokio::test]
async fn loads_plain_openssh_key() -> Result<()> {
    let key = load_private_key(&KeySource::new(fixture("id_ed25519"))).await?;
    assert_eq!(key.algorithm(), russh::keys::Algorithm::Ed25519);
    assert!(!key.is_encrypted());
    Ok(())
}

#[tokio::test]
async fn decrypts_openssh_key_with_passphrase() -> Result<()> {
    let source = KeySource::new(fixture("id_ed25519_encrypted")).with_passphrase("correct horse");
    let key = load_private_key(&source).await?;
    assert!(!key.is_encrypted());
    Ok(())
}

#[tokio::test]
async fn encrypted_openssh_key_without_passphrase_is_a_parse_error() {
    let err = load_private_key(&KeySource::new(fixture("id_ed25519_encrypted")))
        .await
        .unwrap_err();
    match err {
        TunnelError::KeyParse {
            source: KeyDecodeError::PassphraseRequired,
            ..
        } => {}
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn wrong_passphrase_is_a_parse_error() {
    let source = KeySource::new(fixture("id_ed25519_encrypted")).with_passphrase("battery staple");
    let err = load_private_key(&source).await.unwrap_err();
    assert!(
        matches!(
            err,
            TunnelError::KeyParse {
                source: KeyDecodeError::WrongPassphrase,
                ..
            }
        ),
        "{err}"
    );
    assert_eq!(err.phase(), "key material");
}

#[tokio::test]
async fn loads_traditional_rsa_pem() -> Result<()> {
    let key = load_private_key(&KeySource::new(fixture("id_rsa_legacy.pem"))).await?;
    assert!(key.algorithm().is_rsa());
    Ok(())
}

#[tokio::test]
async fn loads_des3_encrypted_rsa_pem() -> Result<()> {
    let source = KeySource::new(fixture("id_rsa_legacy_des3.pem")).with_passphrase("legacy-pass");
    let key = load_private_key(&source).await?;
    assert!(key.algorithm().is_rsa());
    Ok(())
}

#[tokio::test]
async fn des3_encrypted_rsa_pem_needs_passphrase() {
    let err = load_private_key(&KeySource::new(fixture("id_rsa_legacy_des3.pem")))
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            TunnelError::KeyParse {
                source: KeyDecodeError::PassphraseRequired,
                ..
            }
        ),
        "{err}"
    );
}

#[tokio::test]
async fn loads_pkcs8_key() -> Result<()> {
    let key = load_private_key(&KeySource::new(fixture("id_rsa_pkcs8.pem"))).await?;
    assert!(key.algorithm().is_rsa());
    Ok(())
}

#[tokio::test]
async fn missing_key_file_is_a_read_error() {
    let err = SshAuthenticator::from_key_source("ops", &KeySource::new(fixture("does-not-exist")))
        .await
        .err()
        .unwrap();
    match err {
        TunnelError::KeyRead { path, source } => {
            assert!(path.ends_with("does-not-exist"));
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_key_file_is_a_parse_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "just some text\n")?;
    let err = load_private_key(&KeySource::new(&path)).await.unwrap_err();
    assert!(
        matches!(
            err,
            TunnelError::KeyParse {
                source: KeyDecodeError::Unrecognized,
                ..
            }
        ),
        "{err}"
    );
    Ok(())
}
