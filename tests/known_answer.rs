//! Known-answer container tests
//!
//! Builds containers with a fixed salt and IV and checks every byte
//! against a layout computed directly with the underlying primitives.

use aes::cipher::{BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use sha2::Sha256;
use veilbox::kdf::{KdfParams, Prf};
use veilbox::media::MediaTypeRegistry;
use veilbox::{CipherChoice, Codec, ErrorKind};

const ITERATIONS: u32 = 1000;
const SALT: [u8; 16] = *b"0123456789abcdef";
const IV: [u8; 16] = [0x5a; 16];

fn codec() -> Codec {
    let mut registry = MediaTypeRegistry::new();
    registry.register("text/plain", 1).unwrap();
    Codec::new(KdfParams::new(ITERATIONS, Prf::HmacSha256), registry)
}

fn reference_ciphertext(password: &[u8], cipher: CipherChoice, payload: &[u8]) -> Vec<u8> {
    let mut key = vec![0u8; cipher.key_len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password, &SALT, ITERATIONS, &mut key);
    match cipher {
        CipherChoice::Aes128Cbc => cbc::Encryptor::<aes::Aes128>::new_from_slices(&key, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
        CipherChoice::Aes192Cbc => cbc::Encryptor::<aes::Aes192>::new_from_slices(&key, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
        CipherChoice::Aes256Cbc => cbc::Encryptor::<aes::Aes256>::new_from_slices(&key, &IV)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(payload),
    }
}

fn reference_container(
    password: &[u8],
    cipher: CipherChoice,
    media_id: u32,
    name: &[u8],
    payload: &[u8],
) -> Vec<u8> {
    let ciphertext = reference_ciphertext(password, cipher, payload);
    let mut out = Vec::new();
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&media_id.to_le_bytes());
    let mut name_field = [0u8; 32];
    name_field[..name.len()].copy_from_slice(name);
    out.extend_from_slice(&name_field);
    out.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&SALT);
    out.extend_from_slice(&IV);
    out.extend_from_slice(&ciphertext);
    out
}

#[test]
fn test_container_layout_matches_reference() {
    let codec = codec();
    for cipher in CipherChoice::ALL {
        let container = codec
            .encrypt_with(
                b"hello world",
                b"correct horse",
                cipher,
                "text/plain",
                "hello.txt",
                &SALT,
                &IV,
            )
            .unwrap();

        let expected =
            reference_container(b"correct horse", cipher, 1, b"hello.txt", b"hello world");
        assert_eq!(
            hex::encode(&container),
            hex::encode(&expected),
            "layout mismatch for {}",
            cipher
        );
        assert_eq!(container.len(), 64 + 16 + 16 + 16);
    }
}

#[test]
fn test_block_aligned_payload_gets_full_padding_block() {
    let codec = codec();
    let payload = [0x11u8; 32];
    let container = codec
        .encrypt_with(
            &payload,
            b"pw",
            CipherChoice::Aes128Cbc,
            "application/octet-stream",
            "blocks.bin",
            &SALT,
            &IV,
        )
        .unwrap();

    assert_eq!(&container[40..44], &48u32.to_le_bytes());
    assert_eq!(
        container,
        reference_container(b"pw", CipherChoice::Aes128Cbc, 0, b"blocks.bin", &payload)
    );
}

#[test]
fn test_reference_container_decrypts() {
    let container = reference_container(
        b"correct horse",
        CipherChoice::Aes256Cbc,
        1,
        b"hello.txt",
        b"hello world",
    );

    let decrypted = codec()
        .decrypt(&container, b"correct horse", CipherChoice::Aes256Cbc)
        .unwrap();
    assert_eq!(decrypted.payload, b"hello world");
    assert_eq!(decrypted.media_type, "text/plain");
    assert_eq!(decrypted.original_name, "hello.txt");
}

#[test]
fn test_future_version_rejected() {
    let mut container = reference_container(
        b"pw",
        CipherChoice::Aes256Cbc,
        0,
        b"x",
        b"payload",
    );
    container[0..4].copy_from_slice(&2u32.to_le_bytes());

    let err = codec()
        .decrypt(&container, b"pw", CipherChoice::Aes256Cbc)
        .unwrap_err();
    assert_eq!(err.kind, Some(ErrorKind::UnsupportedVersion));
}

#[test]
fn test_armored_reference_roundtrip() {
    let container = reference_container(
        b"pw",
        CipherChoice::Aes192Cbc,
        0,
        b"note",
        b"armored payload",
    );
    let armored = veilbox::varmor::wrap(&container);
    assert!(armored.starts_with("veilbox1:"));

    let unwrapped = veilbox::varmor::unwrap(&armored).unwrap();
    assert_eq!(unwrapped, container);
    let decrypted = codec()
        .decrypt(&unwrapped, b"pw", CipherChoice::Aes192Cbc)
        .unwrap();
    assert_eq!(decrypted.payload, b"armored payload");
}
