use std::io::{self, Read};

use sha2::Digest as _;

use cask_types::Address;

use crate::algorithm::HashAlgorithm;

/// Read buffer size for [`digest_reader`]. Inputs are hashed in bounded
/// chunks so arbitrarily large streams never need to be memory-resident.
const CHUNK_SIZE: usize = 64 * 1024;

/// Incremental content hasher.
///
/// Feed bytes with [`update`](Self::update) in chunks of any size; the
/// resulting address depends only on the concatenated byte sequence, never
/// on how it was chunked.
pub struct Digester {
    inner: Inner,
}

enum Inner {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    /// Create a digester for the given algorithm.
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let inner = match algorithm {
            HashAlgorithm::Sha256 => Inner::Sha256(sha2::Sha256::new()),
            HashAlgorithm::Blake3 => Inner::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self { inner }
    }

    /// Feed a chunk of input.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Inner::Sha256(hasher) => {
                hasher.update(data);
            }
            Inner::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    /// Consume the digester and produce the address of everything fed so far.
    pub fn finalize(self) -> Address {
        match self.inner {
            Inner::Sha256(hasher) => {
                let digest: [u8; 32] = hasher.finalize().into();
                Address::from_digest(digest)
            }
            Inner::Blake3(hasher) => Address::from_digest(*hasher.finalize().as_bytes()),
        }
    }

    /// The algorithm this digester was created with.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self.inner {
            Inner::Sha256(_) => HashAlgorithm::Sha256,
            Inner::Blake3(_) => HashAlgorithm::Blake3,
        }
    }
}

impl std::fmt::Debug for Digester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Digester")
            .field("algorithm", &self.algorithm())
            .finish()
    }
}

/// Hash an in-memory byte slice.
pub fn digest_bytes(algorithm: HashAlgorithm, data: &[u8]) -> Address {
    let mut digester = Digester::new(algorithm);
    digester.update(data);
    digester.finalize()
}

/// Hash a reader to exhaustion in bounded chunks.
///
/// The only error condition is a read failure from the source, which is
/// propagated unchanged.
pub fn digest_reader<R: Read>(algorithm: HashAlgorithm, mut reader: R) -> io::Result<Address> {
    let mut digester = Digester::new(algorithm);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    Ok(digester.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// SHA-256 of the empty input.
    const SHA256_EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    /// SHA-256 of `b"test"`.
    const SHA256_TEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
    /// BLAKE3 of the empty input.
    const BLAKE3_EMPTY: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

    #[test]
    fn sha256_known_vectors() {
        assert_eq!(
            digest_bytes(HashAlgorithm::Sha256, b"").to_hex(),
            SHA256_EMPTY
        );
        assert_eq!(
            digest_bytes(HashAlgorithm::Sha256, b"test").to_hex(),
            SHA256_TEST
        );
    }

    #[test]
    fn blake3_known_vector() {
        assert_eq!(
            digest_bytes(HashAlgorithm::Blake3, b"").to_hex(),
            BLAKE3_EMPTY
        );
    }

    #[test]
    fn digest_is_deterministic() {
        let a = digest_bytes(HashAlgorithm::Sha256, b"hello world");
        let b = digest_bytes(HashAlgorithm::Sha256, b"hello world");
        assert_eq!(a, b);
    }

    #[test]
    fn different_content_differs() {
        let a = digest_bytes(HashAlgorithm::Sha256, b"hello");
        let b = digest_bytes(HashAlgorithm::Sha256, b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn algorithms_disagree_on_same_content() {
        let sha = digest_bytes(HashAlgorithm::Sha256, b"content");
        let blake = digest_bytes(HashAlgorithm::Blake3, b"content");
        assert_ne!(sha, blake);
    }

    #[test]
    fn chunking_does_not_affect_digest() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = digest_bytes(HashAlgorithm::Blake3, data);

        let mut digester = Digester::new(HashAlgorithm::Blake3);
        for chunk in data.chunks(7) {
            digester.update(chunk);
        }
        assert_eq!(digester.finalize(), whole);

        let mut byte_by_byte = Digester::new(HashAlgorithm::Blake3);
        for byte in data {
            byte_by_byte.update(std::slice::from_ref(byte));
        }
        assert_eq!(byte_by_byte.finalize(), whole);
    }

    #[test]
    fn digest_reader_matches_digest_bytes() {
        let data = vec![0x5a; 3 * CHUNK_SIZE + 17];
        let from_reader = digest_reader(HashAlgorithm::Sha256, Cursor::new(&data)).unwrap();
        let from_bytes = digest_bytes(HashAlgorithm::Sha256, &data);
        assert_eq!(from_reader, from_bytes);
    }

    #[test]
    fn digest_reader_empty_input() {
        let address = digest_reader(HashAlgorithm::Sha256, Cursor::new(&[])).unwrap();
        assert_eq!(address.to_hex(), SHA256_EMPTY);
    }

    #[test]
    fn digest_reader_propagates_read_errors() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "boom"))
            }
        }

        let err = digest_reader(HashAlgorithm::Sha256, FailingReader).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn digester_reports_algorithm() {
        assert_eq!(
            Digester::new(HashAlgorithm::Blake3).algorithm(),
            HashAlgorithm::Blake3
        );
    }
}
