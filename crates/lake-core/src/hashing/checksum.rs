//! Checksums de contenido para deduplicación.
//!
//! Se usa md5 truncado a 20 caracteres base64url: el hash funciona como clave
//! corta de contenido, no como primitiva de seguridad. La colisión se tolera
//! (ver política de duplicados en `ingest`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use md5::{Digest, Md5};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Longitud del hash truncado (caracteres base64url).
pub const CONTENT_HASH_LEN: usize = 20;

const CHUNK_SIZE: usize = 8192;

/// Codifica bytes como base64url sin padding.
pub fn to_b64_str(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn truncate_hash(mut b64: String) -> String {
    b64.truncate(CONTENT_HASH_LEN);
    b64
}

/// Hashea un archivo por streaming en bloques de tamaño fijo.
/// Contenido idéntico produce el mismo hash; los errores de IO se propagan.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(truncate_hash(to_b64_str(&hasher.finalize())))
}

/// Hashea un conjunto de labels de forma orden-independiente: se ordena
/// lexicográficamente y se une con `:` antes de digerir.
pub fn hash_set<I, S>(labels: I) -> String
    where I: IntoIterator<Item = S>,
          S: AsRef<str>
{
    let mut sorted: Vec<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
    sorted.sort();
    sorted.dedup();
    let joined = sorted.join(":");
    truncate_hash(to_b64_str(&Md5::digest(joined.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_set_is_permutation_invariant() {
        let a = hash_set(["CD8A", "CD4", "FOXP3"]);
        let b = hash_set(["FOXP3", "CD8A", "CD4"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), CONTENT_HASH_LEN);
    }

    #[test]
    fn hash_set_distinguishes_different_sets() {
        assert_ne!(hash_set(["CD8A", "CD4"]), hash_set(["CD8A", "CD3E"]));
    }

    #[test]
    fn hash_file_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.bin");
        let p2 = dir.path().join("b.bin");
        let p3 = dir.path().join("c.bin");
        std::fs::write(&p1, b"genes are fun").unwrap();
        std::fs::write(&p2, b"genes are fun").unwrap();
        std::fs::write(&p3, b"genes are fuN").unwrap();
        let h1 = hash_file(&p1).unwrap();
        let h2 = hash_file(&p2).unwrap();
        let h3 = hash_file(&p3).unwrap();
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h1.len(), CONTENT_HASH_LEN);
        // base64url: nunca debe aparecer padding
        assert!(!h1.contains('='));
    }

    #[test]
    fn hash_file_streams_beyond_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let mut f = File::create(&path).unwrap();
        let block = vec![7u8; CHUNK_SIZE + 123];
        f.write_all(&block).unwrap();
        drop(f);
        let h = hash_file(&path).unwrap();
        assert_eq!(h.len(), CONTENT_HASH_LEN);
        assert_eq!(h, hash_file(&path).unwrap());
    }

    #[test]
    fn hash_file_propagates_io_errors() {
        assert!(hash_file(Path::new("/definitely/not/there.csv")).is_err());
    }
}
