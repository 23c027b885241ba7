//! Módulo de hashing de contenido (archivos y conjuntos de labels).

pub mod checksum;

pub use checksum::{hash_file, hash_set, to_b64_str, CONTENT_HASH_LEN};
