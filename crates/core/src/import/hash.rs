use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::ImportError;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of the file contents as lowercase hex, read in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<String, ImportError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_hash_known_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("book.txt");
        fs::write(&path, "abc").unwrap();

        assert_eq!(
            hash_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_spans_buffers() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        let mut content = vec![7u8; HASH_BUFFER_SIZE * 2 + 13];
        fs::write(&a, &content).unwrap();
        content[HASH_BUFFER_SIZE + 1] = 8;
        fs::write(&b, &content).unwrap();

        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        assert_eq!(
            hash_file(&b).unwrap(),
            format!("{:x}", Sha256::digest(&content))
        );
    }

    #[test]
    fn test_hash_missing_file() {
        let result = hash_file(Path::new("/nonexistent/book.epub"));
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
