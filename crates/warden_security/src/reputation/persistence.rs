//! # Reputation File Format
//!
//! ```text
//! ┌────────┬─────────┬───────┬──────────────────────────────┬──────────┐
//! │ "WRDN" │ version │ count │ records...                   │ SHA-256  │
//! │ 4 B    │ u16     │ u32   │ len u16 | id | f64 | u64     │ 32 B     │
//! └────────┴─────────┴───────┴──────────────────────────────┴──────────┘
//! ```
//!
//! All integers are little-endian. The digest covers every byte before it.
//! A file is replaced by writing `<path>.tmp` and renaming it over the
//! original, so readers never observe a half-written table.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::{ReputationProfile, MAX_REPUTATION};
use crate::error::{SecurityError, SecurityResult};

/// File magic.
pub const MAGIC: [u8; 4] = *b"WRDN";
/// Current format version.
pub const VERSION: u16 = 1;
/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

const HEADER_LEN: usize = 4 + 2 + 4;

/// Serializes records into the file format.
///
/// # Errors
///
/// [`SecurityError::InvalidInput`] if an identity is longer than
/// `u16::MAX` bytes or there are more than `u32::MAX` records.
pub fn encode(records: &[(String, ReputationProfile)]) -> SecurityResult<Vec<u8>> {
    let count = u32::try_from(records.len())
        .map_err(|_| SecurityError::InvalidInput("too many reputation records".into()))?;

    let body: usize = records.iter().map(|(id, _)| 2 + id.len() + 8 + 8).sum();
    let mut out = Vec::with_capacity(HEADER_LEN + body + DIGEST_LEN);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    for (identity, profile) in records {
        let len = u16::try_from(identity.len())
            .map_err(|_| SecurityError::InvalidInput(format!("identity too long: {} bytes", identity.len())))?;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(identity.as_bytes());
        out.extend_from_slice(&profile.reputation.to_le_bytes());
        out.extend_from_slice(&profile.violation_count.to_le_bytes());
    }

    let digest = Sha256::digest(&out);
    out.extend_from_slice(&digest);
    Ok(out)
}

/// Parses and verifies the file format.
///
/// # Errors
///
/// [`SecurityError::IntegrityFailure`] if the digest does not match or the
/// payload is malformed.
pub fn decode(bytes: &[u8]) -> SecurityResult<Vec<(String, ReputationProfile)>> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(integrity("file too short"));
    }
    let (payload, stored) = bytes.split_at(bytes.len() - DIGEST_LEN);
    let computed = Sha256::digest(payload);
    if computed.as_slice() != stored {
        return Err(integrity(&format!(
            "digest mismatch (stored {}, computed {})",
            hex::encode(stored),
            hex::encode(computed)
        )));
    }

    let mut reader = Reader { bytes: payload, pos: 0 };
    if reader.take(4)? != MAGIC {
        return Err(integrity("bad magic"));
    }
    let version = u16::from_le_bytes(reader.array()?);
    if version != VERSION {
        return Err(integrity(&format!("unsupported version {version}")));
    }
    let count = u32::from_le_bytes(reader.array()?);

    let mut records = Vec::new();
    for _ in 0..count {
        let len = usize::from(u16::from_le_bytes(reader.array()?));
        let identity = std::str::from_utf8(reader.take(len)?)
            .map_err(|_| integrity("identity is not UTF-8"))?
            .to_owned();
        let reputation = f64::from_le_bytes(reader.array()?);
        let violation_count = u64::from_le_bytes(reader.array()?);

        if identity.is_empty() {
            return Err(integrity("empty identity"));
        }
        if !reputation.is_finite() || !(0.0..=MAX_REPUTATION).contains(&reputation) {
            return Err(integrity(&format!("reputation {reputation} out of range for {identity}")));
        }
        records.push((identity, ReputationProfile { reputation, violation_count }));
    }

    if reader.pos != payload.len() {
        return Err(integrity("trailing bytes after records"));
    }
    Ok(records)
}

/// Writes records to `path` through a temporary file and rename.
///
/// # Errors
///
/// [`SecurityError::Persistence`] on any I/O failure.
pub fn save(path: &Path, records: &[(String, ReputationProfile)]) -> SecurityResult<()> {
    let bytes = encode(records)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = tmp_path(path);
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    tracing::debug!("Saved {} reputation records to {}", records.len(), path.display());
    Ok(())
}

/// Reads records from `path`. A missing file yields no records.
///
/// # Errors
///
/// [`SecurityError::Persistence`] if the file exists but cannot be read,
/// [`SecurityError::IntegrityFailure`] if it fails verification.
pub fn load(path: &Path) -> SecurityResult<Vec<(String, ReputationProfile)>> {
    match fs::read(path) {
        Ok(bytes) => decode(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn integrity(msg: &str) -> SecurityError {
    SecurityError::IntegrityFailure(msg.to_owned())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> SecurityResult<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.bytes.len());
        let end = end.ok_or_else(|| integrity("truncated record"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> SecurityResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
